//! 验证码生成
//!
//! 生成分两步：
//!
//! 1. **构建模板**：为每个位置分配一个字符类，保证每个字符类满足配置的最少个数，
//!    多出的位置从填充字符类中选取（见 [`TemplateStrategy`]）
//! 2. **渲染**：对每个位置，从该字符类的字母表中均匀随机选取一个字符
//!
//! ## 示例
//!
//! ```rust
//! use otprs::{CharClass, Composer, OtpConfig};
//!
//! let composer = Composer::new(OtpConfig::default()).unwrap();
//!
//! let record = composer.issue("alice").unwrap();
//! assert_eq!(record.value.len(), 6);
//! assert!(record.value.chars().any(|c| CharClass::Upper.contains(c)));
//! assert!(record.value.chars().any(|c| CharClass::Special.contains(c)));
//! ```

mod class;
mod template;

pub use class::{CharClass, DIGITS, LOWERCASE, SPECIAL, UPPERCASE};
pub use template::{Template, TemplateStrategy};

use chrono::{DateTime, Utc};

use crate::config::OtpConfig;
use crate::error::{Error, Result};
use crate::random::pick_char;
use crate::record::OtpRecord;

/// 验证码生成器
///
/// 不接触存储；持久化由调用方负责。
#[derive(Debug, Clone)]
pub struct Composer {
    config: OtpConfig,
}

impl Composer {
    /// 创建生成器
    ///
    /// # Errors
    ///
    /// 配置无效时返回 [`Error::Config`]。
    pub fn new(config: OtpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 构建字符类模板
    pub fn build_template(&self) -> Template {
        Template::build(&self.config)
    }

    /// 将模板渲染为验证码
    ///
    /// # Errors
    ///
    /// 模板中存在未赋值的位置时返回 [`Error::Internal`]。
    pub fn render(&self, template: &Template) -> Result<String> {
        template
            .slots()
            .iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.and_then(|class| pick_char(class.alphabet()))
                    .ok_or_else(|| {
                        tracing::error!(
                            position,
                            template_len = template.len(),
                            event = "otp_template_invalid",
                            "Template slot has no character class"
                        );
                        Error::internal(format!("template slot {} has no character class", position))
                    })
            })
            .collect()
    }

    /// 生成一个新的验证码字符串
    pub fn generate_value(&self) -> Result<String> {
        let template = self.build_template();
        self.render(&template)
    }

    /// 为主体签发一条新记录
    ///
    /// `issued_at = now + clock_offset_hours`，状态为 `Ready`，尚未分配 ID。
    /// 不写入存储。
    ///
    /// # Arguments
    ///
    /// * `subject_id` - 验证码绑定的主体标识
    ///
    /// # Returns
    ///
    /// 返回待存储的 [`OtpRecord`]
    pub fn issue(&self, subject_id: impl Into<String>) -> Result<OtpRecord> {
        self.issue_at(subject_id, Utc::now())
    }

    /// 以指定的当前时间签发
    pub fn issue_at(&self, subject_id: impl Into<String>, now: DateTime<Utc>) -> Result<OtpRecord> {
        let value = self.generate_value()?;
        let issued_at = now
            .checked_add_signed(self.config.clock_offset())
            .ok_or_else(|| Error::internal("issued_at is out of range"))?;
        Ok(OtpRecord::new(subject_id, value, issued_at))
    }

    /// 获取配置
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }
}
