//! 验证码配置
//!
//! [`OtpConfig`] 在进程启动时构建一次，之后作为不可变值传入
//! [`Composer`](crate::composer::Composer)、[`Validator`](crate::validator::Validator)
//! 和 [`OtpManager`](crate::manager::OtpManager)。
//!
//! 配置错误在构造组件时立即报告，不会拖到生成验证码时才暴露。
//!
//! ## 示例
//!
//! ```rust
//! use otprs::{CharClass, OtpConfig};
//!
//! let config = OtpConfig::default()
//!     .with_code_length(8)
//!     .with_min_special(2)
//!     .with_validity_seconds(300)
//!     .with_clock_offset_hours(0)
//!     .with_default_fill_classes(vec![CharClass::Lower, CharClass::Digit]);
//!
//! assert!(config.validate().is_ok());
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::composer::{CharClass, TemplateStrategy};
use crate::error::{ConfigError, Error, Result};

/// 默认有效期（秒）
pub const DEFAULT_VALIDITY_SECONDS: u64 = 600;

/// 默认验证码长度
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// 默认时钟偏移（小时）
pub const DEFAULT_CLOCK_OFFSET_HOURS: i64 = 3;

/// 默认存储集合名
pub const DEFAULT_COLLECTION: &str = "otps";

/// 验证码配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// 有效期（秒），从 `issued_at` 起算
    pub validity_seconds: u64,

    /// 验证码长度
    pub code_length: usize,

    /// 大写字母最少个数
    pub min_upper: usize,

    /// 小写字母最少个数
    pub min_lower: usize,

    /// 数字最少个数
    pub min_digit: usize,

    /// 特殊字符最少个数
    pub min_special: usize,

    /// 签发时间的时钟偏移（小时）
    ///
    /// `issued_at = now + clock_offset_hours`，用于补偿存储端与应用端的时钟差，
    /// 它同样会推迟过期时间。
    pub clock_offset_hours: i64,

    /// 满足最少个数后，剩余位置从这些字符类中随机选取
    pub default_fill_classes: Vec<CharClass>,

    /// 是否允许同一主体同时存在多条验证码
    ///
    /// 为 `false` 时，签发新验证码会先删除该主体已有的记录。
    pub allow_multiple: bool,

    /// 模板构建策略
    pub template_strategy: TemplateStrategy,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            validity_seconds: DEFAULT_VALIDITY_SECONDS,
            code_length: DEFAULT_CODE_LENGTH,
            min_upper: 1,
            min_lower: 1,
            min_digit: 1,
            min_special: 1,
            clock_offset_hours: DEFAULT_CLOCK_OFFSET_HOURS,
            default_fill_classes: vec![CharClass::Lower],
            allow_multiple: false,
            template_strategy: TemplateStrategy::default(),
        }
    }
}

impl OtpConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 纯数字验证码
    ///
    /// 所有位置都是数字，适合短信场景。
    pub fn numeric(length: usize) -> Self {
        Self {
            code_length: length,
            min_upper: 0,
            min_lower: 0,
            min_digit: length,
            min_special: 0,
            default_fill_classes: vec![CharClass::Digit],
            ..Self::default()
        }
    }

    /// 高强度配置
    ///
    /// - 10 位验证码
    /// - 每个字符类至少 2 个
    /// - 剩余位置从全部字符类中选取
    /// - 5 分钟有效期
    pub fn strict() -> Self {
        Self {
            validity_seconds: 300,
            code_length: 10,
            min_upper: 2,
            min_lower: 2,
            min_digit: 2,
            min_special: 2,
            default_fill_classes: CharClass::ALL.to_vec(),
            ..Self::default()
        }
    }

    /// 设置有效期（秒）
    pub fn with_validity_seconds(mut self, seconds: u64) -> Self {
        self.validity_seconds = seconds;
        self
    }

    /// 设置验证码长度
    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// 设置大写字母最少个数
    pub fn with_min_upper(mut self, count: usize) -> Self {
        self.min_upper = count;
        self
    }

    /// 设置小写字母最少个数
    pub fn with_min_lower(mut self, count: usize) -> Self {
        self.min_lower = count;
        self
    }

    /// 设置数字最少个数
    pub fn with_min_digit(mut self, count: usize) -> Self {
        self.min_digit = count;
        self
    }

    /// 设置特殊字符最少个数
    pub fn with_min_special(mut self, count: usize) -> Self {
        self.min_special = count;
        self
    }

    /// 按字符类设置最少个数
    pub fn with_minimum(mut self, class: CharClass, count: usize) -> Self {
        match class {
            CharClass::Upper => self.min_upper = count,
            CharClass::Lower => self.min_lower = count,
            CharClass::Digit => self.min_digit = count,
            CharClass::Special => self.min_special = count,
        }
        self
    }

    /// 设置时钟偏移（小时）
    pub fn with_clock_offset_hours(mut self, hours: i64) -> Self {
        self.clock_offset_hours = hours;
        self
    }

    /// 设置填充字符类
    pub fn with_default_fill_classes(mut self, classes: Vec<CharClass>) -> Self {
        self.default_fill_classes = classes;
        self
    }

    /// 设置是否允许多条并存
    pub fn with_allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = allow;
        self
    }

    /// 设置模板构建策略
    pub fn with_template_strategy(mut self, strategy: TemplateStrategy) -> Self {
        self.template_strategy = strategy;
        self
    }

    /// 某个字符类的最少个数
    pub fn minimum(&self, class: CharClass) -> usize {
        match class {
            CharClass::Upper => self.min_upper,
            CharClass::Lower => self.min_lower,
            CharClass::Digit => self.min_digit,
            CharClass::Special => self.min_special,
        }
    }

    /// 四个字符类的最少个数，顺序同 [`CharClass::ALL`]
    pub fn minimums(&self) -> [usize; 4] {
        CharClass::ALL.map(|class| self.minimum(class))
    }

    /// 最少个数之和
    ///
    /// 溢出时饱和为 `usize::MAX`，使 [`validate`](Self::validate) 按超长拒绝。
    pub fn required_len(&self) -> usize {
        self.minimums()
            .iter()
            .try_fold(0usize, |acc, n| acc.checked_add(*n))
            .unwrap_or(usize::MAX)
    }

    /// 有效期
    pub fn validity(&self) -> Duration {
        i64::try_from(self.validity_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// 时钟偏移
    pub fn clock_offset(&self) -> Duration {
        Duration::try_hours(self.clock_offset_hours).unwrap_or(Duration::zero())
    }

    /// 校验配置
    ///
    /// # Errors
    ///
    /// - 验证码长度为 0
    /// - 最少个数之和超过验证码长度
    /// - 需要填充但填充字符类为空
    /// - 有效期或时钟偏移超出可表示范围
    pub fn validate(&self) -> Result<()> {
        if self.code_length == 0 {
            return Err(Error::invalid_config(
                "code_length",
                "must be greater than zero",
            ));
        }

        let required = self.required_len();
        if required > self.code_length {
            return Err(ConfigError::MinimumsExceedLength {
                required,
                code_length: self.code_length,
            }
            .into());
        }

        let missing = self.code_length - required;
        if missing > 0 && self.default_fill_classes.is_empty() {
            return Err(ConfigError::EmptyFillClasses { missing }.into());
        }

        let validity_ok = i64::try_from(self.validity_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .is_some();
        if !validity_ok {
            return Err(Error::invalid_config(
                "validity_seconds",
                format!("{} is out of range", self.validity_seconds),
            ));
        }

        if Duration::try_hours(self.clock_offset_hours).is_none() {
            return Err(Error::invalid_config(
                "clock_offset_hours",
                format!("{} is out of range", self.clock_offset_hours),
            ));
        }

        Ok(())
    }

    /// 从环境变量加载配置
    ///
    /// 未设置的变量使用默认值：
    ///
    /// | 变量 | 字段 |
    /// |------|------|
    /// | `OTP_VALIDITY_SECONDS` | `validity_seconds` |
    /// | `OTP_CODE_LENGTH` | `code_length` |
    /// | `OTP_MIN_UPPER` / `OTP_MIN_LOWER` / `OTP_MIN_DIGIT` / `OTP_MIN_SPECIAL` | 各字符类最少个数 |
    /// | `OTP_CLOCK_OFFSET_HOURS` | `clock_offset_hours` |
    /// | `OTP_DEFAULT_FILL_CLASSES` | 逗号分隔，如 `lower,digit` |
    /// | `OTP_ALLOW_MULTIPLE` | `true` / `false` |
    /// | `OTP_TEMPLATE_STRATEGY` | `shuffle` / `rejection_sampling` |
    ///
    /// 返回的配置已经过 [`validate`](Self::validate)。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "OTP_VALIDITY_SECONDS")? {
            config.validity_seconds = v;
        }
        if let Some(v) = parse_var(&lookup, "OTP_CODE_LENGTH")? {
            config.code_length = v;
        }
        if let Some(v) = parse_var(&lookup, "OTP_MIN_UPPER")? {
            config.min_upper = v;
        }
        if let Some(v) = parse_var(&lookup, "OTP_MIN_LOWER")? {
            config.min_lower = v;
        }
        if let Some(v) = parse_var(&lookup, "OTP_MIN_DIGIT")? {
            config.min_digit = v;
        }
        if let Some(v) = parse_var(&lookup, "OTP_MIN_SPECIAL")? {
            config.min_special = v;
        }
        if let Some(v) = parse_var(&lookup, "OTP_CLOCK_OFFSET_HOURS")? {
            config.clock_offset_hours = v;
        }
        if let Some(raw) = lookup("OTP_DEFAULT_FILL_CLASSES") {
            config.default_fill_classes = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(CharClass::from_str)
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(v) = parse_var(&lookup, "OTP_ALLOW_MULTIPLE")? {
            config.allow_multiple = v;
        }
        if let Some(v) = parse_var(&lookup, "OTP_TEMPLATE_STRATEGY")? {
            config.template_strategy = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::invalid_config(key, format!("'{}': {}", raw, e))),
    }
}
