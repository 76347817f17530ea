//! 验证码管理器
//!
//! 面向调用方的签发与验证接口，把 [`Composer`]、[`Validator`] 和存储串起来。
//! 发送（短信、邮件）由应用层负责。
//!
//! ## 示例
//!
//! ```rust
//! use otprs::{OtpConfig, OtpManager};
//!
//! let manager = OtpManager::new(OtpConfig::default()).unwrap();
//!
//! let code = manager.issue("alice").unwrap();
//! // send_sms(phone, &code);
//!
//! assert!(manager.verify(&code, "alice").unwrap());
//! // 一次性：再次验证失败
//! assert!(!manager.verify(&code, "alice").unwrap());
//! ```

use chrono::Utc;

use crate::composer::Composer;
use crate::config::OtpConfig;
use crate::error::{Error, Result};
use crate::record::{OtpRecord, RecordField};
use crate::store::{InMemoryOtpStore, OtpStore};
use crate::validator::{CheckOutcome, Validator};

/// 验证码管理器
#[derive(Debug)]
pub struct OtpManager<S: OtpStore = InMemoryOtpStore> {
    composer: Composer,
    validator: Validator<S>,
}

impl OtpManager<InMemoryOtpStore> {
    /// 使用默认内存存储创建管理器
    pub fn new(config: OtpConfig) -> Result<Self> {
        Self::with_store(InMemoryOtpStore::new(), config)
    }

    /// 使用默认配置创建管理器
    pub fn with_default_config() -> Result<Self> {
        Self::new(OtpConfig::default())
    }
}

impl<S: OtpStore> OtpManager<S> {
    /// 使用自定义存储创建管理器
    ///
    /// # Errors
    ///
    /// 配置无效时返回 [`Error::Config`]。
    pub fn with_store(store: S, config: OtpConfig) -> Result<Self> {
        let composer = Composer::new(config.clone())?;
        let validator = Validator::new(store, config)?;
        Ok(Self {
            composer,
            validator,
        })
    }

    /// 为主体签发验证码，返回待发送的验证码
    ///
    /// # Arguments
    ///
    /// * `subject_id` - 验证码绑定的主体标识（如用户名）
    ///
    /// # Returns
    ///
    /// 返回验证码字符串，长度为 `code_length`
    ///
    /// # Errors
    ///
    /// 存储失败时返回 [`Error::Storage`]，行为见 [`issue_record`](Self::issue_record)。
    ///
    /// # Example
    ///
    /// ```rust
    /// use otprs::OtpManager;
    ///
    /// let manager = OtpManager::with_default_config().unwrap();
    /// let code = manager.issue("alice").unwrap();
    /// assert_eq!(code.len(), 6);
    /// ```
    pub fn issue(&self, subject_id: &str) -> Result<String> {
        self.issue_record(subject_id).map(|record| record.value)
    }

    /// 为主体签发验证码，返回已存储的记录（含 ID）
    ///
    /// 未开启 `allow_multiple` 时会先删除该主体已有的记录，再插入新记录。
    /// 插入失败时旧记录已被删除，主体没有可用的验证码，需要重新签发。
    ///
    /// # Errors
    ///
    /// 撤销或插入失败时返回 [`Error::Storage`]。
    pub fn issue_record(&self, subject_id: &str) -> Result<OtpRecord> {
        let mut record = self.composer.issue(subject_id)?;

        let replaced = if self.config().allow_multiple {
            0
        } else {
            self.revoke(subject_id)?
        };

        let id = self.store().insert(record.clone()).map_err(|e| {
            tracing::error!(
                subject_id,
                replaced,
                error = %e,
                event = "otp_storage_failed",
                "Failed to store issued code"
            );
            e
        })?;
        record.id = Some(id);

        tracing::info!(
            subject_id,
            record_id = ?record.id,
            replaced,
            expires_at = %record.expires_at(self.config().validity()),
            event = "otp_issued",
            "Issued new code"
        );

        Ok(record)
    }

    /// 验证主体提交的验证码
    pub fn verify(&self, code: &str, subject_id: &str) -> Result<bool> {
        self.validator.check(code, subject_id)
    }

    /// 验证并返回详细结果
    pub fn verify_with_result(&self, code: &str, subject_id: &str) -> Result<CheckOutcome> {
        self.validator.check_with_result(code, subject_id)
    }

    /// 撤销主体的全部待检查记录，返回删除数量
    pub fn revoke(&self, subject_id: &str) -> Result<usize> {
        let mut removed = 0;
        while self
            .store()
            .take_one_by_field(RecordField::SubjectId, subject_id)?
            .is_some()
        {
            removed += 1;
        }

        if removed > 0 {
            tracing::debug!(subject_id, removed, event = "otp_revoked", "Revoked outstanding codes");
        }
        Ok(removed)
    }

    /// 清理已过期的记录，返回删除数量
    pub fn cleanup(&self) -> Result<usize> {
        let cutoff = Utc::now()
            .checked_sub_signed(self.config().validity())
            .ok_or_else(|| Error::internal("cleanup cutoff is out of range"))?;
        let removed = self.store().delete_issued_before(cutoff)?;

        tracing::debug!(removed, %cutoff, event = "otp_cleanup", "Removed expired codes");
        Ok(removed)
    }

    /// 获取配置
    pub fn config(&self) -> &OtpConfig {
        self.composer.config()
    }

    /// 获取生成器
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// 获取存储
    pub fn store(&self) -> &S {
        self.validator.store()
    }
}
