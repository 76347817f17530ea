//! 验证码校验
//!
//! 每条记录只能被检查一次：只要找到记录，无论检查结果如何都会被删除。
//!
//! ```text
//! Ready --(check, 任意结果)--> 已删除
//! ```
//!
//! 记录不存在、已过期、不匹配都属于正常结果，以 `Ok(false)` 返回；
//! 只有存储层故障才会返回错误。

use chrono::{DateTime, Utc};
use std::fmt;

use crate::config::OtpConfig;
use crate::error::Result;
use crate::random::constant_time_compare_str;
use crate::record::{OtpRecord, RecordField};
use crate::store::OtpStore;

/// 一次检查的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
    /// 通过
    Accepted,
    /// 主体没有待检查的记录（从未签发或已被消费）
    NotFound,
    /// 验证码不匹配
    Mismatch,
    /// 已过期
    Expired,
    /// 记录状态不是 `Ready`
    NotReady,
}

impl CheckOutcome {
    /// 是否通过
    pub fn is_accepted(&self) -> bool {
        matches!(self, CheckOutcome::Accepted)
    }

    /// 是否消费了一条记录
    pub fn consumed(&self) -> bool {
        !matches!(self, CheckOutcome::NotFound)
    }

    /// 日志中使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckOutcome::Accepted => "accepted",
            CheckOutcome::NotFound => "not_found",
            CheckOutcome::Mismatch => "mismatch",
            CheckOutcome::Expired => "expired",
            CheckOutcome::NotReady => "not_ready",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对一条已取出的记录做判定
///
/// 三个条件全部满足才通过：值完全一致（区分大小写）、未过期、状态为 `Ready`。
pub fn evaluate(
    record: &OtpRecord,
    submitted: &str,
    config: &OtpConfig,
    now: DateTime<Utc>,
) -> CheckOutcome {
    if !constant_time_compare_str(submitted, &record.value) {
        CheckOutcome::Mismatch
    } else if record.is_expired_at(config.validity(), now) {
        CheckOutcome::Expired
    } else if !record.is_ready() {
        CheckOutcome::NotReady
    } else {
        CheckOutcome::Accepted
    }
}

/// 验证码校验器
#[derive(Debug, Clone)]
pub struct Validator<S: OtpStore> {
    store: S,
    config: OtpConfig,
}

impl<S: OtpStore> Validator<S> {
    /// 创建校验器
    ///
    /// # Errors
    ///
    /// 配置无效时返回 [`Error::Config`](crate::Error::Config)。
    pub fn new(store: S, config: OtpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// 检查验证码
    ///
    /// 找到记录时无论结果如何都会删除它。
    ///
    /// # Arguments
    ///
    /// * `submitted` - 用户提交的验证码，区分大小写
    /// * `subject_id` - 验证码绑定的主体标识
    ///
    /// # Returns
    ///
    /// 值一致、未过期且状态为 `Ready` 时返回 `true`；未找到记录时返回 `false`
    ///
    /// # Errors
    ///
    /// 存储操作失败时返回 [`Error::Storage`](crate::Error::Storage)。
    ///
    /// # Example
    ///
    /// ```rust
    /// use otprs::{Composer, InMemoryOtpStore, OtpConfig, OtpStore, Validator};
    ///
    /// let store = InMemoryOtpStore::new();
    /// let composer = Composer::new(OtpConfig::default()).unwrap();
    /// let record = composer.issue("alice").unwrap();
    /// store.insert(record.clone()).unwrap();
    ///
    /// let validator = Validator::new(store, OtpConfig::default()).unwrap();
    /// assert!(validator.check(&record.value, "alice").unwrap());
    /// assert!(!validator.check(&record.value, "alice").unwrap());
    /// ```
    pub fn check(&self, submitted: &str, subject_id: &str) -> Result<bool> {
        Ok(self.check_with_result(submitted, subject_id)?.is_accepted())
    }

    /// 检查验证码并返回详细结果
    pub fn check_with_result(&self, submitted: &str, subject_id: &str) -> Result<CheckOutcome> {
        self.check_at(submitted, subject_id, Utc::now())
    }

    /// 以指定的当前时间检查验证码
    pub fn check_at(
        &self,
        submitted: &str,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckOutcome> {
        let Some(record) = self
            .store
            .take_one_by_field(RecordField::SubjectId, subject_id)?
        else {
            tracing::info!(
                subject_id,
                collection = self.store.collection(),
                event = "otp_not_found",
                "No outstanding code for subject"
            );
            return Ok(CheckOutcome::NotFound);
        };

        let outcome = evaluate(&record, submitted, &self.config, now);

        if outcome.is_accepted() {
            tracing::info!(
                subject_id,
                record_id = ?record.id,
                event = "otp_verified",
                "Code accepted and consumed"
            );
        } else {
            tracing::warn!(
                subject_id,
                record_id = ?record.id,
                outcome = %outcome,
                event = "otp_rejected",
                "Code rejected and consumed"
            );
        }

        Ok(outcome)
    }

    /// 获取配置
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// 获取存储
    pub fn store(&self) -> &S {
        &self.store
    }
}
