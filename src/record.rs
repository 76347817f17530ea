//! 验证码记录
//!
//! 一条 [`OtpRecord`] 代表一个尚未被检查的验证码。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// 存储分配的记录 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// 包装一个已有的 ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// ID 字符串
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 验证码状态
///
/// 目前只有 `Ready` 参与校验逻辑，其余状态为后续的两阶段确认流程保留。
/// 序列化为数字编码：Ready=1，Completed=2，Used=3。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OtpStatus {
    /// 已签发，等待检查
    #[default]
    Ready,
    /// 已确认
    Completed,
    /// 已使用
    Used,
}

impl OtpStatus {
    /// 存储层使用的数字编码
    pub fn code(&self) -> u8 {
        match self {
            OtpStatus::Ready => 1,
            OtpStatus::Completed => 2,
            OtpStatus::Used => 3,
        }
    }

    /// 由数字编码还原
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(OtpStatus::Ready),
            2 => Some(OtpStatus::Completed),
            3 => Some(OtpStatus::Used),
            _ => None,
        }
    }
}

impl From<OtpStatus> for u8 {
    fn from(status: OtpStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for OtpStatus {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        OtpStatus::from_code(code)
            .ok_or_else(|| Error::internal(format!("unknown otp status code {}", code)))
    }
}

impl fmt::Display for OtpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpStatus::Ready => write!(f, "ready"),
            OtpStatus::Completed => write!(f, "completed"),
            OtpStatus::Used => write!(f, "used"),
        }
    }
}

/// 可用于查找的记录字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    /// 绑定的主体标识
    SubjectId,
    /// 验证码本身
    Value,
}

impl RecordField {
    /// 字段在存储中的名称
    pub fn name(&self) -> &'static str {
        match self {
            RecordField::SubjectId => "subject_id",
            RecordField::Value => "value",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 验证码记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// 存储分配的 ID，插入前为 `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    /// 验证码
    pub value: String,

    /// 绑定的主体标识（如用户名）
    pub subject_id: String,

    /// 状态
    #[serde(default)]
    pub status: OtpStatus,

    /// 签发时间（已包含时钟偏移）
    pub issued_at: DateTime<Utc>,

    /// 确认时间，保留字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OtpRecord {
    /// 创建一条 `Ready` 状态的新记录
    pub fn new(
        subject_id: impl Into<String>,
        value: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            value: value.into(),
            subject_id: subject_id.into(),
            status: OtpStatus::Ready,
            issued_at,
            completed_at: None,
        }
    }

    /// 附带 ID
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// 过期时间 = `issued_at + validity`
    pub fn expires_at(&self, validity: Duration) -> DateTime<Utc> {
        self.issued_at
            .checked_add_signed(validity)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// 在 `now` 时刻是否已过期
    ///
    /// 恰好等于过期时间时仍然有效。
    pub fn is_expired_at(&self, validity: Duration, now: DateTime<Utc>) -> bool {
        now > self.expires_at(validity)
    }

    /// 是否处于可检查状态
    pub fn is_ready(&self) -> bool {
        self.status == OtpStatus::Ready
    }

    /// 指定字段的值
    pub fn field(&self, field: RecordField) -> &str {
        match field {
            RecordField::SubjectId => &self.subject_id,
            RecordField::Value => &self.value,
        }
    }
}
