//! 统一错误类型模块
//!
//! 提供 otprs 库中所有操作的错误类型定义。
//!
//! 注意：验证码不存在、已过期、不匹配都**不是**错误，
//! 它们是正常的业务结果，由 [`crate::validator::Validator::check`] 以 `false` 返回。

use thiserror::Error;

/// otprs 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// otprs 库的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 配置错误（在构造时报告，不会延迟到生成时）
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 存储错误（来自存储端口的实现）
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 内部不变量被破坏（程序缺陷，不应被静默恢复）
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个无效配置值错误
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config(ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        })
    }

    /// 是否为配置错误
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 各字符类的最小数量之和超过验证码长度
    #[error("class minimums require {required} characters but code length is {code_length}")]
    MinimumsExceedLength { required: usize, code_length: usize },

    /// 需要填充位置但填充字符类集合为空
    #[error("{missing} position(s) need padding but no default fill classes are configured")]
    EmptyFillClasses { missing: usize },

    /// 无效的配置值
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// 记录已存在
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// 操作失败
    #[error("storage operation failed: {0}")]
    OperationFailed(String),

    /// 后端不支持该操作
    #[error("operation not supported by store: {0}")]
    Unsupported(String),
}
