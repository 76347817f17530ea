//! # otprs
//!
//! 签发和校验短期、一次性的验证码（OTP），验证码绑定到一个主体标识（如用户名）。
//!
//! ## 功能特性
//!
//! - **组成约束**: 按字符类（大写、小写、数字、特殊字符）设置最少个数
//! - **一次性消费**: 每条记录只能被检查一次，无论成功与否
//! - **有效期**: 可配置有效期和签发时间的时钟偏移
//! - **存储端口**: 通过 [`OtpStore`] 接入任意存储后端，自带内存实现
//!
//! ## 设计原则
//!
//! 本库只负责验证码的生成、存储记录的结构和校验逻辑，**不包含**短信/邮件发送，
//! 也不做速率限制或暴力破解锁定。
//!
//! ## 示例
//!
//! ```rust
//! use otprs::{OtpConfig, OtpManager};
//!
//! let config = OtpConfig::default()
//!     .with_code_length(6)
//!     .with_validity_seconds(600);
//! let manager = OtpManager::new(config).unwrap();
//!
//! let code = manager.issue("alice").unwrap();
//! assert_eq!(code.len(), 6);
//!
//! assert!(manager.verify(&code, "alice").unwrap());
//! assert!(!manager.verify(&code, "alice").unwrap());
//! ```
//!
//! ## 自定义存储
//!
//! ```rust
//! use otprs::{InMemoryOtpStore, OtpConfig, OtpManager, OtpStore};
//!
//! let store = InMemoryOtpStore::with_collection("login_codes");
//! let manager = OtpManager::with_store(store.clone(), OtpConfig::default()).unwrap();
//!
//! manager.issue("bob").unwrap();
//! assert_eq!(store.len().unwrap(), 1);
//! assert_eq!(store.collection(), "login_codes");
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod manager;
pub mod random;
pub mod record;
pub mod store;
pub mod validator;

pub use composer::{CharClass, Composer, Template, TemplateStrategy};
pub use config::OtpConfig;
pub use error::{ConfigError, Error, Result, StorageError};
pub use manager::OtpManager;
pub use record::{OtpRecord, OtpStatus, RecordField, RecordId};
pub use store::{InMemoryOtpStore, OtpStore};
pub use validator::{CheckOutcome, Validator};
