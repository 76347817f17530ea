//! 存储端口
//!
//! 核心逻辑只通过 [`OtpStore`] 访问持久化层。实现此 trait 即可接入
//! 文档数据库、Redis 等后端；[`InMemoryOtpStore`] 适用于单实例部署和测试。
//!
//! ## 读取后删除
//!
//! 验证流程需要"读出记录，然后删除"。[`OtpStore::take_one_by_field`] 的默认实现
//! 是先 `find_one_by_field` 再 `delete_by_id`，两步之间没有加锁：
//! 同一主体的两次并发检查可能都读到记录，从而让同一个验证码被接受两次。
//! 后端若支持原子的"删除并返回"操作，应覆盖该方法。`InMemoryOtpStore` 已覆盖。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::DEFAULT_COLLECTION;
use crate::error::{Error, Result, StorageError};
use crate::random::generate_random_hex;
use crate::record::{OtpRecord, RecordField, RecordId};

/// 记录 ID 的随机字节数
const RECORD_ID_BYTES: usize = 12;

/// 验证码存储接口
pub trait OtpStore: Send + Sync {
    /// 集合名称
    fn collection(&self) -> &str;

    /// 插入记录并返回分配的 ID
    fn insert(&self, record: OtpRecord) -> Result<RecordId>;

    /// 按字段查找一条记录
    fn find_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>>;

    /// 按 ID 删除记录
    ///
    /// 删除不存在的 ID 不是错误。
    fn delete_by_id(&self, id: &RecordId) -> Result<()>;

    /// 删除签发时间早于 `cutoff` 的记录，返回删除数量
    ///
    /// 维护操作，默认返回 [`StorageError::Unsupported`]。
    fn delete_issued_before(&self, _cutoff: DateTime<Utc>) -> Result<usize> {
        Err(StorageError::Unsupported(format!("{}: delete_issued_before", self.collection())).into())
    }

    /// 按字段取出一条记录：查找并删除
    ///
    /// 默认实现不是原子的，见模块文档。
    ///
    /// # Errors
    ///
    /// 查到的记录没有 ID 时无法删除，返回 [`Error::Internal`](crate::Error::Internal)，
    /// 记录不会被返回。
    fn take_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        let Some(record) = self.find_one_by_field(field, value)? else {
            return Ok(None);
        };
        let Some(id) = &record.id else {
            tracing::error!(
                collection = self.collection(),
                field = %field,
                event = "otp_record_without_id",
                "Store returned a record without id"
            );
            return Err(Error::internal(format!(
                "{} returned a record without id for field '{}'",
                self.collection(),
                field
            )));
        };
        self.delete_by_id(id)?;
        Ok(Some(record))
    }
}

impl<S: OtpStore + ?Sized> OtpStore for Arc<S> {
    fn collection(&self) -> &str {
        (**self).collection()
    }

    fn insert(&self, record: OtpRecord) -> Result<RecordId> {
        (**self).insert(record)
    }

    fn find_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        (**self).find_one_by_field(field, value)
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<()> {
        (**self).delete_by_id(id)
    }

    fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        (**self).delete_issued_before(cutoff)
    }

    fn take_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        (**self).take_one_by_field(field, value)
    }
}

// ============================================================================
// 内存存储实现
// ============================================================================

/// 内存存储实现
///
/// 克隆后共享同一份数据。
#[derive(Debug, Clone)]
pub struct InMemoryOtpStore {
    collection: String,
    /// id -> 记录
    records: Arc<RwLock<HashMap<RecordId, OtpRecord>>>,
}

impl Default for InMemoryOtpStore {
    fn default() -> Self {
        Self::with_collection(DEFAULT_COLLECTION)
    }
}

impl InMemoryOtpStore {
    /// 使用默认集合名 `"otps"` 创建
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定集合名创建
    pub fn with_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 当前记录数量
    ///
    /// # Errors
    ///
    /// 锁中毒时返回 [`StorageError::OperationFailed`]。
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// 是否为空
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// 指定主体的全部记录
    pub fn records_for(&self, subject_id: &str) -> Result<Vec<OtpRecord>> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<RecordId, OtpRecord>>> {
        self.records
            .read()
            .map_err(|_| StorageError::OperationFailed("otp store lock poisoned".into()).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<RecordId, OtpRecord>>> {
        self.records
            .write()
            .map_err(|_| StorageError::OperationFailed("otp store lock poisoned".into()).into())
    }
}

/// 同一字段值有多条记录时返回最早签发的一条
fn oldest_match<'a>(
    records: impl Iterator<Item = &'a OtpRecord>,
    field: RecordField,
    value: &str,
) -> Option<&'a OtpRecord> {
    records
        .filter(|r| r.field(field) == value)
        .min_by_key(|r| r.issued_at)
}

impl OtpStore for InMemoryOtpStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn insert(&self, mut record: OtpRecord) -> Result<RecordId> {
        let id = match record.id.clone() {
            Some(id) => id,
            None => RecordId::new(generate_random_hex(RECORD_ID_BYTES)?),
        };

        let mut records = self.write()?;
        if records.contains_key(&id) {
            return Err(StorageError::AlreadyExists(format!("{}/{}", self.collection, id)).into());
        }
        record.id = Some(id.clone());
        records.insert(id.clone(), record);
        Ok(id)
    }

    fn find_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        let records = self.read()?;
        Ok(oldest_match(records.values(), field, value).cloned())
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<()> {
        self.write()?.remove(id);
        Ok(())
    }

    fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|_, record| record.issued_at >= cutoff);
        Ok(before - records.len())
    }

    fn take_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        let mut records = self.write()?;
        let id = oldest_match(records.values(), field, value).and_then(|r| r.id.clone());
        Ok(id.and_then(|id| records.remove(&id)))
    }
}
