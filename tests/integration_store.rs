//! 存储端口集成测试
//!
//! 测试自定义存储后端的接入，以及内存存储在并发检查下的一次性语义。

use chrono::{DateTime, Utc};
use otprs::{
    Error, InMemoryOtpStore, OtpConfig, OtpManager, OtpRecord, OtpStore, RecordField, RecordId,
    Result, StorageError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

/// 只实现必需方法的文档存储，`take_one_by_field` 使用默认实现
#[derive(Default)]
struct DocumentStore {
    docs: Mutex<Vec<OtpRecord>>,
    next_id: AtomicUsize,
    deletes: AtomicUsize,
}

impl DocumentStore {
    fn docs(&self) -> Result<std::sync::MutexGuard<'_, Vec<OtpRecord>>> {
        self.docs
            .lock()
            .map_err(|_| StorageError::OperationFailed("poisoned".to_string()).into())
    }
}

impl OtpStore for DocumentStore {
    fn collection(&self) -> &str {
        "otps"
    }

    fn insert(&self, mut record: OtpRecord) -> Result<RecordId> {
        let id = RecordId::new(format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        record.id = Some(id.clone());
        self.docs()?.push(record);
        Ok(id)
    }

    fn find_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        Ok(self
            .docs()?
            .iter()
            .find(|r| r.field(field) == value)
            .cloned())
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.docs()?.retain(|r| r.id.as_ref() != Some(id));
        Ok(())
    }

    fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut docs = self.docs()?;
        let before = docs.len();
        docs.retain(|r| r.issued_at >= cutoff);
        Ok(before - docs.len())
    }
}

/// 测试自定义存储的完整流程
#[test]
fn test_custom_store_round_trip() {
    let store = Arc::new(DocumentStore::default());
    let manager = OtpManager::with_store(store.clone(), OtpConfig::default()).unwrap();

    let code = manager.issue("alice").unwrap();
    assert_eq!(store.docs().unwrap().len(), 1);

    assert!(manager.verify(&code, "alice").unwrap());
    assert!(store.docs().unwrap().is_empty());
    assert!(!manager.verify(&code, "alice").unwrap());
}

/// 测试未找到记录时不会发起删除
#[test]
fn test_not_found_issues_no_delete() {
    let store = Arc::new(DocumentStore::default());
    let manager = OtpManager::with_store(store.clone(), OtpConfig::default()).unwrap();

    assert!(!manager.verify("aB3$xy", "ghost").unwrap());
    assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
}

/// 测试校验失败时同样删除记录
#[test]
fn test_failed_check_deletes_once() {
    let store = Arc::new(DocumentStore::default());
    let manager = OtpManager::with_store(store.clone(), OtpConfig::default()).unwrap();

    manager.issue("alice").unwrap();
    let deletes_after_issue = store.deletes.load(Ordering::SeqCst);

    assert!(!manager.verify("wrong!", "alice").unwrap());
    assert_eq!(store.deletes.load(Ordering::SeqCst), deletes_after_issue + 1);
    assert!(store.docs().unwrap().is_empty());
}

/// 测试清理过期记录
#[test]
fn test_custom_store_cleanup() {
    let store = Arc::new(DocumentStore::default());
    let manager = OtpManager::with_store(
        store.clone(),
        OtpConfig::default()
            .with_clock_offset_hours(0)
            .with_allow_multiple(true),
    )
    .unwrap();

    let stale = OtpRecord::new("old", "aB3$xy", Utc::now() - chrono::Duration::hours(1));
    store.insert(stale).unwrap();
    manager.issue("fresh").unwrap();

    assert_eq!(manager.cleanup().unwrap(), 1);
    assert!(
        store
            .find_one_by_field(RecordField::SubjectId, "fresh")
            .unwrap()
            .is_some()
    );
}

/// 测试内存存储下并发检查同一验证码只有一次通过
#[test]
fn test_concurrent_checks_accept_once() {
    const THREADS: usize = 8;

    for _ in 0..20 {
        let manager = Arc::new(OtpManager::new(OtpConfig::default()).unwrap());
        let code = Arc::new(manager.issue("alice").unwrap());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let code = Arc::clone(&code);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    manager.verify(&code, "alice").unwrap()
                })
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
    }
}

/// 测试多个管理器共享同一存储
#[test]
fn test_shared_in_memory_store() {
    let store = InMemoryOtpStore::new();
    let issuer = OtpManager::with_store(store.clone(), OtpConfig::default()).unwrap();
    let verifier = OtpManager::with_store(store.clone(), OtpConfig::default()).unwrap();

    let code = issuer.issue("alice").unwrap();
    assert!(verifier.verify(&code, "alice").unwrap());
    assert!(store.is_empty().unwrap());
}

/// ID 只保存在文档之外的存储，查到的记录不带 ID
#[derive(Default)]
struct DetachedIdStore {
    docs: Mutex<Vec<(RecordId, OtpRecord)>>,
    next_id: AtomicUsize,
}

impl OtpStore for DetachedIdStore {
    fn collection(&self) -> &str {
        "detached"
    }

    fn insert(&self, mut record: OtpRecord) -> Result<RecordId> {
        let id = RecordId::new(format!("d-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        record.id = None;
        self.docs.lock().unwrap().push((id.clone(), record));
        Ok(id)
    }

    fn find_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .find(|(_, r)| r.field(field) == value)
            .map(|(_, r)| r.clone()))
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<()> {
        self.docs.lock().unwrap().retain(|(doc_id, _)| doc_id != id);
        Ok(())
    }
}

/// 测试存储返回不带 ID 的记录时验证报错，同一验证码不会被接受
#[test]
fn test_record_without_id_is_never_accepted() {
    let manager = OtpManager::with_store(DetachedIdStore::default(), OtpConfig::default()).unwrap();
    let code = manager.issue("alice").unwrap();

    for _ in 0..2 {
        let result = manager.verify(&code, "alice");
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}

/// 测试存储返回不带 ID 的记录时重新签发报错而不是无限循环
#[test]
fn test_reissue_with_detached_ids_fails() {
    let manager = OtpManager::with_store(DetachedIdStore::default(), OtpConfig::default()).unwrap();
    manager.issue("alice").unwrap();

    assert!(matches!(manager.issue("alice"), Err(Error::Internal(_))));
    assert!(matches!(manager.revoke("alice"), Err(Error::Internal(_))));
}

/// 测试未实现清理的存储返回不支持错误
#[test]
fn test_cleanup_unsupported_by_default() {
    let manager = OtpManager::with_store(DetachedIdStore::default(), OtpConfig::default()).unwrap();

    let err = manager.cleanup().unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::Unsupported(_))));
}

/// 第一次插入成功、之后插入都失败的存储
struct FailingInsertStore {
    inner: InMemoryOtpStore,
    inserts_left: AtomicUsize,
}

impl OtpStore for FailingInsertStore {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    fn insert(&self, record: OtpRecord) -> Result<RecordId> {
        let left = self.inserts_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(StorageError::OperationFailed("write rejected".to_string()).into());
        }
        self.inserts_left.store(left - 1, Ordering::SeqCst);
        self.inner.insert(record)
    }

    fn find_one_by_field(&self, field: RecordField, value: &str) -> Result<Option<OtpRecord>> {
        self.inner.find_one_by_field(field, value)
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<()> {
        self.inner.delete_by_id(id)
    }
}

/// 测试重新签发时插入失败：错误被返回，旧验证码已被撤销
#[test]
fn test_failed_insert_on_reissue_revokes_previous() {
    let store = FailingInsertStore {
        inner: InMemoryOtpStore::new(),
        inserts_left: AtomicUsize::new(1),
    };
    let manager = OtpManager::with_store(store, OtpConfig::default()).unwrap();

    let first = manager.issue("alice").unwrap();
    let err = manager.issue("alice").unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::OperationFailed(_))));

    assert!(manager.store().inner.is_empty().unwrap());
    assert!(!manager.verify(&first, "alice").unwrap());
}
