use crate::{EMPTY_SERIAL, Record, Storage, StorageError, check_serial};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Volatile storage. Everything is lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    name: String,
    record: Mutex<Option<Record>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::named("memory")
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), record: Mutex::new(None) }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Option<Record>, StorageError> {
        Ok(self.record.lock().clone())
    }

    async fn store(&self, expected: u64, data: Vec<u8>) -> Result<u64, StorageError> {
        let mut record = self.record.lock();
        let actual = record.as_ref().map_or(EMPTY_SERIAL, |r| r.serial);
        let serial = check_serial(expected, actual)?;
        *record = Some(Record { serial, data });
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_is_compare_and_swap() {
        let storage = MemoryStorage::new();
        assert!(storage.load().await.unwrap().is_none());

        let first = storage.store(EMPTY_SERIAL, b"a".to_vec()).await.unwrap();
        assert_eq!(first, 1);

        let err = storage.store(EMPTY_SERIAL, b"b".to_vec()).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { expected: 0, actual: 1, .. }));

        let second = storage.store(first, b"c".to_vec()).await.unwrap();
        let record = storage.load().await.unwrap().unwrap();
        assert_eq!(record, Record { serial: second, data: b"c".to_vec() });
    }
}
