use crate::{db::DB, errors::StoreError};

use super::prelude::{DbKey, DbWriter};
use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// A cached DB item with concurrency support
#[derive(Clone)]
pub struct CachedDbItem<T> {
    db: Arc<DB>,
    key: Vec<u8>,
    cached_item: Arc<RwLock<Option<T>>>,
}

impl<T> CachedDbItem<T> {
    pub fn new(db: Arc<DB>, key: Vec<u8>) -> Self {
        Self { db, key, cached_item: Arc::new(RwLock::new(None)) }
    }

    pub fn read(&self) -> Result<T, StoreError>
    where
        T: Clone + DeserializeOwned,
    {
        if let Some(item) = self.cached_item.read().clone() {
            return Ok(item);
        }
        if let Some(slice) = self.db.get_pinned(&self.key)? {
            let item: T = bincode::deserialize(&slice)?;
            *self.cached_item.write() = Some(item.clone());
            Ok(item)
        } else {
            Err(StoreError::KeyNotFound(DbKey::prefix_only(&self.key)))
        }
    }

    pub fn write(&mut self, mut writer: impl DbWriter, item: &T) -> Result<(), StoreError>
    where
        T: Clone + Serialize,
    {
        let bin_data = bincode::serialize(item)?;
        writer.put(&self.key, bin_data)?;
        *self.cached_item.write() = Some(item.clone());
        Ok(())
    }

    pub fn remove(&mut self, mut writer: impl DbWriter) -> Result<(), StoreError> {
        writer.delete(&self.key)?;
        *self.cached_item.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        create_temp_db,
        prelude::{BatchDbWriter, ConnBuilder, StoreResultExtensions},
    };
    use rocksdb::WriteBatch;

    #[test]
    fn test_item_read_write_remove() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let mut item = CachedDbItem::<(u64, u64)>::new(db.clone(), b"item".to_vec());
        assert!(item.read().optional().unwrap().is_none());

        let mut batch = WriteBatch::default();
        item.write(BatchDbWriter::new(&mut batch), &(1, 2)).unwrap();
        db.write(batch).unwrap();
        assert_eq!(item.read().unwrap(), (1, 2));

        // A fresh handle (with an empty cache) reads the persisted value
        let fresh = CachedDbItem::<(u64, u64)>::new(db.clone(), b"item".to_vec());
        assert_eq!(fresh.read().unwrap(), (1, 2));

        let mut batch = WriteBatch::default();
        item.remove(BatchDbWriter::new(&mut batch)).unwrap();
        db.write(batch).unwrap();
        assert!(item.read().optional().unwrap().is_none());
    }
}
