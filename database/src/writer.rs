use rocksdb::WriteBatch;

/// Abstraction over the DB writes of a store
pub trait DbWriter {
    fn put<K, V>(&mut self, key: K, value: V) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>;
    fn delete<K: AsRef<[u8]>>(&mut self, key: K) -> Result<(), rocksdb::Error>;

    /// Deletes the keys in `[from, to)`
    fn delete_range<K: AsRef<[u8]>>(&mut self, from: K, to: K) -> Result<(), rocksdb::Error>;
}

/// Stages writes into a `WriteBatch`, so a store commits them atomically with `DB::write`
pub struct BatchDbWriter<'a> {
    batch: &'a mut WriteBatch,
}

impl<'a> BatchDbWriter<'a> {
    pub fn new(batch: &'a mut WriteBatch) -> Self {
        Self { batch }
    }
}

impl DbWriter for BatchDbWriter<'_> {
    fn put<K, V>(&mut self, key: K, value: V) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.batch.put(key, value);
        Ok(())
    }

    fn delete<K: AsRef<[u8]>>(&mut self, key: K) -> Result<(), rocksdb::Error> {
        self.batch.delete(key);
        Ok(())
    }

    fn delete_range<K: AsRef<[u8]>>(&mut self, from: K, to: K) -> Result<(), rocksdb::Error> {
        self.batch.delete_range(from, to);
        Ok(())
    }
}
