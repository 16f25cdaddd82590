use crate::db::DB;
use rocksdb::DBCompressionType;
use std::{path::PathBuf, sync::Arc};

const MB: usize = 1024 * 1024;

/// Memory budget handed to rocksdb level style compaction
const MEM_BUDGET: usize = 64 * MB;

#[derive(Debug)]
pub struct Unspecified;

#[derive(Debug)]
pub struct ConnBuilder<Path> {
    db_path: Path,
}

impl Default for ConnBuilder<Unspecified> {
    fn default() -> Self {
        ConnBuilder { db_path: Unspecified }
    }
}

impl<Path> ConnBuilder<Path> {
    pub fn with_db_path(self, db_path: PathBuf) -> ConnBuilder<PathBuf> {
        ConnBuilder { db_path }
    }
}

impl ConnBuilder<PathBuf> {
    /// Opens the DB, creating it if missing
    pub fn build(self) -> Result<Arc<DB>, rocksdb::Error> {
        let mut opts = rocksdb::Options::default();
        opts.optimize_level_style_compaction(MEM_BUDGET);
        opts.set_compression_per_level(&[
            DBCompressionType::None,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
        ]);
        opts.create_if_missing(true);
        let db = Arc::new(DB::open(&opts, self.db_path)?);
        Ok(db)
    }
}
