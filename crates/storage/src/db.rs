// storage/src/db.rs

use crate::cache::PoolCache;
use crate::{StorageError, StorageResult};
use amm_core::{Amount, BlockNumber, PoolId};
use gamm::{DistrInfo, FeeTokens, GammError, GammParams, GammResult, MemoryBank, Pool, PoolAsset, PoolParams, PoolStore};
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const NEXT_POOL_ID_KEY: &str = "next_pool_id";
const LATEST_BLOCK_KEY: &str = "latest_block_number";
const BANK_KEY: &str = "bank";
const PARAMS_KEY: &str = "gamm_params";
const DISTR_INFO_KEY: &str = "distr_info";
const FEE_TOKENS_KEY: &str = "fee_tokens";

/// Column families for different data types
#[derive(Debug, Clone, Copy)]
pub enum ColumnFamily {
    Pools,
    Meta,
    Incentives,
}

impl ColumnFamily {
    fn as_str(&self) -> &'static str {
        match self {
            ColumnFamily::Pools => "pools",
            ColumnFamily::Meta => "meta",
            ColumnFamily::Incentives => "incentives",
        }
    }

    fn all() -> Vec<Self> {
        vec![Self::Pools, Self::Meta, Self::Incentives]
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub create_if_missing: bool,
    pub max_open_files: i32,
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
    pub pool_cache_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
            create_if_missing: true,
            max_open_files: 1024,
            write_buffer_size: 64 * 1024 * 1024, // 64 MB
            max_write_buffer_number: 3,
            pool_cache_capacity: 256,
        }
    }
}

/// RocksDB-backed pool store plus node metadata
pub struct Database {
    db: Arc<DB>,
    config: DatabaseConfig,
    cache: PoolCache,
}

impl Database {
    /// Open or create database
    pub fn open(config: DatabaseConfig) -> StorageResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.increase_parallelism(num_cpus::get() as i32);

        let cfs: Vec<_> = ColumnFamily::all().iter().map(|cf| cf.as_str()).collect();

        let db = DB::open_cf(&opts, &config.path, &cfs).map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        tracing::info!("Database opened at {}", config.path);

        Ok(Self {
            db: Arc::new(db),
            cache: PoolCache::new(config.pool_cache_capacity),
            config,
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ==================== POOL OPERATIONS ====================

    /// Get pool by id, through the cache
    pub fn get_pool(&self, pool_id: PoolId) -> StorageResult<Option<Pool>> {
        if let Some(pool) = self.cache.get(pool_id) {
            return Ok(Some(pool));
        }

        let cf = self.cf(ColumnFamily::Pools)?;
        match self
            .db
            .get_cf(cf, pool_id.to_be_bytes())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
        {
            Some(bytes) => {
                let pool: Pool = decode(&bytes)?;
                self.cache.insert(pool.clone());
                Ok(Some(pool))
            }
            None => Ok(None),
        }
    }

    /// All pools in ascending id order
    pub fn get_pools(&self) -> StorageResult<Vec<Pool>> {
        let cf = self.cf(ColumnFamily::Pools)?;
        let mut pools = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            pools.push(decode(&value)?);
        }
        Ok(pools)
    }

    /// Write pools and, optionally, the id counter in one atomic batch
    fn write_pools(&self, pools: &[Pool], next_pool_id: Option<PoolId>) -> StorageResult<()> {
        let cf_pools = self.cf(ColumnFamily::Pools)?;
        let cf_meta = self.cf(ColumnFamily::Meta)?;

        let mut batch = WriteBatch::default();
        for pool in pools {
            batch.put_cf(cf_pools, pool.id().to_be_bytes(), encode(pool)?);
        }
        if let Some(next) = next_pool_id {
            batch.put_cf(cf_meta, NEXT_POOL_ID_KEY.as_bytes(), next.to_be_bytes());
        }

        self.db.write(batch).map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        for pool in pools {
            self.cache.insert(pool.clone());
        }
        Ok(())
    }

    pub fn get_next_pool_id(&self) -> StorageResult<PoolId> {
        Ok(self.get_u64_meta(NEXT_POOL_ID_KEY)?.unwrap_or(1))
    }

    // ==================== METADATA OPERATIONS ====================

    /// Store metadata
    pub fn store_meta(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let cf = self.cf(ColumnFamily::Meta)?;
        self.db
            .put_cf(cf, key.as_bytes(), value)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    /// Get metadata
    pub fn get_meta(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let cf = self.cf(ColumnFamily::Meta)?;
        self.db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    fn get_u64_meta(&self, key: &str) -> StorageResult<Option<u64>> {
        match self.get_meta(key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| StorageError::Corruption(format!("Invalid {} value", key)))?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Get latest block number
    pub fn get_latest_block_number(&self) -> StorageResult<Option<BlockNumber>> {
        self.get_u64_meta(LATEST_BLOCK_KEY)
    }

    /// Update latest block number
    pub fn update_latest_block_number(&self, number: BlockNumber) -> StorageResult<()> {
        self.store_meta(LATEST_BLOCK_KEY, &number.to_be_bytes())
    }

    /// Store any serializable value under a metadata key
    pub fn store_meta_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.store_meta(key, &encode(value)?)
    }

    pub fn load_meta_value<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        self.get_meta(key)?.map(|bytes| decode(&bytes)).transpose()
    }

    pub fn store_bank(&self, bank: &MemoryBank) -> StorageResult<()> {
        self.store_meta_value(BANK_KEY, bank)
    }

    pub fn load_bank(&self) -> StorageResult<Option<MemoryBank>> {
        self.load_meta_value(BANK_KEY)
    }

    pub fn store_params(&self, params: &GammParams) -> StorageResult<()> {
        self.store_meta_value(PARAMS_KEY, params)
    }

    pub fn load_params(&self) -> StorageResult<Option<GammParams>> {
        self.load_meta_value(PARAMS_KEY)
    }

    pub fn store_fee_tokens(&self, fee_tokens: &FeeTokens) -> StorageResult<()> {
        self.store_meta_value(FEE_TOKENS_KEY, fee_tokens)
    }

    /// Stored fee tokens, only the default base denom if none were ever written
    pub fn load_fee_tokens(&self) -> StorageResult<FeeTokens> {
        Ok(self.load_meta_value(FEE_TOKENS_KEY)?.unwrap_or_default())
    }

    // ==================== INCENTIVE OPERATIONS ====================

    pub fn store_distr_info(&self, distr_info: &DistrInfo) -> StorageResult<()> {
        let cf = self.cf(ColumnFamily::Incentives)?;
        self.db
            .put_cf(cf, DISTR_INFO_KEY.as_bytes(), encode(distr_info)?)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    /// Stored incentive records, empty if none were ever written
    pub fn load_distr_info(&self) -> StorageResult<DistrInfo> {
        let cf = self.cf(ColumnFamily::Incentives)?;
        match self
            .db
            .get_cf(cf, DISTR_INFO_KEY.as_bytes())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
        {
            Some(bytes) => decode(&bytes),
            None => Ok(DistrInfo::default()),
        }
    }

    // ==================== UTILITY OPERATIONS ====================

    /// Compact database
    pub fn compact(&self) -> StorageResult<()> {
        tracing::info!("Compacting database...");

        for cf_type in ColumnFamily::all() {
            if let Ok(cf) = self.cf(cf_type) {
                self.db.compact_range_cf(cf, None::<&[u8]>, None::<&[u8]>);
            }
        }

        tracing::info!("Database compaction complete");
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> StorageResult<DatabaseStats> {
        let cf_pools = self.cf(ColumnFamily::Pools)?;
        let pool_count = self.db.iterator_cf(cf_pools, IteratorMode::Start).count();

        Ok(DatabaseStats {
            latest_block: self.get_latest_block_number()?.unwrap_or(0),
            next_pool_id: self.get_next_pool_id()?,
            total_pools: pool_count as u64,
            cached_pools: self.cache.len(),
        })
    }

    /// Get column family handle
    fn cf(&self, cf_type: ColumnFamily) -> StorageResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(cf_type.as_str())
            .ok_or_else(|| StorageError::DatabaseError(format!("{} CF not found", cf_type.as_str())))
    }
}

impl PoolStore for Database {
    fn next_pool_id(&self) -> GammResult<PoolId> {
        Ok(self.get_next_pool_id()?)
    }

    fn set_next_pool_id(&mut self, next: PoolId) -> GammResult<()> {
        Ok(self.store_meta(NEXT_POOL_ID_KEY, &next.to_be_bytes())?)
    }

    fn create(&mut self, assets: Vec<PoolAsset>, params: PoolParams, total_shares: Amount) -> GammResult<PoolId> {
        let pool_id = self.get_next_pool_id()?;
        let pool = Pool::from_parts(pool_id, params, assets, total_shares);
        self.write_pools(std::slice::from_ref(&pool), Some(pool_id + 1))?;
        tracing::debug!("Stored new pool #{}", pool_id);
        Ok(pool_id)
    }

    fn restore(&mut self, pool: Pool) -> GammResult<()> {
        Ok(self.write_pools(std::slice::from_ref(&pool), None)?)
    }

    fn get(&self, pool_id: PoolId) -> GammResult<Pool> {
        self.get_pool(pool_id)?.ok_or(GammError::PoolNotFound(pool_id))
    }

    fn list(&self) -> GammResult<Vec<Pool>> {
        Ok(self.get_pools()?)
    }

    fn commit_batch(&mut self, pools: &[Pool]) -> GammResult<()> {
        for pool in pools {
            if self.get_pool(pool.id())?.is_none() {
                return Err(GammError::PoolNotFound(pool.id()));
            }
        }
        self.write_pools(pools, None)?;
        tracing::debug!("Committed {} pools", pools.len());
        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub latest_block: BlockNumber,
    pub next_pool_id: PoolId,
    pub total_pools: u64,
    pub cached_pools: usize,
}

fn encode<T: Serialize + ?Sized>(value: &T) -> StorageResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    bincode::deserialize(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}
