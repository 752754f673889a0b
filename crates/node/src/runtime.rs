// node/src/runtime.rs
use crate::config::{NodeConfig, UpgradeConfig};
use crate::genesis::NodeGenesis;
use amm_core::hooks::{EpochHooks, EpochInfo, EpochSchedule, HookRegistry, HookTrigger};
use amm_core::upgrades::UpgradeSchedule;
use amm_core::{Amount, BlockNumber, Coin, CoreError, CoreResult, Dec, PoolId};
use chrono::{DateTime, Utc};
use gamm::genesis::{export_genesis, import_genesis};
use gamm::migrations::{renormalize_pool_weights, V2_UPGRADE_NAME};
use gamm::{
    DistrInfo, ExitOutcome, FeeTokens, GammResult, GammService, JoinOutcome, MemoryBank, PoolQuerier, PoolStore,
    SwapAmountInRoute, SwapAmountOutRoute, UpdateFeeTokenProposal, UpdatePoolIncentivesProposal,
};
use std::sync::{Arc, Mutex, PoisonError};
use storage::{Database, DatabaseConfig};

const GENESIS_TIME_KEY: &str = "genesis_time";
const EPOCHS_KEY: &str = "epochs";

pub type Service = GammService<Database, MemoryBank>;

/// Total shares of every pool at one epoch end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub identifier: String,
    pub epoch_number: u64,
    pub total_shares: Vec<(PoolId, Amount)>,
}

/// Records pool share totals whenever an epoch ends
pub struct PoolSnapshotHook {
    log: Arc<Mutex<Vec<PoolSnapshot>>>,
}

impl PoolSnapshotHook {
    pub fn new(log: Arc<Mutex<Vec<PoolSnapshot>>>) -> Self {
        Self { log }
    }
}

impl EpochHooks<dyn PoolStore> for PoolSnapshotHook {
    fn name(&self) -> &str {
        "pool-snapshot"
    }

    fn after_epoch_end(&mut self, store: &dyn PoolStore, identifier: &str, epoch_number: u64) -> CoreResult<()> {
        let pools = store.list().map_err(|e| CoreError::HookError(e.to_string()))?;
        let total_shares: Vec<(PoolId, Amount)> =
            pools.iter().map(|p| (p.id(), p.total_shares().clone())).collect();

        tracing::info!(
            "Epoch '{}' #{} ended, snapshot of {} pools",
            identifier,
            epoch_number,
            total_shares.len()
        );
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(PoolSnapshot {
            identifier: identifier.to_string(),
            epoch_number,
            total_shares,
        });
        Ok(())
    }
}

fn migrate_v2(db: &mut Database) -> CoreResult<()> {
    let changed = renormalize_pool_weights(db).map_err(|e| CoreError::UpgradeError(e.to_string()))?;
    tracing::info!("v2 migration re-normalized {} pools", changed);
    Ok(())
}

/// Map configured upgrade names to their migrations
pub fn build_upgrade_schedule(upgrades: &[UpgradeConfig]) -> anyhow::Result<UpgradeSchedule<Database>> {
    let mut schedule = UpgradeSchedule::new();
    for upgrade in upgrades {
        let migration = match upgrade.name.as_str() {
            V2_UPGRADE_NAME => migrate_v2,
            other => anyhow::bail!("unknown upgrade '{}'", other),
        };
        schedule.register(upgrade.name.clone(), upgrade.height, migration)?;
    }
    Ok(schedule)
}

fn open_database(config: &NodeConfig) -> anyhow::Result<Database> {
    let db_config = DatabaseConfig {
        path: config.db_path().to_string_lossy().into_owned(),
        max_open_files: config.storage.max_open_files,
        write_buffer_size: config.storage.write_buffer_size_mb * 1024 * 1024,
        pool_cache_capacity: config.storage.pool_cache_capacity,
        ..Default::default()
    };
    Ok(Database::open(db_config)?)
}

pub struct Node {
    config: NodeConfig,
    service: Service,
    distr_info: DistrInfo,
    fee_tokens: FeeTokens,
    height: BlockNumber,
    genesis_time: DateTime<Utc>,
    epochs: EpochSchedule,
    hooks: HookRegistry<dyn PoolStore>,
    upgrades: UpgradeSchedule<Database>,
    snapshots: Arc<Mutex<Vec<PoolSnapshot>>>,
}

impl Node {
    /// Write a fresh database from `genesis`
    pub fn init(config: &NodeConfig, genesis: &NodeGenesis) -> anyhow::Result<()> {
        tracing::info!("Initializing node at {}", config.home);
        std::fs::create_dir_all(&config.home)?;

        let bank = genesis.build_bank()?;
        genesis.validate(&bank)?;

        let mut db = open_database(config)?;
        anyhow::ensure!(
            db.load_meta_value::<DateTime<Utc>>(GENESIS_TIME_KEY)?.is_none(),
            "{} is already initialized",
            config.home
        );

        let (params, distr_info) = import_genesis(&mut db, genesis.gamm.clone())?;
        genesis.fee_tokens.validate(&db)?;
        db.store_params(&params)?;
        db.store_distr_info(&distr_info)?;
        db.store_fee_tokens(&genesis.fee_tokens)?;
        db.store_bank(&bank)?;
        db.update_latest_block_number(0)?;
        db.store_meta_value(GENESIS_TIME_KEY, &genesis.genesis_time)?;

        genesis.to_file(config.genesis_path())?;
        tracing::info!(
            "Imported {} pools and {} accounts",
            genesis.gamm.pools.len(),
            genesis.accounts.len()
        );
        Ok(())
    }

    /// Open an initialized home directory
    pub fn open(config: NodeConfig) -> anyhow::Result<Self> {
        tracing::info!("Initializing node components");

        let db = open_database(&config)?;
        let genesis_time: DateTime<Utc> = db
            .load_meta_value(GENESIS_TIME_KEY)?
            .ok_or_else(|| anyhow::anyhow!("{} is not initialized, run `gammd init` first", config.home))?;

        let bank = db.load_bank()?.unwrap_or_default();
        let mut params = db.load_params()?.unwrap_or_default();
        if let Some(fee) = &config.gamm.pool_creation_fee {
            params.pool_creation_fee = vec![fee.parse::<Coin>()?];
        }
        params.validate()?;

        let distr_info = db.load_distr_info()?;
        let fee_tokens = db.load_fee_tokens()?;
        let height = db.get_latest_block_number()?.unwrap_or(0);

        let mut epochs: EpochSchedule = db.load_meta_value(EPOCHS_KEY)?.unwrap_or_default();
        for epoch in &config.epochs {
            if !epochs.epochs().iter().any(|e| e.identifier == epoch.identifier) {
                epochs.add_epoch(EpochInfo::new(epoch.identifier.clone(), genesis_time, epoch.duration_secs)?)?;
            }
        }

        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let mut hooks: HookRegistry<dyn PoolStore> = HookRegistry::new();
        for epoch in epochs.epochs() {
            hooks.register(
                HookTrigger::EpochEnd(epoch.identifier.clone()),
                Box::new(PoolSnapshotHook::new(snapshots.clone())),
            );
        }

        let upgrades = build_upgrade_schedule(&config.upgrades)?;

        tracing::info!(
            "Node opened at height {} with {} epochs and {} scheduled upgrades",
            height,
            epochs.epochs().len(),
            upgrades.upgrades().len()
        );

        Ok(Self {
            config,
            service: GammService::new(db, bank, params),
            distr_info,
            fee_tokens,
            height,
            genesis_time,
            epochs,
            hooks,
            upgrades,
            snapshots,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn height(&self) -> BlockNumber {
        self.height
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn querier(&self) -> PoolQuerier<'_, Database> {
        self.service.querier()
    }

    pub fn bank(&self) -> &MemoryBank {
        self.service.bank()
    }

    pub fn distr_info(&self) -> &DistrInfo {
        &self.distr_info
    }

    pub fn fee_tokens(&self) -> &FeeTokens {
        &self.fee_tokens
    }

    pub fn snapshots(&self) -> Vec<PoolSnapshot> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Hand the store and incentive records to the query server
    pub fn into_query_state(self) -> (Database, DistrInfo) {
        let (db, _, _) = self.service.into_parts();
        (db, self.distr_info)
    }

    // ==================== BLOCK LIFECYCLE ====================

    /// Advance one block: run the upgrade scheduled for the new height, then epoch hooks
    pub fn begin_block(&mut self, block_time: DateTime<Utc>) -> anyhow::Result<BlockNumber> {
        let height = self.height + 1;

        self.upgrades.apply(height, self.service.store_mut())?;

        let events = self.epochs.advance(block_time);
        if !events.is_empty() {
            let invoked = self.hooks.dispatch(self.service.store(), &events);
            tracing::debug!("Block {} crossed {} epoch boundaries, {} hooks ran", height, events.len(), invoked);
        }

        let db = self.service.store();
        db.update_latest_block_number(height)?;
        db.store_meta_value(EPOCHS_KEY, &self.epochs)?;
        self.height = height;
        Ok(height)
    }

    /// Run one transaction in a new block and persist the ledger if it succeeded
    fn deliver<T>(&mut self, tx: impl FnOnce(&mut Service) -> GammResult<T>) -> anyhow::Result<T> {
        self.begin_block(Utc::now())?;
        let value = tx(&mut self.service)?;
        self.service.store().store_bank(self.service.bank())?;
        Ok(value)
    }

    // ==================== TRANSACTIONS ====================

    pub fn create_pool(
        &mut self,
        sender: &str,
        assets: Vec<(Coin, Dec)>,
        swap_fee: Dec,
        exit_fee: Dec,
    ) -> anyhow::Result<PoolId> {
        self.deliver(|service| service.create_pool(sender, assets, swap_fee, exit_fee))
    }

    pub fn join_pool(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        max_tokens_in: &[Coin],
        min_shares_out: &Amount,
    ) -> anyhow::Result<JoinOutcome> {
        self.deliver(|service| service.join_pool(sender, pool_id, max_tokens_in, min_shares_out))
    }

    pub fn join_swap_extern_amount_in(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        token_in: &Coin,
        min_shares_out: &Amount,
    ) -> anyhow::Result<JoinOutcome> {
        self.deliver(|service| service.join_swap_extern_amount_in(sender, pool_id, token_in, min_shares_out))
    }

    pub fn exit_pool(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        shares_in: &Amount,
        min_tokens_out: &[Coin],
    ) -> anyhow::Result<ExitOutcome> {
        self.deliver(|service| service.exit_pool(sender, pool_id, shares_in, min_tokens_out))
    }

    pub fn exit_swap_share_amount_in(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        denom_out: &str,
        shares_in: &Amount,
        min_amount_out: &Amount,
    ) -> anyhow::Result<ExitOutcome> {
        self.deliver(|service| {
            service.exit_swap_share_amount_in(sender, pool_id, denom_out, shares_in, min_amount_out)
        })
    }

    pub fn swap_exact_amount_in(
        &mut self,
        sender: &str,
        routes: &[SwapAmountInRoute],
        token_in: &Coin,
        min_amount_out: &Amount,
    ) -> anyhow::Result<Amount> {
        self.deliver(|service| service.swap_exact_amount_in(sender, routes, token_in, min_amount_out))
    }

    pub fn swap_exact_amount_out(
        &mut self,
        sender: &str,
        routes: &[SwapAmountOutRoute],
        max_amount_in: &Amount,
        token_out: &Coin,
    ) -> anyhow::Result<Amount> {
        self.deliver(|service| service.swap_exact_amount_out(sender, routes, max_amount_in, token_out))
    }

    /// Apply a governance proposal to the incentive records
    pub fn update_pool_incentives(&mut self, proposal: &UpdatePoolIncentivesProposal) -> anyhow::Result<()> {
        self.begin_block(Utc::now())?;
        proposal.validate_basic()?;

        let mut distr_info = self.distr_info.clone();
        distr_info.apply_proposal(self.service.store(), proposal)?;
        self.service.store().store_distr_info(&distr_info)?;
        self.distr_info = distr_info;

        tracing::info!(
            "Applied proposal '{}': {} incentive records, total weight {}",
            proposal.title,
            self.distr_info.records.len(),
            self.distr_info.total_weight
        );
        Ok(())
    }

    /// Apply a governance proposal to the fee token list
    pub fn update_fee_token(&mut self, proposal: &UpdateFeeTokenProposal) -> anyhow::Result<()> {
        self.begin_block(Utc::now())?;

        let mut fee_tokens = self.fee_tokens.clone();
        fee_tokens.apply_proposal(self.service.store(), proposal)?;
        self.service.store().store_fee_tokens(&fee_tokens)?;
        self.fee_tokens = fee_tokens;

        tracing::info!(
            "Applied proposal '{}': {} fee tokens",
            proposal.title,
            self.fee_tokens.tokens.len()
        );
        Ok(())
    }

    // ==================== EXPORT ====================

    pub fn export(&self) -> anyhow::Result<NodeGenesis> {
        let gamm = export_genesis(self.service.store(), self.service.params(), &self.distr_info)?;
        Ok(NodeGenesis {
            genesis_time: self.genesis_time,
            accounts: NodeGenesis::accounts_from_bank(self.service.bank()),
            gamm,
            fee_tokens: self.fee_tokens.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EpochConfig;
    use crate::genesis::GenesisAccount;
    use amm_core::{Amount, Coin};
    use gamm::pool::{init_pool_shares, share_denom};
    use gamm::{Bank, DistrRecord, FeeToken, Pool, PoolAsset, PoolParams, MODULE_ACCOUNT};
    use tempfile::TempDir;

    fn coin(amount: u64, denom: &str) -> Coin {
        Coin::new(denom, Amount::from_u64(amount))
    }

    fn test_config(dir: &TempDir) -> NodeConfig {
        NodeConfig {
            home: dir.path().to_string_lossy().into_owned(),
            epochs: vec![EpochConfig {
                identifier: "day".into(),
                duration_secs: 86_400,
            }],
            ..Default::default()
        }
    }

    fn genesis() -> NodeGenesis {
        let mut genesis = NodeGenesis::new(Utc::now() - chrono::Duration::days(2));
        genesis.accounts.push(GenesisAccount {
            address: "alice".into(),
            coins: vec![coin(10_000_000, "tokena"), coin(10_000_000, "tokenb"), coin(10_000, "uosmo")],
        });
        genesis
    }

    fn init_node(dir: &TempDir) -> Node {
        let config = test_config(dir);
        Node::init(&config, &genesis()).unwrap();
        Node::open(config).unwrap()
    }

    fn create_ab(node: &mut Node) -> PoolId {
        node.create_pool(
            "alice",
            vec![(coin(1_000_000, "tokena"), Dec::one()), (coin(1_000_000, "tokenb"), Dec::one())],
            "0.003".parse().unwrap(),
            Dec::zero(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_requires_init() {
        let dir = TempDir::new().unwrap();
        assert!(Node::open(test_config(&dir)).is_err());
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        Node::init(&config, &genesis()).unwrap();
        assert!(Node::init(&config, &genesis()).is_err());
    }

    #[test]
    fn test_transactions_advance_height_and_persist() {
        let dir = TempDir::new().unwrap();
        let mut node = init_node(&dir);
        assert_eq!(node.height(), 0);

        let pool_id = create_ab(&mut node);
        let out = node
            .swap_exact_amount_in(
                "alice",
                &[SwapAmountInRoute { pool_id, token_out_denom: "tokenb".into() }],
                &coin(10_000, "tokena"),
                &Amount::from_u64(1),
            )
            .unwrap();
        assert_eq!(node.height(), 2);
        let balance = node.bank().balance("alice", "tokenb");

        let config = node.config().clone();
        drop(node);
        let node = Node::open(config).unwrap();
        assert_eq!(node.height(), 2);
        assert_eq!(node.bank().balance("alice", "tokenb"), balance);
        assert_eq!(balance, &Amount::from_u64(9_000_000) + &out);
        assert_eq!(node.bank().balance(MODULE_ACCOUNT, "tokena"), Amount::from_u64(1_010_000));
    }

    #[test]
    fn test_failed_transaction_keeps_ledger() {
        let dir = TempDir::new().unwrap();
        let mut node = init_node(&dir);
        let pool_id = create_ab(&mut node);
        let bank = node.bank().clone();

        assert!(node
            .exit_pool("bob", pool_id, &Amount::from_tokens(1), &[])
            .is_err());
        assert_eq!(node.bank(), &bank);
        assert_eq!(node.querier().pool(pool_id).unwrap().total_shares(), &init_pool_shares());
    }

    #[test]
    fn test_epoch_end_records_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut node = init_node(&dir);
        let pool_id = create_ab(&mut node);

        // first block started the day epoch two days after genesis; the next one ends it
        node.begin_block(Utc::now()).unwrap();

        let snapshots = node.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].identifier, "day");
        assert_eq!(snapshots[0].total_shares, vec![(pool_id, init_pool_shares())]);
    }

    #[test]
    fn test_v2_upgrade_renormalizes_at_height() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        Node::init(&config, &genesis()).unwrap();
        config.upgrades.push(UpgradeConfig {
            name: V2_UPGRADE_NAME.into(),
            height: 1,
        });
        let mut node = Node::open(config).unwrap();

        let skewed = Pool::from_parts(
            7,
            PoolParams::new(Dec::zero(), Dec::zero()).unwrap(),
            vec![
                PoolAsset { denom: "tokena".into(), weight: Dec::from_u64(1), balance: Amount::from_u64(100) },
                PoolAsset { denom: "tokenb".into(), weight: Dec::from_u64(3), balance: Amount::from_u64(100) },
            ],
            init_pool_shares(),
        );
        node.service.store_mut().restore(skewed).unwrap();

        node.begin_block(Utc::now()).unwrap();
        let pool = node.querier().pool(7).unwrap();
        pool.validate().unwrap();
        assert_eq!(pool.asset("tokenb").unwrap().weight, "0.75".parse::<Dec>().unwrap());
    }

    #[test]
    fn test_unknown_upgrade_rejected() {
        let upgrades = vec![UpgradeConfig {
            name: "v9".into(),
            height: 5,
        }];
        assert!(build_upgrade_schedule(&upgrades).is_err());
    }

    #[test]
    fn test_incentive_proposal_and_export() {
        let dir = TempDir::new().unwrap();
        let mut node = init_node(&dir);
        let pool_id = create_ab(&mut node);

        node.update_pool_incentives(&UpdatePoolIncentivesProposal {
            title: "boost".into(),
            description: "weight pool one".into(),
            records: vec![DistrRecord { pool_id, weight: Amount::from_u64(100) }],
        })
        .unwrap();
        assert_eq!(node.distr_info().total_weight, Amount::from_u64(100));

        let exported = node.export().unwrap();
        assert_eq!(exported.gamm.pools.len(), 1);
        assert_eq!(exported.gamm.distr_info.records.len(), 1);

        let bank = exported.build_bank().unwrap();
        exported.validate(&bank).unwrap();
        assert_eq!(bank.supply(&share_denom(pool_id)), init_pool_shares());
    }

    #[test]
    fn test_fee_token_proposal_persists_and_exports() {
        let dir = TempDir::new().unwrap();
        let mut node = init_node(&dir);
        let pool_id = node
            .create_pool(
                "alice",
                vec![(coin(1_000_000, "tokena"), Dec::one()), (coin(1_000, "uosmo"), Dec::one())],
                Dec::zero(),
                Dec::zero(),
            )
            .unwrap();

        let proposal = |denom: &str, pool_id: PoolId| UpdateFeeTokenProposal {
            title: "fee token".into(),
            description: String::new(),
            fee_token: FeeToken { denom: denom.into(), pool_id },
        };
        assert!(node.update_fee_token(&proposal("tokenb", pool_id)).is_err());
        node.update_fee_token(&proposal("tokena", pool_id)).unwrap();
        assert_eq!(node.height(), 3);

        let config = node.config().clone();
        drop(node);
        let node = Node::open(config).unwrap();
        assert_eq!(node.fee_tokens().fee_token("tokena").unwrap().pool_id, pool_id);
        assert_eq!(node.export().unwrap().fee_tokens, node.fee_tokens().clone());
    }
}
