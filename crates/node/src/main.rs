// node/src/main.rs
use amm_core::{Amount, Coin, Dec, PoolId};
use clap::{Args, Parser, Subcommand};
use gamm::route::{exact_in_routes, exact_out_routes};
use gamm::{DistrRecord, FeeToken, UpdateFeeTokenProposal, UpdatePoolIncentivesProposal};
use node::{Node, NodeConfig, NodeGenesis};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gammd")]
#[command(about = "Weighted AMM pool engine node", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a home directory
    Init {
        /// Home directory
        #[arg(long, default_value = "./gammd")]
        home: String,

        /// Genesis file (JSON) to import
        #[arg(short, long)]
        genesis: Option<String>,
    },

    /// Serve queries over JSON-RPC
    Start {
        /// Configuration file path
        #[arg(short, long, default_value = "./gammd/config.toml")]
        config: String,
    },

    /// Read pool state
    Query {
        #[arg(short, long, default_value = "./gammd/config.toml", global = true)]
        config: String,

        #[command(subcommand)]
        command: QueryCommands,
    },

    /// Submit a transaction in a new block
    Tx {
        #[arg(short, long, default_value = "./gammd/config.toml", global = true)]
        config: String,

        #[command(subcommand)]
        command: TxCommands,
    },

    /// Governance proposals
    Gov {
        #[arg(short, long, default_value = "./gammd/config.toml", global = true)]
        config: String,

        #[command(subcommand)]
        command: GovCommands,
    },

    /// Print the current state as a genesis file
    Export {
        #[arg(short, long, default_value = "./gammd/config.toml")]
        config: String,
    },
}

/// Route as parallel pool id and denom lists
#[derive(Args)]
struct RouteArgs {
    #[arg(long = "swap-route-pool-ids", required = true)]
    pool_ids: Vec<PoolId>,

    #[arg(long = "swap-route-denoms", required = true)]
    denoms: Vec<String>,
}

#[derive(Subcommand)]
enum QueryCommands {
    Pool { pool_id: PoolId },
    Pools,
    PoolParams { pool_id: PoolId },
    TotalShare { pool_id: PoolId },
    Records { pool_id: PoolId },
    SpotPrice {
        pool_id: PoolId,
        token_in_denom: String,
        token_out_denom: String,
    },
    EstimateSwapExactAmountIn {
        pool_id: PoolId,
        sender: String,
        /// Coin such as `1000tokena`
        token_in: Coin,
        #[command(flatten)]
        route: RouteArgs,
    },
    EstimateSwapExactAmountOut {
        pool_id: PoolId,
        sender: String,
        token_out: Coin,
        #[command(flatten)]
        route: RouteArgs,
    },
    DistrInfo,
    FeeTokens,
    Balances { address: String },
}

#[derive(Subcommand)]
enum TxCommands {
    CreatePool {
        #[arg(long)]
        from: String,
        /// Initial deposit, repeated once per asset
        #[arg(long = "asset", required = true)]
        assets: Vec<Coin>,
        /// Raw weight, repeated in the same order as --asset
        #[arg(long = "weight", required = true)]
        weights: Vec<Decimal>,
        #[arg(long)]
        swap_fee: Decimal,
        #[arg(long, default_value = "0")]
        exit_fee: Decimal,
    },
    JoinPool {
        #[arg(long)]
        from: String,
        #[arg(long)]
        pool_id: PoolId,
        #[arg(long = "max-amounts-in", required = true)]
        max_amounts_in: Vec<Coin>,
        #[arg(long, default_value = "0")]
        min_shares_out: Amount,
    },
    JoinSwapExternAmountIn {
        #[arg(long)]
        from: String,
        #[arg(long)]
        pool_id: PoolId,
        #[arg(long)]
        token_in: Coin,
        #[arg(long, default_value = "0")]
        min_shares_out: Amount,
    },
    ExitPool {
        #[arg(long)]
        from: String,
        #[arg(long)]
        pool_id: PoolId,
        #[arg(long)]
        share_amount_in: Amount,
        #[arg(long = "min-amounts-out")]
        min_amounts_out: Vec<Coin>,
    },
    ExitSwapShareAmountIn {
        #[arg(long)]
        from: String,
        #[arg(long)]
        pool_id: PoolId,
        #[arg(long)]
        token_out_denom: String,
        #[arg(long)]
        share_amount_in: Amount,
        #[arg(long, default_value = "0")]
        min_amount_out: Amount,
    },
    SwapExactAmountIn {
        #[arg(long)]
        from: String,
        #[arg(long)]
        token_in: Coin,
        #[arg(long)]
        token_out_min_amount: Amount,
        #[command(flatten)]
        route: RouteArgs,
    },
    SwapExactAmountOut {
        #[arg(long)]
        from: String,
        #[arg(long)]
        token_out: Coin,
        #[arg(long)]
        token_in_max_amount: Amount,
        #[command(flatten)]
        route: RouteArgs,
    },
}

#[derive(Subcommand)]
enum GovCommands {
    UpdatePoolIncentives {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Repeated, paired with --weight; weight 0 removes the record
        #[arg(long = "pool-id", required = true)]
        pool_ids: Vec<PoolId>,
        #[arg(long = "weight", required = true)]
        weights: Vec<Amount>,
    },
    UpdateFeeToken {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        denom: String,
        /// Pool pricing the denom against the base denom; 0 removes it
        #[arg(long)]
        pool_id: PoolId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("gammd={0},node={0},gamm={0},storage={0},rpc={0},amm_core={0},hyper=warn", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { home, genesis } => {
            init_node(&home, genesis.as_deref())?;
        }
        Commands::Start { config } => {
            start_node(&config).await?;
        }
        Commands::Query { config, command } => {
            let node = Node::open(NodeConfig::from_file(&config)?)?;
            handle_query_command(&node, command)?;
        }
        Commands::Tx { config, command } => {
            let mut node = Node::open(NodeConfig::from_file(&config)?)?;
            handle_tx_command(&mut node, command)?;
        }
        Commands::Gov { config, command } => {
            let mut node = Node::open(NodeConfig::from_file(&config)?)?;
            handle_gov_command(&mut node, command)?;
        }
        Commands::Export { config } => {
            let node = Node::open(NodeConfig::from_file(&config)?)?;
            print_json(&node.export()?)?;
        }
    }

    Ok(())
}

fn init_node(home: &str, genesis_path: Option<&str>) -> anyhow::Result<()> {
    let config_path = Path::new(home).join("config.toml");
    let config = if config_path.exists() {
        NodeConfig::from_file(&config_path)?
    } else {
        std::fs::create_dir_all(home)?;
        let config = NodeConfig {
            home: home.to_string(),
            ..Default::default()
        };
        config.to_file(&config_path)?;
        config
    };

    let genesis = match genesis_path {
        Some(path) => {
            tracing::info!("Loading genesis from {}", path);
            NodeGenesis::from_file(path)?
        }
        None => NodeGenesis::new(chrono::Utc::now()),
    };

    Node::init(&config, &genesis)?;

    tracing::info!("Node initialized successfully at {}", home);
    tracing::info!("Edit {} to configure your node", config_path.display());
    Ok(())
}

async fn start_node(config_path: &str) -> anyhow::Result<()> {
    use rpc::{RpcConfig, RpcMethods, RpcServer};

    tracing::info!("Loading configuration from {}", config_path);
    let config = NodeConfig::from_file(config_path)?;
    let node = Node::open(config.clone())?;
    tracing::info!("Serving state at height {}", node.height());

    let (db, distr_info) = node.into_query_state();
    let store = Arc::new(RwLock::new(db));

    if config.rpc.enabled {
        let methods = RpcMethods::new(store.clone(), Arc::new(RwLock::new(distr_info)));
        let rpc_config = RpcConfig {
            listen_addr: config.rpc.listen_addr,
            cors_origin: config.rpc.cors_origin.clone(),
        };
        let rpc_server = Arc::new(RpcServer::new(rpc_config, methods));

        tokio::spawn(async move {
            if let Err(e) = rpc_server.start().await {
                tracing::error!("RPC server error: {}", e);
            }
        });
    } else {
        tracing::warn!("RPC disabled, nothing to serve");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    tracing::info!("Flushing database...");
    store.read().await.compact()?;
    tracing::info!("Node stopped gracefully");
    Ok(())
}

fn handle_query_command(node: &Node, command: QueryCommands) -> anyhow::Result<()> {
    let querier = node.querier();
    match command {
        QueryCommands::Pool { pool_id } => print_json(&querier.pool(pool_id)?),
        QueryCommands::Pools => print_json(&querier.pools()?),
        QueryCommands::PoolParams { pool_id } => print_json(&querier.pool_params(pool_id)?),
        QueryCommands::TotalShare { pool_id } => print_json(&querier.total_share(pool_id)?),
        QueryCommands::Records { pool_id } => print_json(&querier.records(pool_id)?),
        QueryCommands::SpotPrice {
            pool_id,
            token_in_denom,
            token_out_denom,
        } => {
            let price = querier.spot_price(pool_id, &token_in_denom, &token_out_denom)?;
            print_json(&serde_json::json!({ "spot_price": price.to_string() }))
        }
        QueryCommands::EstimateSwapExactAmountIn {
            pool_id,
            sender,
            token_in,
            route,
        } => {
            let routes = exact_in_routes(&route.pool_ids, &route.denoms)?;
            let amount = querier.estimate_swap_exact_amount_in(pool_id, &sender, &token_in, &routes)?;
            print_json(&serde_json::json!({ "token_out_amount": amount.to_string() }))
        }
        QueryCommands::EstimateSwapExactAmountOut {
            pool_id,
            sender,
            token_out,
            route,
        } => {
            let routes = exact_out_routes(&route.pool_ids, &route.denoms)?;
            let amount = querier.estimate_swap_exact_amount_out(pool_id, &sender, &routes, &token_out)?;
            print_json(&serde_json::json!({ "token_in_amount": amount.to_string() }))
        }
        QueryCommands::DistrInfo => print_json(node.distr_info()),
        QueryCommands::FeeTokens => print_json(node.fee_tokens()),
        QueryCommands::Balances { address } => print_json(&node.bank().all_balances(&address)),
    }
}

fn handle_tx_command(node: &mut Node, command: TxCommands) -> anyhow::Result<()> {
    match command {
        TxCommands::CreatePool {
            from,
            assets,
            weights,
            swap_fee,
            exit_fee,
        } => {
            anyhow::ensure!(
                assets.len() == weights.len(),
                "{} assets but {} weights",
                assets.len(),
                weights.len()
            );
            let weighted = assets
                .into_iter()
                .zip(weights)
                .map(|(coin, weight)| Ok((coin, Dec::try_from(weight)?)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let pool_id = node.create_pool(&from, weighted, Dec::try_from(swap_fee)?, Dec::try_from(exit_fee)?)?;
            print_json(&serde_json::json!({ "pool_id": pool_id, "height": node.height() }))
        }
        TxCommands::JoinPool {
            from,
            pool_id,
            max_amounts_in,
            min_shares_out,
        } => {
            let outcome = node.join_pool(&from, pool_id, &max_amounts_in, &min_shares_out)?;
            print_json(&serde_json::json!({
                "shares_out": outcome.shares_out.to_string(),
                "tokens_in": outcome.tokens_in,
            }))
        }
        TxCommands::JoinSwapExternAmountIn {
            from,
            pool_id,
            token_in,
            min_shares_out,
        } => {
            let outcome = node.join_swap_extern_amount_in(&from, pool_id, &token_in, &min_shares_out)?;
            print_json(&serde_json::json!({ "shares_out": outcome.shares_out.to_string() }))
        }
        TxCommands::ExitPool {
            from,
            pool_id,
            share_amount_in,
            min_amounts_out,
        } => {
            let outcome = node.exit_pool(&from, pool_id, &share_amount_in, &min_amounts_out)?;
            print_json(&serde_json::json!({
                "exit_fee_shares": outcome.exit_fee_shares.to_string(),
                "tokens_out": outcome.tokens_out,
            }))
        }
        TxCommands::ExitSwapShareAmountIn {
            from,
            pool_id,
            token_out_denom,
            share_amount_in,
            min_amount_out,
        } => {
            let outcome =
                node.exit_swap_share_amount_in(&from, pool_id, &token_out_denom, &share_amount_in, &min_amount_out)?;
            print_json(&serde_json::json!({ "tokens_out": outcome.tokens_out }))
        }
        TxCommands::SwapExactAmountIn {
            from,
            token_in,
            token_out_min_amount,
            route,
        } => {
            let routes = exact_in_routes(&route.pool_ids, &route.denoms)?;
            let amount = node.swap_exact_amount_in(&from, &routes, &token_in, &token_out_min_amount)?;
            print_json(&serde_json::json!({ "token_out_amount": amount.to_string() }))
        }
        TxCommands::SwapExactAmountOut {
            from,
            token_out,
            token_in_max_amount,
            route,
        } => {
            let routes = exact_out_routes(&route.pool_ids, &route.denoms)?;
            let amount = node.swap_exact_amount_out(&from, &routes, &token_in_max_amount, &token_out)?;
            print_json(&serde_json::json!({ "token_in_amount": amount.to_string() }))
        }
    }
}

fn handle_gov_command(node: &mut Node, command: GovCommands) -> anyhow::Result<()> {
    match command {
        GovCommands::UpdatePoolIncentives {
            title,
            description,
            pool_ids,
            weights,
        } => {
            anyhow::ensure!(
                pool_ids.len() == weights.len(),
                "{} pool ids but {} weights",
                pool_ids.len(),
                weights.len()
            );
            let proposal = UpdatePoolIncentivesProposal {
                title,
                description,
                records: pool_ids
                    .into_iter()
                    .zip(weights)
                    .map(|(pool_id, weight)| DistrRecord { pool_id, weight })
                    .collect(),
            };
            node.update_pool_incentives(&proposal)?;
            print_json(node.distr_info())
        }
        GovCommands::UpdateFeeToken {
            title,
            description,
            denom,
            pool_id,
        } => {
            let proposal = UpdateFeeTokenProposal {
                title,
                description,
                fee_token: FeeToken { denom, pool_id },
            };
            node.update_fee_token(&proposal)?;
            print_json(node.fee_tokens())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
