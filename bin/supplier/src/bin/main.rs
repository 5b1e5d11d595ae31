use action::{
    Action, AlloyWallet, ApprovalMethod, Approve, ApproveAction, CacheInvalidation,
    SupplyExecutor, SupplyRequest, Wallet,
};
use allowance::{AllowanceCache, AllowanceKey, AllowanceResolver, Erc20Reader, TokenReader};
use alloy_primitives::Address;
use balance::{monitor::BalanceMonitor, BalanceBook};
use bridge::{HttpBridgeService, LiquidityBridgeAdapter};
use clap::{Parser, Subcommand, ValueEnum};
use client::RemoteSigner;
use std::{path::PathBuf, sync::Arc};
use supplier::{
    config::Config,
    metrics::{install_prometheus_exporter, Metrics},
    parse_amount, refresh_balance, report_balance, run_supply, token_metadata,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "supplier", about = "Supply assets into a lending pool")]
struct Cli {
    /// Path to the TOML config
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Hex private key, used when no signer_url is configured
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Supply an asset, approving and bridging as needed
    Supply {
        #[arg(long)]
        asset: Address,
        /// Whole-token amount, e.g. 12.5
        #[arg(long)]
        amount: String,
        #[arg(long, value_enum, default_value_t = Method::Permit)]
        method: Method,
        #[arg(long)]
        on_behalf_of: Option<Address>,
    },
    /// Approve the pool to pull an asset
    Approve {
        #[arg(long)]
        asset: Address,
        #[arg(long)]
        amount: String,
    },
    /// Show the pool's allowance over an asset
    Allowance {
        #[arg(long)]
        asset: Address,
    },
    /// Show the market-chain balance of an asset
    Balance {
        #[arg(long)]
        asset: Address,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Method {
    Permit,
    Approve,
}

impl From<Method> for ApprovalMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Permit => Self::Permit,
            Method::Approve => Self::Approve,
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Loading config: {}", cli.config.display());
    let config = Config::from_file(&cli.config)?;
    let market = config.market();

    info!("Loaded config:");
    info!("  RPC URL: {}", config.rpc_url);
    info!("  Network: {:?} (chain {})", market.network_type, market.chain_id);
    info!("  Pool: {}", market.pool);
    info!("  Bridge: {}", config.bridge.url);

    let metrics = Metrics::new();
    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!("Prometheus exporter listening on port {}", port);
    }

    let provider = client::create_provider(&config.rpc_url)?;

    let wallet = match (&config.signer_url, &cli.private_key) {
        (Some(signer_url), _) => {
            let owner = config
                .owner_address
                .ok_or_else(|| eyre::eyre!("owner_address is required with signer_url"))?;
            info!("  Signer: remote ({}) for {}", signer_url, owner);
            let remote = RemoteSigner::new(signer_url.as_str(), owner, market.chain_id);
            AlloyWallet::new(
                provider.clone(),
                client::remote_signer_fn(remote.clone(), provider.clone()),
                client::remote_permit_signer_fn(remote),
                owner,
                market.chain_id,
            )
        }
        (None, Some(private_key)) => {
            let signer = client::parse_private_key(private_key)?;
            let owner = signer.address();
            info!("  Signer: local key for {}", owner);
            AlloyWallet::new(
                provider.clone(),
                client::local_signer_fn(signer.clone(), market.chain_id, provider.clone()),
                client::local_permit_signer_fn(signer),
                owner,
                market.chain_id,
            )
        }
        (None, None) => eyre::bail!("Either signer_url or PRIVATE_KEY must be provided"),
    };
    let wallet: Arc<dyn Wallet> =
        Arc::new(wallet.with_receipt_timeout(config.supply.confirmation_timeout()));
    let owner = wallet.address();

    let reader: Arc<dyn TokenReader> = Arc::new(Erc20Reader::new(provider.clone()));
    let cache = AllowanceCache::new();
    let resolver = AllowanceResolver::new(Arc::clone(&reader), cache.clone());
    let book = BalanceBook::new();
    let monitor = BalanceMonitor::new(provider.clone(), market.chain_id);

    match cli.command {
        Command::Allowance { asset } => {
            let token = token_metadata(&provider, asset).await?;
            let allowance = resolver.fetch(asset, owner, market.pool).await?;
            info!(
                "Allowance of {} for pool {}: {} (base units)",
                token.symbol, market.pool, allowance.amount
            );
        }
        Command::Balance { asset } => {
            let token = token_metadata(&provider, asset).await?;
            let amount = refresh_balance(&monitor, &book, &market, asset, owner, &token).await?;
            report_balance(&metrics, &token.symbol, amount);
            info!("Balance on chain {}: {} {}", market.chain_id, amount, token.symbol);
        }
        Command::Approve { asset, amount } => {
            let token = token_metadata(&provider, asset).await?;
            let amount = parse_amount(&amount, token.decimals)?;
            let mut action = ApproveAction::new(
                Arc::clone(&wallet),
                Arc::clone(&reader),
                config.supply.gas,
                config.supply.confirmations,
                Approve {
                    asset,
                    owner,
                    spender: market.pool,
                    amount,
                },
            );

            info!("{}", action.description());
            if !action.is_ready().await? {
                eyre::bail!("Approval is not ready: amount is zero or owner is not the signer");
            }
            if action.is_completed().await? {
                info!("Allowance already covers {} {}", amount, token.symbol);
                return Ok(());
            }
            let result = action.execute().await?;
            info!(
                "Approved in tx {} (block {:?})",
                result.tx_hash, result.block_number
            );
        }
        Command::Supply {
            asset,
            amount,
            method,
            on_behalf_of,
        } => {
            let token = token_metadata(&provider, asset).await?;
            let amount = parse_amount(&amount, token.decimals)?;
            refresh_balance(&monitor, &book, &market, asset, owner, &token).await?;

            let service = HttpBridgeService::new(&config.bridge.url, config.bridge.timeout())?;
            let bridge =
                LiquidityBridgeAdapter::new(Arc::new(service), config.supply.fee_buffers.clone());

            let (invalidations_tx, mut invalidations_rx) =
                mpsc::unbounded_channel::<CacheInvalidation>();
            let executor = SupplyExecutor::new(
                Arc::clone(&wallet),
                resolver,
                Arc::new(book.clone()),
                bridge,
                market.clone(),
                config.supply.clone(),
            )
            .with_invalidation_sink(invalidations_tx);

            // Refetch balances and allowances touched by a confirmed supply
            let refresher = {
                let (metrics, market, token) = (metrics.clone(), market.clone(), token.clone());
                tokio::spawn(async move {
                    while let Some(signal) = invalidations_rx.recv().await {
                        cache.remove(&AllowanceKey {
                            asset: signal.key.asset,
                            owner: signal.key.owner,
                            spender: signal.key.pool,
                        });
                        match refresh_balance(
                            &monitor,
                            &book,
                            &market,
                            signal.key.asset,
                            signal.key.owner,
                            &token,
                        )
                        .await
                        {
                            Ok(amount) => report_balance(&metrics, &signal.symbol, amount),
                            Err(e) => warn!("Failed to refresh balance after supply: {}", e),
                        }
                    }
                })
            };

            let request = SupplyRequest {
                asset,
                symbol: token.symbol.clone(),
                decimals: token.decimals,
                amount,
                preference: method.into(),
                on_behalf_of,
                prior_signature: None,
            };

            let result = run_supply(&executor, &metrics, request).await;
            drop(executor);
            if let Err(e) = refresher.await {
                warn!("Balance refresher stopped: {}", e);
            }

            match result {
                Ok(outcome) => {
                    info!(
                        "Supplied {} {} in tx {} (block {:?})",
                        outcome.amount, token.symbol, outcome.tx_hash, outcome.block_number
                    );
                    if let Some(receipt) = outcome.bridge {
                        info!("Shortfall bridged by intent {}", receipt.intent_id);
                    }
                }
                Err(e) => {
                    error!("Supply failed: {}", e.user_message());
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
