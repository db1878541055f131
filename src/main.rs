use anyhow::Context;
use clap::{Parser, Subcommand};
use ethers::types::Address;
use evm_bridge_wallet::{
    bridge::{BridgeOptions, BridgeOrchestrator, BridgeRequest, LifiClient},
    chains::{ChainRegistry, EvmClient, ExplorerKind, HttpTransport, ResilientRpcClient, RpcRole},
    config::Settings,
    wallet::{FileWalletStore, WalletStore},
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "evm-wallet")]
#[clap(about = "Local EVM wallet with LI.FI bridging between BSC and opBNB", long_about = None)]
struct Cli {
    /// Wallet file location (default: ~/.evm-wallet.json)
    #[clap(long, global = true)]
    wallet_path: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new wallet and save it
    Setup,

    /// Show the wallet address and creation time
    Address,

    /// List supported chains
    Chains,

    /// Show the wallet's native balance on a chain
    Balance {
        /// Chain alias or chain id
        chain: String,
    },

    /// Bridge tokens between chains
    Bridge {
        /// Source chain (bsc, opbnb)
        from_chain: String,

        /// Destination chain (bsc, opbnb)
        to_chain: String,

        /// Source token: native symbol or contract address
        from_token: String,

        /// Destination token: native symbol or contract address
        to_token: String,

        /// Amount in whole tokens, e.g. 1.5
        amount: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // No fallback to defaults here: they carry the default wallet path.
    let settings = Settings::new().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.app.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid settings: {}", e))?;

    let wallet_path = cli.wallet_path.unwrap_or_else(|| settings.wallet.path.clone());
    debug!(path = %wallet_path.display(), "Using wallet file");
    let store = FileWalletStore::new(wallet_path);

    match cli.command {
        Commands::Setup => {
            if store.exists() {
                anyhow::bail!(
                    "A wallet already exists at {}. Move it away first if you really want a new one",
                    store.location()
                );
            }

            let wallet = store.generate();
            store.save(&wallet)?;

            println!("Wallet created");
            println!("Address: {}", wallet.address);
            println!("Saved to: {}", store.location());
            println!("\nBack up this file. Anyone who can read it controls the funds.");
        }

        Commands::Address => {
            let info = store.info()?;
            println!("Address: {}", info.address);
            println!("Created: {}", info.created_at);
        }

        Commands::Chains => {
            for chain in ChainRegistry::all() {
                let marker = if chain.bridgeable { "bridgeable" } else { "" };
                println!(
                    "{:<14} {:>5}  {:<18} {:<5} {}",
                    chain.alias(),
                    chain.chain_id,
                    chain.display_name,
                    chain.native_token.symbol,
                    marker
                );
            }
        }

        Commands::Balance { chain } => {
            let chain = ChainRegistry::lookup(&chain)?;
            let address = store.address()?;
            let parsed = Address::from_str(&address)
                .map_err(|e| anyhow::anyhow!("Invalid wallet address {}: {}", address, e))?;

            let transport = Arc::new(HttpTransport::new(settings.rpc.timeout())?);
            let client = EvmClient::new(ResilientRpcClient::for_chain(
                chain,
                RpcRole::Read,
                transport,
                settings.rpc.retry_config(),
            )?);

            let balance = client.balance(parsed).await?;
            let formatted = ethers::utils::format_units(balance, chain.native_token.decimals as u32)?;
            println!("{} {} on {}", formatted, chain.native_token.symbol, chain.display_name);
            println!("{}", ChainRegistry::explorer_url(chain, ExplorerKind::Address, &address)?);
        }

        Commands::Bridge {
            from_chain,
            to_chain,
            from_token,
            to_token,
            amount,
        } => {
            let orchestrator = BridgeOrchestrator::new(
                Arc::new(store),
                Arc::new(LifiClient::new(&settings.aggregator)?),
                Arc::new(HttpTransport::new(settings.rpc.timeout())?),
                BridgeOptions::from_settings(&settings),
            );

            let outcome = orchestrator
                .bridge(&BridgeRequest {
                    from_chain,
                    to_chain,
                    from_token,
                    to_token,
                    amount,
                })
                .await?;

            println!("{:?}", outcome.transaction_hash);
            println!("Explorer: {}", outcome.explorer_url);
            println!(
                "Route: {} -> {} via {}, ~{:.0}s, expected output {}",
                outcome.from_chain,
                outcome.to_chain,
                outcome.tool_name,
                outcome.estimated_duration_seconds,
                outcome.destination_amount
            );
        }
    }

    Ok(())
}
