//! Command-line entry point for the NIGHT wallet.

mod commands;
mod render;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use night_types::EndpointOverrides;
use night_utils::{init_logging, LogFormat};
use night_wallet_core::WalletConfig;

#[derive(Parser)]
#[command(name = "night-wallet", about = "NIGHT wallet client", version)]
struct Cli {
    /// Network profile: "undeployed", "devnet", "preview", "preprod" or "mainnet".
    /// Defaults to the address's network, then the configured default.
    #[arg(long, global = true, env = "NIGHT_NETWORK")]
    network: Option<String>,

    /// Override the indexer subscription (websocket) endpoint.
    #[arg(long, global = true, env = "NIGHT_INDEXER")]
    indexer: Option<String>,

    /// Override the node RPC endpoint.
    #[arg(long, global = true, env = "NIGHT_NODE")]
    node: Option<String>,

    /// Override the proof server endpoint.
    #[arg(long, global = true, env = "NIGHT_PROVER")]
    prover: Option<String>,

    /// Wallet engine JSON-RPC endpoint.
    #[arg(long, global = true, env = "NIGHT_ENGINE_URL")]
    engine_url: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "NIGHT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "NIGHT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to the TOML configuration file. Defaults to
    /// `$NIGHT_WALLET_HOME/config.toml` or `~/.night-wallet/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Reconstruct the unshielded balance of an address from the indexer.
    Balance {
        /// Bech32m wallet address.
        address: String,
    },

    /// Send NIGHT to another address.
    Transfer {
        /// Recipient address.
        #[arg(long)]
        to: String,

        /// Amount in NIGHT, e.g. "12.5" (at most 6 decimals).
        #[arg(long)]
        amount: String,

        /// Wallet seed as 64 hex characters.
        #[arg(long, env = "NIGHT_WALLET_SEED", hide_env_values = true)]
        seed: String,
    },

    /// List the built-in network profiles.
    Networks,

    /// Inspect or change the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,

    /// Store the default network.
    SetNetwork {
        /// Network name.
        name: String,
    },
}

/// Everything a command needs after flags, environment and file are merged.
pub struct Context {
    pub config_path: PathBuf,
    pub config: WalletConfig,
    pub network: Option<String>,
    pub overrides: EndpointOverrides,
    pub engine_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => WalletConfig::default_path()?,
    };
    let config = WalletConfig::load_or_default(&config_path)?;

    let log_format: LogFormat = cli
        .log_format
        .as_deref()
        .unwrap_or(&config.log_format)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(log_format, log_level);
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    let ctx = Context {
        engine_url: cli.engine_url.unwrap_or_else(|| config.engine_url.clone()),
        config_path,
        config,
        network: cli.network,
        overrides: EndpointOverrides {
            indexer_ws: cli.indexer,
            node: cli.node,
            prover: cli.prover,
        },
    };

    match cli.command {
        Command::Balance { address } => commands::balance(&ctx, &address).await,
        Command::Transfer { to, amount, seed } => {
            commands::transfer(&ctx, to, amount, &seed).await
        }
        Command::Networks => commands::networks(&ctx),
        Command::Config { action } => match action {
            ConfigAction::Show => commands::config_show(&ctx),
            ConfigAction::SetNetwork { name } => commands::config_set_network(ctx, &name),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "night-wallet",
            "balance",
            "mn_addr_preview1xyz",
            "--network",
            "preview",
            "--indexer",
            "ws://localhost:1234/ws",
        ])
        .unwrap();
        assert_eq!(cli.network.as_deref(), Some("preview"));
        assert_eq!(cli.indexer.as_deref(), Some("ws://localhost:1234/ws"));
        assert!(matches!(cli.command, Command::Balance { .. }));
    }

    #[test]
    fn transfer_requires_recipient_and_amount() {
        assert!(Cli::try_parse_from(["night-wallet", "transfer", "--amount", "1", "--seed", "00"]).is_err());
    }
}
