//! Command handlers.

use anyhow::Context as _;
use std::process::ExitCode;
use tracing::info;

use night_indexer::BalanceReconstructor;
use night_types::{NetworkId, NetworkProfile, ResolvedProfile, Resolver, WalletAddress};
use night_wallet_core::{
    CancelToken, RpcEngine, SigningMaterial, TransferError, TransferOrchestrator, TransferRequest,
};

use crate::render;
use crate::Context;

/// Conventional exit status for an interrupt.
const EXIT_INTERRUPTED: u8 = 130;

fn resolve(ctx: &Context, address: Option<&str>) -> anyhow::Result<ResolvedProfile> {
    let resolved = Resolver::new()
        .explicit(ctx.network.as_deref())
        .address(address)
        .stored_default(ctx.config.default_network.as_deref())
        .overrides(ctx.overrides.clone())
        .resolve()?;
    info!(
        network = %resolved.profile.network,
        source = %resolved.source,
        "network profile resolved"
    );
    Ok(resolved)
}

pub async fn balance(ctx: &Context, address: &str) -> anyhow::Result<ExitCode> {
    let resolved = resolve(ctx, Some(address))?;
    let profile = resolved.profile;
    let address = WalletAddress::decode_for(address, profile.network)?;

    let reconstructor = BalanceReconstructor::new(ctx.config.timeouts.subscription_budget());
    let mut on_progress = render::sync_progress;
    let snapshot = reconstructor
        .reconstruct(&address, &profile.indexer_ws, Some(&mut on_progress))
        .await
        .with_context(|| format!("balance reconstruction on {} failed", profile.network))?;
    render::clear_progress();

    render::balance(&address, profile.network, &snapshot);
    Ok(ExitCode::SUCCESS)
}

pub async fn transfer(
    ctx: &Context,
    to: String,
    amount: String,
    seed: &str,
) -> anyhow::Result<ExitCode> {
    let resolved = resolve(ctx, Some(&to))?;
    let material = SigningMaterial::from_hex(seed).context("invalid wallet seed")?;
    let engine = RpcEngine::new(ctx.engine_url.clone())?;

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received, cancelling at the next checkpoint...");
            interrupt.cancel();
        }
    });

    let mut orchestrator = TransferOrchestrator::new(&engine, resolved.profile.clone())
        .with_config(ctx.config.timeouts.transfer_config())
        .with_observer(render::transfer_event);

    let outcome = orchestrator
        .execute(TransferRequest {
            recipient: to,
            amount,
            material,
            cancel,
        })
        .await;

    match outcome {
        Ok(result) => {
            render::transfer_result(&result, resolved.profile.network);
            Ok(ExitCode::SUCCESS)
        }
        Err(TransferError::Cancelled) => {
            eprintln!("transfer cancelled; nothing was submitted");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Err(e) => Err(e).context(render::transfer_hint(resolved.profile.network)),
    }
}

pub fn networks(ctx: &Context) -> anyhow::Result<ExitCode> {
    let default = match ctx.config.default_network.as_deref() {
        Some(name) => name.parse::<NetworkId>()?,
        None => night_types::profile::FALLBACK_NETWORK,
    };
    for profile in NetworkProfile::all() {
        render::profile(&profile, profile.network == default);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn config_show(ctx: &Context) -> anyhow::Result<ExitCode> {
    println!("# {}", ctx.config_path.display());
    print!("{}", ctx.config.to_toml_string()?);
    Ok(ExitCode::SUCCESS)
}

pub fn config_set_network(ctx: Context, name: &str) -> anyhow::Result<ExitCode> {
    let network: NetworkId = name.parse()?;
    let mut config = ctx.config;
    config.default_network = Some(network.as_str().to_string());
    config.save(&ctx.config_path)?;
    println!(
        "default network set to {network} ({})",
        ctx.config_path.display()
    );
    Ok(ExitCode::SUCCESS)
}
