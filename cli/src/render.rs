//! Plain-text output. Results go to stdout, progress to stderr.

use std::io::Write;

use night_indexer::BalanceSnapshot;
use night_types::amount::format_minor;
use night_types::{NetworkId, NetworkProfile, WalletAddress};
use night_utils::format_duration;
use night_wallet_core::{TransferEvent, TransferResult};

pub fn sync_progress(applied: u64, highest: u64) {
    if highest == 0 {
        eprint!("\rsyncing: {applied} transactions applied");
    } else {
        let percent = (applied.min(highest) * 100) / highest;
        eprint!("\rsyncing: {applied}/{highest} ({percent}%)");
    }
    let _ = std::io::stderr().flush();
}

pub fn clear_progress() {
    eprint!("\r\x1b[2K");
}

pub fn balance(address: &WalletAddress, network: NetworkId, snapshot: &BalanceSnapshot) {
    println!("address:      {address}");
    println!("network:      {network}");
    println!("NIGHT:        {}", format_minor(snapshot.native()));
    for (token_type, value) in snapshot.balances.iter().filter(|(t, _)| !t.is_native()) {
        println!("token {token_type}: {value}");
    }
    println!("utxos:        {}", snapshot.utxo_count);
    println!("transactions: {}", snapshot.tx_count);
}

pub fn transfer_event(event: &TransferEvent) {
    match event {
        TransferEvent::Stage(stage) => eprintln!("{stage}..."),
        TransferEvent::SyncProgress { applied, highest } => {
            if applied < highest {
                eprintln!("  synced {applied}/{highest}");
            }
        }
        TransferEvent::DustRegistered { utxos, tx_id } => {
            eprintln!("  registered {utxos} UTXO(s) for dust generation ({tx_id})")
        }
        TransferEvent::DustWaiting { elapsed } => {
            eprintln!("  waiting for dust ({})", format_duration(*elapsed))
        }
        TransferEvent::Retrying { attempt, reason } => {
            eprintln!("  attempt {attempt} conflicted ({reason}), retrying")
        }
        TransferEvent::Warning(warning) => eprintln!("  warning: {warning}"),
        TransferEvent::Submitted { tx_id } => eprintln!("  submitted {tx_id}"),
    }
}

pub fn transfer_result(result: &TransferResult, network: NetworkId) {
    println!("sent {} on {network}", result.amount);
    println!("transaction: {}", result.tx_id);
}

/// Extra guidance attached to a failed transfer.
pub fn transfer_hint(network: NetworkId) -> String {
    match network {
        NetworkId::Undeployed => {
            "transfer failed; is the local network (node, indexer, proof server) running?".into()
        }
        other => format!("transfer on {other} failed"),
    }
}

pub fn profile(profile: &NetworkProfile, is_default: bool) {
    let marker = if is_default { " (default)" } else { "" };
    println!("{}{marker}", profile.network);
    println!("  address prefix: {}", profile.network.address_hrp());
    println!("  indexer:        {}", profile.indexer_ws);
    println!("  indexer http:   {}", profile.indexer_http);
    println!("  node:           {}", profile.node);
    println!("  prover:         {}", profile.prover);
}
