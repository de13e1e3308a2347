//! nxf-wallet
//!
//! CLI wallet for NXF. Manages secp256k1 keypairs, builds and signs
//! transactions, and submits them to a running node via JSON-RPC.
//!
//! Usage:
//!   nxf-wallet keygen    [--keyfile <path>]
//!   nxf-wallet balance   [--account <b58>] [--rpc <url>]
//!   nxf-wallet send      --to <account> --amount <nxf> [--rpc <url>] [--keyfile <path>]
//!   nxf-wallet trust-set --currency <code> --issuer <account> --limit <drops>
//!   nxf-wallet stake     --tier <flexible|30|90|180|365> --amount <nxf>
//!   nxf-wallet unstake   --stake-id <hex>
//!   nxf-wallet info      [--rpc <url>]
//!   nxf-wallet network   [--rpc <url>]

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use nxf_core::constants::{DROPS_PER_NXF, MIN_FEE_DROPS};
use nxf_core::transaction::{StakeTier, Transaction, TrustSetFields, TxKind};
use nxf_core::types::{Amount, CurrencyCode, Signature, TxId};
use nxf_crypto::{decode_address, encode_address, sign_transaction, tx_id_from_signed, KeyPair};

mod rpc_client;
use rpc_client::WalletRpcClient;

#[derive(Parser, Debug)]
#[command(name = "nxf-wallet", version, about = "NXF wallet — sign and submit transactions")]
struct Args {
    /// Path to the keyfile (JSON).
    #[arg(long, global = true, default_value = "~/.nxf/wallet.json")]
    keyfile: PathBuf,

    /// Node RPC endpoint.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8545")]
    rpc: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new secp256k1 keypair and save to the keyfile.
    Keygen,

    /// Print the account ID and native balance.
    Balance {
        /// Account to query (Base58Check). Defaults to the local keypair's account.
        #[arg(long)]
        account: Option<String>,
    },

    /// Send native NXF to another account.
    Send {
        /// Recipient account (Base58Check).
        #[arg(long)]
        to: String,
        /// Amount in NXF (converted to drops internally).
        #[arg(long)]
        amount: f64,
        /// Optional destination tag.
        #[arg(long)]
        destination_tag: Option<u32>,
    },

    /// Establish or adjust a trust line to an issuer's currency.
    TrustSet {
        /// Three-to-twenty byte currency code, e.g. "USD".
        #[arg(long)]
        currency: String,
        /// Issuer account (Base58Check).
        #[arg(long)]
        issuer: String,
        /// Trust limit, in drops of the issued currency.
        #[arg(long)]
        limit: i128,
    },

    /// Lock native NXF into a stake for a fixed term (or flexible, withdrawable any time).
    Stake {
        /// "flexible", "30", "90", "180", or "365".
        #[arg(long)]
        tier: String,
        /// Amount in NXF.
        #[arg(long)]
        amount: f64,
    },

    /// Request early or matured withdrawal of a stake.
    Unstake {
        /// Stake id (hex) — the tx-id of the originating Stake transaction.
        #[arg(long)]
        stake_id: String,
    },

    /// Print genesis/protocol info from the node.
    Info,

    /// Print this node's P2P identity, peer count, and current tip.
    Network,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn,nxf_wallet=info").init();

    let args = Args::parse();
    let keyfile = expand_tilde(&args.keyfile);
    let client = WalletRpcClient::new(&args.rpc);

    match args.command {
        Command::Keygen => cmd_keygen(&keyfile),

        Command::Balance { account } => {
            let addr = match account {
                Some(a) => a,
                None => encode_address(&load_keypair(&keyfile)?.account_id),
            };
            let drops = client.get_balance(&addr).await?;
            println!("Account:  {}", addr);
            println!("Balance:  {} NXF  ({} drops)", drops_to_nxf(drops), drops);
            Ok(())
        }

        Command::Send { to, amount, destination_tag } => {
            let kp = load_keypair(&keyfile)?;
            let destination = decode_address(&to).map_err(|e| anyhow::anyhow!("invalid recipient: {e}"))?;
            let drops = nxf_to_drops(amount);
            let kind = TxKind::Payment {
                destination,
                amount: Amount::Native(drops),
                send_max: None,
                destination_tag,
                partial_payment_ok: false,
            };
            let tx = build_and_sign(&kp, kind, &client).await?;
            let tx_id = client.send_transaction(&tx).await?;
            println!("Submitted: {}", tx_id);
            Ok(())
        }

        Command::TrustSet { currency, issuer, limit } => {
            let kp = load_keypair(&keyfile)?;
            let issuer_id = decode_address(&issuer).map_err(|e| anyhow::anyhow!("invalid issuer: {e}"))?;
            let code = CurrencyCode::new(&currency).map_err(|e| anyhow::anyhow!("invalid currency code: {e}"))?;
            let kind = TxKind::TrustSet(TrustSetFields {
                currency: code,
                issuer: issuer_id,
                limit,
                quality_in: None,
                quality_out: None,
                set_auth: false,
                set_no_ripple: false,
                clear_no_ripple: false,
                set_freeze: false,
                clear_freeze: false,
            });
            let tx = build_and_sign(&kp, kind, &client).await?;
            let tx_id = client.send_transaction(&tx).await?;
            println!("Trust line set: {}", tx_id);
            Ok(())
        }

        Command::Stake { tier, amount } => {
            let kp = load_keypair(&keyfile)?;
            let tier = parse_tier(&tier)?;
            let kind = TxKind::Stake { tier, amount: nxf_to_drops(amount) };
            let tx = build_and_sign(&kp, kind, &client).await?;
            let tx_id = client.send_transaction(&tx).await?;
            println!("Stake submitted: {}", tx_id);
            Ok(())
        }

        Command::Unstake { stake_id } => {
            let kp = load_keypair(&keyfile)?;
            let id = TxId::from_hex(&stake_id).map_err(|e| anyhow::anyhow!("invalid stake id: {e}"))?;
            let kind = TxKind::Unstake { stake_id: id };
            let tx = build_and_sign(&kp, kind, &client).await?;
            let tx_id = client.send_transaction(&tx).await?;
            println!("Unstake submitted: {}", tx_id);
            Ok(())
        }

        Command::Info => {
            let info = client.get_genesis_info().await?;
            println!("Protocol:          {}", info.protocol);
            println!("Ticker:            {}", info.ticker);
            println!("Drops per NXF:     {}", info.drops_per_nxf);
            println!("Total supply:      {} drops", info.total_supply_drops);
            println!("Genesis timestamp: {}", info.genesis_timestamp);
            println!("Account reserve:   {} drops", info.account_reserve_drops);
            println!("Owner reserve:     {} drops", info.owner_reserve_drops);
            println!("Min fee:           {} drops", info.min_fee_drops);
            Ok(())
        }

        Command::Network => {
            let info = client.get_network_info().await?;
            println!("Node id:          {}", info.node_id);
            println!("Listen address:   {}", info.listen_addr);
            println!("Peers:            {}", info.peer_count);
            println!("Ledger sequence:  {}", info.ledger_seq);
            println!("Protocol version: {}", info.protocol_version);
            Ok(())
        }
    }
}

fn cmd_keygen(keyfile: &PathBuf) -> anyhow::Result<()> {
    if keyfile.exists() {
        bail!("Keyfile {} already exists. Delete it first to generate a new key.", keyfile.display());
    }
    if let Some(parent) = keyfile.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let kp = KeyPair::generate();
    let json = serde_json::to_string_pretty(&kp)?;
    std::fs::write(keyfile, &json).with_context(|| format!("writing keyfile to {}", keyfile.display()))?;

    println!("Generated new keypair.");
    println!("Account ID: {}", encode_address(&kp.account_id));
    println!("Public key: {}", hex::encode(kp.public_key.as_bytes()));
    println!("Keyfile:    {}", keyfile.display());
    println!("\nBACK UP YOUR KEYFILE. Loss = permanent loss of funds.");
    Ok(())
}

/// Fetches the account's next sequence number, builds a transaction of
/// `kind` at the network fee floor, and signs it with `kp`.
async fn build_and_sign(kp: &KeyPair, kind: TxKind, client: &WalletRpcClient) -> anyhow::Result<Transaction> {
    let address = encode_address(&kp.account_id);
    let sequence = client.next_sequence(&address).await?;

    let mut tx = Transaction {
        tx_id: TxId::from_bytes([0u8; 32]),
        account: kp.account_id,
        sequence,
        fee: MIN_FEE_DROPS,
        memo: None,
        source_tag: None,
        signing_public_key: kp.public_key.clone(),
        signature: Signature(Vec::new()),
        kind,
    };
    tx.signature = sign_transaction(kp, &tx);
    tx.tx_id = tx_id_from_signed(&tx);
    Ok(tx)
}

fn load_keypair(keyfile: &PathBuf) -> anyhow::Result<KeyPair> {
    let json = std::fs::read_to_string(keyfile).with_context(|| format!("reading keyfile {}", keyfile.display()))?;
    serde_json::from_str(&json).context("parsing keyfile — is it a valid NXF keyfile?")
}

fn parse_tier(s: &str) -> anyhow::Result<StakeTier> {
    match s.to_ascii_lowercase().as_str() {
        "flexible" | "0" => Ok(StakeTier::Flexible),
        "30" => Ok(StakeTier::Days30),
        "90" => Ok(StakeTier::Days90),
        "180" => Ok(StakeTier::Days180),
        "365" => Ok(StakeTier::Days365),
        other => bail!("unknown stake tier '{other}' (expected flexible, 30, 90, 180, or 365)"),
    }
}

fn nxf_to_drops(nxf: f64) -> u64 {
    (nxf * DROPS_PER_NXF as f64) as u64
}

fn drops_to_nxf(drops: u64) -> f64 {
    drops as f64 / DROPS_PER_NXF as f64
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.clone()
}
