//! End-to-end smoke test for nxf-node.
//!
//! Starts a real node process with a fresh genesis, submits a payment via
//! JSON-RPC, and asserts state changes are correctly reflected after the
//! next consensus round closes.
//!
//! Run with:
//!   cargo test -p nxf-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use nxf_core::constants::DROPS_PER_NXF;
use nxf_core::transaction::{Transaction, TxKind};
use nxf_core::types::{AccountId, Amount, Signature, TxId};
use nxf_crypto::{encode_address, sign_transaction, tx_id_from_signed, KeyPair};
use nxf_genesis::GenesisParams;

// ── Node lifecycle ────────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

fn spawn_node(data_dir: &PathBuf, rpc_port: u16, p2p_port: u16, params_path: &PathBuf) -> Child {
    let node_bin = env!("CARGO_BIN_EXE_nxf-node");
    Command::new(node_bin)
        .args([
            "--data-dir",
            data_dir.join("state").to_str().unwrap(),
            "--rpc-addr",
            &format!("127.0.0.1:{rpc_port}"),
            "--p2p-listen",
            &format!("127.0.0.1:{p2p_port}"),
            "--genesis-params",
            params_path.to_str().unwrap(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn nxf-node")
}

// ── RPC helpers ───────────────────────────────────────────────────────────────

async fn rpc_call(client: &reqwest::Client, url: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
    let body = serde_json::json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
    let resp = client.post(url).json(&body).send().await.unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    let json: serde_json::Value = resp.json().await.expect("parse RPC JSON");
    if let Some(err) = json.get("error") {
        panic!("RPC error from {method}: {err}");
    }
    json["result"].clone()
}

async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let body = serde_json::json!({ "jsonrpc": "2.0", "method": "nxf_getGenesisInfo", "params": [], "id": 1 });
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

async fn get_balance(client: &reqwest::Client, url: &str, address: &str) -> u64 {
    let result = rpc_call(client, url, "nxf_getBalance", serde_json::json!([address])).await;
    result.as_str().unwrap().parse().expect("parse balance")
}

async fn get_sequence(client: &reqwest::Client, url: &str, address: &str) -> u32 {
    let result = rpc_call(client, url, "nxf_getAccount", serde_json::json!([address])).await;
    if result.is_null() {
        return 0;
    }
    result["sequence"].as_u64().expect("sequence field") as u32
}

async fn send_tx(client: &reqwest::Client, url: &str, tx: &Transaction) -> String {
    let tx_json = serde_json::to_value(tx).expect("encode tx");
    let result = rpc_call(client, url, "nxf_sendTransaction", serde_json::json!([tx_json])).await;
    result.as_str().expect("tx_id string").to_string()
}

/// Poll until a tx is visible via `nxf_getTransaction` (i.e. a ledger has closed with it).
async fn wait_for_tx(client: &reqwest::Client, url: &str, tx_id: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let result = rpc_call(client, url, "nxf_getTransaction", serde_json::json!([tx_id])).await;
        if !result.is_null() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    false
}

// ── Transaction builder ───────────────────────────────────────────────────────

fn build_payment(kp: &KeyPair, sequence: u32, destination: AccountId, drops: u64) -> Transaction {
    let mut tx = Transaction {
        tx_id: TxId::from_bytes([0u8; 32]),
        account: kp.account_id,
        sequence,
        fee: nxf_core::constants::MIN_FEE_DROPS,
        memo: None,
        source_tag: None,
        signing_public_key: kp.public_key.clone(),
        signature: Signature(Vec::new()),
        kind: TxKind::Payment {
            destination,
            amount: Amount::Native(drops),
            send_max: None,
            destination_tag: None,
            partial_payment_ok: false,
        },
    };
    tx.signature = sign_transaction(kp, &tx);
    tx.tx_id = tx_id_from_signed(&tx);
    tx
}

// ── Smoke test ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn smoke_genesis_and_payment() {
    // ── 1. Prepare temp dir and genesis params ────────────────────────────────
    let data_dir = std::env::temp_dir().join(format!("nxf_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();

    let foundation_kp = KeyPair::generate();
    let params = GenesisParams::new(foundation_kp.public_key.clone());
    let params_path = data_dir.join("genesis-params.json");
    std::fs::write(&params_path, serde_json::to_string(&params).unwrap()).unwrap();

    // ── 2. Start node ─────────────────────────────────────────────────────────
    let rpc_port = free_port();
    let p2p_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{rpc_port}");

    let child = spawn_node(&data_dir, rpc_port, p2p_port, &params_path);
    let _guard = NodeGuard { child, data_dir };

    // ── 3. Wait for RPC ready ─────────────────────────────────────────────────
    let http = reqwest::Client::new();
    assert!(wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await, "nxf-node did not become ready within 20 seconds");

    // ── 4. Verify genesis supply landed on the foundation account ─────────────
    let foundation_addr = encode_address(&foundation_kp.account_id);
    let genesis_bal = get_balance(&http, &rpc_url, &foundation_addr).await;
    assert_eq!(genesis_bal, nxf_core::constants::GENESIS_TOTAL_SUPPLY_DROPS as u64, "foundation should hold the full genesis supply");

    // ── 5. Transfer 1000 NXF foundation → alice ───────────────────────────────
    let alice = KeyPair::generate();
    let alice_addr = encode_address(&alice.account_id);
    let sequence = get_sequence(&http, &rpc_url, &foundation_addr).await + 1;
    let amount_drops = 1_000 * DROPS_PER_NXF;
    let tx = build_payment(&foundation_kp, sequence, alice.account_id, amount_drops);
    let tx_id = send_tx(&http, &rpc_url, &tx).await;

    // ── 6. Wait for the consensus round to close a ledger containing it ───────
    assert!(wait_for_tx(&http, &rpc_url, &tx_id, Duration::from_secs(20)).await, "transaction did not close within 20 seconds");

    // ── 7. Verify alice received 1000 NXF and foundation was debited ──────────
    let alice_bal = get_balance(&http, &rpc_url, &alice_addr).await;
    assert_eq!(alice_bal, amount_drops, "alice should have 1000 NXF");

    let foundation_bal_after = get_balance(&http, &rpc_url, &foundation_addr).await;
    assert_eq!(
        foundation_bal_after,
        nxf_core::constants::GENESIS_TOTAL_SUPPLY_DROPS as u64 - amount_drops - nxf_core::constants::MIN_FEE_DROPS,
        "foundation should be reduced by the payment plus fee"
    );
}
