//! P2P integration test for nxf-node.
//!
//! Starts two node processes sharing the same genesis:
//!   Node A — bootstrap node (no peers)
//!   Node B — joins by dialing node A's TCP address
//!
//! Submits a payment to node A and verifies that node B receives and
//! applies it via gossip once consensus closes a ledger.
//!
//! Run with:
//!   cargo test -p nxf-node --test p2p

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

fn spawn_node(data_dir: &PathBuf, rpc_port: u16, p2p_port: u16, params_path: &PathBuf, bootstrap: Option<u16>) -> Child {
    let node_bin = env!("CARGO_BIN_EXE_nxf-node");
    let mut cmd = Command::new(node_bin);
    cmd.args([
        "--data-dir",
        data_dir.join("state").to_str().unwrap(),
        "--rpc-addr",
        &format!("127.0.0.1:{rpc_port}"),
        "--p2p-listen",
        &format!("127.0.0.1:{p2p_port}"),
        "--genesis-params",
        params_path.to_str().unwrap(),
    ]);
    if let Some(port) = bootstrap {
        cmd.args(["--bootstrap", &format!("127.0.0.1:{port}")]);
    }
    cmd.stdout(Stdio::null()).stderr(Stdio::null()).spawn().expect("failed to spawn nxf-node")
}

// ── RPC helpers ───────────────────────────────────────────────────────────────

async fn rpc_call(client: &reqwest::Client, url: &str, method: &str, params: serde_json::Value) -> Option<serde_json::Value> {
    let body = serde_json::json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
    let resp = client.post(url).json(&body).send().await.ok()?;
    let json: serde_json::Value = resp.json().await.ok()?;
    if json.get("error").is_some() {
        return None;
    }
    Some(json["result"].clone())
}

async fn rpc_call_unwrap(client: &reqwest::Client, url: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
    rpc_call(client, url, method, params).await.unwrap_or_else(|| panic!("RPC call {method} returned error/none"))
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

async fn get_peer_count(client: &reqwest::Client, url: &str) -> usize {
    let result = rpc_call_unwrap(client, url, "nxf_getNetworkInfo", serde_json::json!([])).await;
    result["peer_count"].as_u64().expect("peer_count field") as usize
}

async fn get_balance(client: &reqwest::Client, url: &str, address: &str) -> u64 {
    let result = rpc_call_unwrap(client, url, "nxf_getBalance", serde_json::json!([address])).await;
    result.as_str().unwrap().parse().unwrap()
}

async fn get_sequence(client: &reqwest::Client, url: &str, address: &str) -> u32 {
    let result = rpc_call_unwrap(client, url, "nxf_getAccount", serde_json::json!([address])).await;
    if result.is_null() {
        return 0;
    }
    result["sequence"].as_u64().unwrap_or(0) as u32
}

async fn send_tx(client: &reqwest::Client, url: &str, tx: &Transaction) -> String {
    let tx_json = serde_json::to_value(tx).unwrap();
    let result = rpc_call_unwrap(client, url, "nxf_sendTransaction", serde_json::json!([tx_json])).await;
    result.as_str().unwrap().to_string()
}

/// Poll until a tx is visible via `nxf_getTransaction` on the given node.
async fn wait_for_tx(client: &reqwest::Client, url: &str, tx_id: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let result = rpc_call(client, url, "nxf_getTransaction", serde_json::json!([tx_id])).await;
        if let Some(v) = result {
            if !v.is_null() {
                return true;
            }
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

// ── P2P test ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn p2p_gossip_propagation() {
    let http = reqwest::Client::new();

    // ── 1. Shared genesis (both nodes start from the same genesis) ────────────
    let base_dir = std::env::temp_dir().join(format!("nxf_p2p_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&base_dir);

    let dir_a = base_dir.join("node_a");
    let dir_b = base_dir.join("node_b");
    std::fs::create_dir_all(&dir_a).unwrap();
    std::fs::create_dir_all(&dir_b).unwrap();

    let foundation_kp = KeyPair::generate();
    let params = GenesisParams::new(foundation_kp.public_key.clone());
    let params_path_a = dir_a.join("genesis-params.json");
    std::fs::write(&params_path_a, serde_json::to_string(&params).unwrap()).unwrap();
    let params_path_b = dir_b.join("genesis-params.json");
    std::fs::copy(&params_path_a, &params_path_b).unwrap();

    // ── 2. Start node A (bootstrap node, no peers) ────────────────────────────
    let rpc_a = free_port();
    let p2p_a = free_port();
    let url_a = format!("http://127.0.0.1:{rpc_a}");

    let child_a = spawn_node(&dir_a, rpc_a, p2p_a, &params_path_a, None);
    let _guard_a = NodeGuard { child: child_a, data_dir: dir_a };

    assert!(wait_for_rpc(&http, &url_a, Duration::from_secs(20)).await, "node A did not become ready");

    // ── 3. Start node B, bootstrapping off node A's TCP listen address ────────
    let rpc_b = free_port();
    let p2p_b = free_port();
    let url_b = format!("http://127.0.0.1:{rpc_b}");

    let child_b = spawn_node(&dir_b, rpc_b, p2p_b, &params_path_b, Some(p2p_a));
    let _guard_b = NodeGuard { child: child_b, data_dir: base_dir };

    assert!(wait_for_rpc(&http, &url_b, Duration::from_secs(20)).await, "node B did not become ready");

    // ── 4. Wait for the handshake to complete on both sides ───────────────────
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if get_peer_count(&http, &url_a).await >= 1 && get_peer_count(&http, &url_b).await >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    assert!(get_peer_count(&http, &url_a).await >= 1, "node A never saw node B connect");
    assert!(get_peer_count(&http, &url_b).await >= 1, "node B never saw node A connect");

    // ── 5. Submit a payment on node A ─────────────────────────────────────────
    let foundation_addr = encode_address(&foundation_kp.account_id);
    let alice = KeyPair::generate();

    let sequence = get_sequence(&http, &url_a, &foundation_addr).await + 1;
    let amount_drops = 500 * DROPS_PER_NXF;
    let tx = build_payment(&foundation_kp, sequence, alice.account_id, amount_drops);
    let tx_id_hex = send_tx(&http, &url_a, &tx).await;

    // ── 6. Verify node A applied it ───────────────────────────────────────────
    assert!(wait_for_tx(&http, &url_a, &tx_id_hex, Duration::from_secs(20)).await, "node A did not apply the transaction");

    // ── 7. Verify node B received and applied it via gossip + its own sync ────
    assert!(wait_for_tx(&http, &url_b, &tx_id_hex, Duration::from_secs(30)).await, "node B did not receive the transaction within 30 seconds");

    // ── 8. Assert state consistency: both nodes agree on alice's balance ──────
    let alice_addr = encode_address(&alice.account_id);
    let bal_a = get_balance(&http, &url_a, &alice_addr).await;
    let bal_b = get_balance(&http, &url_b, &alice_addr).await;
    assert_eq!(bal_a, amount_drops, "node A: wrong alice balance");
    assert_eq!(bal_a, bal_b, "nodes disagree on alice's balance");
}
