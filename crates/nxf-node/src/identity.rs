//! Persisted node identity: a secp256k1 keypair stored as hex in a small
//! JSON file next to the ledger database, generated on first run.

use std::path::Path;

use anyhow::Context;
use nxf_crypto::KeyPair;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct IdentityFile {
    secret_key_hex: String,
}

/// Loads the keypair at `path`, or generates and persists a fresh one if
/// the file doesn't exist yet.
pub fn load_or_create_identity(path: &Path) -> anyhow::Result<KeyPair> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    if path.exists() {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading identity file {}", path.display()))?;
        let file: IdentityFile = serde_json::from_str(&raw).context("parsing identity file")?;
        let secret = hex::decode(&file.secret_key_hex).context("decoding identity secret key")?;
        return KeyPair::from_raw(&secret).context("restoring identity keypair");
    }

    let keypair = KeyPair::generate();
    let file = IdentityFile { secret_key_hex: hex::encode(keypair.secret_key_bytes()) };
    let raw = serde_json::to_string_pretty(&file).context("encoding identity file")?;
    std::fs::write(path, raw).with_context(|| format!("writing identity file {}", path.display()))?;
    Ok(keypair)
}
