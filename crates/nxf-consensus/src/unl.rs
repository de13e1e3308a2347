use std::collections::HashMap;

use nxf_core::types::{AccountId, PublicKey};
use tracing::warn;

/// A node's Unique Node List: the validators it trusts for consensus,
/// plus its own identity. When `pubkeys` is populated, every proposal from
/// a listed validator must carry a valid signature under that key.
#[derive(Clone, Debug)]
pub struct UnlConfig {
    pub self_id: AccountId,
    pub unl: Vec<AccountId>,
    pub pubkeys: Option<HashMap<AccountId, PublicKey>>,
}

impl UnlConfig {
    pub fn new(self_id: AccountId, unl: Vec<AccountId>, pubkeys: Option<HashMap<AccountId, PublicKey>>) -> Self {
        let config = Self { self_id, unl, pubkeys };
        if config.n() < 4 {
            warn!(
                n = config.n(),
                "UNL size + self is below the 3f+1 boundary (n >= 4 required for f >= 1 Byzantine tolerance)"
            );
        }
        config
    }

    /// `|UNL| + 1` (self inclusive).
    pub fn n(&self) -> usize {
        self.unl.len() + 1
    }

    /// Byzantine tolerance: `floor((n-1)/3)`.
    pub fn f(&self) -> usize {
        (self.n() - 1) / 3
    }

    pub fn is_member(&self, id: &AccountId) -> bool {
        *id == self.self_id || self.unl.contains(id)
    }

    /// All voting members, self included.
    pub fn members(&self) -> Vec<AccountId> {
        let mut v = vec![self.self_id];
        v.extend(self.unl.iter().copied());
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_and_f_computed_from_unl_plus_self() {
        let self_id = AccountId::from_bytes([0; 20]);
        let unl = vec![AccountId::from_bytes([1; 20]), AccountId::from_bytes([2; 20]), AccountId::from_bytes([3; 20])];
        let config = UnlConfig::new(self_id, unl, None);
        assert_eq!(config.n(), 4);
        assert_eq!(config.f(), 1);
    }
}
