//! Catch-up protocol: comparing chain tips with peers, choosing between a
//! transaction-replay delta and a full snapshot, and installing whichever
//! is chosen with the same hash-chain scrutiny a freshly-closed ledger gets.

pub mod error;
pub mod install;
pub mod plan;
pub mod status;

pub use error::SyncError;
pub use install::{install_delta, install_snapshot, verify_header, DeltaLedger};
pub use plan::{chunk_bounds, plan_sync, SyncPlan};
pub use status::{PeerStatus, SyncStatus};
