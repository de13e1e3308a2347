pub mod error;
pub mod proposal;
pub mod round;
pub mod unl;

pub use error::ConsensusError;
pub use proposal::Proposal;
pub use round::{ConsensusResult, ConsensusRound, Phase};
pub use unl::UnlConfig;
