//! 3DS2 challenge orchestration
//!
//! The cryptographic challenge engine is an external collaborator; this
//! module owns creating a transaction from directory-server material,
//! driving the challenge to its single terminal outcome, and emitting
//! exactly one finalize relay per attempt.

pub mod engine;
pub mod orchestrator;

pub use engine::{
    AuthRequestParams, ChallengeEngine, ChallengeOutcome, ChallengeParameters,
    ChallengeTransaction, ChallengeUiType, TransactionCreateError, TransactionRequest,
};
pub use orchestrator::{ChallengeFlow, FlowHandle};
