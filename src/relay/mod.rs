//! Relay core: the authorization policy and the propagation engine that
//! fans one ban/pardon out across every guild.

pub mod engine;
pub mod policy;
pub mod report;

pub use engine::{EngineConfig, PropagationEngine, RelayError};
pub use policy::{decide, Decision};
pub use report::{
    ActionKind, ActionRequest, GuildOutcome, OutcomeDecision, PropagationReport,
    DEFAULT_DELETE_MESSAGE_DAYS,
};
