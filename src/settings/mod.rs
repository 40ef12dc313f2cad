//! Guild settings: the per-guild opt tier, trusted issuers and log channel,
//! and the store that persists them.

pub mod guild;
pub mod store;

#[cfg(test)]
mod proptests;

pub use guild::{GuildSettings, OptTier};
pub use store::{ConfigStore, StoreError};
