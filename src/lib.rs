//! Gatekeeper - Cross-Server Moderation Relay
//!
//! A chat bot that relays ban and pardon directives from one designated
//! control channel to every server (guild) it is a member of.
//!
//! Key principles:
//! - Each guild decides how much it trusts the control channel (opt-in tier)
//! - One guild's failure never stops the others
//! - Settings are persisted atomically; a corrupt store is never replaced
//!   with an empty one
//!
//! Modules:
//! - `platform`: capability traits for the chat platform, plus an in-memory
//!   implementation
//! - `settings`: per-guild settings and the persisted store
//! - `relay`: authorization policy and the propagation engine
//! - `commands`: directive grammar, admin commands and message routing
//! - `bot`: the event loop

pub mod bot;
pub mod commands;
pub mod platform;
pub mod relay;
pub mod settings;
