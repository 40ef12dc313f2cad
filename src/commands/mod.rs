//! Inbound command handling: the control-channel directive grammar, the
//! per-guild admin commands, and the surface that routes messages to them.

pub mod admin;
pub mod directive;
pub mod refs;
pub mod surface;

#[cfg(test)]
mod proptests;

pub use admin::{parse_admin_command, AdminCommand, AdminError};
pub use directive::{
    looks_like_directive, names_action, parse_directive, DirectiveError, FORMAT_HINT,
};
pub use refs::{parse_channel_ref, parse_user_ref};
pub use surface::{CommandSurface, SurfaceConfig, DEFAULT_COMMAND_PREFIX};
