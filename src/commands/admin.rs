//! Per-guild administrative commands.
//!
//! Commands (after the configured prefix, e.g. `g!`):
//! - `opt <1|2|3>`
//! - `logging <#channel|off>`
//! - `trust <@user>...`
//! - `untrust <@user>...`
//! - `status`
//!
//! Parsing only; execution lives in `CommandSurface`.

use super::refs::{parse_channel_ref, parse_user_ref};
use crate::platform::{ChannelId, UserId};

/// Parsed administrative command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Set opt-in level. Range is checked on execution so the reply can
    /// explain the levels.
    Opt { level: i64 },

    /// Set (or clear) the log channel
    Logging { channel: Option<ChannelId> },

    /// Add trusted issuers
    Trust { users: Vec<UserId> },

    /// Remove trusted issuers
    Untrust { users: Vec<UserId> },

    /// Show this guild's configuration and permission warnings
    Status,
}

impl AdminCommand {
    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::Opt { .. } => "opt",
            AdminCommand::Logging { .. } => "logging",
            AdminCommand::Trust { .. } => "trust",
            AdminCommand::Untrust { .. } => "untrust",
            AdminCommand::Status => "status",
        }
    }
}

/// Admin command parse errors (rendered straight back to the admin)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{0} is missing arguments")]
    MissingArgument(&'static str),

    #[error("Did not recognize the {argument} argument")]
    BadArgument {
        command: &'static str,
        argument: &'static str,
    },
}

/// Parse the text after the command prefix.
///
/// Command names are case-insensitive.
pub fn parse_admin_command(body: &str) -> Result<AdminCommand, AdminError> {
    let mut parts = body.split_whitespace();
    let name = parts.next().unwrap_or("").to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    match name.as_str() {
        "opt" => {
            let raw = args.first().ok_or(AdminError::MissingArgument("opt"))?;
            let level = raw.parse::<i64>().map_err(|_| AdminError::BadArgument {
                command: "opt",
                argument: "level",
            })?;
            Ok(AdminCommand::Opt { level })
        }
        "logging" => {
            let raw = args.first().ok_or(AdminError::MissingArgument("logging"))?;
            if raw.eq_ignore_ascii_case("off") || raw.eq_ignore_ascii_case("none") {
                return Ok(AdminCommand::Logging { channel: None });
            }
            let channel = parse_channel_ref(raw).ok_or(AdminError::BadArgument {
                command: "logging",
                argument: "channel",
            })?;
            Ok(AdminCommand::Logging {
                channel: Some(channel),
            })
        }
        "trust" => Ok(AdminCommand::Trust {
            users: parse_users("trust", &args)?,
        }),
        "untrust" => Ok(AdminCommand::Untrust {
            users: parse_users("untrust", &args)?,
        }),
        "status" => Ok(AdminCommand::Status),
        other => Err(AdminError::UnknownCommand(other.to_string())),
    }
}

fn parse_users(command: &'static str, args: &[&str]) -> Result<Vec<UserId>, AdminError> {
    if args.is_empty() {
        return Err(AdminError::MissingArgument(command));
    }

    let mut users = Vec::with_capacity(args.len());
    for arg in args {
        let user = parse_user_ref(arg).ok_or(AdminError::BadArgument {
            command,
            argument: "users",
        })?;
        if !users.contains(&user) {
            users.push(user);
        }
    }
    Ok(users)
}

/// Reply for an out-of-range `opt` level
pub fn opt_levels_help() -> String {
    "Not a valid opt in level. Levels are:\n\
     ```\n\
     1. Only logging - no bans\n\
     2. Bans from trusted users only\n\
     3. Bans from all users in the moderator server\n\
     ```"
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opt() {
        assert_eq!(
            parse_admin_command("opt 2"),
            Ok(AdminCommand::Opt { level: 2 })
        );
        // Range is checked later
        assert_eq!(
            parse_admin_command("OPT 9"),
            Ok(AdminCommand::Opt { level: 9 })
        );
        assert_eq!(
            parse_admin_command("opt two"),
            Err(AdminError::BadArgument {
                command: "opt",
                argument: "level"
            })
        );
        assert_eq!(
            parse_admin_command("opt"),
            Err(AdminError::MissingArgument("opt"))
        );
    }

    #[test]
    fn test_parse_logging() {
        assert_eq!(
            parse_admin_command("logging <#555>"),
            Ok(AdminCommand::Logging {
                channel: Some(ChannelId(555))
            })
        );
        assert_eq!(
            parse_admin_command("logging off"),
            Ok(AdminCommand::Logging { channel: None })
        );
        assert!(parse_admin_command("logging #general").is_err());
    }

    #[test]
    fn test_parse_trust_dedups() {
        assert_eq!(
            parse_admin_command("trust <@1> 2 <@!1>"),
            Ok(AdminCommand::Trust {
                users: vec![UserId(1), UserId(2)]
            })
        );
    }

    #[test]
    fn test_parse_untrust_requires_users() {
        assert_eq!(
            parse_admin_command("untrust"),
            Err(AdminError::MissingArgument("untrust"))
        );
        assert_eq!(
            parse_admin_command("untrust bob"),
            Err(AdminError::BadArgument {
                command: "untrust",
                argument: "users"
            })
        );
    }

    #[test]
    fn test_parse_status_and_unknown() {
        assert_eq!(parse_admin_command("status"), Ok(AdminCommand::Status));
        assert_eq!(
            parse_admin_command("frobnicate"),
            Err(AdminError::UnknownCommand("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AdminError::MissingArgument("trust").to_string(),
            "trust is missing arguments"
        );
        assert_eq!(
            AdminError::BadArgument {
                command: "opt",
                argument: "level"
            }
            .to_string(),
            "Did not recognize the level argument"
        );
    }
}
