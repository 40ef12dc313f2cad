use super::config::{resolve_config_path, GatekeeperConfig, LoggingConfig};
use gatekeeper::bot::GatekeeperBot;
use gatekeeper::platform::{ChannelId, Event, Message, UserId, UserInfo};
use gatekeeper::settings::ConfigStore;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Run the relay against the console platform
///
/// The guilds, channels and users described in `[console]` make up an
/// offline chat platform. Each line read from stdin is posted as the
/// console issuer:
/// - `ban:<id>:<reason>` and other plain lines go to the control channel
/// - `#<channel> <text>` posts into that channel, as a guild administrator
///
/// Replies from the relay (and log lines posted to guild log channels) are
/// printed as they are sent.
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided
/// 2. Default config at `~/.config/gatekeeper/config.toml`
///
/// Run `gatekeeper init` first if neither exists.
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path);
    if !config_path.exists() {
        return Err(format!(
            "No config file at '{}'. Run `gatekeeper init` to create one.",
            config_path.display()
        )
        .into());
    }

    let config = GatekeeperConfig::load(&config_path)?;
    init_tracing(&config.logging)?;

    println!("🚀 Starting Gatekeeper relay (console mode)...");
    println!("Config: {}", config_path.display());

    let stdin = BufReader::new(tokio::io::stdin());
    serve(&config, &config_path, stdin, &mut std::io::stdout()).await
}

/// Load the store, start the bot and feed it `input` line by line.
///
/// A corrupt settings store stops here; the relay never starts with an
/// empty table in place of one it could not read.
pub async fn serve<R, W>(
    config: &GatekeeperConfig,
    config_path: &Path,
    input: R,
    output: &mut W,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
    W: std::io::Write,
{
    let store_path = config.store_path(config_path);
    let store = Arc::new(ConfigStore::load(&store_path)?);
    writeln!(output, "Store: {}", store_path.display())?;

    let platform = config.console_platform();
    let bot = GatekeeperBot::new(
        platform.clone(),
        store,
        config.engine_config()?,
        config.surface_config(),
    );

    let created = bot.start().await?;
    writeln!(
        output,
        "✅ Ready: {} guild(s), {} new settings record(s)",
        config.console.guilds.len(),
        created
    )?;
    writeln!(output)?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        platform.clear_history();
        platform.push_event(Event::Message(console_message(config, line)));
        bot.run_until_idle().await?;

        for sent in platform.sent_messages() {
            writeln!(output, "[#{}] {}", sent.channel, sent.content)?;
        }
    }

    Ok(())
}

/// Build the message for one console line
fn console_message(config: &GatekeeperConfig, line: &str) -> Message {
    let control = config.control.channel_id;

    let (channel, text, is_admin) = match line
        .strip_prefix('#')
        .and_then(|rest| rest.split_once(char::is_whitespace))
        .and_then(|(id, text)| id.parse::<u64>().ok().map(|id| (id, text.trim())))
    {
        Some((channel, text)) => (channel, text, true),
        None => (control, line, false),
    };

    Message {
        channel: ChannelId(channel),
        guild: config.console_guild_of(channel),
        author: UserInfo {
            id: UserId(config.console.issuer_id),
            name: config.console.issuer_name.clone(),
        },
        author_is_admin: is_admin,
        text: text.to_string(),
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `[logging] level`.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    // A subscriber installed earlier (e.g. by a test harness) wins
    let _ = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper::platform::GuildId;
    use gatekeeper::settings::OptTier;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> (GatekeeperConfig, std::path::PathBuf) {
        let config_path = dir.path().join("config.toml");
        GatekeeperConfig::create_default(&config_path).unwrap();
        (GatekeeperConfig::load(&config_path).unwrap(), config_path)
    }

    async fn run_lines(
        config: &GatekeeperConfig,
        config_path: &Path,
        input: &str,
    ) -> Result<String, Box<dyn std::error::Error>> {
        let mut output = Vec::new();
        serve(config, config_path, input.as_bytes(), &mut output).await?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_console_directive_prints_summary() {
        let dir = TempDir::new().unwrap();
        let (config, config_path) = write_config(&dir);

        let output = run_lines(&config, &config_path, "ban:12345:spamming\n")
            .await
            .unwrap();

        assert!(output.contains("[#50] Banned mallory (12345) across 2 servers"));
    }

    #[tokio::test]
    async fn test_console_admin_line_changes_settings() {
        let dir = TempDir::new().unwrap();
        let (config, config_path) = write_config(&dir);

        let output = run_lines(&config, &config_path, "#200 g!opt 3\nquit\nban:12345:x\n")
            .await
            .unwrap();

        assert!(output.contains("[#200] Successfully set opt in level to 3"));
        // Nothing after quit is processed
        assert!(!output.contains("Banned"));

        let store = ConfigStore::load(config.store_path(&config_path)).unwrap();
        assert_eq!(store.get(GuildId(2)).opt_tier, OptTier::AllIssuers);
        // Startup reconciliation created both records
        assert!(store.contains(GuildId(1)));
    }

    #[tokio::test]
    async fn test_corrupt_store_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (config, config_path) = write_config(&dir);
        std::fs::write(config.store_path(&config_path), "{ not json").unwrap();

        let result = run_lines(&config, &config_path, "").await;
        assert!(result.is_err());
        // The corrupt file is left for the operator to inspect
        assert_eq!(
            std::fs::read_to_string(config.store_path(&config_path)).unwrap(),
            "{ not json"
        );
    }

    #[tokio::test]
    async fn test_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        let result = execute(Some(path.to_string_lossy().to_string())).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_console_message_routing() {
        let config: GatekeeperConfig =
            toml::from_str(&GatekeeperConfig::generate_default_toml()).unwrap();

        let msg = console_message(&config, "ban:1:spam");
        assert_eq!(msg.channel, ChannelId(50));
        assert_eq!(msg.guild, Some(GuildId(1)));
        assert!(!msg.author_is_admin);

        let msg = console_message(&config, "#200 g!status");
        assert_eq!(msg.channel, ChannelId(200));
        assert_eq!(msg.guild, Some(GuildId(2)));
        assert_eq!(msg.text, "g!status");
        assert!(msg.author_is_admin);
    }
}
