use super::config::{resolve_config_path, GatekeeperConfig};
use gatekeeper::settings::ConfigStore;
use std::fmt::Write;

/// Show the stored settings of every guild
///
/// Reads the settings store only; nothing is contacted or changed.
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path);
    let config = GatekeeperConfig::load(&config_path)?;
    let store = ConfigStore::load(config.store_path(&config_path))?;

    println!("📊 Gatekeeper Status");
    println!();
    print!("{}", render(&config, &store));

    Ok(())
}

fn render(config: &GatekeeperConfig, store: &ConfigStore) -> String {
    let mut out = String::new();
    let guilds = store.snapshot();

    let _ = writeln!(out, "Control channel: {}", config.control.channel_id);
    let _ = writeln!(out, "Store: {}", store.path().display());
    let _ = writeln!(out, "Guilds: {}", guilds.len());

    for (id, settings) in &guilds {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Guild {}", id);
        let _ = writeln!(
            out,
            "    Opt in level: {} ({})",
            settings.opt_tier.level(),
            settings.opt_tier.description()
        );
        match settings.log_channel_id {
            Some(channel) => {
                let _ = writeln!(out, "    Logging channel: {}", channel);
            }
            None => {
                let _ = writeln!(out, "    Logging channel: ⚠️ not set");
            }
        }
        if !settings.trusted_issuers.is_empty() {
            let trusted: Vec<String> = settings
                .trusted_issuers
                .iter()
                .map(|u| u.to_string())
                .collect();
            let _ = writeln!(out, "    Trusted users: {}", trusted.join(", "));
        }
    }

    out
}
