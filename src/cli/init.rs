use super::config::{resolve_config_path, GatekeeperConfig};

/// Write a commented default configuration file
///
/// Refuses to overwrite an existing file unless `force` is set.
pub async fn execute(
    config_path: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path);

    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    GatekeeperConfig::create_default(&config_path)?;

    println!("📝 Created: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set [control] channel_id to your moderator server's ban channel");
    println!("  2. Start the relay with: gatekeeper run");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        execute(Some(config_path.to_string_lossy().to_string()), false)
            .await
            .unwrap();

        assert!(GatekeeperConfig::load(&config_path).is_ok());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[control]\nchannel_id = 1\n").unwrap();

        let path = config_path.to_string_lossy().to_string();
        assert!(execute(Some(path.clone()), false).await.is_err());
        assert_eq!(
            std::fs::read_to_string(&config_path).unwrap(),
            "[control]\nchannel_id = 1\n"
        );

        execute(Some(path), true).await.unwrap();
        let config = GatekeeperConfig::load(&config_path).unwrap();
        assert_eq!(config.control.channel_id, 50);
    }
}
