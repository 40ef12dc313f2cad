use super::config::{resolve_config_path, GatekeeperConfig};
use gatekeeper::settings::ConfigStore;

/// Verify installation integrity
///
/// Checks that the config file parses and validates, and that the
/// settings store loads. A corrupt store fails verification.
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Verifying Gatekeeper installation...");
    println!();

    let mut all_ok = true;

    print!("  Version: ");
    println!("✅ {}", env!("CARGO_PKG_VERSION"));

    let config_path = resolve_config_path(config_path);
    print!("  Config: ");
    let config = match GatekeeperConfig::load(&config_path) {
        Ok(config) => {
            println!("✅ {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            println!("❌ {}", e);
            all_ok = false;
            None
        }
    };

    if let Some(config) = config {
        let store_path = config.store_path(&config_path);
        print!("  Settings store: ");
        match ConfigStore::load(&store_path) {
            Ok(store) => println!(
                "✅ {} ({} guilds)",
                store_path.display(),
                store.snapshot().len()
            ),
            Err(e) => {
                println!("❌ {}", e);
                all_ok = false;
            }
        }
    }

    println!();
    if all_ok {
        println!("✅ All checks passed");
        Ok(())
    } else {
        Err("Verification failed".into())
    }
}
