//! `chatforge init`: first-time setup.

use chatforge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("chatforge setup");
    println!("===============\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if !config.data_dir.exists() {
        std::fs::create_dir_all(&config.data_dir)?;
        println!("✅ Created data directory: {}", config.data_dir.display());
    }

    println!("\nNext steps:");
    println!("   chatforge modifiers available");
    println!("   chatforge tools list\n");

    Ok(())
}
