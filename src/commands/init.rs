use anyhow::Result;
use std::env;
use std::path::PathBuf;
use unrealpack::{PackConfig, PluginManifest, CONFIG_FILE_NAME};

pub fn run(path: Option<String>, force: bool) -> Result<()> {
    let plugin_dir = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        env::current_dir()?
    };

    if !plugin_dir.is_dir() {
        anyhow::bail!("Plugin directory does not exist: {}", plugin_dir.display());
    }

    // Check if unrealpack.toml already exists
    if plugin_dir.join(CONFIG_FILE_NAME).exists() && !force {
        println!("✓ {} already exists in this directory", CONFIG_FILE_NAME);
        println!();
        println!(
            "To reinitialize, run 'unrealpack init --force' or delete {}.",
            CONFIG_FILE_NAME
        );
        return Ok(());
    }

    println!("Initializing UnrealPack config...");
    println!();

    let mut config = PackConfig::default();

    // Try to find the .uplugin file
    match PluginManifest::find(&plugin_dir) {
        Ok(uplugin_path) => {
            let plugin_name =
                PluginManifest::name(&uplugin_path).unwrap_or_else(|| "Plugin".to_string());
            println!("✓ Found plugin: {}", plugin_name);

            if let Ok(manifest) = PluginManifest::load(&uplugin_path) {
                if let Ok(version_name) = manifest.version_name() {
                    println!("  Version: {}", version_name);
                }
            }

            if let Some(file_name) = uplugin_path.file_name().and_then(|n| n.to_str()) {
                config.manifest_file = Some(file_name.to_string());
            }
        }
        Err(e) => {
            println!("⚠ {}", e);
            println!("  Set manifest_file in {} before packing.", CONFIG_FILE_NAME);
        }
    }

    config.save(&plugin_dir)?;

    println!();
    println!("✓ Created {}", CONFIG_FILE_NAME);
    println!();
    println!("Next steps:");
    println!("  • Set product_name and target_versions for your plugin");
    println!("  • Preview the output: unrealpack pack --dry-run");
    println!();

    Ok(())
}
