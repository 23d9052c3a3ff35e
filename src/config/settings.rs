use anyhow::Result;
use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "FolderViewer";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "folderviewer", APP_NAME).map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_file_path().ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the configuration from `path`, or from the platform config file.
///
/// A missing file is created with defaults. A file that no longer parses is
/// migrated by filling in missing fields; if that fails too, the defaults
/// are used and a warning is logged.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_path(path)?;

    if !config_path.exists() {
        tracing::info!("Config file not found, creating default config at {:?}", config_path);
        let default_config = AppConfig::default();
        save_config(&default_config, Some(config_path.as_path()))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;

    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Trying to migrate it.",
                config_path,
                e
            );
            migrate_legacy_config(&config_content).or_else(|e| {
                tracing::warn!("Config migration failed: {}. Falling back to default config.", e);
                Ok(AppConfig::default())
            })
        }
    }
}

/// Fills fields missing from an older or hand-edited config with defaults.
fn migrate_legacy_config(config_content: &str) -> Result<AppConfig> {
    let mut value: Value = serde_json::from_str(config_content)?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Config is not a JSON object"))?;

    let defaults = serde_json::to_value(AppConfig::default())?;
    if let Value::Object(default_fields) = defaults {
        for (key, default_val) in default_fields {
            if obj.get(&key).map_or(true, Value::is_null) {
                obj.insert(key, default_val);
            }
        }
    }

    let migrated_config: AppConfig = serde_json::from_value(value)?;
    tracing::info!("Successfully migrated legacy config");
    Ok(migrated_config)
}

/// Saves the configuration to `path`, or to the platform config file.
pub fn save_config(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

/// Exports the configuration to a user-specified JSON file.
pub fn export_config(config: &AppConfig, export_path: &Path) -> Result<()> {
    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(export_path, config_json)?;
    tracing::info!("Exported config to {:?}", export_path);
    Ok(())
}

/// Imports a configuration from a user-specified JSON file.
pub fn import_config(import_path: &Path) -> Result<AppConfig> {
    let config_content = fs::read_to_string(import_path)?;
    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Imported config from {:?}", import_path);
            Ok(config)
        }
        Err(_) => {
            tracing::info!("Importing legacy config format from {:?}", import_path);
            migrate_legacy_config(&config_content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SortKey, SortOrder};
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AppConfig {
            default_sort_key: SortKey::Size,
            default_sort_order: SortOrder::Descending,
            rename_pattern: "img_#".to_string(),
            ..AppConfig::default()
        };

        save_config(&config, Some(path.as_path())).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_partial_config_is_migrated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "follow_links": true, "rename_pattern": null }"#).unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert!(config.follow_links);
        assert_eq!(config.rename_pattern, "$N_#");
        assert!(config.expand_all_on_load);
    }

    #[test]
    fn test_corrupt_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "not json at all").unwrap();

        assert_eq!(load_config(Some(path.as_path())).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_export_and_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exported.json");
        let config = AppConfig {
            keep_empty_root: true,
            ..AppConfig::default()
        };

        export_config(&config, &path).unwrap();
        assert_eq!(import_config(&path).unwrap(), config);

        fs::write(&path, r#"{ "progress_interval": 5 }"#).unwrap();
        assert_eq!(import_config(&path).unwrap().progress_interval, 5);
    }
}
