//! # AetherRadio Configuration Module
//!
//! Configuration management for the AetherRadio client engine:
//! - Loading configuration from YAML files
//! - Merging with the embedded default configuration
//! - Environment variable overrides
//! - Typed getters/setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use aerconfig::get_config;
//!
//! let config = get_config();
//!
//! let volume = config.get_playback_volume();
//! config.set_playback_volume(0.42)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::info;

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("aetherradio.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load AetherRadio configuration"));
}

const ENV_CONFIG_DIR: &str = "AETHERRADIO_CONFIG";
const ENV_PREFIX: &str = "AETHERRADIO_CONFIG__";

/// Configuration path of the persisted volume key.
///
/// The value is stored as a decimal string in `[0, 1]` and read back at
/// startup to initialize the audio device before any server data arrives.
pub const VOLUME_KEY: [&str; 2] = ["playback", "volume"];

const DEFAULT_VOLUME: f32 = 1.0;

/// Macro to generate getter/setter for optional string values.
///
/// Empty strings in the YAML tree read back as `None`.
macro_rules! impl_opt_string_config {
    ($getter:ident, $setter:ident, $path:expr) => {
        pub fn $getter(&self) -> Option<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
                _ => None,
            }
        }

        pub fn $setter(&self, value: &str) -> Result<()> {
            self.set_value($path, Value::String(value.to_string()))
        }
    };
}

/// Configuration manager for AetherRadio
///
/// Manages the engine configuration:
/// - Loading configuration from YAML files
/// - Merging with the default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// # Examples
///
/// ```no_run
/// use aerconfig::get_config;
///
/// let config = get_config();
/// let feed = config.get_station_feed_url();
/// println!("Feed URL: {:?}", feed);
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data.lock().unwrap().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".aetherradio").exists() {
            return ".aetherradio".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".aetherradio");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".aetherradio".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("Config path is not a directory"));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        // Test read permission
        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `AETHERRADIO_CONFIG` environment variable
    /// 3. `.aetherradio` in the current directory
    /// 4. `.aetherradio` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for
    /// read/write permissions.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created or validated
    pub fn config_dir(directory: &str) -> String {
        let dir_path = Self::find_config_dir(directory);
        let path = Path::new(&dir_path);

        Self::validate_config_dir(path).expect("Unable to validate the configuration directory");

        dir_path
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory containing the config.yaml file, or empty
    ///   to use defaults
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory);
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file = %path, "Loaded config file");
            data
        } else {
            info!(config_file = %path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Returns the directory holding the configuration file.
    pub fn dir(&self) -> &str {
        &self.config_dir
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["playback", "volume"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()?;
        Ok(())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key);
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["playback", "volume"]`)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the YAML value or an error if the path
    /// doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                let key_path = key
                    .trim_start_matches(ENV_PREFIX)
                    .split("__")
                    .collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        let new_key = Value::String(s.to_lowercase());
                        new_map.insert(new_key, Self::lower_keys_value(v));
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Gets the persisted playback volume in `[0, 1]`
    ///
    /// The volume is stored as a decimal string. Missing or unparseable
    /// values fall back to 1.0; out-of-range values are clamped.
    pub fn get_playback_volume(&self) -> f32 {
        let raw = match self.get_value(&VOLUME_KEY) {
            Ok(Value::String(s)) => s.parse::<f32>().ok(),
            Ok(Value::Number(n)) => n.as_f64().map(|v| v as f32),
            _ => None,
        };
        match raw {
            Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => DEFAULT_VOLUME,
        }
    }

    /// Persists the playback volume, clamped to `[0, 1]`
    ///
    /// The value is written as a decimal string and survives process restart.
    pub fn set_playback_volume(&self, volume: f32) -> Result<()> {
        let clamped = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_VOLUME
        };
        self.set_value(&VOLUME_KEY, Value::String(clamped.to_string()))
    }

    // ========================================================================
    // Station
    // ========================================================================

    impl_opt_string_config!(
        get_station_feed_url,
        set_station_feed_url,
        &["station", "feed_url"]
    );

    impl_opt_string_config!(
        get_station_listen_url,
        set_station_listen_url,
        &["station", "listen_url"]
    );

    // ========================================================================
    // Admin API
    // ========================================================================

    impl_opt_string_config!(get_admin_base_url, set_admin_base_url, &["admin", "base_url"]);

    impl_opt_string_config!(get_admin_token, set_admin_token, &["admin", "token"]);

    // ========================================================================
    // Library (liked tracks collaborator)
    // ========================================================================

    impl_opt_string_config!(
        get_library_base_url,
        set_library_base_url,
        &["library", "base_url"]
    );
}

/// Get the global configuration singleton
///
/// The configuration is loaded on first access and shared afterwards.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        // Scalars and sequences are replaced wholesale
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn volume_defaults_to_full() {
        let (_dir, config) = test_config();
        assert_eq!(config.get_playback_volume(), 1.0);
    }

    #[test]
    fn volume_round_trips_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();

        let config = Config::load_config(path).unwrap();
        config.set_playback_volume(0.42).unwrap();

        // Fresh load simulates a process restart
        let reloaded = Config::load_config(path).unwrap();
        assert_eq!(reloaded.get_playback_volume(), 0.42);
    }

    #[test]
    fn volume_is_clamped_on_write() {
        let (_dir, config) = test_config();
        config.set_playback_volume(3.5).unwrap();
        assert_eq!(config.get_playback_volume(), 1.0);
        config.set_playback_volume(-0.5).unwrap();
        assert_eq!(config.get_playback_volume(), 0.0);
    }

    #[test]
    fn volume_is_stored_as_decimal_string() {
        let (_dir, config) = test_config();
        config.set_playback_volume(0.25).unwrap();
        match config.get_value(&VOLUME_KEY).unwrap() {
            Value::String(s) => assert_eq!(s, "0.25"),
            other => panic!("volume should be stored as a string, got {:?}", other),
        }
    }

    #[test]
    fn empty_urls_read_as_none() {
        let (_dir, config) = test_config();
        assert!(config.get_station_feed_url().is_none());
        assert!(config.get_admin_token().is_none());
    }

    #[test]
    fn url_setters_round_trip() {
        let (_dir, config) = test_config();
        config
            .set_station_feed_url("https://radio.example/api/live/nowplaying/websocket")
            .unwrap();
        assert_eq!(
            config.get_station_feed_url().as_deref(),
            Some("https://radio.example/api/live/nowplaying/websocket")
        );
    }

    #[test]
    fn nested_set_creates_intermediate_maps() {
        let (_dir, config) = test_config();
        config
            .set_value(&["station", "extra", "nested"], Value::String("x".into()))
            .unwrap();
        assert_eq!(
            config.get_value(&["station", "extra", "nested"]).unwrap(),
            Value::String("x".into())
        );
    }
}
