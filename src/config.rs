use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable holding the geocoding API key.
pub const MAPS_API_KEY_ENV: &str = "PINPOINT_MAPS_API_KEY";
/// Stand-in used when no key is configured; switches the app into demo mode.
pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub location: LocationConfig,
    pub share: ShareConfig,
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ip,
    Manual,
    Disabled,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub provider: ProviderKind,
    pub consent: bool,         // Location lookups are refused while false
    pub manual_lat: f64,       // Used by the "manual" provider
    pub manual_lon: f64,
    pub ip_lookup_target: String, // Empty string locates our own public address
    pub timeout_seconds: u64,
    pub fallback_lat: f64,     // Map center before any fix arrives
    pub fallback_lon: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShareConfig {
    pub origin: String,
    pub path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub map_span_degrees: f64, // Half-width of the map view around the marker
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_name: String, // Rotated daily, the date is appended
    pub level: String,     // RUST_LOG overrides this when set
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            directory: "logs".to_string(),
            file_name: "pinpoint.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                provider: ProviderKind::Ip,
                consent: true,
                manual_lat: 37.7749,
                manual_lon: -122.4194,
                ip_lookup_target: String::new(),
                timeout_seconds: 15,
                fallback_lat: 20.5937,
                fallback_lon: 78.9629,
            },
            share: ShareConfig {
                origin: "http://localhost:3000".to_string(),
                path: "/tracker".to_string(),
            },
            ui: UiConfig {
                tick_rate_ms: 150,
                map_span_degrees: 2.0,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config file at `path`.
    /// If it doesn't exist, creates a default one.
    ///
    /// Runs before logging is set up (the log location lives in here), so
    /// problems go to stderr while the terminal is still ours.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let config_path = path.as_ref();

        if let Ok(content) = fs::read_to_string(config_path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    eprintln!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(config_path, toml_string).is_err() {
                    eprintln!("Could not write default {} to disk.", config_path.display());
                }
            }
            Err(e) => eprintln!("Could not serialize default config: {}", e),
        }

        default_config
    }
}

/// Reads the geocoding key from the environment. `None` means demo mode.
pub fn maps_api_key() -> Option<String> {
    usable_api_key(std::env::var(MAPS_API_KEY_ENV).ok())
}

/// Treats unset, blank and sentinel keys alike.
pub fn usable_api_key(raw: Option<String>) -> Option<String> {
    let key = raw.unwrap_or_else(|| DEMO_KEY.to_string());
    let key = key.trim();
    if key.is_empty() || key == DEMO_KEY {
        None
    } else {
        Some(key.to_string())
    }
}
