//! Configuration management for posmix.
//!
//! This module provides a configuration system that allows users to customize
//! program behavior through INI-format configuration files. The system supports
//! hierarchical configuration with the following precedence:
//!
//! 1. Local configuration (`./posmix_config.cfg`)
//! 2. User configuration (`~/.config/posmix/posmix_config.cfg`)
//! 3. System configuration (`/etc/posmix/posmix_config.cfg`)
//! 4. Built-in defaults
//!
//! Each layer only overrides the keys it actually sets.
//!
//! # Configuration File Format
//!
//! ```ini
//! [mixing]
//! tolerance = 1e-4
//! method = isometric
//! parallel = false
//!
//! [output]
//! poscar_name = POSCAR
//! folder_prefix = eta=
//! precision = 3
//! write_manifest = true
//!
//! [logging]
//! level = info
//! file_logging = false
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use posmix::settings::SettingsManager;
//!
//! let settings = SettingsManager::load()?;
//! println!("Tolerance: {}", settings.mixing().tolerance);
//! # Ok::<(), posmix::settings::ConfigError>(())
//! ```

use crate::fraction::MixMethod;
use crate::mixing::PERIODIC_TOLERANCE;
use crate::naming::FractionNaming;
use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the settings file looked up in each configuration directory.
pub const CONFIG_FILE_NAME: &str = "posmix_config.cfg";

type Section = HashMap<String, Option<String>>;

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    /// Template target already exists
    #[error("Refusing to overwrite existing file: {0}")]
    FileExists(String),
}

/// Main configuration structure containing all program settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Interpolation settings
    pub mixing: MixingSettings,
    /// Output layout settings
    pub output: OutputSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Interpolation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixingSettings {
    /// Minimum-image snapping tolerance (default: 1e-4)
    pub tolerance: f64,
    /// Fraction strategy used when the command line does not pick one
    /// (default: isometric)
    pub method: MixMethod,
    /// Generate structures on the rayon thread pool (default: false)
    pub parallel: bool,
}

impl Default for MixingSettings {
    fn default() -> Self {
        Self {
            tolerance: PERIODIC_TOLERANCE,
            method: MixMethod::Isometric,
            parallel: false,
        }
    }
}

/// Output layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// File name of the structure written in each folder (default: "POSCAR")
    pub poscar_name: String,
    /// Prefix of the per-fraction folder names (default: "eta=")
    pub folder_prefix: String,
    /// Decimals of the fraction in folder names (default: 3)
    pub precision: usize,
    /// Write `mixing_manifest.json` after a run (default: true)
    pub write_manifest: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            poscar_name: "POSCAR".to_string(),
            folder_prefix: "eta=".to_string(),
            precision: 3,
            write_manifest: true,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
    /// Enable file-based logging (default: false)
    /// When enabled, log output goes to posmix_debug.log instead of the console
    pub file_logging: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
        }
    }
}

impl OutputSettings {
    /// Folder naming scheme described by these settings.
    pub fn naming(&self) -> FractionNaming {
        FractionNaming::new(self.folder_prefix.clone(), self.precision)
    }
}

/// Configuration manager that loads and provides access to settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the hierarchical configuration files.
    ///
    /// Files that exist but fail to parse are skipped with a warning.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let candidates = [
            ("system", Self::get_system_config_path()),
            ("user", Self::get_user_config_path()),
            ("local", Some(PathBuf::from(CONFIG_FILE_NAME))),
        ];

        for (label, path) in candidates {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let mut layered = settings.clone();
            match Self::apply_config(&mut layered, &path) {
                Ok(()) => {
                    settings = layered;
                    config_source = format!("{} config ({})", label, path.display());
                    debug!("Loaded {} configuration from: {}", label, path.display());
                }
                Err(e) => {
                    warn!(
                        "Failed to load {} config from {}: {}",
                        label,
                        path.display(),
                        e
                    );
                }
            }
        }

        info!("Configuration loaded from: {}", config_source);
        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Loads a single configuration file on top of the built-in defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        Self::apply_config(&mut settings, path)?;
        Ok(Self {
            settings,
            config_source: format!("{}", path.display()),
        })
    }

    /// Wraps already-built settings.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            config_source: "built-in defaults".to_string(),
        }
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Returns the complete settings structure.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the `[mixing]` section.
    pub fn mixing(&self) -> &MixingSettings {
        &self.settings.mixing
    }

    /// Returns the `[output]` section.
    pub fn output(&self) -> &OutputSettings {
        &self.settings.output
    }

    /// Returns the `[logging]` section.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Applies the keys present in `path` to `settings`.
    fn apply_config(settings: &mut Settings, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::apply_str(settings, &content)
    }

    fn apply_str(settings: &mut Settings, content: &str) -> Result<(), ConfigError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;
        let map = ini.get_map_ref();

        if let Some(section) = map.get("mixing") {
            Self::parse_mixing(&mut settings.mixing, section)?;
        }
        if let Some(section) = map.get("output") {
            Self::parse_output(&mut settings.output, section)?;
        }
        if let Some(section) = map.get("logging") {
            Self::parse_logging(&mut settings.logging, section)?;
        }
        Ok(())
    }

    fn parse_mixing(mixing: &mut MixingSettings, section: &Section) -> Result<(), ConfigError> {
        if let Some(Some(tolerance)) = section.get("tolerance") {
            let value: f64 = tolerance.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("Invalid tolerance: {}", tolerance))
            })?;
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "tolerance must be in (0, 1), got {}",
                    tolerance
                )));
            }
            mixing.tolerance = value;
        }
        if let Some(Some(method)) = section.get("method") {
            mixing.method = method
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("{}", e)))?;
        }
        if let Some(Some(parallel)) = section.get("parallel") {
            mixing.parallel = parse_bool("parallel", parallel)?;
        }
        Ok(())
    }

    fn parse_output(output: &mut OutputSettings, section: &Section) -> Result<(), ConfigError> {
        if let Some(Some(poscar_name)) = section.get("poscar_name") {
            if poscar_name.is_empty() || poscar_name.contains(|c: char| c == '/' || c == '\\') {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid poscar_name: '{}'",
                    poscar_name
                )));
            }
            output.poscar_name = poscar_name.clone();
        }
        if let Some(Some(prefix)) = section.get("folder_prefix") {
            output.folder_prefix = prefix.clone();
        }
        if let Some(Some(precision)) = section.get("precision") {
            output.precision = precision.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("Invalid precision: {}", precision))
            })?;
        }
        if let Some(Some(write_manifest)) = section.get("write_manifest") {
            output.write_manifest = parse_bool("write_manifest", write_manifest)?;
        }
        Ok(())
    }

    fn parse_logging(logging: &mut LoggingSettings, section: &Section) -> Result<(), ConfigError> {
        if let Some(Some(level)) = section.get("level") {
            let level = level.to_lowercase();
            if !["off", "error", "warn", "info", "debug", "trace"].contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid log level: {}",
                    level
                )));
            }
            logging.level = level;
        }
        if let Some(Some(file_logging)) = section.get("file_logging") {
            logging.file_logging = parse_bool("file_logging", file_logging)?;
        }
        Ok(())
    }

    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/posmix").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("posmix").join(CONFIG_FILE_NAME))
        }
        #[cfg(not(any(unix, windows)))]
        {
            None
        }
    }

    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("posmix")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("posmix").join(CONFIG_FILE_NAME))
        }
        #[cfg(not(any(unix, windows)))]
        {
            None
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "Invalid {} value: {}",
            key, value
        ))),
    }
}

impl SettingsManager {
    /// Writes a commented settings template with the built-in defaults.
    ///
    /// Refuses to overwrite an existing file.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::FileExists(path.display().to_string()));
        }
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let defaults = Settings::default();
        format!(
            r#"# posmix Configuration File
#
# Configuration files are loaded in hierarchical order with local settings taking precedence:
#
# 1. Current working directory (./posmix_config.cfg) - highest priority
# 2. User config directory (~/.config/posmix/posmix_config.cfg on Unix, %APPDATA%/posmix/posmix_config.cfg on Windows)
# 3. System config directory (/etc/posmix/posmix_config.cfg on Unix, %PROGRAMDATA%/posmix/posmix_config.cfg on Windows)
# 4. Built-in defaults (fallback)
#
# Any missing sections or values will use the built-in defaults shown below.

[mixing]
# Minimum-image tolerance (default: 1e-4)
# Displacement components within this distance of +1 or -1 are treated as
# crossing the periodic boundary and snapped back by one cell
tolerance = {:e}

# Fraction strategy when --method is not given: isometric or arbitrary (default: isometric)
method = {}

# Build the mixed structures in parallel (default: false)
parallel = {}

[output]
# Structure file name inside each fraction folder (default: POSCAR)
poscar_name = {}

# Fraction folder prefix (default: eta=)
folder_prefix = {}

# Decimals of the fraction in folder names (default: 3)
precision = {}

# Write mixing_manifest.json next to the folders (default: true)
write_manifest = {}

[logging]
# Log level: off, error, warn, info, debug, trace (default: info)
level = {}

# Send log output to posmix_debug.log instead of the console (default: false)
file_logging = {}
"#,
            defaults.mixing.tolerance,
            defaults.mixing.method,
            defaults.mixing.parallel,
            defaults.output.poscar_name,
            defaults.output.folder_prefix,
            defaults.output.precision,
            defaults.output.write_manifest,
            defaults.logging.level,
            defaults.logging.file_logging,
        )
    }
}
