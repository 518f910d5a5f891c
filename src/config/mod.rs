use crate::models::RenameSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the settings file inside the configuration directory.
pub const SETTINGS_FILE_NAME: &str = "autotitle.yaml";

/// Prefix of environment variables that override file settings,
/// e.g. `AUTOTITLE__CHAR_COUNT=80`.
pub const ENV_PREFIX: &str = "AUTOTITLE";

/// Configuration manager for loading and saving rename settings.
///
/// Settings come from `autotitle.yaml` in the configuration directory,
/// overridden by `AUTOTITLE__*` environment variables. The resolved value is
/// clamped before it is handed to the rename pipeline.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE_NAME),
            config_dir,
        })
    }

    /// Load settings from the file and the process environment.
    ///
    /// # Returns
    /// The layered settings, or defaults if neither source sets anything
    pub fn load_settings(&self) -> Result<RenameSettings> {
        self.load_settings_with(environment())
    }

    /// Load settings with an explicit environment source.
    pub fn load_settings_with(&self, env: Environment) -> Result<RenameSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings: RenameSettings = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded settings: header={}, first_line={}, yaml={}, emojis={}, chars={}, interval={}ms, folders={}",
            settings.use_header,
            settings.use_first_line,
            settings.support_yaml,
            settings.include_emojis,
            settings.char_count,
            settings.check_interval,
            settings.include_folders.len()
        );

        Ok(settings.clamped())
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &RenameSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

/// Environment source for `AUTOTITLE__*` overrides.
///
/// `AUTOTITLE__INCLUDE_FOLDERS` takes a comma separated list.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("include_folders")
}
