use crate::domain::config::{ReplMuxConfig, SerialPortConfig};
use crate::domain::error::{ReplMuxError, ReplMuxResult};
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT_DIR: &str = ".replmux";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> ReplMuxResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> ReplMuxResult<ReplMuxConfig> {
        let mut config = ReplMuxConfig::default();

        if self.global_config_path.exists() {
            config = self.load_config_from_path(&self.global_config_path)?;
        }

        // Project files pick the console and listener; serial ports accumulate
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = self.load_config_from_path(project_path)?;
                config.console = project_config.console;
                config.listener = project_config.listener;
                config.serial.extend(project_config.serial);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> ReplMuxResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| ReplMuxError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("replmux").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> ReplMuxResult<ReplMuxConfig> {
        let content = fs::read_to_string(path).map_err(|e| ReplMuxError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: ReplMuxConfig = toml::from_str(&content).map_err(|e| ReplMuxError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &ReplMuxConfig) -> ReplMuxResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ReplMuxError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| ReplMuxError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| ReplMuxError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration
    pub fn init_project_config(&self, path: &Path) -> ReplMuxResult<PathBuf> {
        let config_file = path.join(PROJECT_DIR).join(CONFIG_FILE);

        if config_file.exists() {
            return Err(ReplMuxError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        let mut example = ReplMuxConfig::default();
        example.serial.push(SerialPortConfig::new("/dev/ttyACM0", 115_200));

        self.save_config_to_path(&config_file, &example)?;
        Ok(config_file)
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}
