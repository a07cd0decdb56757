use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GrabConfig {
    pub fetch: FetchSettings,
    pub filter: FilterSettings,
    pub download: DownloadSettings,
}

/// Page fetching settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    /// URL used when none is given on the command line (backward compatibility)
    pub fallback_url: String,
}

/// Candidate classification settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterSettings {
    /// Regex patterns matched against the lowercased filename; a hit means
    /// the URL is icon/placeholder noise and is skipped
    pub noise_patterns: Vec<String>,

    /// Exact filenames that are always skipped
    pub skip_filenames: Vec<String>,

    /// Extensions accepted as content images
    pub image_extensions: Vec<String>,
}

/// Download behavior settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadSettings {
    /// Base directory under which the per-page save directory is created
    pub output_dir: PathBuf,

    /// Fixed pause between downloads in seconds
    pub delay_secs: f64,

    /// How many sibling URLs the pattern-guess fallback synthesizes
    pub guess_limit: u32,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings {
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
                timeout_secs: 30,
                fallback_url: "https://example.com/readOnline2.php?ID=156900".to_string(),
            },
            filter: FilterSettings {
                noise_patterns: vec![
                    r"blank\.gif$".to_string(),
                    r"touch-icon".to_string(),
                    r"favicon".to_string(),
                    r"icon\.png$".to_string(),
                    r"^logo\.".to_string(),
                ],
                skip_filenames: vec![
                    "ipad-landscape.png".to_string(),
                    "ipad-portrait.png".to_string(),
                    "iphone.png".to_string(),
                    "sunny.png".to_string(),
                    "sunny_1.png".to_string(),
                ],
                image_extensions: vec![
                    "jpg".to_string(),
                    "jpeg".to_string(),
                    "png".to_string(),
                    "gif".to_string(),
                    "webp".to_string(),
                    "bmp".to_string(),
                    "svg".to_string(),
                ],
            },
            download: DownloadSettings {
                output_dir: PathBuf::from("./downloaded_images"),
                delay_secs: 0.5,
                guess_limit: 12,
            },
        }
    }
}

impl GrabConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let path = if let Some(proj_dirs) = directories::ProjectDirs::from("com", "imgrab", "imgrab")
        {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        path
    }

    /// Load the default configuration, creating it on first run
    pub fn load_default() -> Result<Self> {
        let config_path = Self::config_dir().join("default.yaml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save the configuration to a file
    fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let config = GrabConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let restored: GrabConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(restored.fetch.user_agent, config.fetch.user_agent);
        assert_eq!(restored.filter.noise_patterns, config.filter.noise_patterns);
        assert_eq!(restored.download.output_dir, config.download.output_dir);
        assert_eq!(restored.download.delay_secs, config.download.delay_secs);
    }

    #[test]
    fn load_from_file_reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");

        let mut config = GrabConfig::default();
        config.download.delay_secs = 2.0;
        config.filter.noise_patterns.push("sprite".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = GrabConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.download.delay_secs, 2.0);
        assert!(loaded.filter.noise_patterns.contains(&"sprite".to_string()));
    }
}
