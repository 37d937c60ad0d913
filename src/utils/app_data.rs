use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "authdex";
const CONFIG_FILE: &str = "config.json";
const INDEX_DIR: &str = "index";

/// Engine configuration, stored as JSON in the app data directory.
///
/// The T-occurrence thresholds trade recall for precision and are tuned per
/// deployment, so they stay configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Length of the q-grams used by the inverted index
    #[serde(default = "default_qgram_len")]
    pub qgram_len: usize,

    /// Share of a query's inverted lists that seed the intersection
    #[serde(default = "default_matching_qgrams_percentage")]
    pub matching_qgrams_percentage: f64,

    /// Keep narrowing only while the candidate pool is at least this large
    #[serde(default = "default_max_result_cardinality")]
    pub max_result_cardinality: usize,

    /// A narrowing step is accepted only if the pool stays above this size
    #[serde(default = "default_min_result_cardinality")]
    pub min_result_cardinality: usize,

    /// Minimum surname similarity for a retrieved string to be kept
    #[serde(default = "default_surname_threshold")]
    pub surname_threshold: f64,

    /// Entries kept by the memoizing name normalizer
    #[serde(default = "default_normalizer_cache_size")]
    pub normalizer_cache_size: usize,
}

fn default_qgram_len() -> usize {
    2
}

fn default_matching_qgrams_percentage() -> f64 {
    0.8
}

fn default_max_result_cardinality() -> usize {
    35
}

fn default_min_result_cardinality() -> usize {
    10
}

fn default_surname_threshold() -> f64 {
    0.9
}

fn default_normalizer_cache_size() -> usize {
    4096
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            qgram_len: default_qgram_len(),
            matching_qgrams_percentage: default_matching_qgrams_percentage(),
            max_result_cardinality: default_max_result_cardinality(),
            min_result_cardinality: default_min_result_cardinality(),
            surname_threshold: default_surname_threshold(),
            normalizer_cache_size: default_normalizer_cache_size(),
        }
    }
}

impl EngineConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from the app data directory, or return default if not found
    pub fn load_default() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.qgram_len == 0 {
            bail!("qgram_len must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.matching_qgrams_percentage) {
            bail!(
                "matching_qgrams_percentage must be within [0, 1], got {}",
                self.matching_qgrams_percentage
            );
        }
        if self.min_result_cardinality > self.max_result_cardinality {
            bail!(
                "min_result_cardinality ({}) exceeds max_result_cardinality ({})",
                self.min_result_cardinality,
                self.max_result_cardinality
            );
        }
        Ok(())
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Default directory holding the persisted index generation
pub fn get_index_dir() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(INDEX_DIR))
}
