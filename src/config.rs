//! Project configuration.
//!
//! Handles loading, validating, and merging `folio.toml`. Stock defaults are
//! serialized to a TOML table, the user's file is merged on top, and the
//! result is deserialized and validated. Every key is optional.
//!
//! ## Configuration Options
//!
//! ```toml
//! [content]
//! # api_endpoint = "https://my-repo.cdn.prismic.io/api/v2"
//! # repository_name = "my-repo"
//! collection_type = "collection"
//! image_type = "image_asset"
//! lang = "*"
//! page_size = 100
//! timeout = "30s"
//!
//! [images]
//! base_widths = [480, 640, 768, 960, 1024, 1280, 1440, 1536, 1600, 1920]
//! max_width = 3840
//! quality = 82
//! url_prefix = "/i"
//!
//! [output]
//! image_root = "public/i"
//! manifest_path = "generated/image-manifest.json"
//!
//! [processing]
//! # max_processes = 4
//!
//! [viewer]
//! idle_delay = "25s"
//! interval = "6s"
//! max_attempts = 10
//! sizes = "100vw"
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Content endpoint
//!
//! The CMS endpoint is the one piece of configuration the build cannot run
//! without. [`resolve_endpoint`] looks for it on the command line / in the
//! environment, then in `folio.toml`, then in the Slice Machine project files
//! (`slicemachine.config.json`, `sm.json`), and finally derives it from a
//! repository name.

use crate::imaging::{EncodeSettings, Quality, width_preset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Name of the project config file.
pub const CONFIG_FILENAME: &str = "folio.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error(
        "Unable to determine the content API endpoint. Set PRISMIC_API_ENDPOINT or a repository name."
    )]
    MissingEndpoint,
}

/// Root configuration loaded from `folio.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioConfig {
    /// Where the content documents come from.
    pub content: ContentConfig,
    /// Derivative widths and encoding.
    pub images: ImagesConfig,
    /// Where derivatives and the manifest are written.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Viewer timings and defaults.
    pub viewer: ViewerConfig,
}

impl FolioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.base_widths.is_empty() {
            return Err(ConfigError::Validation(
                "images.base_widths must not be empty".into(),
            ));
        }
        if self.images.max_width == 0 {
            return Err(ConfigError::Validation(
                "images.max_width must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.content.page_size) {
            return Err(ConfigError::Validation(
                "content.page_size must be 1-100".into(),
            ));
        }
        if self.viewer.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "viewer.max_attempts must be at least 1".into(),
            ));
        }
        if self.viewer.interval.is_zero() {
            return Err(ConfigError::Validation(
                "viewer.interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Content source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Full API endpoint, e.g. `https://my-repo.cdn.prismic.io/api/v2`.
    pub api_endpoint: Option<String>,
    /// Repository name used to derive the endpoint when none is given.
    pub repository_name: Option<String>,
    /// Custom type of collection documents.
    pub collection_type: String,
    /// Custom type of image asset documents.
    pub image_type: String,
    /// Language filter passed to the API (`*` = all locales).
    pub lang: String,
    /// Documents per API page (the API caps this at 100).
    pub page_size: u32,
    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            repository_name: None,
            collection_type: "collection".to_string(),
            image_type: "image_asset".to_string(),
            lang: "*".to_string(),
            page_size: 100,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Derivative generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Base ladder; each width is also generated doubled for high-density displays.
    pub base_widths: Vec<u32>,
    /// Hard cap on any generated width.
    pub max_width: u32,
    /// JPEG quality (1-100).
    pub quality: u32,
    /// Public URL prefix that maps onto `output.image_root`.
    pub url_prefix: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            base_widths: vec![480, 640, 768, 960, 1024, 1280, 1440, 1536, 1600, 1920],
            max_width: 3840,
            quality: 82,
            url_prefix: "/i".to_string(),
        }
    }
}

impl ImagesConfig {
    /// Ascending preset of widths the pipeline attempts.
    pub fn preset(&self) -> Vec<u32> {
        width_preset(&self.base_widths, self.max_width)
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            quality: Quality::new(self.quality),
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory that receives derivative files. Cleared on every build.
    pub image_root: PathBuf,
    /// Where the manifest JSON is written.
    pub manifest_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image_root: PathBuf::from("public/i"),
            manifest_path: PathBuf::from("generated/image-manifest.json"),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Gallery viewer timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Inactivity before the screensaver starts.
    #[serde(with = "humantime_serde")]
    pub idle_delay: Duration,
    /// Time between screensaver advances.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Random draws allowed when looking for a different image.
    pub max_attempts: u32,
    /// Default `sizes` hint for responsive sources.
    pub sizes: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            idle_delay: Duration::from_secs(25),
            interval: Duration::from_secs(6),
            max_attempts: 10,
            sizes: "100vw".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(FolioConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` when the file is absent.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<FolioConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: FolioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `folio.toml` from the given path, falling back to stock defaults.
pub fn load_config(path: &Path) -> Result<FolioConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

// =============================================================================
// Endpoint resolution
// =============================================================================

/// Endpoint settings supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
    pub api_endpoint: Option<String>,
    pub repository_name: Option<String>,
}

/// The subset of a Slice Machine project file we care about.
#[derive(Debug, Default, PartialEq)]
struct ProjectFile {
    repository_name: Option<String>,
    api_endpoint: Option<String>,
}

/// Read `name` under `dir` as a loose JSON object. Missing files are silent;
/// unreadable or malformed ones are reported and ignored.
fn read_project_file(dir: &Path, name: &str) -> ProjectFile {
    let path = dir.join(name);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ProjectFile::default(),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "unable to read project file");
            return ProjectFile::default();
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "unable to parse project file");
            return ProjectFile::default();
        }
    };
    let field = |key: &str| {
        value
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    ProjectFile {
        repository_name: field("repositoryName"),
        api_endpoint: field("apiEndpoint"),
    }
}

/// Default CDN endpoint for a repository.
pub fn endpoint_for_repository(repository: &str) -> String {
    format!("https://{repository}.cdn.prismic.io/api/v2")
}

/// Determine the content API endpoint. First match wins:
///
/// 1. `overrides.api_endpoint` (CLI flag / `PRISMIC_API_ENDPOINT`)
/// 2. `content.api_endpoint` in `folio.toml`
/// 3. `apiEndpoint` in `slicemachine.config.json`, then in `sm.json`
/// 4. a repository name (overrides → config → `slicemachine.config.json` →
///    `sm.json`), expanded with [`endpoint_for_repository`]
pub fn resolve_endpoint(
    overrides: &EndpointOverrides,
    content: &ContentConfig,
    project_dir: &Path,
) -> Result<String, ConfigError> {
    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    if let Some(endpoint) = non_empty(&overrides.api_endpoint).or_else(|| non_empty(&content.api_endpoint)) {
        return Ok(endpoint);
    }

    let slicemachine = read_project_file(project_dir, "slicemachine.config.json");
    if let Some(endpoint) = slicemachine.api_endpoint {
        return Ok(endpoint);
    }
    let sm = read_project_file(project_dir, "sm.json");
    if let Some(endpoint) = sm.api_endpoint {
        return Ok(endpoint);
    }

    non_empty(&overrides.repository_name)
        .or_else(|| non_empty(&content.repository_name))
        .or(slicemachine.repository_name)
        .or(sm.repository_name)
        .map(|repo| endpoint_for_repository(&repo))
        .ok_or(ConfigError::MissingEndpoint)
}

/// Returns a fully-commented stock `folio.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Content source
# ---------------------------------------------------------------------------
[content]
# Full API endpoint. Can also be set with PRISMIC_API_ENDPOINT or --api-endpoint.
# api_endpoint = "https://my-repo.cdn.prismic.io/api/v2"

# Repository name, used to derive the endpoint when none is given.
# Can also be set with PRISMIC_REPOSITORY_NAME or --repository.
# repository_name = "my-repo"

# Custom types holding collections and image assets.
collection_type = "collection"
image_type = "image_asset"

# Locale filter ("*" = all locales).
lang = "*"

# Documents per API page (max 100).
page_size = 100

# Per-request timeout.
timeout = "30s"

# ---------------------------------------------------------------------------
# Derivatives
# ---------------------------------------------------------------------------
[images]
# Base width ladder. Each width is also generated doubled (for 2x displays).
base_widths = [480, 640, 768, 960, 1024, 1280, 1440, 1536, 1600, 1920]

# No derivative is ever wider than this.
max_width = 3840

# JPEG quality (1 = worst, 100 = best).
quality = 82

# Public URL prefix for derivative files.
url_prefix = "/i"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Derivative files. This directory is deleted and recreated on every build.
image_root = "public/i"

# The manifest consumed at render time.
manifest_path = "generated/image-manifest.json"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Viewer
# ---------------------------------------------------------------------------
[viewer]
# Inactivity before the screensaver starts.
idle_delay = "25s"

# Time between screensaver advances.
interval = "6s"

# Random draws allowed when picking a different image.
max_attempts = 10

# Default sizes hint for responsive sources.
sizes = "100vw"
"##
}
