use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::labels::LabelErrorPolicy;

/// Environment variable naming a config file to use instead of the default location.
pub const CONFIG_ENV: &str = "PODORDERS_CONFIG";
pub const DEFAULT_IMAGE_BASE: &str = "./images";
pub const DEFAULT_GALLERY_OUTPUT: &str = "data.json";
pub const DEFAULT_IMAGE_PREFIX: &str = "image";
pub const DEFAULT_LABEL_PREFIX: &str = "label";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("missing required setting `{key}` (pass {flag} or set it in the config file)")]
    Missing {
        key: &'static str,
        flag: &'static str,
    },
}

/// Contents of `config.toml`. Every key is optional; command-line flags win.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub orders: OrdersSettings,
    #[serde(default)]
    pub gallery: GallerySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OrdersSettings {
    pub predictions: Option<PathBuf>,
    pub labels_dir: Option<PathBuf>,
    pub image_base: Option<String>,
    pub output: Option<PathBuf>,
    pub on_label_error: Option<LabelErrorPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GallerySettings {
    pub images_dir: Option<PathBuf>,
    pub labels_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub image_prefix: Option<String>,
    pub label_prefix: Option<String>,
}

impl OrdersSettings {
    /// Fills unset values from `fallback`.
    pub fn or(self, fallback: &OrdersSettings) -> Self {
        Self {
            predictions: self.predictions.or_else(|| fallback.predictions.clone()),
            labels_dir: self.labels_dir.or_else(|| fallback.labels_dir.clone()),
            image_base: self.image_base.or_else(|| fallback.image_base.clone()),
            output: self.output.or_else(|| fallback.output.clone()),
            on_label_error: self.on_label_error.or(fallback.on_label_error),
        }
    }
}

impl GallerySettings {
    pub fn or(self, fallback: &GallerySettings) -> Self {
        Self {
            images_dir: self.images_dir.or_else(|| fallback.images_dir.clone()),
            labels_dir: self.labels_dir.or_else(|| fallback.labels_dir.clone()),
            output: self.output.or_else(|| fallback.output.clone()),
            image_prefix: self.image_prefix.or_else(|| fallback.image_prefix.clone()),
            label_prefix: self.label_prefix.or_else(|| fallback.label_prefix.clone()),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Loads settings from `explicit`, else `$PODORDERS_CONFIG`, else the
    /// per-user config file if one exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::from_file(Path::new(&path));
        }
        match Self::config_file_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn config_file_path() -> Option<PathBuf> {
        Self::config_dir().map(|mut path| {
            path.push("config.toml");
            path
        })
    }

    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("podorders");
            path
        })
    }
}

fn require<T>(value: Option<T>, key: &'static str, flag: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::Missing { key, flag })
}

/// Everything the orders pipeline needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub predictions: PathBuf,
    pub labels_dir: PathBuf,
    /// Prefix for `image_src`, e.g. `./images`.
    pub image_base: String,
    pub output: PathBuf,
    pub on_label_error: LabelErrorPolicy,
}

impl PipelineConfig {
    /// Resolves `overrides` (from flags) over the `[orders]` section of `settings`.
    pub fn resolve(overrides: OrdersSettings, settings: &Settings) -> Result<Self, ConfigError> {
        let merged = overrides.or(&settings.orders);
        Ok(Self {
            predictions: require(merged.predictions, "orders.predictions", "--predictions")?,
            labels_dir: require(merged.labels_dir, "orders.labels_dir", "--labels-dir")?,
            image_base: merged
                .image_base
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE.to_string()),
            output: require(merged.output, "orders.output", "--output")?,
            on_label_error: merged.on_label_error.unwrap_or_default(),
        })
    }
}

/// Everything the gallery index needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub output: PathBuf,
    pub image_prefix: String,
    pub label_prefix: String,
}

impl GalleryConfig {
    /// Resolves `overrides` over `[gallery]`; the labels directory falls back
    /// to `[orders].labels_dir` since both commands usually share it.
    pub fn resolve(overrides: GallerySettings, settings: &Settings) -> Result<Self, ConfigError> {
        let merged = overrides.or(&settings.gallery);
        let labels_dir = merged
            .labels_dir
            .or_else(|| settings.orders.labels_dir.clone());
        Ok(Self {
            images_dir: require(merged.images_dir, "gallery.images_dir", "--images-dir")?,
            labels_dir: require(labels_dir, "gallery.labels_dir", "--labels-dir")?,
            output: merged
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GALLERY_OUTPUT)),
            image_prefix: merged
                .image_prefix
                .unwrap_or_else(|| DEFAULT_IMAGE_PREFIX.to_string()),
            label_prefix: merged
                .label_prefix
                .unwrap_or_else(|| DEFAULT_LABEL_PREFIX.to_string()),
        })
    }
}
