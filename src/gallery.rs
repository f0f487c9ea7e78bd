//! Flat per-image index of an images directory and its raw labels.
//!
//! Unlike the orders artifact this keeps label cells as written (integers,
//! free text or missing) so annotators can spot malformed label files.
//!
//! Only regular files directly inside the images directory are listed.
//! Dotfiles are skipped. An entry that cannot be read, such as a dangling
//! symlink, is logged and skipped rather than failing the whole index.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::GalleryConfig;
use crate::pipeline::write_pretty_json;
use crate::schema::{STEP_KEYS, flag};

/// Extensions picked up from the images directory, in listing order.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{kind} directory not found: {}", path.display())]
    MissingDirectory { kind: &'static str, path: PathBuf },
    #[error("failed to read label file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One label cell: an integer when it parses as one, otherwise the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelCell {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub raw: String,
    pub values: Vec<Option<LabelCell>>,
    pub by_key: BTreeMap<String, Option<LabelCell>>,
}

impl LabelInfo {
    pub fn missing() -> Self {
        Self::from_cells(String::new(), vec![None; STEP_KEYS.len()])
    }

    /// Reads the four step cells of a label line; missing cells are `None`.
    pub fn parse(line: &str) -> Self {
        let raw = line.trim().to_string();
        let mut values: Vec<Option<LabelCell>> = raw
            .split(',')
            .map(str::trim)
            .map(|cell| {
                if cell.is_empty() {
                    None
                } else {
                    Some(match cell.parse() {
                        Ok(int) => LabelCell::Int(int),
                        Err(_) => LabelCell::Text(cell.to_string()),
                    })
                }
            })
            .collect();
        values.resize(STEP_KEYS.len(), None);
        Self::from_cells(raw, values)
    }

    fn from_cells(raw: String, values: Vec<Option<LabelCell>>) -> Self {
        let by_key = STEP_KEYS
            .iter()
            .map(|key| key.to_string())
            .zip(values.iter().cloned())
            .collect();
        Self { raw, values, by_key }
    }

    pub fn all_pass(&self) -> bool {
        self.values
            .iter()
            .all(|cell| matches!(cell, Some(LabelCell::Int(1))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub image_name: String,
    pub image_relpath: String,
    pub label_relpath: String,
    pub label: LabelInfo,
    #[serde(with = "flag")]
    pub overall_pass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryReport {
    pub output: PathBuf,
    pub images_dir: PathBuf,
    pub images: usize,
}

/// Image files directly inside `dir`, grouped by [`IMAGE_EXTENSIONS`] order
/// and sorted by name within each group. Hidden and unreadable entries are
/// skipped.
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    let mut by_extension: Vec<Vec<PathBuf>> = vec![Vec::new(); IMAGE_EXTENSIONS.len()];
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.into_path();
        let slot = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| IMAGE_EXTENSIONS.iter().position(|known| *known == ext));
        if let Some(slot) = slot {
            by_extension[slot].push(path);
        }
    }
    for group in &mut by_extension {
        group.sort();
    }
    by_extension.into_iter().flatten().collect()
}

fn read_label(path: &Path) -> Result<LabelInfo, GalleryError> {
    if !path.is_file() {
        return Ok(LabelInfo::missing());
    }
    let bytes = std::fs::read(path).map_err(|source| GalleryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let first_line = text.trim().lines().next().unwrap_or("");
    Ok(LabelInfo::parse(first_line))
}

pub fn build_gallery(config: &GalleryConfig) -> Result<Vec<GalleryItem>, GalleryError> {
    for (kind, path) in [("images", &config.images_dir), ("labels", &config.labels_dir)] {
        if !path.is_dir() {
            return Err(GalleryError::MissingDirectory {
                kind,
                path: path.clone(),
            });
        }
    }

    let image_prefix = config.image_prefix.trim_end_matches('/');
    let label_prefix = config.label_prefix.trim_end_matches('/');

    list_images(&config.images_dir)
        .into_iter()
        .map(|image| -> Result<GalleryItem, GalleryError> {
            let image_name = image
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = image
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let label_name = format!("{stem}.txt");
            let label = read_label(&config.labels_dir.join(&label_name))?;
            debug!(image = %image_name, raw = %label.raw, "indexed image");

            Ok(GalleryItem {
                image_relpath: format!("{image_prefix}/{image_name}"),
                label_relpath: format!("{label_prefix}/{label_name}"),
                overall_pass: label.all_pass(),
                image_name,
                label,
            })
        })
        .collect()
}

pub fn run(config: &GalleryConfig) -> Result<GalleryReport, GalleryError> {
    let items = build_gallery(config)?;
    write_pretty_json(&config.output, &items).map_err(|source| GalleryError::Write {
        path: config.output.clone(),
        source,
    })?;
    info!(images = items.len(), output = %config.output.display(), "wrote gallery index");
    Ok(GalleryReport {
        output: config.output.clone(),
        images_dir: config.images_dir.clone(),
        images: items.len(),
    })
}
