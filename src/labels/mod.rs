//! Ground-truth lookup: find an image's label file and parse its verdict.

pub mod parser;
pub mod resolver;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::Verdict;

pub use parser::{LABEL_FIELDS, LabelParseError, parse_label};
pub use resolver::LabelResolver;

/// What to do when a label file exists but holds a non-numeric or non-0/1 field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelErrorPolicy {
    /// Treat the image as having no ground truth and keep going.
    #[default]
    Absent,
    /// Abort the run.
    Fatal,
}

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("failed to read label file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid label file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: LabelParseError,
    },
}

/// Resolves and parses ground truth for images under a labels directory.
#[derive(Debug, Clone)]
pub struct GroundTruth {
    resolver: LabelResolver,
    policy: LabelErrorPolicy,
}

impl GroundTruth {
    pub fn new(resolver: LabelResolver, policy: LabelErrorPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn policy(&self) -> LabelErrorPolicy {
        self.policy
    }

    /// Ground truth for `image_name`, or `None` when it is unavailable.
    ///
    /// Only an invalid field under [`LabelErrorPolicy::Fatal`] is an error;
    /// a missing, unreadable or short label file always yields `None`.
    pub fn lookup(&self, image_name: &str) -> Result<Option<Verdict>, LabelError> {
        let Some(path) = self.resolver.resolve(image_name) else {
            debug!(image = image_name, "no label file");
            return Ok(None);
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) => {
                let err = LabelError::Read { path, source };
                warn!(image = image_name, error = %err, "ground truth unavailable");
                return Ok(None);
            }
        };

        match parse_label(&content) {
            Ok(verdict) => {
                debug!(image = image_name, label = %path.display(), "ground truth resolved");
                Ok(Some(verdict))
            }
            Err(source) => {
                let short = source.is_short();
                let err = LabelError::Parse { path, source };
                if short || self.policy == LabelErrorPolicy::Absent {
                    warn!(image = image_name, error = %err, "ground truth unavailable");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }
}
