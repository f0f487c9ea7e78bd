//! Reading model output and normalizing it into predicted verdicts.
//!
//! Records come in two shapes: some put `image_name`/`image_path` at the top
//! level, others only under `parsed`. Step flags always live under `parsed`.
//! Lookups follow a fixed precedence, first non-empty string wins; a name or
//! path of any other JSON type counts as absent:
//!
//! | value        | precedence                                              |
//! |--------------|---------------------------------------------------------|
//! | `image_name` | top level, `parsed.image_name`                          |
//! | `image_path` | top level, `parsed.image_path`, resolved `image_name`   |
//! | step flags   | `parsed.<step key>`, otherwise fail                     |

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::schema::{StepResult, Verdict};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read predictions {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}:{line}: malformed prediction record: {source}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}:{line}: prediction record has no image_name", path.display())]
    MissingImageName { path: PathBuf, line: usize },
}

/// One line of model output as written by the inference job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPrediction {
    #[serde(default)]
    pub image_name: Option<Value>,
    #[serde(default)]
    pub image_path: Option<Value>,
    #[serde(default)]
    pub parsed: Option<ParsedFields>,
}

/// The model's structured answer for one image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParsedFields {
    #[serde(default)]
    pub image_name: Option<Value>,
    #[serde(default)]
    pub image_path: Option<Value>,
    #[serde(default)]
    pub step1_valid_pod: Option<Value>,
    #[serde(default)]
    pub step2_has_package: Option<Value>,
    #[serde(default)]
    pub step3_not_in_mailbox: Option<Value>,
    #[serde(default)]
    pub step4_valid_location: Option<Value>,
}

/// A prediction after field fallback and flag coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub image_name: String,
    pub image_path: String,
    pub verdict: Verdict,
}

impl RawPrediction {
    pub fn image_name(&self) -> Option<&str> {
        non_empty(self.image_name.as_ref())
            .or_else(|| self.parsed.as_ref().and_then(|p| non_empty(p.image_name.as_ref())))
    }

    pub fn image_path(&self) -> Option<&str> {
        non_empty(self.image_path.as_ref())
            .or_else(|| self.parsed.as_ref().and_then(|p| non_empty(p.image_path.as_ref())))
            .or_else(|| self.image_name())
    }

    pub fn steps(&self) -> StepResult {
        match &self.parsed {
            Some(parsed) => StepResult::new(
                coerce_flag(parsed.step1_valid_pod.as_ref()),
                coerce_flag(parsed.step2_has_package.as_ref()),
                coerce_flag(parsed.step3_not_in_mailbox.as_ref()),
                coerce_flag(parsed.step4_valid_location.as_ref()),
            ),
            None => StepResult::default(),
        }
    }

    /// `None` when the record names no image.
    pub fn normalize(&self) -> Option<Prediction> {
        let image_name = self.image_name()?.to_string();
        let image_path = self.image_path().unwrap_or(&image_name).to_string();
        Some(Prediction {
            image_name,
            image_path,
            verdict: Verdict::derived(self.steps()),
        })
    }
}

/// A usable name or path: a non-empty JSON string. Anything else is absent.
fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Interprets a model-provided step value; anything that is not `1` fails.
pub fn coerce_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => match number.as_i64() {
            Some(int) => int == 1,
            None => number.as_f64().is_some_and(|float| float.trunc() == 1.0),
        },
        Some(Value::String(text)) => text.trim().parse::<i64>() == Ok(1),
        _ => false,
    }
}

/// Re-roots the final component of `image_path` under `image_base`.
pub fn display_path(image_base: &str, image_path: &str) -> String {
    let file_name = Path::new(image_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_path.to_string());
    let base = image_base.trim_end_matches('/');
    if base.is_empty() {
        file_name
    } else {
        format!("{base}/{file_name}")
    }
}

pub fn read_predictions(path: &Path) -> Result<Vec<Prediction>, InputError> {
    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_predictions(BufReader::new(file), path)
}

/// Parses JSON-lines predictions. Blank lines are skipped; any other line that
/// does not hold a record naming an image fails the whole read.
pub fn parse_predictions<R: BufRead>(
    reader: R,
    path: &Path,
) -> Result<Vec<Prediction>, InputError> {
    let mut predictions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let raw: RawPrediction =
            serde_json::from_str(line).map_err(|source| InputError::Malformed {
                path: path.to_path_buf(),
                line: line_no,
                source,
            })?;
        let prediction = raw.normalize().ok_or_else(|| InputError::MissingImageName {
            path: path.to_path_buf(),
            line: line_no,
        })?;
        predictions.push(prediction);
    }
    Ok(predictions)
}
