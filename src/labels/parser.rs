use thiserror::Error;

use crate::schema::{StepResult, Verdict};

/// Number of comma-separated fields in a label line: four steps then overall.
pub const LABEL_FIELDS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LabelParseError {
    #[error("expected 5 comma-separated fields, found {found}")]
    TooFewFields { found: usize },
    #[error("field {index} is not an integer: {token:?}")]
    NotAnInteger { index: usize, token: String },
    #[error("field {index} must be 0 or 1, found {value}")]
    OutOfRange { index: usize, value: i64 },
}

impl LabelParseError {
    /// Short labels are treated as missing ground truth regardless of policy.
    pub fn is_short(&self) -> bool {
        matches!(self, LabelParseError::TooFewFields { .. })
    }
}

/// Parses `step1,step2,step3,step4,overall`.
///
/// The fifth field becomes `overall_pass` as written; it is not recomputed
/// from the steps. Fields past the fifth are ignored.
pub fn parse_label(content: &str) -> Result<Verdict, LabelParseError> {
    let tokens: Vec<&str> = content.trim().split(',').map(str::trim).collect();
    if tokens.len() < LABEL_FIELDS {
        return Err(LabelParseError::TooFewFields {
            found: tokens.len(),
        });
    }

    let mut flags = [false; LABEL_FIELDS];
    for (index, (slot, token)) in flags.iter_mut().zip(&tokens).enumerate() {
        *slot = parse_flag(index + 1, token)?;
    }

    let [s1, s2, s3, s4, overall] = flags;
    Ok(Verdict::labeled(StepResult::new(s1, s2, s3, s4), overall))
}

fn parse_flag(index: usize, token: &str) -> Result<bool, LabelParseError> {
    let value: i64 = token.parse().map_err(|_| LabelParseError::NotAnInteger {
        index,
        token: token.to_string(),
    })?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(LabelParseError::OutOfRange { index, value }),
    }
}
