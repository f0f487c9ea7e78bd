use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::flag;

/// Keys of the four per-image checks, in artifact order.
pub const STEP_KEYS: [&str; 4] = [
    "step1_valid_pod",
    "step2_has_package",
    "step3_not_in_mailbox",
    "step4_valid_location",
];

/// Outcome of the four independent checks for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct StepResult {
    #[serde(rename = "step1_valid_pod", with = "flag")]
    #[schemars(with = "u8")]
    pub valid_pod: bool,
    #[serde(rename = "step2_has_package", with = "flag")]
    #[schemars(with = "u8")]
    pub has_package: bool,
    #[serde(rename = "step3_not_in_mailbox", with = "flag")]
    #[schemars(with = "u8")]
    pub not_in_mailbox: bool,
    #[serde(rename = "step4_valid_location", with = "flag")]
    #[schemars(with = "u8")]
    pub valid_location: bool,
}

impl StepResult {
    pub fn new(
        valid_pod: bool,
        has_package: bool,
        not_in_mailbox: bool,
        valid_location: bool,
    ) -> Self {
        Self {
            valid_pod,
            has_package,
            not_in_mailbox,
            valid_location,
        }
    }

    /// Builds a result from flags given in [`STEP_KEYS`] order.
    pub fn from_array(flags: [bool; 4]) -> Self {
        let [valid_pod, has_package, not_in_mailbox, valid_location] = flags;
        Self::new(valid_pod, has_package, not_in_mailbox, valid_location)
    }

    /// Flags in [`STEP_KEYS`] order.
    pub fn to_array(self) -> [bool; 4] {
        [
            self.valid_pod,
            self.has_package,
            self.not_in_mailbox,
            self.valid_location,
        ]
    }

    pub fn all_pass(self) -> bool {
        self.to_array().into_iter().all(|flag| flag)
    }
}

/// A step result together with its overall verdict.
///
/// Predictions always derive `overall_pass` from the steps ([`Verdict::derived`]).
/// Ground truth carries its own overall value ([`Verdict::labeled`]) which is kept
/// as written even when it disagrees with the steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    #[serde(flatten)]
    pub steps: StepResult,
    #[serde(with = "flag")]
    #[schemars(with = "u8")]
    pub overall_pass: bool,
}

impl Verdict {
    pub fn derived(steps: StepResult) -> Self {
        Self {
            steps,
            overall_pass: steps.all_pass(),
        }
    }

    pub fn labeled(steps: StepResult, overall_pass: bool) -> Self {
        Self {
            steps,
            overall_pass,
        }
    }
}
