pub mod artifact;
pub mod flag;
pub mod verdict;

// Re-export commonly used types
pub use artifact::{ImageRecord, OrderGroup, OrdersArtifact};
pub use verdict::{STEP_KEYS, StepResult, Verdict};
