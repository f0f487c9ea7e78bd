//! The orders batch job: predictions + labels in, one artifact out.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::PipelineConfig;
use crate::labels::{GroundTruth, LabelError, LabelResolver};
use crate::orders::group_orders;
use crate::predictions::{InputError, Prediction, display_path, read_predictions};
use crate::schema::{ImageRecord, OrdersArtifact};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub output: PathBuf,
    pub orders: usize,
    pub images: usize,
    pub images_without_ground_truth: usize,
}

/// Joins each prediction with its ground truth.
pub fn join_ground_truth(
    predictions: Vec<Prediction>,
    ground_truth: &GroundTruth,
    image_base: &str,
) -> Result<Vec<ImageRecord>, LabelError> {
    predictions
        .into_iter()
        .map(|prediction| -> Result<ImageRecord, LabelError> {
            let gt = ground_truth.lookup(&prediction.image_name)?;
            Ok(ImageRecord {
                image_src: display_path(image_base, &prediction.image_path),
                image_name: prediction.image_name,
                pred: prediction.verdict,
                gt,
            })
        })
        .collect()
}

/// Builds the artifact in memory without writing anything.
pub fn build_orders(config: &PipelineConfig) -> Result<OrdersArtifact, PipelineError> {
    let predictions = read_predictions(&config.predictions)?;
    info!(
        count = predictions.len(),
        path = %config.predictions.display(),
        "read predictions"
    );

    let ground_truth = GroundTruth::new(
        LabelResolver::new(&config.labels_dir),
        config.on_label_error,
    );
    let records = join_ground_truth(predictions, &ground_truth, &config.image_base)?;

    Ok(OrdersArtifact {
        orders: group_orders(records),
    })
}

pub fn run(config: &PipelineConfig) -> Result<RunReport, PipelineError> {
    let artifact = build_orders(config)?;
    write_pretty_json(&config.output, &artifact).map_err(|source| PipelineError::Write {
        path: config.output.clone(),
        source,
    })?;

    let report = RunReport {
        output: config.output.clone(),
        orders: artifact.orders.len(),
        images: artifact.image_count(),
        images_without_ground_truth: artifact.images().filter(|image| image.gt.is_none()).count(),
    };
    info!(
        orders = report.orders,
        images = report.images,
        without_ground_truth = report.images_without_ground_truth,
        output = %report.output.display(),
        "wrote orders"
    );
    Ok(report)
}

/// Writes `value` as 2-space indented JSON, creating parent directories.
pub fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelErrorPolicy;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new(predictions: &str) -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join("labels")).unwrap();
            fs::write(dir.path().join("results.jsonl"), predictions).unwrap();
            Self { dir }
        }

        fn label(&self, name: &str, content: &str) -> &Self {
            fs::write(self.dir.path().join("labels").join(name), content).unwrap();
            self
        }

        fn config(&self) -> PipelineConfig {
            PipelineConfig {
                predictions: self.dir.path().join("results.jsonl"),
                labels_dir: self.dir.path().join("labels"),
                image_base: "./images".to_string(),
                output: self.dir.path().join("site").join("data_orders.json"),
                on_label_error: LabelErrorPolicy::Absent,
            }
        }
    }

    const PREDICTIONS: &str = r#"{"image_name": "general_B_1.jpg.jpg", "image_path": "/raw/general_B_1.jpg.jpg", "parsed": {"step1_valid_pod": 1, "step2_has_package": 1, "step3_not_in_mailbox": 1, "step4_valid_location": 1}}
{"parsed": {"image_name": "general_A_1.jpg", "step3_not_in_mailbox": 1}}

{"image_name": "general_B_2.jpg", "parsed": {"step3_not_in_mailbox": "1"}}
"#;

    #[test]
    fn builds_sorted_orders_with_ground_truth() {
        let fixture = Fixture::new(PREDICTIONS);
        fixture
            .label("general_B_1.txt", "1,1,1,1,1")
            .label("general_B_2.jpg.txt", "1,1,1,0,0");

        let artifact = build_orders(&fixture.config()).unwrap();
        let ids: Vec<_> = artifact.orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["general_A", "general_B"]);

        let a = &artifact.orders[0];
        assert!(!a.pred_order_pass);
        assert_eq!(a.gt_order_pass, None);
        assert_eq!(a.images[0].image_src, "./images/general_A_1.jpg");

        let b = &artifact.orders[1];
        assert!(b.pred_order_pass);
        assert_eq!(b.gt_order_pass, Some(true));
        assert_eq!(b.images[0].image_src, "./images/general_B_1.jpg.jpg");
        assert!(b.images[0].gt.unwrap().overall_pass);
        assert!(!b.images[1].gt.unwrap().overall_pass);
    }

    #[test]
    fn run_writes_output_and_reports_counts() {
        let fixture = Fixture::new(PREDICTIONS);
        fixture.label("general_B_1.txt", "1,1,1,1,1");

        let config = fixture.config();
        let report = run(&config).unwrap();
        assert_eq!(report.orders, 2);
        assert_eq!(report.images, 3);
        assert_eq!(report.images_without_ground_truth, 2);

        let written: OrdersArtifact =
            serde_json::from_str(&fs::read_to_string(&config.output).unwrap()).unwrap();
        assert_eq!(written, build_orders(&config).unwrap());
    }

    #[test]
    fn fatal_label_policy_aborts_without_output() {
        let fixture = Fixture::new(PREDICTIONS);
        fixture.label("general_B_1.txt", "1,1,1,1,maybe");

        let mut config = fixture.config();
        config.on_label_error = LabelErrorPolicy::Fatal;
        let err = run(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Label(_)));
        assert!(!config.output.exists());

        config.on_label_error = LabelErrorPolicy::Absent;
        let report = run(&config).unwrap();
        assert_eq!(report.images_without_ground_truth, 3);
    }

    #[test]
    fn malformed_input_aborts_without_output() {
        let fixture = Fixture::new("{\"image_name\": \"a_b_1.jpg\"}\n{\"image_name\": \n");
        let config = fixture.config();
        let err = run(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Input(InputError::Malformed { line: 2, .. })
        ));
        assert!(!config.output.exists());
    }

    #[test]
    fn unwritable_output_is_an_error() {
        let fixture = Fixture::new(PREDICTIONS);
        let mut config = fixture.config();
        let blocker = fixture.dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        config.output = blocker.join("data_orders.json");

        let err = run(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
    }

    #[test]
    fn write_pretty_json_keeps_unicode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_pretty_json(&path, &serde_json::json!({"name": "订单"})).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"name\": \"订单\"\n}");
    }
}
