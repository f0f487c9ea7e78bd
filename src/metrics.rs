//! Agreement between predicted and ground-truth verdicts in an orders artifact.

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::schema::{OrdersArtifact, STEP_KEYS};

//////////////////////////////////////////////////////////////////////////////////////////////////
// Binary Confusion Matrix
//////////////////////////////////////////////////////////////////////////////////////////////////

/// Counts of prediction/truth pairs where "positive" means the check passed.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryConfusionMatrix {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_negatives: u64,
}

impl BinaryConfusionMatrix {
    pub fn record(&mut self, prediction: bool, truth: bool) {
        match (prediction, truth) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut matrix = Self::default();
        for (prediction, truth) in pairs {
            matrix.record(prediction, truth);
        }
        matrix
    }

    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    pub fn correct(&self) -> u64 {
        self.true_positives + self.true_negatives
    }

    pub fn predicted_positive(&self) -> u64 {
        self.true_positives + self.false_positives
    }

    pub fn actually_positive(&self) -> u64 {
        self.true_positives + self.false_negatives
    }

    // Ratios are undefined on an empty denominator.

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.correct(), self.total())
    }

    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positives, self.predicted_positive())
    }

    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positives, self.actually_positive())
    }

    pub fn f1_score(&self) -> Option<f64> {
        let precision = self.precision()?;
        let recall = self.recall()?;
        if precision + recall == 0.0 {
            return None;
        }
        Some(2.0 * precision * recall / (precision + recall))
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator != 0).then(|| numerator as f64 / denominator as f64)
}

//////////////////////////////////////////////////////////////////////////////////////////////////
// Agreement Summary
//////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub name: String,
    #[serde(flatten)]
    pub confusion_matrix: BinaryConfusionMatrix,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

impl MetricRow {
    pub fn new(name: impl Into<String>, confusion_matrix: BinaryConfusionMatrix) -> Self {
        Self {
            name: name.into(),
            accuracy: confusion_matrix.accuracy(),
            precision: confusion_matrix.precision(),
            recall: confusion_matrix.recall(),
            f1: confusion_matrix.f1_score(),
            confusion_matrix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementSummary {
    pub orders: usize,
    pub orders_without_ground_truth: usize,
    pub images: usize,
    pub images_without_ground_truth: usize,
    /// One row per step, then `overall_pass`, then `order_pass`.
    pub metrics: Vec<MetricRow>,
}

/// Compares predictions to ground truth over every labeled image and order.
pub fn summarize(artifact: &OrdersArtifact) -> AgreementSummary {
    let labeled: Vec<_> = artifact
        .images()
        .filter_map(|image| image.gt.map(|gt| (image.pred, gt)))
        .collect();

    let mut metrics: Vec<MetricRow> = STEP_KEYS
        .iter()
        .enumerate()
        .map(|(index, key)| {
            let pairs = labeled
                .iter()
                .map(|(pred, gt)| (pred.steps.to_array()[index], gt.steps.to_array()[index]));
            MetricRow::new(*key, BinaryConfusionMatrix::from_pairs(pairs))
        })
        .collect();

    let overall_pairs = labeled
        .iter()
        .map(|(pred, gt)| (pred.overall_pass, gt.overall_pass));
    metrics.push(MetricRow::new(
        "overall_pass",
        BinaryConfusionMatrix::from_pairs(overall_pairs),
    ));

    let order_pairs = artifact
        .orders
        .iter()
        .filter_map(|order| order.gt_order_pass.map(|gt| (order.pred_order_pass, gt)));
    metrics.push(MetricRow::new("order_pass", BinaryConfusionMatrix::from_pairs(order_pairs)));

    let images = artifact.image_count();
    AgreementSummary {
        orders: artifact.orders.len(),
        orders_without_ground_truth: artifact
            .orders
            .iter()
            .filter(|order| order.gt_order_pass.is_none())
            .count(),
        images,
        images_without_ground_truth: images - labeled.len(),
        metrics,
    }
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

/// Plain-text table for terminals.
pub fn render_summary(summary: &AgreementSummary, color: bool) -> String {
    let heading = |text: &str| {
        if color {
            text.bold().cyan().to_string()
        } else {
            text.to_string()
        }
    };

    let mut out = String::new();
    out.push_str(&heading("Totals:"));
    out.push_str(&format!(
        "\n  orders = {} ({} without ground truth)",
        summary.orders, summary.orders_without_ground_truth
    ));
    out.push_str(&format!(
        "\n  images = {} ({} without ground truth)",
        summary.images, summary.images_without_ground_truth
    ));

    out.push('\n');
    out.push_str(&heading("Agreement:"));
    out.push_str(&format!(
        "\n  {:<22} {:>5} {:>5} {:>5} {:>5} {:>9} {:>9} {:>9} {:>9}",
        "check", "tp", "fp", "fn", "tn", "accuracy", "precision", "recall", "f1"
    ));
    for row in &summary.metrics {
        let m = &row.confusion_matrix;
        out.push_str(&format!(
            "\n  {:<22} {:>5} {:>5} {:>5} {:>5} {:>9} {:>9} {:>9} {:>9}",
            row.name,
            m.true_positives,
            m.false_positives,
            m.false_negatives,
            m.true_negatives,
            format_metric(row.accuracy),
            format_metric(row.precision),
            format_metric(row.recall),
            format_metric(row.f1),
        ));
    }
    out
}
