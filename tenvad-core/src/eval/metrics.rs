//! Confusion counts and precision/recall sweeps over decision thresholds.

/// Counts of hard decisions against ground truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    /// Compare `probabilities >= threshold` with 0/1 `labels`, pairwise up to
    /// the shorter of the two.
    pub fn from_scores(probabilities: &[f32], labels: &[u8], threshold: f32) -> Self {
        let mut m = Self::default();
        for (&prob, &label) in probabilities.iter().zip(labels) {
            match (prob >= threshold, label != 0) {
                (true, true) => m.true_positive += 1,
                (true, false) => m.false_positive += 1,
                (false, false) => m.true_negative += 1,
                (false, true) => m.false_negative += 1,
            }
        }
        m
    }
}

/// Precision/recall (and error rates) at one threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrPoint {
    pub threshold: f32,
    pub precision: f64,
    pub recall: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn precision_recall(probabilities: &[f32], labels: &[u8], threshold: f32) -> PrPoint {
    let m = ConfusionMatrix::from_scores(probabilities, labels, threshold);
    PrPoint {
        threshold,
        precision: ratio(m.true_positive, m.true_positive + m.false_positive),
        recall: ratio(m.true_positive, m.true_positive + m.false_negative),
        false_positive_rate: ratio(m.false_positive, m.false_positive + m.true_negative),
        false_negative_rate: ratio(m.false_negative, m.true_positive + m.false_negative),
    }
}

/// Thresholds `0, 1/steps, ..., 1` inclusive.
pub fn threshold_grid(steps: u32) -> Vec<f32> {
    let steps = steps.max(1);
    (0..=steps).map(|i| i as f32 / steps as f32).collect()
}

/// Sweep thresholds 0.00..=1.00 in steps of 0.01.
pub fn sweep(probabilities: &[f32], labels: &[u8]) -> Vec<PrPoint> {
    sweep_with(probabilities, labels, &threshold_grid(100))
}

pub fn sweep_with(probabilities: &[f32], labels: &[u8], thresholds: &[f32]) -> Vec<PrPoint> {
    thresholds
        .iter()
        .map(|&t| precision_recall(probabilities, labels, t))
        .collect()
}
