use crate::error::{AnalysisError, MetricResult};
use crate::schema::FinancialDataset;
use chrono::NaiveDate;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Expected fraction of rows treated as outliers.
pub const CONTAMINATION: f64 = 0.1;
/// Fixed seed so repeated runs flag identical rows.
pub const RANDOM_SEED: u64 = 42;

const MIN_ROWS: usize = 10;
const TREE_COUNT: usize = 100;
const MAX_SUBSAMPLE: usize = 256;
const MAX_REPORTED: usize = 20;

const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Serialize)]
pub struct AnomalousRecord {
    pub row_index: usize,
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub category: Option<String>,
    /// Isolation score in (0, 1); higher isolates faster.
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub anomaly_count: usize,
    pub anomaly_percentage: f64,
    /// Sum of absolute amounts over all flagged rows.
    pub total_anomaly_value: f64,
    /// Flagged rows in ascending row order, capped at 20.
    pub anomalies: Vec<AnomalousRecord>,
}

enum Tree {
    Split {
        threshold: f64,
        left: Box<Tree>,
        right: Box<Tree>,
    },
    Leaf {
        size: usize,
    },
}

/// Average unsuccessful-search path length in a binary search tree of `n`
/// nodes; the standard isolation-forest normalization term.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}

fn build_tree(values: &[f64], depth: usize, depth_limit: usize, rng: &mut StdRng) -> Tree {
    let (min, max) = values.iter().fold((f64::MAX, f64::MIN), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
    });
    if depth >= depth_limit || values.len() <= 1 || max <= min {
        return Tree::Leaf { size: values.len() };
    }

    let threshold = rng.gen_range(min..max);
    let left: Vec<f64> = values.iter().copied().filter(|v| *v < threshold).collect();
    let right: Vec<f64> = values.iter().copied().filter(|v| *v >= threshold).collect();

    Tree::Split {
        threshold,
        left: Box::new(build_tree(&left, depth + 1, depth_limit, rng)),
        right: Box::new(build_tree(&right, depth + 1, depth_limit, rng)),
    }
}

fn path_length(tree: &Tree, value: f64) -> f64 {
    let mut node = tree;
    let mut depth = 0.0;
    loop {
        match node {
            Tree::Leaf { size } => return depth + average_path_length(*size),
            Tree::Split {
                threshold,
                left,
                right,
            } => {
                node = if value < *threshold { left } else { right };
                depth += 1.0;
            }
        }
    }
}

/// Draws a subsample without replacement, in index order for determinism.
fn subsample(values: &[f64], size: usize, rng: &mut StdRng) -> Vec<f64> {
    if values.len() <= size {
        return values.to_vec();
    }
    rand::seq::index::sample(rng, values.len(), size)
        .into_iter()
        .map(|i| values[i])
        .collect()
}

/// Runs a seeded isolation-forest ensemble over the amount column and flags
/// the top `contamination` share of rows by isolation score.
pub fn detect_anomalies(dataset: &FinancialDataset) -> MetricResult<AnomalyReport> {
    let rows = dataset.len();
    if rows < MIN_ROWS || !dataset.resolved.amount {
        return Err(AnalysisError::InsufficientData {
            rows,
            required: MIN_ROWS,
        });
    }

    let values: Vec<f64> = dataset
        .records
        .iter()
        .map(|r| r.amount.unwrap_or(0.0))
        .collect();

    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
    let sample_size = values.len().min(MAX_SUBSAMPLE);
    let depth_limit = (sample_size as f64).log2().ceil() as usize;
    let normalizer = average_path_length(sample_size);

    let trees: Vec<Tree> = (0..TREE_COUNT)
        .map(|_| {
            let sample = subsample(&values, sample_size, &mut rng);
            build_tree(&sample, 0, depth_limit, &mut rng)
        })
        .collect();

    let scores: Vec<f64> = values
        .iter()
        .map(|v| {
            let mean_path =
                trees.iter().map(|t| path_length(t, *v)).sum::<f64>() / trees.len() as f64;
            2f64.powf(-mean_path / normalizer)
        })
        .collect();

    let flagged_count = (CONTAMINATION * rows as f64).ceil() as usize;
    let mut order: Vec<usize> = (0..rows).collect();
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]).then(a.cmp(b)));
    let mut flagged: Vec<usize> = order.into_iter().take(flagged_count).collect();
    flagged.sort_unstable();

    let total_anomaly_value: f64 = flagged.iter().map(|&i| values[i].abs()).sum();

    debug!(
        "Anomaly detection flagged {} of {} rows ({:.1}% contamination target)",
        flagged.len(),
        rows,
        CONTAMINATION * 100.0
    );

    Ok(AnomalyReport {
        anomaly_count: flagged.len(),
        anomaly_percentage: flagged.len() as f64 / rows as f64 * 100.0,
        total_anomaly_value,
        anomalies: flagged
            .iter()
            .take(MAX_REPORTED)
            .map(|&i| {
                let record = &dataset.records[i];
                AnomalousRecord {
                    row_index: i,
                    date: record.date,
                    amount: values[i],
                    category: record.category.clone(),
                    score: scores[i],
                }
            })
            .collect(),
    })
}
