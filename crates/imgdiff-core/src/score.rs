use serde::{Deserialize, Serialize};

/// Per-window or per-sample similarity values, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreMap {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
}

impl ScoreMap {
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            values,
        }
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }

    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }
}

/// Score plus the map it was aggregated from, when the caller asked for one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub score: f64,
    pub map: Option<ScoreMap>,
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.max(0.0).sqrt()
}
