use crate::error::{FluenceError, Result};
use crate::volume::FluenceVolume;

use ndarray::{ArrayBase, Data, Dimension};
use rayon::prelude::*;

/// Summary statistics over every element of an array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

/// Per-gate summary, computed independently for each gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateStats {
    pub gate_index: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
}

/// Compute min, max, mean and population standard deviation.
///
/// Works on a whole volume, a single gate or a 2-D slice. Sums are
/// accumulated in `f64`.
pub fn stats<S, D>(data: &ArrayBase<S, D>) -> Result<Stats>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if data.is_empty() {
        return Err(FluenceError::EmptyInput);
    }
    let (min, max) = min_max(data);
    let count = data.len() as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / count;
    let variance = data
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count;

    Ok(Stats {
        min,
        max,
        mean,
        stddev: variance.sqrt(),
    })
}

/// Min, max and mean of each gate of a volume, in gate order.
pub fn gate_stats(volume: &FluenceVolume) -> Result<Vec<GateStats>> {
    (0..volume.gate_count())
        .into_par_iter()
        .map(|gate| -> Result<GateStats> {
            let summary = stats(&volume.gate(gate)?)?;
            Ok(GateStats {
                gate_index: gate,
                min: summary.min,
                max: summary.max,
                mean: summary.mean,
            })
        })
        .collect()
}

pub(crate) fn min_max<S, D>(data: &ArrayBase<S, D>) -> (f32, f32)
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    data.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}
