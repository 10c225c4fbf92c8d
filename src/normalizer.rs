//! Shared colour scales across datasets.
//!
//! For every gate the range is taken over the union of all voxels of all
//! datasets, so the same value maps to the same colour in every medium.

use std::ops::Range;

use ndarray::{ArrayBase, Data, Dimension};
use rayon::prelude::*;

use crate::aggregator::DatasetEntry;
use crate::error::{FluenceError, Result};
use crate::volume::FluenceVolume;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateRange {
    pub gate_index: usize,
    pub min: f32,
    pub max: f32,
}

impl GateRange {
    pub fn bounds(&self) -> (f32, f32) {
        (self.min, self.max)
    }
}

/// Per-gate union ranges over registered datasets.
pub fn compute_gate_ranges(entries: &[DatasetEntry]) -> Result<Vec<GateRange>> {
    let volumes: Vec<&FluenceVolume> = entries.iter().map(|entry| &entry.volume).collect();
    compute_volume_gate_ranges(&volumes)
}

/// Per-gate union ranges over a set of volumes
///
/// # Errors
///
/// `EmptyInput` for no volumes (or a gate holding only NaN), `ShapeMismatch`
/// if the volumes disagree on `[X, Y, Z, T]`
pub fn compute_volume_gate_ranges(volumes: &[&FluenceVolume]) -> Result<Vec<GateRange>> {
    let gates = check_shapes(volumes)?;

    let ranges = (0..gates)
        .into_par_iter()
        .map(|gate| -> Result<GateRange> {
            let mut bounds = Bounds::default();
            for volume in volumes {
                bounds.extend(&volume.gate(gate)?);
            }
            let (min, max) = bounds.finish()?;
            Ok(GateRange {
                gate_index: gate,
                min,
                max,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for range in &ranges {
        log::debug!(
            "gate {} range {:.6} .. {:.6}",
            range.gate_index,
            range.min,
            range.max
        );
    }
    Ok(ranges)
}

/// One range spanning several gates of every volume.
///
/// Lets a caller put, say, gates 1..5 on one colour scale while gate 0 keeps
/// its own.
pub fn combined_range(volumes: &[&FluenceVolume], gates: Range<usize>) -> Result<(f32, f32)> {
    let gate_count = check_shapes(volumes)?;
    if gates.is_empty() {
        return Err(FluenceError::EmptyInput);
    }
    if gates.end > gate_count {
        return Err(FluenceError::IndexOutOfRange {
            dimension: "gate",
            index: gates.end - 1,
            extent: gate_count,
        });
    }

    let mut bounds = Bounds::default();
    for volume in volumes {
        for gate in gates.clone() {
            bounds.extend(&volume.gate(gate)?);
        }
    }
    bounds.finish()
}

/// All volumes must share the first volume's shape. Returns the gate count.
fn check_shapes(volumes: &[&FluenceVolume]) -> Result<usize> {
    let first = volumes.first().ok_or(FluenceError::EmptyInput)?;
    let expected = first.shape();
    if let Some(other) = volumes.iter().find(|volume| volume.shape() != expected) {
        return Err(FluenceError::ShapeMismatch {
            expected: expected.to_vec(),
            found: other.shape().to_vec(),
        });
    }
    Ok(first.gate_count())
}

/// Running min/max that skips NaN.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f32,
    max: f32,
    seen: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            seen: false,
        }
    }
}

impl Bounds {
    fn extend<S, D>(&mut self, data: &ArrayBase<S, D>)
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        for &v in data.iter().filter(|v| !v.is_nan()) {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
            self.seen = true;
        }
    }

    fn finish(self) -> Result<(f32, f32)> {
        if self.seen {
            Ok((self.min, self.max))
        } else {
            Err(FluenceError::EmptyInput)
        }
    }
}
