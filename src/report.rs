use std::fmt;

use crate::aggregator::DatasetEntry;
use crate::enums::Axis;
use crate::error::Result;
use crate::simulation::SessionMetadata;
use crate::stats::{GateStats, Stats, gate_stats, stats};

/// Diagnostic summary of one dataset.
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub label: String,
    pub shape: [usize; 4],
    pub overall: Stats,
    pub gates: Vec<GateStats>,
    /// Max of the X-middle plane in the last gate.
    pub center_plane_max: f32,
    /// Max of the `x = 0` plane in the last gate.
    pub edge_plane_max: f32,
    pub metadata: SessionMetadata,
}

impl DatasetReport {
    pub fn build(entry: &DatasetEntry) -> Result<Self> {
        let volume = &entry.volume;
        let last_gate = volume.gate_count().saturating_sub(1);
        let center = volume.slice(Axis::X, volume.middle_index(Axis::X), last_gate)?;
        let edge = volume.slice(Axis::X, 0, last_gate)?;

        Ok(Self {
            label: entry.label.clone(),
            shape: volume.shape(),
            overall: stats(volume.data())?,
            gates: gate_stats(volume)?,
            center_plane_max: stats(&center)?.max,
            edge_plane_max: stats(&edge)?.max,
            metadata: entry.metadata.clone(),
        })
    }

    pub fn log(&self) {
        for line in self.to_string().lines() {
            log::info!("{line}");
        }
    }
}

fn optional<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} {:?} ===", self.label, self.shape)?;
        writeln!(f, "fluence:")?;
        writeln!(f, "  max     {:.6}", self.overall.max)?;
        writeln!(f, "  min     {:.6}", self.overall.min)?;
        writeln!(f, "  mean    {:.6}", self.overall.mean)?;
        writeln!(f, "  stddev  {:.6}", self.overall.stddev)?;
        writeln!(f, "gates:")?;
        for gate in &self.gates {
            write!(
                f,
                "  gate {}: max={:.6} min={:.6} mean={:.6}",
                gate.gate_index + 1,
                gate.max,
                gate.min,
                gate.mean
            )?;
            if let Some(forward) = &self.metadata.forward {
                let (start, end) = forward.gate_window(gate.gate_index);
                write!(f, " [{:.2} ns, {:.2} ns)", start * 1e9, end * 1e9)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "spatial (last gate):")?;
        writeln!(f, "  center plane max {:.6}", self.center_plane_max)?;
        writeln!(f, "  edge plane max   {:.6}", self.edge_plane_max)?;

        let meta = &self.metadata;
        if meta.is_empty() {
            return writeln!(f, "simulation: no metadata found");
        }
        writeln!(f, "simulation:")?;
        if !meta.media.is_empty() {
            writeln!(f, "  media: {}", meta.media.len())?;
            for (i, medium) in meta.media.iter().enumerate() {
                writeln!(
                    f,
                    "  medium {i}: n={} mua={} mus={} g={}",
                    optional(medium.n),
                    optional(medium.mua),
                    optional(medium.mus),
                    optional(medium.g)
                )?;
            }
        }
        if let Some(photons) = meta.photons {
            writeln!(f, "  photons launched: {photons}")?;
        }
        if let Some(detected) = meta.detected_photons {
            writeln!(f, "  photons detected: {detected}")?;
        }
        if let Some(rate) = meta.detection_rate() {
            writeln!(f, "  detection rate: {rate:.3}%")?;
        }
        if let Some(forward) = &meta.forward {
            let expected = forward.gate_count();
            if expected != self.shape[3] {
                writeln!(
                    f,
                    "  note: time window implies {expected} gates, volume has {}",
                    self.shape[3]
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Forward, Medium};
    use crate::volume::FluenceVolume;
    use ndarray::Array4;

    fn entry() -> DatasetEntry {
        let data =
            Array4::from_shape_fn((3, 2, 2, 2), |(x, y, z, t)| (x * 4 + y * 2 + z + t) as f32);
        DatasetEntry::new("Glass", FluenceVolume::new(data), "glass_result.jnii")
    }

    #[test]
    fn summarises_whole_volume_and_planes() {
        let report = DatasetReport::build(&entry()).unwrap();
        assert_eq!(report.shape, [3, 2, 2, 2]);
        assert_eq!(report.overall.min, 0.0);
        assert_eq!(report.overall.max, 12.0);
        assert_eq!(report.gates.len(), 2);
        // x = 1 plane of gate 1 holds 5..=8
        assert_eq!(report.center_plane_max, 8.0);
        assert_eq!(report.edge_plane_max, 4.0);
    }

    #[test]
    fn text_mentions_media_and_detection_rate() {
        let mut entry = entry();
        entry.metadata = SessionMetadata {
            photons: Some(1000),
            detected_photons: Some(42),
            media: vec![Medium {
                n: Some(1.52),
                mua: Some(0.0001),
                mus: Some(0.0),
                g: None,
            }],
            forward: Some(Forward {
                t0: 0.0,
                t1: 5.0e-9,
                dt: 1.0e-9,
            }),
        };
        let text = DatasetReport::build(&entry).unwrap().to_string();
        assert!(text.contains("n=1.52"));
        assert!(text.contains("g=N/A"));
        assert!(text.contains("detection rate: 4.200%"));
        assert!(text.contains("time window implies 5 gates, volume has 2"));
    }

    #[test]
    fn text_notes_missing_metadata() {
        let text = DatasetReport::build(&entry()).unwrap().to_string();
        assert!(text.contains("no metadata found"));
    }
}
