use crate::enums::Axis;
use crate::error::{FluenceError, Result};

use ndarray::Array4;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::Axis as NdAxis;
use ndarray::s;

pub(crate) const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

/// Number of elements in `shape`, or `Format` when the product does not fit
/// in `usize`.
pub(crate) fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
        .ok_or_else(|| FluenceError::Format(format!("shape {shape:?} is too large")))
}

/// Size in bytes of an `f32` array with `shape`.
pub(crate) fn byte_len(shape: &[usize]) -> Result<usize> {
    element_count(shape)?
        .checked_mul(FLOAT_SIZE)
        .ok_or_else(|| FluenceError::Format(format!("shape {shape:?} is too large")))
}

/// Time-gated fluence data with dimensions `[X, Y, Z, T]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FluenceVolume {
    data: Array4<f32>,
}

impl FluenceVolume {
    pub fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    /// Build a volume from row-major values, failing when the count does not
    /// match the shape.
    pub fn from_shape_vec(shape: [usize; 4], values: Vec<f32>) -> Result<Self> {
        let expected = byte_len(&shape)?;
        let actual = values.len() * FLOAT_SIZE;
        if actual != expected {
            return Err(FluenceError::SizeMismatch {
                shape: shape.to_vec(),
                expected,
                actual,
            });
        }
        let data = Array4::from_shape_vec(shape, values)
            .map_err(|e| FluenceError::Format(e.to_string()))?;
        Ok(Self { data })
    }

    /// Get the dimensions of the volume (x, y, z, gates)
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    pub fn shape(&self) -> [usize; 4] {
        let (x, y, z, t) = self.data.dim();
        [x, y, z, t]
    }

    pub fn gate_count(&self) -> usize {
        self.data.len_of(NdAxis(3))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    /// The 3-D spatial field recorded in one time gate.
    pub fn gate(&self, gate: usize) -> Result<ArrayView3<'_, f32>> {
        self.check_gate(gate)?;
        Ok(self.data.index_axis(NdAxis(3), gate))
    }

    /// Middle index of a spatial axis, `extent / 2`.
    pub fn middle_index(&self, axis: Axis) -> usize {
        self.data.len_of(NdAxis(axis.index())) / 2
    }

    /// Fix one spatial axis at `index` and one gate at `gate`.
    ///
    /// The remaining two spatial axes keep their declared order: fixing X
    /// yields `(Y, Z)`, fixing Y yields `(X, Z)` and fixing Z yields `(X, Y)`.
    pub fn slice(&self, axis: Axis, index: usize, gate: usize) -> Result<ArrayView2<'_, f32>> {
        let extent = self.data.len_of(NdAxis(axis.index()));
        if index >= extent {
            return Err(FluenceError::IndexOutOfRange {
                dimension: axis.name(),
                index,
                extent,
            });
        }
        self.check_gate(gate)?;

        let view = match axis {
            Axis::X => self.data.slice(s![index, .., .., gate]),
            Axis::Y => self.data.slice(s![.., index, .., gate]),
            Axis::Z => self.data.slice(s![.., .., index, gate]),
        };
        Ok(view)
    }

    /// Z-middle slice of a gate, the conventional display plane.
    pub fn center_slice(&self, gate: usize) -> Result<ArrayView2<'_, f32>> {
        self.slice(Axis::Z, self.middle_index(Axis::Z), gate)
    }

    fn check_gate(&self, gate: usize) -> Result<()> {
        let extent = self.gate_count();
        if gate >= extent {
            return Err(FluenceError::IndexOutOfRange {
                dimension: "gate",
                index: gate,
                extent,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(shape: [usize; 4]) -> FluenceVolume {
        let n: usize = shape.iter().product();
        FluenceVolume::from_shape_vec(shape, (0..n).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn center_slice_of_small_volume_is_x_by_y() {
        let volume = ramp([4, 4, 4, 2]);
        let slice = volume.center_slice(0).unwrap();
        assert_eq!(slice.dim(), (4, 4));
        assert_eq!(volume.middle_index(Axis::Z), 2);
    }

    #[test]
    fn slices_keep_remaining_axes_in_order() {
        let volume = ramp([2, 3, 5, 2]);
        assert_eq!(volume.slice(Axis::X, 1, 0).unwrap().dim(), (3, 5));
        assert_eq!(volume.slice(Axis::Y, 2, 1).unwrap().dim(), (2, 5));
        assert_eq!(volume.slice(Axis::Z, 4, 1).unwrap().dim(), (2, 3));
    }

    #[test]
    fn slice_values_follow_row_major_layout() {
        let volume = ramp([2, 3, 5, 2]);
        let slice = volume.slice(Axis::Z, 4, 1).unwrap();
        // flat index of [x, y, 4, 1] is ((x * 3 + y) * 5 + 4) * 2 + 1
        assert_eq!(slice[[1, 2]], (((1 * 3 + 2) * 5 + 4) * 2 + 1) as f32);
    }

    #[test]
    fn gate_past_the_end_is_rejected() {
        let volume = ramp([4, 4, 4, 2]);
        let err = volume.slice(Axis::Z, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            FluenceError::IndexOutOfRange { dimension: "gate", index: 2, extent: 2 }
        ));
    }

    #[test]
    fn spatial_index_past_the_end_is_rejected() {
        let volume = ramp([4, 4, 4, 2]);
        assert!(matches!(
            volume.slice(Axis::Y, 4, 0),
            Err(FluenceError::IndexOutOfRange { dimension: "Y", .. })
        ));
    }

    #[test]
    fn shape_and_value_count_must_agree() {
        let err = FluenceVolume::from_shape_vec([2, 2, 2, 2], vec![0.0; 15]).unwrap_err();
        assert!(matches!(
            err,
            FluenceError::SizeMismatch { expected: 64, actual: 60, .. }
        ));
    }

    #[test]
    fn oversized_shape_is_an_error_not_an_overflow() {
        let shape = [1usize << 32, 1 << 32, 2, 1];
        assert!(matches!(element_count(&shape), Err(FluenceError::Format(_))));
        assert!(matches!(
            FluenceVolume::from_shape_vec(shape, vec![0.0; 4]),
            Err(FluenceError::Format(_))
        ));
        assert!(matches!(byte_len(&[usize::MAX / 2, 1, 1, 1]), Err(FluenceError::Format(_))));
    }
}
