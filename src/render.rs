//! Colour-mapped images of fluence slices.
//!
//! The core hands over a 2-D slice and an optional `(min, max)` scale; values
//! outside the scale are clamped. Without a scale the slice's own finite range
//! is used.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::ArrayView2;
use palette::{Mix, Srgb};
use rayon::prelude::*;

use crate::aggregator::DatasetEntry;
use crate::enums::{ColorMap, Interpolation, Origin};
use crate::error::{FluenceError, Result};
use crate::normalizer::GateRange;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const NAN_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub colormap: ColorMap,
    pub origin: Origin,
    /// Magnification applied to every slice.
    pub pixel_scale: u32,
    pub interpolation: Interpolation,
    /// How many leading gates a strip or grid shows.
    pub max_gates: usize,
    /// Blank pixels between tiles.
    pub gutter: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            colormap: ColorMap::Hot,
            origin: Origin::LowerLeft,
            pixel_scale: 4,
            interpolation: Interpolation::Nearest,
            max_gates: 5,
            gutter: 2,
        }
    }
}

impl ColorMap {
    /// Colour for a normalised value in `[0, 1]`.
    pub fn color_at(self, t: f32) -> Rgb<u8> {
        let t = t.clamp(0.0, 1.0);
        let color: Srgb<f32> = match self {
            ColorMap::Gray => Srgb::new(t, t, t),
            ColorMap::Hot => {
                // black → red → yellow → white in equal thirds
                let stops = [
                    Srgb::new(0.0, 0.0, 0.0),
                    Srgb::new(1.0, 0.0, 0.0),
                    Srgb::new(1.0, 1.0, 0.0),
                    Srgb::new(1.0, 1.0, 1.0),
                ];
                let scaled = t * 3.0;
                let segment = (scaled.floor() as usize).min(2);
                stops[segment].mix(stops[segment + 1], scaled - segment as f32)
            }
        };
        let rgb: Srgb<u8> = color.into_format();
        Rgb([rgb.red, rgb.green, rgb.blue])
    }
}

/// Finite min/max of a slice; `None` when it holds no finite value.
fn auto_scale(slice: &ArrayView2<'_, f32>) -> Option<(f32, f32)> {
    slice
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[inline]
fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

/// Render a slice: rows become image rows, columns become image columns.
///
/// With `Origin::LowerLeft` row 0 is drawn at the bottom.
pub fn slice_to_image(
    slice: &ArrayView2<'_, f32>,
    scale: Option<(f32, f32)>,
    options: &RenderOptions,
) -> Result<RgbImage> {
    let (height, width) = slice.dim();
    if height == 0 || width == 0 {
        return Err(FluenceError::EmptyInput);
    }
    let (min, max) = scale.or_else(|| auto_scale(slice)).unwrap_or((0.0, 0.0));
    let colormap = options.colormap;

    let pixel_data: Vec<u8> = (0..height)
        .into_par_iter()
        .flat_map_iter(|y| {
            let row = match options.origin {
                Origin::LowerLeft => height - 1 - y,
                Origin::UpperLeft => y,
            };
            (0..width).flat_map(move |x| {
                let value = slice[[row, x]];
                let Rgb(px) = if value.is_nan() {
                    NAN_COLOR
                } else {
                    colormap.color_at(normalize(value, min, max))
                };
                px
            })
        })
        .collect();

    let image = RgbImage::from_raw(width as u32, height as u32, pixel_data)
        .ok_or_else(|| FluenceError::Format("pixel buffer does not fit image".to_string()))?;

    let scale = options.pixel_scale.max(1);
    if scale == 1 {
        return Ok(image);
    }
    let filter = match options.interpolation {
        Interpolation::Nearest => FilterType::Nearest,
        Interpolation::Bilinear => FilterType::Triangle,
    };
    let (Some(scaled_width), Some(scaled_height)) = (
        image.width().checked_mul(scale),
        image.height().checked_mul(scale),
    ) else {
        return Err(FluenceError::Format(format!(
            "pixel scale {scale} is too large for a {}x{} slice",
            image.width(),
            image.height()
        )));
    };
    Ok(imageops::resize(&image, scaled_width, scaled_height, filter))
}

/// The Z-middle slice of the first `max_gates` gates of one dataset, side by
/// side. Each gate uses its entry in `ranges` when given, else auto-scales.
pub fn gate_strip(
    entry: &DatasetEntry,
    ranges: Option<&[GateRange]>,
    options: &RenderOptions,
) -> Result<RgbImage> {
    let tiles = gate_tiles(entry, ranges, options)?;
    Ok(tile(vec![tiles], options.gutter))
}

/// Rows are datasets in registration order, columns are gates; every tile in
/// a column shares that gate's range.
pub fn comparison_grid(
    entries: &[DatasetEntry],
    ranges: &[GateRange],
    options: &RenderOptions,
) -> Result<RgbImage> {
    if entries.is_empty() {
        return Err(FluenceError::EmptyInput);
    }
    let rows = entries
        .iter()
        .map(|entry| gate_tiles(entry, Some(ranges), options))
        .collect::<Result<Vec<_>>>()?;
    Ok(tile(rows, options.gutter))
}

pub fn save(image: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    image.save(path)?;
    log::info!(
        "saved {}x{} image to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

fn gate_tiles(
    entry: &DatasetEntry,
    ranges: Option<&[GateRange]>,
    options: &RenderOptions,
) -> Result<Vec<RgbImage>> {
    let gates = entry.volume.gate_count().min(options.max_gates);
    (0..gates)
        .map(|gate| {
            let slice = entry.volume.center_slice(gate)?;
            slice_to_image(&slice, gate_scale(ranges, gate)?, options)
        })
        .collect()
}

fn gate_scale(ranges: Option<&[GateRange]>, gate: usize) -> Result<Option<(f32, f32)>> {
    let Some(ranges) = ranges else {
        return Ok(None);
    };
    ranges
        .iter()
        .find(|range| range.gate_index == gate)
        .map(|range| Some(range.bounds()))
        .ok_or(FluenceError::IndexOutOfRange {
            dimension: "gate",
            index: gate,
            extent: ranges.len(),
        })
}

/// Lay out rows of tiles on a white canvas. Cells are sized to the largest
/// tile.
fn tile(rows: Vec<Vec<RgbImage>>, gutter: u32) -> RgbImage {
    let cell_w = rows.iter().flatten().map(|t| t.width()).max().unwrap_or(0);
    let cell_h = rows.iter().flatten().map(|t| t.height()).max().unwrap_or(0);
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
    let row_count = rows.len() as u32;

    let width = columns * cell_w + columns.saturating_sub(1) * gutter;
    let height = row_count * cell_h + row_count.saturating_sub(1) * gutter;
    let mut canvas = RgbImage::from_pixel(width.max(1), height.max(1), BACKGROUND);

    for (r, row) in rows.iter().enumerate() {
        for (c, tile) in row.iter().enumerate() {
            let x = c as u32 * (cell_w + gutter);
            let y = r as u32 * (cell_h + gutter);
            imageops::replace(&mut canvas, tile, x as i64, y as i64);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::compute_gate_ranges;
    use crate::volume::FluenceVolume;
    use ndarray::{Array4, array};

    fn unscaled() -> RenderOptions {
        RenderOptions {
            pixel_scale: 1,
            ..Default::default()
        }
    }

    #[test]
    fn hot_colormap_endpoints() {
        assert_eq!(ColorMap::Hot.color_at(0.0), Rgb([0, 0, 0]));
        assert_eq!(ColorMap::Hot.color_at(1.0), Rgb([255, 255, 255]));
        assert_eq!(ColorMap::Hot.color_at(2.0 / 3.0), Rgb([255, 255, 0]));
        assert_eq!(ColorMap::Gray.color_at(1.0), Rgb([255, 255, 255]));
    }

    #[test]
    fn origin_lower_left_puts_first_row_at_bottom() {
        let slice = array![[0.0f32, 0.0, 0.0], [1.0, 1.0, 1.0]];
        let image = slice_to_image(&slice.view(), None, &unscaled()).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(*image.get_pixel(0, 1), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(0, 0), Rgb([255, 255, 255]));

        let options = RenderOptions {
            origin: Origin::UpperLeft,
            ..unscaled()
        };
        let image = slice_to_image(&slice.view(), None, &options).unwrap();
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn explicit_scale_clamps_values() {
        let slice = array![[5.0f32, -5.0]];
        let image = slice_to_image(&slice.view(), Some((0.0, 1.0)), &unscaled()).unwrap();
        assert_eq!(*image.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(1, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn constant_slice_maps_to_low_end() {
        let slice = array![[2.0f32, 2.0], [2.0, 2.0]];
        let image = slice_to_image(&slice.view(), None, &unscaled()).unwrap();
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn pixel_scale_magnifies() {
        let slice = array![[0.0f32, 1.0]];
        let options = RenderOptions {
            pixel_scale: 3,
            ..Default::default()
        };
        let image = slice_to_image(&slice.view(), None, &options).unwrap();
        assert_eq!(image.dimensions(), (6, 3));
        assert_eq!(*image.get_pixel(0, 2), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(5, 0), Rgb([255, 255, 255]));

        let smooth = RenderOptions {
            interpolation: Interpolation::Bilinear,
            ..options
        };
        let image = slice_to_image(&slice.view(), None, &smooth).unwrap();
        assert_eq!(image.dimensions(), (6, 3));
    }

    #[test]
    fn grid_has_one_row_per_dataset_and_one_column_per_gate() {
        let volume = FluenceVolume::new(Array4::from_shape_fn((4, 6, 4, 7), |(x, y, _, t)| {
            (x + y + t) as f32
        }));
        let entries = vec![
            DatasetEntry::new("Air", volume.clone(), "air.jnii"),
            DatasetEntry::new("Water", volume, "water.jnii"),
        ];
        let ranges = compute_gate_ranges(&entries).unwrap();
        let options = unscaled();
        let grid = comparison_grid(&entries, &ranges, &options).unwrap();
        // 5 gates of 6 px plus 4 gutters; 2 rows of 4 px plus 1 gutter
        assert_eq!(grid.dimensions(), (5 * 6 + 4 * 2, 2 * 4 + 2));

        let strip = gate_strip(&entries[0], None, &options).unwrap();
        assert_eq!(strip.dimensions(), (5 * 6 + 4 * 2, 4));
    }

    #[test]
    fn missing_gate_range_is_an_error() {
        let volume = FluenceVolume::new(Array4::zeros((2, 2, 2, 3)));
        let entry = DatasetEntry::new("Glass", volume, "glass.jnii");
        let ranges = [GateRange {
            gate_index: 0,
            min: 0.0,
            max: 1.0,
        }];
        assert!(matches!(
            gate_strip(&entry, Some(&ranges), &unscaled()),
            Err(FluenceError::IndexOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn pixel_scale_that_overflows_the_image_size_is_an_error() {
        let slice = array![[0.0f32, 1.0], [2.0, 3.0]];
        let options = RenderOptions {
            pixel_scale: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            slice_to_image(&slice.view(), None, &options),
            Err(FluenceError::Format(_))
        ));
    }
}
