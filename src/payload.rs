//! Payload codec for JData annotated arrays.
//!
//! Decoding runs base-64 → inflate → `f32` reinterpretation → reshape. The
//! declared `_ArraySize_` is used as given, row-major with the last axis
//! varying fastest, so `[X, Y, Z, T]` stays `[X, Y, Z, T]`.

use std::io::{self, Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression as Level;
use flate2::read::GzDecoder;
use flate2::{Decompress, FlushDecompress, Status};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};

use crate::container::{ArraySection, ContainerRecord};
use crate::enums::Compression;
use crate::error::{FluenceError, Result};
use crate::volume::{FLOAT_SIZE, FluenceVolume, byte_len};

/// Output produced per inflate call.
const CHUNK: usize = 32 * 1024;

/// Decode the array section of a container into a volume.
pub fn decode_record(record: &ContainerRecord) -> Result<FluenceVolume> {
    decode(&record.array)
}

/// Decode an annotated array into a volume.
///
/// Inflation stops one byte past the size the declared shape needs, so an
/// oversized stream fails without being expanded in full.
///
/// # Errors
///
/// `Format` for a bad shape, `UnsupportedType` for anything but 32-bit
/// float, `Encoding` / `Decompression` for a damaged payload and
/// `SizeMismatch` when the payload does not fill the declared shape exactly
pub fn decode(section: &ArraySection) -> Result<FluenceVolume> {
    let shape = volume_shape(&section.shape)?;
    check_element_type(&section.element_type)?;
    let expected = byte_len(&shape)?;

    let values = match (&section.zip_data, &section.raw_data) {
        (Some(encoded), _) => {
            let compression = section
                .compression
                .as_deref()
                .map(str::parse::<Compression>)
                .transpose()?
                .unwrap_or_default();
            let compressed = BASE64.decode(encoded.trim())?;
            let bytes = inflate(&compressed, compression, expected)?;
            log::debug!(
                "inflated {} {} bytes to {}",
                compressed.len(),
                compression.tag(),
                bytes.len()
            );
            bytes_to_floats(&bytes, &section.shape, expected)?
        }
        (None, Some(raw)) => {
            if raw.len() * FLOAT_SIZE != expected {
                return Err(FluenceError::SizeMismatch {
                    shape: section.shape.clone(),
                    expected,
                    actual: raw.len() * FLOAT_SIZE,
                });
            }
            raw.clone()
        }
        (None, None) => {
            return Err(FluenceError::Format(
                "array section has no payload".to_string(),
            ));
        }
    };

    if let Some(zip_size) = &section.zip_size {
        let declared = byte_len(zip_size)?;
        if declared != expected {
            return Err(FluenceError::SizeMismatch {
                shape: zip_size.clone(),
                expected,
                actual: declared,
            });
        }
    }

    FluenceVolume::from_shape_vec(shape, values)
}

/// Encode a volume with the same scheme `decode` reads.
pub fn encode(volume: &FluenceVolume, compression: Compression) -> Result<ArraySection> {
    let values: Vec<f32> = volume.data().iter().copied().collect();
    let bytes: &[u8] = bytemuck::cast_slice(&values);
    let compressed = deflate(bytes, compression)?;

    Ok(ArraySection {
        element_type: "single".to_string(),
        shape: volume.shape().to_vec(),
        compression: Some(compression.tag().to_string()),
        zip_size: Some(vec![1, values.len()]),
        zip_data: Some(BASE64.encode(compressed)),
        raw_data: None,
    })
}

fn volume_shape(declared: &[usize]) -> Result<[usize; 4]> {
    if declared.contains(&0) {
        return Err(FluenceError::Format(format!(
            "shape {declared:?} has a zero extent"
        )));
    }
    match *declared {
        [x, y, z, t] => Ok([x, y, z, t]),
        [x, y, z] => Ok([x, y, z, 1]),
        _ => Err(FluenceError::Format(format!(
            "expected a [X, Y, Z] or [X, Y, Z, T] shape, got {declared:?}"
        ))),
    }
}

fn check_element_type(tag: &str) -> Result<()> {
    match tag {
        "single" | "float32" => Ok(()),
        other => Err(FluenceError::UnsupportedType(other.to_string())),
    }
}

/// Inflate at most `limit + 1` bytes; the caller treats anything but exactly
/// `limit` as a size mismatch.
fn inflate(compressed: &[u8], compression: Compression, limit: usize) -> Result<Vec<u8>> {
    match compression {
        Compression::Zlib => inflate_stream(compressed, true, limit),
        Compression::Deflate => inflate_stream(compressed, false, limit),
        Compression::Gzip => {
            let mut bytes = Vec::new();
            GzDecoder::new(compressed)
                .take(limit as u64 + 1)
                .read_to_end(&mut bytes)
                .map_err(FluenceError::Decompression)?;
            Ok(bytes)
        }
    }
}

/// Inflate a zlib or raw deflate stream, failing unless it reaches its end
/// marker.
fn inflate_stream(compressed: &[u8], zlib_header: bool, limit: usize) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(zlib_header);
    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; CHUNK];
    loop {
        let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
        let status = inflater
            .decompress(
                &compressed[in_before as usize..],
                &mut chunk,
                FlushDecompress::None,
            )
            .map_err(|e| {
                FluenceError::Decompression(io::Error::new(io::ErrorKind::InvalidData, e))
            })?;
        let produced = (inflater.total_out() - out_before) as usize;
        let room = (limit + 1).saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..produced.min(room)]);
        if bytes.len() > limit {
            return Ok(bytes);
        }
        match status {
            Status::StreamEnd => return Ok(bytes),
            Status::Ok | Status::BufError => {
                if produced == 0 && inflater.total_in() == in_before {
                    return Err(FluenceError::Decompression(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "compressed stream ended early",
                    )));
                }
            }
        }
    }
}

fn deflate(bytes: &[u8], compression: Compression) -> Result<Vec<u8>> {
    let compressed = match compression {
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Level::default());
            encoder.write_all(bytes)?;
            encoder.finish()?
        }
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Level::default());
            encoder.write_all(bytes)?;
            encoder.finish()?
        }
        Compression::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Level::default());
            encoder.write_all(bytes)?;
            encoder.finish()?
        }
    };
    Ok(compressed)
}

fn bytes_to_floats(bytes: &[u8], shape: &[usize], expected: usize) -> Result<Vec<f32>> {
    if bytes.len() != expected {
        return Err(FluenceError::SizeMismatch {
            shape: shape.to_vec(),
            expected,
            actual: bytes.len(),
        });
    }
    // Native byte order; copies into an aligned buffer.
    Ok(bytemuck::pod_collect_to_vec::<u8, f32>(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn section_from_bytes(shape: Vec<usize>, bytes: &[u8]) -> ArraySection {
        ArraySection {
            element_type: "single".to_string(),
            shape,
            compression: Some("zlib".to_string()),
            zip_size: None,
            zip_data: Some(BASE64.encode(deflate(bytes, Compression::Zlib).unwrap())),
            raw_data: None,
        }
    }

    fn sample_volume(shape: [usize; 4]) -> FluenceVolume {
        let n: usize = shape.iter().product();
        let values = (0..n).map(|i| (i as f32 * 0.37).sin() * 1e-3).collect();
        FluenceVolume::from_shape_vec(shape, values).unwrap()
    }

    #[test]
    fn decodes_512_bytes_into_4x4x4x2() {
        let values: Vec<f32> = (0..128).map(|i| i as f32).collect();
        let section = section_from_bytes(vec![4, 4, 4, 2], bytemuck::cast_slice(&values));
        let volume = decode(&section).unwrap();
        assert_eq!(volume.dim(), (4, 4, 4, 2));
        assert_eq!(volume.len(), 128);
        assert_eq!(volume.data()[[0, 0, 1, 1]], 3.0);
    }

    #[test]
    fn rejects_payload_of_500_bytes() {
        let section = section_from_bytes(vec![4, 4, 4, 2], &[0u8; 500]);
        assert!(matches!(
            decode(&section),
            Err(FluenceError::SizeMismatch { expected: 512, actual: 500, .. })
        ));
    }

    #[test]
    fn rejects_payload_with_ragged_byte_count() {
        let section = section_from_bytes(vec![1, 1, 1, 1], &[0u8; 6]);
        assert!(matches!(
            decode(&section),
            Err(FluenceError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn round_trips_bit_for_bit_with_every_compression() {
        let volume = sample_volume([3, 5, 2, 4]);
        for compression in [Compression::Zlib, Compression::Gzip, Compression::Deflate] {
            let decoded = decode(&encode(&volume, compression).unwrap()).unwrap();
            let original_bits: Vec<u32> = volume.data().iter().map(|v| v.to_bits()).collect();
            let decoded_bits: Vec<u32> = decoded.data().iter().map(|v| v.to_bits()).collect();
            assert_eq!(decoded_bits, original_bits, "{compression:?}");
        }
    }

    #[test]
    fn rejects_non_float_element_types() {
        let mut section = encode(&sample_volume([2, 2, 2, 1]), Compression::Zlib).unwrap();
        section.element_type = "double".to_string();
        assert!(matches!(
            decode(&section),
            Err(FluenceError::UnsupportedType(tag)) if tag == "double"
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        let mut section = encode(&sample_volume([2, 2, 2, 1]), Compression::Zlib).unwrap();
        section.zip_data = Some("not*base64!".to_string());
        assert!(matches!(decode(&section), Err(FluenceError::Encoding(_))));
    }

    #[test]
    fn rejects_truncated_stream_with_every_compression() {
        let volume = sample_volume([4, 4, 4, 2]);
        for compression in [Compression::Zlib, Compression::Gzip, Compression::Deflate] {
            let mut section = encode(&volume, compression).unwrap();
            let compressed = BASE64.decode(section.zip_data.as_ref().unwrap()).unwrap();
            section.zip_data = Some(BASE64.encode(&compressed[..compressed.len() / 2]));
            assert!(
                matches!(decode(&section), Err(FluenceError::Decompression(_))),
                "{compression:?}"
            );
        }
    }

    #[test]
    fn round_trips_mostly_zero_volume_with_every_compression() {
        // Photons only reach a thin column; the rest compresses to almost nothing.
        let data = Array4::from_shape_fn((20, 20, 20, 5), |(x, y, z, t)| {
            if (8..12).contains(&x) && (8..12).contains(&y) {
                (z * 5 + t) as f32 * 0.125 + 1.0
            } else {
                0.0
            }
        });
        let volume = FluenceVolume::new(data);
        for compression in [Compression::Zlib, Compression::Gzip, Compression::Deflate] {
            let section = encode(&volume, compression).unwrap();
            let decoded = decode(&section).unwrap();
            assert_eq!(decoded, volume, "{compression:?}");
        }
    }

    #[test]
    fn decodes_all_zero_volume_far_beyond_the_output_chunk() {
        let zeros = vec![0u8; 60 * 60 * 60 * 5 * FLOAT_SIZE];
        let section = section_from_bytes(vec![60, 60, 60, 5], &zeros);
        assert!(section.zip_data.as_ref().unwrap().len() < 10_000);
        let volume = decode(&section).unwrap();
        assert_eq!(volume.dim(), (60, 60, 60, 5));
        assert!(volume.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn stops_inflating_once_past_the_declared_size() {
        let section = section_from_bytes(vec![1, 1, 1, 1], &vec![0u8; 16 << 20]);
        assert!(matches!(
            decode(&section),
            Err(FluenceError::SizeMismatch { expected: 4, actual: 5, .. })
        ));
    }

    #[test]
    fn oversized_declared_shape_is_a_format_error() {
        let section = section_from_bytes(vec![1 << 32, 1 << 32, 2, 1], &[0u8; 16]);
        assert!(matches!(decode(&section), Err(FluenceError::Format(_))));
    }

    #[test]
    fn rejects_unknown_compression() {
        let mut section = encode(&sample_volume([2, 2, 2, 1]), Compression::Zlib).unwrap();
        section.compression = Some("lz4".to_string());
        assert!(matches!(
            decode(&section),
            Err(FluenceError::UnsupportedCompression(_))
        ));
    }

    #[test]
    fn three_dimensional_shape_reads_as_single_gate() {
        let values = vec![1.5f32; 8];
        let section = section_from_bytes(vec![2, 2, 2], bytemuck::cast_slice(&values));
        assert_eq!(decode(&section).unwrap().dim(), (2, 2, 2, 1));
    }

    #[test]
    fn rejects_zero_extent_and_wrong_rank() {
        let section = section_from_bytes(vec![2, 0, 2, 1], &[]);
        assert!(matches!(decode(&section), Err(FluenceError::Format(_))));
        let section = section_from_bytes(vec![16], &[0u8; 64]);
        assert!(matches!(decode(&section), Err(FluenceError::Format(_))));
    }

    #[test]
    fn zip_size_must_agree_with_shape() {
        let mut section = encode(&sample_volume([2, 2, 2, 1]), Compression::Zlib).unwrap();
        section.zip_size = Some(vec![1, 9]);
        assert!(matches!(
            decode(&section),
            Err(FluenceError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn reads_uncompressed_array_data() {
        let section = ArraySection {
            element_type: "single".to_string(),
            shape: vec![1, 1, 2, 2],
            compression: None,
            zip_size: None,
            zip_data: None,
            raw_data: Some(vec![0.0, 1.0, 2.0, 3.0]),
        };
        let volume = decode(&section).unwrap();
        assert_eq!(volume.data()[[0, 0, 1, 0]], 2.0);
    }
}
