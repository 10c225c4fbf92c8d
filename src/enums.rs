use std::fmt;
use std::str::FromStr;

use crate::error::FluenceError;

/// Spatial axis of a fluence volume, in declared `[X, Y, Z, T]` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    /// Position of the axis in the volume's dimension tuple.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMap {
    /// Black → red → yellow → white.
    #[default]
    Hot,
    Gray,
}

impl FromStr for ColorMap {
    type Err = FluenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hot" => Ok(ColorMap::Hot),
            "gray" | "grey" => Ok(ColorMap::Gray),
            other => Err(FluenceError::Format(format!("unknown colormap '{other}'"))),
        }
    }
}

/// Where row 0 of a slice ends up in the rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    LowerLeft,
    UpperLeft,
}

/// Filter used when magnifying a rendered slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
}

/// Compression scheme named by `_ArrayZipType_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Zlib,
    Gzip,
    Deflate,
}

impl Compression {
    pub fn tag(self) -> &'static str {
        match self {
            Compression::Zlib => "zlib",
            Compression::Gzip => "gzip",
            Compression::Deflate => "deflate",
        }
    }
}

impl FromStr for Compression {
    type Err = FluenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zlib" => Ok(Compression::Zlib),
            "gzip" => Ok(Compression::Gzip),
            "deflate" => Ok(Compression::Deflate),
            other => Err(FluenceError::UnsupportedCompression(other.to_string())),
        }
    }
}
