// Platform identifiers and conversion directions.
//
// A `ConvertFormat` is the (source, target) pair that selects a per-game
// patch table and is passed into every patch operation.

use std::fmt;
use std::str::FromStr;

/// Platform a save file was written by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SaveFormat {
    Ps3,
    Ps4,
    Pc,
}

impl SaveFormat {
    /// Lowercase platform name. Also used as the default output extension.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ps3 => "ps3",
            Self::Ps4 => "ps4",
            Self::Pc => "pc",
        }
    }

    /// Only the PS3 (Cell) stores multi-byte values big-endian.
    pub fn is_big_endian(self) -> bool {
        matches!(self, Self::Ps3)
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ps3" => Ok(Self::Ps3),
            "ps4" => Ok(Self::Ps4),
            "pc" => Ok(Self::Pc),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

/// Source and target platform of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConvertFormat {
    pub source: SaveFormat,
    pub target: SaveFormat,
}

impl ConvertFormat {
    pub const PS3_TO_PC: Self = Self::new(SaveFormat::Ps3, SaveFormat::Pc);
    pub const PC_TO_PS3: Self = Self::new(SaveFormat::Pc, SaveFormat::Ps3);
    pub const PS4_TO_PC: Self = Self::new(SaveFormat::Ps4, SaveFormat::Pc);
    pub const PC_TO_PS4: Self = Self::new(SaveFormat::Pc, SaveFormat::Ps4);

    pub const fn new(source: SaveFormat, target: SaveFormat) -> Self {
        Self { source, target }
    }

    /// The opposite direction.
    pub const fn reversed(self) -> Self {
        Self {
            source: self.target,
            target: self.source,
        }
    }

    /// True when the conversion crosses a byte-order boundary.
    pub fn swaps_endianness(self) -> bool {
        self.source.is_big_endian() != self.target.is_big_endian()
    }
}

impl fmt::Display for ConvertFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-to-{}", self.source, self.target)
    }
}

impl FromStr for ConvertFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .split_once("-to-")
            .ok_or_else(|| FormatParseError(s.to_string()))?;
        Ok(Self {
            source: source.parse()?,
            target: target.parse()?,
        })
    }
}

/// A platform or direction string that names no known format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown save format '{0}'")]
pub struct FormatParseError(pub String);
