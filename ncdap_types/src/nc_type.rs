use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Element type of a leaf variable, as declared by the remote metadata or requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NcType {
    /// Not a type; containers carry this.
    Nat,
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
    UByte,
    UShort,
    UInt,
    Int64,
    UInt64,
    String,
    Url,
}

impl NcType {
    /// Size in bytes of one element in its fixed-width encoding.
    ///
    /// Variable-length types report zero; their footprint depends on the values.
    pub fn size(&self) -> usize {
        match self {
            Self::Nat | Self::String | Self::Url => 0,
            Self::Byte | Self::Char | Self::UByte => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double | Self::Int64 | Self::UInt64 => 8,
        }
    }

    /// Integer or floating point types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Short
                | Self::Int
                | Self::Float
                | Self::Double
                | Self::UByte
                | Self::UShort
                | Self::UInt
                | Self::Int64
                | Self::UInt64
        )
    }

    /// Types whose values are variable-length strings.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String | Self::Url)
    }

    /// Single byte types that may stand in for characters.
    pub fn is_byte_like(&self) -> bool {
        matches!(self, Self::Char | Self::Byte | Self::UByte)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nat => "nat",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::UByte => "ubyte",
            Self::UShort => "ushort",
            Self::UInt => "uint",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::String => "string",
            Self::Url => "url",
        }
    }
}

impl Display for NcType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NcType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.to_ascii_lowercase().as_str() {
            "byte" | "int8" => Self::Byte,
            "char" => Self::Char,
            "short" | "int16" => Self::Short,
            "int" | "int32" => Self::Int,
            "float" | "float32" => Self::Float,
            "double" | "float64" => Self::Double,
            "ubyte" | "uint8" => Self::UByte,
            "ushort" | "uint16" => Self::UShort,
            "uint" | "uint32" => Self::UInt,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "string" => Self::String,
            "url" => Self::Url,
            _ => return Err(format!("unrecognized element type: {s}")),
        };
        Ok(t)
    }
}
