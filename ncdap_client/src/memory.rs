//! A payload tree held as plain Rust values.
//!
//! Decoders build one of these from a response body; tests build them by hand.
use ncdap_types::{NcType, Values};

use crate::{Content, Mode, Payload};

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryContent {
    Structure {
        name: String,
        fields: Vec<MemoryContent>,
    },
    Array {
        name: String,
        elements: Vec<MemoryContent>,
    },
    Sequence {
        name: String,
        records: Vec<MemoryContent>,
    },
    Values {
        name: String,
        values: Values,
        scalar: bool,
    },
}

impl MemoryContent {
    /// A structure instance, grid or dataset with the given fields.
    pub fn structure(name: impl Into<String>, fields: Vec<Self>) -> Self {
        Self::Structure {
            name: name.into(),
            fields,
        }
    }

    /// An array of structure instances, in row-major order.
    pub fn array(name: impl Into<String>, elements: Vec<Self>) -> Self {
        Self::Array {
            name: name.into(),
            elements,
        }
    }

    /// A sequence; each record is a structure instance.
    pub fn sequence(name: impl Into<String>, records: Vec<Self>) -> Self {
        Self::Sequence {
            name: name.into(),
            records,
        }
    }

    /// A primitive array, flattened in row-major order.
    pub fn values(name: impl Into<String>, values: Values) -> Self {
        Self::Values {
            name: name.into(),
            values,
            scalar: false,
        }
    }

    /// A single primitive value.
    pub fn scalar(name: impl Into<String>, values: Values) -> Self {
        Self::Values {
            name: name.into(),
            values,
            scalar: true,
        }
    }

    fn byte_size(&self) -> usize {
        match self {
            Self::Structure { fields: c, .. }
            | Self::Array { elements: c, .. }
            | Self::Sequence { records: c, .. } => c.iter().map(Self::byte_size).sum(),
            Self::Values { values, .. } => values.byte_size(),
        }
    }
}

impl Content for MemoryContent {
    fn name(&self) -> &str {
        match self {
            Self::Structure { name, .. }
            | Self::Array { name, .. }
            | Self::Sequence { name, .. }
            | Self::Values { name, .. } => name,
        }
    }

    fn mode(&self) -> Mode {
        match self {
            Self::Structure { .. } => Mode::Field,
            Self::Array { .. } => Mode::Array,
            Self::Sequence { .. } => Mode::Record,
            Self::Values { scalar: true, .. } => Mode::Scalar,
            Self::Values { scalar: false, .. } => Mode::Array,
        }
    }

    fn field(&self, name: &str) -> Option<&dyn Content> {
        match self {
            Self::Structure { fields, .. } => fields
                .iter()
                .find(|f| f.name() == name)
                .map(|f| f as &dyn Content),
            _ => None,
        }
    }

    fn element(&self, index: usize) -> Option<&dyn Content> {
        match self {
            Self::Array { elements: c, .. } | Self::Sequence { records: c, .. } => {
                c.get(index).map(|e| e as &dyn Content)
            }
            _ => None,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Structure { fields: c, .. }
            | Self::Array { elements: c, .. }
            | Self::Sequence { records: c, .. } => c.len(),
            Self::Values { values, .. } => values.len(),
        }
    }

    fn nc_type(&self) -> NcType {
        match self {
            Self::Values { values, .. } => values.nc_type(),
            _ => NcType::Nat,
        }
    }

    fn read(&self, offset: usize, count: usize) -> Option<Values> {
        match self {
            Self::Values { values, .. } => values.range(offset, count),
            _ => None,
        }
    }
}

/// A fetched response held in memory; its size is the sum of its values' byte sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPayload {
    root: MemoryContent,
    size: usize,
}

impl MemoryPayload {
    pub fn new(root: MemoryContent) -> Self {
        let size = root.byte_size();
        Self { root, size }
    }

    /// Override the accounted size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

impl Payload for MemoryPayload {
    fn root(&self) -> &dyn Content {
        &self.root
    }

    fn size(&self) -> usize {
        self.size
    }
}
