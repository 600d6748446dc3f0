use crate::{Error, NcType, Result};

/// A run of values of a single element type.
///
/// This is what a payload cursor hands back for a leaf read and what the extraction walk
/// accumulates into the caller's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Byte(Vec<i8>),
    Char(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    UByte(Vec<u8>),
    UShort(Vec<u16>),
    UInt(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    String(Vec<String>),
    Url(Vec<String>),
}

/// Applies the same expression to the vector held by any variant.
macro_rules! each_variant {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::Byte($v) => $body,
            Values::Char($v) => $body,
            Values::Short($v) => $body,
            Values::Int($v) => $body,
            Values::Float($v) => $body,
            Values::Double($v) => $body,
            Values::UByte($v) => $body,
            Values::UShort($v) => $body,
            Values::UInt($v) => $body,
            Values::Int64($v) => $body,
            Values::UInt64($v) => $body,
            Values::String($v) => $body,
            Values::Url($v) => $body,
        }
    };
}

/// Same as `each_variant`, but rebuilds the variant from the expression's result.
macro_rules! map_variant {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::Byte($v) => Values::Byte($body),
            Values::Char($v) => Values::Char($body),
            Values::Short($v) => Values::Short($body),
            Values::Int($v) => Values::Int($body),
            Values::Float($v) => Values::Float($body),
            Values::Double($v) => Values::Double($body),
            Values::UByte($v) => Values::UByte($body),
            Values::UShort($v) => Values::UShort($body),
            Values::UInt($v) => Values::UInt($body),
            Values::Int64($v) => Values::Int64($body),
            Values::UInt64($v) => Values::UInt64($body),
            Values::String($v) => Values::String($body),
            Values::Url($v) => Values::Url($body),
        }
    };
}

fn reserve<T>(capacity: usize, nc_type: NcType) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| Error::AllocationFailure {
            count: capacity,
            nc_type,
        })?;
    Ok(v)
}

impl Values {
    /// Create an empty run of `nc_type` values with room for `capacity` elements.
    ///
    /// Fails with [`Error::AllocationFailure`] instead of aborting when the reservation cannot
    /// be satisfied.
    pub fn try_with_capacity(nc_type: NcType, capacity: usize) -> Result<Self> {
        Ok(match nc_type {
            NcType::Nat => return Err(Error::NoValues(nc_type)),
            NcType::Byte => Self::Byte(reserve(capacity, nc_type)?),
            NcType::Char => Self::Char(reserve(capacity, nc_type)?),
            NcType::Short => Self::Short(reserve(capacity, nc_type)?),
            NcType::Int => Self::Int(reserve(capacity, nc_type)?),
            NcType::Float => Self::Float(reserve(capacity, nc_type)?),
            NcType::Double => Self::Double(reserve(capacity, nc_type)?),
            NcType::UByte => Self::UByte(reserve(capacity, nc_type)?),
            NcType::UShort => Self::UShort(reserve(capacity, nc_type)?),
            NcType::UInt => Self::UInt(reserve(capacity, nc_type)?),
            NcType::Int64 => Self::Int64(reserve(capacity, nc_type)?),
            NcType::UInt64 => Self::UInt64(reserve(capacity, nc_type)?),
            NcType::String => Self::String(reserve(capacity, nc_type)?),
            NcType::Url => Self::Url(reserve(capacity, nc_type)?),
        })
    }

    pub fn nc_type(&self) -> NcType {
        match self {
            Self::Byte(_) => NcType::Byte,
            Self::Char(_) => NcType::Char,
            Self::Short(_) => NcType::Short,
            Self::Int(_) => NcType::Int,
            Self::Float(_) => NcType::Float,
            Self::Double(_) => NcType::Double,
            Self::UByte(_) => NcType::UByte,
            Self::UShort(_) => NcType::UShort,
            Self::UInt(_) => NcType::UInt,
            Self::Int64(_) => NcType::Int64,
            Self::UInt64(_) => NcType::UInt64,
            Self::String(_) => NcType::String,
            Self::Url(_) => NcType::Url,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate in-memory footprint, used for cache accounting.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::String(v) | Self::Url(v) => v.iter().map(String::len).sum(),
            _ => self.len() * self.nc_type().size(),
        }
    }

    /// The `count` values starting at `offset`, or `None` if that run is not fully present.
    pub fn range(&self, offset: usize, count: usize) -> Option<Self> {
        let end = offset.checked_add(count)?;
        if end > self.len() {
            return None;
        }
        Some(map_variant!(self, v => v[offset..end].to_vec()))
    }

    /// Move every value of `other` onto the end of `self`.
    pub fn append(&mut self, other: Self) -> Result<()> {
        match (self, other) {
            (Self::Byte(a), Self::Byte(b)) => a.extend(b),
            (Self::Char(a), Self::Char(b)) => a.extend(b),
            (Self::Short(a), Self::Short(b)) => a.extend(b),
            (Self::Int(a), Self::Int(b)) => a.extend(b),
            (Self::Float(a), Self::Float(b)) => a.extend(b),
            (Self::Double(a), Self::Double(b)) => a.extend(b),
            (Self::UByte(a), Self::UByte(b)) => a.extend(b),
            (Self::UShort(a), Self::UShort(b)) => a.extend(b),
            (Self::UInt(a), Self::UInt(b)) => a.extend(b),
            (Self::Int64(a), Self::Int64(b)) => a.extend(b),
            (Self::UInt64(a), Self::UInt64(b)) => a.extend(b),
            (Self::String(a), Self::String(b)) => a.extend(b),
            (Self::Url(a), Self::Url(b)) => a.extend(b),
            (this, other) => {
                return Err(Error::MixedTypes {
                    expected: this.nc_type(),
                    actual: other.nc_type(),
                });
            }
        }
        Ok(())
    }

    /// Reserve room for `additional` more values.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let nc_type = self.nc_type();
        each_variant!(self, v => v.try_reserve(additional))
            .map_err(|_| Error::AllocationFailure {
                count: additional,
                nc_type,
            })
    }

    /// String contents, for the string-typed variants.
    pub fn strings(&self) -> Option<&[String]> {
        match self {
            Self::String(v) | Self::Url(v) => Some(v),
            _ => None,
        }
    }
}

/// A Rust scalar that maps one-to-one onto a numeric [`NcType`].
pub trait NcElement: Copy + Default + std::fmt::Debug + Send + Sync + 'static {
    const NC_TYPE: NcType;

    fn into_values(values: Vec<Self>) -> Values;

    /// Take the vector out of `values` when it holds this element type.
    fn from_values(values: Values) -> Option<Vec<Self>>;
}

macro_rules! impl_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl NcElement for $t {
                const NC_TYPE: NcType = NcType::$variant;

                fn into_values(values: Vec<Self>) -> Values {
                    Values::$variant(values)
                }

                fn from_values(values: Values) -> Option<Vec<Self>> {
                    match values {
                        Values::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<Vec<$t>> for Values {
                fn from(values: Vec<$t>) -> Self {
                    Values::$variant(values)
                }
            }
        )*
    };
}

impl_element!(
    i8 => Byte,
    u8 => UByte,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
);

impl From<Vec<String>> for Values {
    fn from(values: Vec<String>) -> Self {
        Self::String(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn range_and_append() {
        let values = Values::from(vec![0i32, 1, 2, 3, 4, 5]);
        let mut out = Values::try_with_capacity(NcType::Int, 4).unwrap();
        out.append(values.range(1, 2).unwrap()).unwrap();
        out.append(values.range(4, 2).unwrap()).unwrap();
        assert_eq!(out, Values::Int(vec![1, 2, 4, 5]));
        assert!(values.range(5, 2).is_none());
        assert!(values.range(usize::MAX, 2).is_none());
    }

    #[test]
    fn append_rejects_mixed_types() {
        let mut out = Values::Int(vec![]);
        let err = out.append(Values::Double(vec![1.0])).unwrap_err();
        assert_eq!(err.to_string(), "cannot append double values to a int buffer");
    }

    #[test]
    fn byte_size_counts_string_contents() {
        assert_eq!(Values::from(vec![1.0f64, 2.0]).byte_size(), 16);
        assert_eq!(
            Values::String(vec!["abc".into(), "de".into()]).byte_size(),
            5
        );
    }

    #[test]
    fn nat_has_no_values() {
        assert!(matches!(
            Values::try_with_capacity(NcType::Nat, 1),
            Err(Error::NoValues(NcType::Nat))
        ));
    }

    #[test]
    fn element_round_trip() {
        let v = u16::into_values(vec![7, 8]);
        assert_eq!(v.nc_type(), NcType::UShort);
        assert_eq!(u16::from_values(v.clone()), Some(vec![7, 8]));
        assert_eq!(i32::from_values(v), None);
    }
}
