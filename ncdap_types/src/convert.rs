//! The conversion matrix between stored leaf types and requested output types.
//!
//! Numeric pairs convert with `as` semantics (truncation toward zero for float to integer,
//! saturation at the bounds, wrapping for integer narrowing). Text converts only to and from the
//! single byte types.
use crate::{Error, NcType, Result, Values};

/// Reject a (stored, requested) pair that has no conversion, without touching any data.
pub fn check_conversion(src: NcType, dst: NcType) -> Result<()> {
    let ok = match (src, dst) {
        (NcType::Nat, _) | (_, NcType::Nat) => false,
        (s, d) if s.is_string() || d.is_string() => {
            (s.is_string() && d.is_string()) || (s.is_string() && d == NcType::Char)
        }
        (s, NcType::Char) => s.is_byte_like(),
        (NcType::Char, d) => d.is_byte_like(),
        (s, d) => s.is_numeric() && d.is_numeric(),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::TypeMismatch { src, dst })
    }
}

macro_rules! cast_numeric {
    ($values:expr, $variant:ident, $t:ty) => {
        match $values {
            Values::Byte(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::Char(v) | Values::UByte(v) => {
                Values::$variant(v.into_iter().map(|x| x as $t).collect())
            }
            Values::Short(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::Int(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::Float(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::Double(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::UShort(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::UInt(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::Int64(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            Values::UInt64(v) => Values::$variant(v.into_iter().map(|x| x as $t).collect()),
            other @ (Values::String(_) | Values::Url(_)) => {
                return Err(Error::TypeMismatch {
                    src: other.nc_type(),
                    dst: NcType::$variant,
                });
            }
        }
    };
}

/// Convert every element of `values` to `dst`.
///
/// Strings converted to [`NcType::Char`] are concatenated byte-wise; callers that need
/// fixed-width character rows slice each string themselves before converting.
pub fn convert(values: Values, dst: NcType) -> Result<Values> {
    let src = values.nc_type();
    check_conversion(src, dst)?;
    if src == dst {
        return Ok(values);
    }
    let out = match dst {
        NcType::Char => match values {
            Values::String(v) | Values::Url(v) => {
                Values::Char(v.into_iter().flat_map(String::into_bytes).collect())
            }
            Values::Byte(v) => Values::Char(v.into_iter().map(|x| x as u8).collect()),
            Values::UByte(v) => Values::Char(v),
            other => {
                return Err(Error::TypeMismatch {
                    src: other.nc_type(),
                    dst,
                });
            }
        },
        NcType::String => match values {
            Values::Url(v) => Values::String(v),
            other => return Err(Error::TypeMismatch { src: other.nc_type(), dst }),
        },
        NcType::Url => match values {
            Values::String(v) => Values::Url(v),
            other => return Err(Error::TypeMismatch { src: other.nc_type(), dst }),
        },
        NcType::Byte => cast_numeric!(values, Byte, i8),
        NcType::UByte => cast_numeric!(values, UByte, u8),
        NcType::Short => cast_numeric!(values, Short, i16),
        NcType::UShort => cast_numeric!(values, UShort, u16),
        NcType::Int => cast_numeric!(values, Int, i32),
        NcType::UInt => cast_numeric!(values, UInt, u32),
        NcType::Int64 => cast_numeric!(values, Int64, i64),
        NcType::UInt64 => cast_numeric!(values, UInt64, u64),
        NcType::Float => cast_numeric!(values, Float, f32),
        NcType::Double => cast_numeric!(values, Double, f64),
        NcType::Nat => return Err(Error::TypeMismatch { src, dst }),
    };
    Ok(out)
}
