//! Helper types to express memory size.

use std::str::FromStr;

/// Memory size in bytes, written as a plain number or with a `K`, `M` or `G` suffix.
///
/// Suffixes are powers of 1024 and case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySize(usize);

impl MemorySize {
    pub const fn from_bytes(bytes: usize) -> Self {
        Self(bytes)
    }

    /// Number of bytes.
    pub fn bytes(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for MemorySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemorySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, multiplier) = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
            Some('K') => (&s[..s.len() - 1], 1024),
            Some('M') => (&s[..s.len() - 1], 1024 * 1024),
            Some('G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
            _ => (s, 1),
        };
        let n = digits
            .parse::<usize>()
            .map_err(|e| format!("cannot parse memory size '{s}': {e}"))?;
        n.checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| format!("memory size '{s}' is too large"))
    }
}

impl From<MemorySize> for usize {
    fn from(size: MemorySize) -> Self {
        size.0
    }
}
