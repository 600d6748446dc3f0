//! Typed handles shared across the ncdap crates.
//!
//! A [`NodeId`] is a non-owning reference into a metadata tree arena; it is only meaningful
//! together with the tree that issued it. A [`CacheNodeId`] identifies one fetched payload for
//! the lifetime of the process and is handed out by a global counter.
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

#[derive(Debug, Copy, Clone, Eq, PartialOrd, Ord, PartialEq, Serialize, Deserialize, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Position of the node in its arena
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialOrd, Ord, PartialEq, Serialize, Deserialize, Hash)]
pub struct CacheNodeId(u64);

static NEXT_CACHE_NODE_ID: AtomicU64 = AtomicU64::new(0);

impl CacheNodeId {
    pub fn new() -> Self {
        Self(NEXT_CACHE_NODE_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for CacheNodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CacheNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
