//! Building blocks for session configuration, parsed with [`clap`].
pub mod cache;
pub mod memory_size;
