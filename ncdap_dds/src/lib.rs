//! An in-memory, read-only view of a remote dataset's metadata tree (its DDS).
//!
//! The tree is an arena: nodes refer to each other with [`NodeId`] handles, and every other crate
//! holds handles rather than references, so constraint expressions can be cloned, detached and
//! re-attached freely without borrowing the tree.
mod builder;
mod tree;

pub use builder::DdsBuilder;
pub use ncdap_id::NodeId;
pub use tree::{Dds, Dimension, Node, NodeKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node {0} does not exist in this tree")]
    UnknownNode(NodeId),

    #[error("a {kind} node ('{name}') cannot contain other nodes")]
    NotAContainer { name: String, kind: NodeKind },

    #[error("grid '{grid}' may only contain primitive arrays")]
    GridMember { grid: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
