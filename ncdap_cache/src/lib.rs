//! Fetched payloads kept for reuse within one session.
//!
//! The cache holds at most one prefetch node, filled once with every small variable, and an LRU
//! list of nodes filled by individual variable fetches. The LRU list is bounded both by the sum
//! of its payload sizes and by its length; the prefetch node counts against neither.
use std::{collections::VecDeque, sync::Arc};

use indexmap::IndexSet;
use ncdap_client::Payload;
use ncdap_constraint::{Constraint, Projection};
use ncdap_id::{CacheNodeId, NodeId};
use tracing::debug;

/// Default bound on the summed payload size of the LRU list.
pub const DEFAULT_BYTE_BUDGET: usize = 100 * 1024 * 1024;
/// Default bound on the length of the LRU list.
pub const DEFAULT_COUNT_BUDGET: usize = 100;
/// Default element count up to which a variable is prefetched.
pub const DEFAULT_SMALL_SIZE_LIMIT: usize = 1024;

/// One fetched payload and the variables it can answer for.
///
/// Immutable once built; the cache only changes where a node sits in the LRU list.
#[derive(Debug)]
pub struct CacheNode {
    id: CacheNodeId,
    vars: IndexSet<NodeId>,
    payload: Arc<dyn Payload>,
    size: usize,
    constraint: Constraint,
    whole_variable: bool,
    is_prefetch: bool,
}

impl CacheNode {
    /// A node for `payload`, fetched with `constraint` to serve `vars`.
    pub fn new(
        vars: impl IntoIterator<Item = NodeId>,
        payload: Arc<dyn Payload>,
        constraint: Constraint,
    ) -> Self {
        let whole_variable = constraint.selections.is_empty()
            && constraint
                .projections
                .iter()
                .all(|p| matches!(p, Projection::Var(_)) && p.is_whole());
        Self {
            id: CacheNodeId::new(),
            vars: vars.into_iter().collect(),
            size: payload.size(),
            payload,
            constraint,
            whole_variable,
            is_prefetch: false,
        }
    }

    /// Like [`Self::new`], marked as the session's prefetch node.
    pub fn prefetch(
        vars: impl IntoIterator<Item = NodeId>,
        payload: Arc<dyn Payload>,
        constraint: Constraint,
    ) -> Self {
        Self {
            is_prefetch: true,
            ..Self::new(vars, payload, constraint)
        }
    }

    pub fn id(&self) -> CacheNodeId {
        self.id
    }

    pub fn vars(&self) -> &IndexSet<NodeId> {
        &self.vars
    }

    pub fn contains(&self, var: NodeId) -> bool {
        self.vars.contains(&var)
    }

    pub fn payload(&self) -> &Arc<dyn Payload> {
        &self.payload
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The constraint the payload was fetched with.
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Whether every variable was fetched whole and unfiltered, so any subset of them can be
    /// read from this payload.
    pub fn is_whole_variable(&self) -> bool {
        self.whole_variable
    }

    pub fn is_prefetch(&self) -> bool {
        self.is_prefetch
    }
}

#[derive(Debug)]
pub struct Cache {
    prefetch: Option<Arc<CacheNode>>,
    /// Least recently used first.
    nodes: VecDeque<Arc<CacheNode>>,
    /// Summed size of `nodes`.
    size: usize,
    byte_budget: usize,
    count_budget: usize,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(DEFAULT_BYTE_BUDGET, DEFAULT_COUNT_BUDGET)
    }
}

impl Cache {
    pub fn new(byte_budget: usize, count_budget: usize) -> Self {
        Self {
            prefetch: None,
            nodes: VecDeque::new(),
            size: 0,
            byte_budget,
            count_budget,
        }
    }

    /// The node that can serve `var`, if any.
    ///
    /// The prefetch node is checked first; then LRU nodes holding `var` whole, most recently
    /// used first. A hit on an LRU node makes it the most recently used.
    pub fn lookup(&mut self, var: NodeId) -> Option<Arc<CacheNode>> {
        if let Some(prefetch) = self.prefetch.as_ref().filter(|p| p.contains(var)) {
            debug!(%var, node = %prefetch.id(), "prefetch hit");
            return Some(Arc::clone(prefetch));
        }
        let position = self
            .nodes
            .iter()
            .rposition(|n| n.is_whole_variable() && n.contains(var))?;
        let node = self.nodes.remove(position)?;
        debug!(%var, node = %node.id(), "cache hit");
        self.nodes.push_back(Arc::clone(&node));
        Some(node)
    }

    /// Add `node` as the most recently used entry, evicting from the least recently used end
    /// until it fits.
    ///
    /// A node that cannot fit even in an empty list is not retained. The node is returned
    /// either way so the caller can read from it.
    pub fn insert(&mut self, node: CacheNode) -> Arc<CacheNode> {
        let node = Arc::new(node);
        while !self.nodes.is_empty() && !self.fits(&node) {
            if let Some(evicted) = self.nodes.pop_front() {
                self.size -= evicted.size();
                debug!(node = %evicted.id(), size = evicted.size(), "evicting cache node");
            }
        }
        if self.fits(&node) {
            self.size += node.size();
            self.nodes.push_back(Arc::clone(&node));
        } else {
            debug!(
                node = %node.id(),
                size = node.size(),
                byte_budget = self.byte_budget,
                "payload exceeds the cache budget, not retained"
            );
        }
        node
    }

    fn fits(&self, node: &CacheNode) -> bool {
        self.size + node.size() <= self.byte_budget && self.nodes.len() + 1 < self.count_budget
    }

    /// Install the prefetch node, replacing any previous one.
    pub fn set_prefetch(&mut self, node: CacheNode) -> Arc<CacheNode> {
        let node = Arc::new(node);
        debug!(node = %node.id(), vars = node.vars().len(), size = node.size(), "prefetched");
        self.prefetch = Some(Arc::clone(&node));
        node
    }

    pub fn prefetch(&self) -> Option<&Arc<CacheNode>> {
        self.prefetch.as_ref()
    }

    /// LRU nodes, least recently used first.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<CacheNode>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Summed payload size of the LRU nodes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn byte_budget(&self) -> usize {
        self.byte_budget
    }

    pub fn count_budget(&self) -> usize {
        self.count_budget
    }

    /// Drop every node, the prefetch node included.
    pub fn clear(&mut self) {
        self.prefetch = None;
        self.nodes.clear();
        self.size = 0;
    }
}
