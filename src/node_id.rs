//! Opaque handle for a node inside a [`Pipeline`](crate::pipeline::Pipeline) graph.
//!
//! Ids are handed out sequentially as stages are attached. Only the pipeline
//! and the runner look inside them.

/// Unique numeric identifier for a node in a pipeline graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(v: u64) -> Self {
        Self(v)
    }

    /// Underlying numeric value, mostly useful in log fields.
    pub fn raw(&self) -> u64 {
        self.0
    }
}
