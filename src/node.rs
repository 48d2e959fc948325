use crate::type_token::{Partition, TypeTag, VecOps};
use anyhow::Result;
use std::any::Any;
use std::sync::Arc;

/// An element-wise stage. Adjacent stateless stages are fused by the runner
/// and applied to one partition at a time.
pub trait DynOp: Send + Sync {
    fn apply(&self, input: Partition) -> Result<Partition>;

    fn name(&self) -> &'static str {
        "op"
    }
}

/// Gathers every partition of its input and produces a single partition.
pub type BarrierFn = Arc<dyn Fn(Vec<Partition>) -> Result<Partition> + Send + Sync>;

/// Receives the materialized partitions of a left and a right subplan.
pub type CoGroupFn = Arc<dyn Fn(Vec<Partition>, Vec<Partition>) -> Result<Partition> + Send + Sync>;

#[derive(Clone)]
pub enum Node {
    Source {
        payload: Arc<dyn Any + Send + Sync>,
        vec_ops: Arc<dyn VecOps>,
        elem_tag: TypeTag,
    },
    Stateless(Vec<Arc<dyn DynOp>>),

    /// All partitions in, one partition out (exact distinct and friends).
    Barrier { label: &'static str, exec: BarrierFn },

    /// Binary co-group. `left_chain` and `right_chain` are complete subplans,
    /// each starting at its own source; `exec` joins their outputs. A co-group
    /// has no upstream edge and acts as the source of its own chain.
    CoGroup {
        left_chain: Arc<Vec<Node>>,
        right_chain: Arc<Vec<Node>>,
        exec: CoGroupFn,
    },
}

impl Node {
    pub fn label(&self) -> &'static str {
        match self {
            Node::Source { .. } => "source",
            Node::Stateless(_) => "stateless",
            Node::Barrier { label, .. } => label,
            Node::CoGroup { .. } => "cogroup",
        }
    }

    pub(crate) fn is_chain_start(&self) -> bool {
        matches!(self, Node::Source { .. } | Node::CoGroup { .. })
    }
}
