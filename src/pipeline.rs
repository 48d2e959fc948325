use crate::node::Node;
use crate::node_id::NodeId;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Container for the computation graph.
///
/// Cloning is cheap: clones share the same graph, which is how every
/// [`PCollection`](crate::PCollection) built from one pipeline keeps appending
/// to it.
pub struct Pipeline {
    pub(crate) inner: Arc<Mutex<PipelineInner>>,
}

pub(crate) struct PipelineInner {
    pub(crate) next_id: u64,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: Vec<(NodeId, NodeId)>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PipelineInner {
                next_id: 0,
                nodes: HashMap::new(),
                edges: Vec::new(),
            })),
        }
    }
}

impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Pipeline {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Pipeline {
    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        // The graph is only ever appended to, so a poisoned lock still holds a valid graph.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert_node(&self, node: Node) -> NodeId {
        let mut g = self.lock();
        let id = NodeId::new(g.next_id);
        g.next_id += 1;
        g.nodes.insert(id, node);
        id
    }

    pub(crate) fn connect(&self, from: NodeId, to: NodeId) {
        self.lock().edges.push((from, to));
    }

    /// Copy of the current nodes and edges.
    pub(crate) fn snapshot(&self) -> (HashMap<NodeId, Node>, Vec<(NodeId, NodeId)>) {
        let g = self.lock();
        (g.nodes.clone(), g.edges.clone())
    }

    /// Linear execution chain ending at `terminal`, found by walking
    /// single-input edges backwards until a source or co-group.
    pub(crate) fn chain_to(&self, terminal: NodeId) -> Result<Vec<Node>> {
        let (mut nodes, edges) = self.snapshot();
        let mut chain = Vec::<Node>::new();
        let mut cur = terminal;
        loop {
            let n = nodes
                .remove(&cur)
                .ok_or_else(|| anyhow!("missing node {cur:?}"))?;
            let start = n.is_chain_start();
            chain.push(n);
            if start {
                break;
            }
            let Some((from, _)) = edges.iter().find(|(_, to)| *to == cur).copied() else {
                break;
            };
            cur = from;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Number of nodes attached so far.
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }
}
