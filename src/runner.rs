//! Execution engine.
//!
//! A plan is the linear chain of nodes ending at the collected terminal. The
//! chain starts at a source (split into partitions) or a co-group (whose two
//! subplans run first, in parallel when allowed). Runs of stateless nodes are
//! fused and applied per partition; barriers gather every partition into one.

use crate::node::{DynOp, Node};
use crate::pipeline::Pipeline;
use crate::type_token::{Partition, concat_partitions};
use crate::NodeId;
use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Parallel {
        threads: Option<usize>,
        partitions: Option<usize>,
    },
}

pub struct Runner {
    pub mode: ExecMode,
    pub default_partitions: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel {
                threads: None,
                partitions: None,
            },
            default_partitions: 2 * num_cpus::get().max(2),
        }
    }
}

impl Runner {
    #[must_use]
    pub fn new(mode: ExecMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn run_collect<T: 'static + Send + Sync + Clone>(
        &self,
        p: &Pipeline,
        terminal: NodeId,
    ) -> Result<Vec<T>> {
        let chain = p.chain_to(terminal)?;
        trace!(terminal = terminal.raw(), nodes = chain.len(), "executing chain");

        let parts = match self.mode {
            ExecMode::Sequential => exec_chain(&chain, 1, false)?,
            ExecMode::Parallel {
                threads,
                partitions,
            } => {
                let n = partitions.unwrap_or(self.default_partitions).max(1);
                match threads {
                    Some(t) => rayon::ThreadPoolBuilder::new()
                        .num_threads(t)
                        .build()
                        .context("build rayon thread pool")?
                        .install(|| exec_chain(&chain, n, true))?,
                    None => exec_chain(&chain, n, true)?,
                }
            }
        };
        concat_partitions::<T>(parts, "terminal")
    }
}

/// Run a fused stateless stage
fn fuse_stateless(ops: &[Arc<dyn DynOp>], input: Partition) -> Result<Partition> {
    ops.iter().try_fold(input, |acc, op| {
        op.apply(acc).with_context(|| format!("stateless op `{}`", op.name()))
    })
}

fn exec_chain(chain: &[Node], partitions: usize, parallel: bool) -> Result<Vec<Partition>> {
    let (first, rest) = chain
        .split_first()
        .ok_or_else(|| anyhow!("empty execution chain"))?;

    let mut current: Vec<Partition> = match first {
        Node::Source {
            payload,
            vec_ops,
            elem_tag,
        } => {
            let parts = if parallel && partitions > 1 {
                let len = vec_ops.len(payload.as_ref()).unwrap_or(0);
                vec_ops.split(payload.as_ref(), partitions.min(len.max(1)))
            } else {
                vec_ops.clone_any(payload.as_ref()).map(|p| vec![p])
            };
            parts.ok_or_else(|| anyhow!("source payload is not Vec<{}>", elem_tag.name))?
        }
        Node::CoGroup {
            left_chain,
            right_chain,
            exec,
        } => {
            let (left, right) = if parallel {
                rayon::join(
                    || exec_chain(left_chain, partitions, parallel),
                    || exec_chain(right_chain, partitions, parallel),
                )
            } else {
                (
                    exec_chain(left_chain, partitions, parallel),
                    exec_chain(right_chain, partitions, parallel),
                )
            };
            vec![exec(left.context("left side of join")?, right.context("right side of join")?)?]
        }
        other => bail!("plan must start with a source, found {}", other.label()),
    };

    let mut i = 0usize;
    while i < rest.len() {
        match &rest[i] {
            Node::Stateless(_) => {
                // Collect contiguous stateless nodes and fuse them
                let mut ops: Vec<Arc<dyn DynOp>> = Vec::new();
                while let Some(Node::Stateless(more)) = rest.get(i) {
                    ops.extend(more.iter().cloned());
                    i += 1;
                }
                current = if parallel {
                    current
                        .into_par_iter()
                        .map(|chunk| fuse_stateless(&ops, chunk))
                        .collect::<Result<Vec<_>>>()?
                } else {
                    current
                        .into_iter()
                        .map(|chunk| fuse_stateless(&ops, chunk))
                        .collect::<Result<Vec<_>>>()?
                };
            }
            Node::Barrier { label, exec } => {
                current = vec![exec(current).with_context(|| format!("barrier `{label}`"))?];
                i += 1;
            }
            other => bail!("unexpected {} in the middle of a plan", other.label()),
        }
    }
    Ok(current)
}
