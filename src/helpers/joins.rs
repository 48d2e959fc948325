//! Left outer join built on a co-group node.
//!
//! The join snapshots the subplans ending at both collections, replays each
//! into a single `Vec<(K, V)>` / `Vec<(K, W)>` buffer and probes a hash map
//! built from the right side. Output follows left-side order, so sequential
//! runs are deterministic.
//!
//! ```no_run
//! use hotel_reviews_etl::*;
//! use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let p = Pipeline::default();
//! let reviews = from_vec(&p, vec![("Hotel Arena".to_string(), 7.1), ("Hotel Nobody".to_string(), 8.0)]);
//! let hotels = from_vec(&p, vec![("Hotel Arena".to_string(), 0i64)]);
//! let joined = reviews.join_left(&hotels).collect_seq()?;
//! assert_eq!(joined[1].1.1, None);
//! # Ok(()) }
//! ```

use crate::node::Node;
use crate::type_token::{Partition, concat_partitions};
use crate::{Element, PCollection};
use anyhow::Result;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

impl<K, V> PCollection<(K, V)>
where
    K: Element + Eq + Hash,
    V: Element,
{
    /// Left outer join on key with another `(K, W)` → `(K, (V, Option<W>))`.
    ///
    /// Every left row is kept. A left row whose key matches several right rows
    /// is emitted once per match; a left row without a match carries `None`.
    ///
    /// # Panics
    /// Panics if either collection's subplan cannot be rebuilt from its pipeline.
    #[must_use]
    pub fn join_left<W>(&self, right: &PCollection<(K, W)>) -> PCollection<(K, (V, Option<W>))>
    where
        W: Element,
    {
        // Nodes are never removed from a pipeline, so a live collection always has a chain.
        let left_chain = self.pipeline.chain_to(self.id).expect("left chain build");
        let right_chain = right.pipeline.chain_to(right.id).expect("right chain build");

        let exec = Arc::new(
            |left_parts: Vec<Partition>, right_parts: Vec<Partition>| -> Result<Partition> {
                let left_rows = concat_partitions::<(K, V)>(left_parts, "join_left (left)")?;
                let right_rows = concat_partitions::<(K, W)>(right_parts, "join_left (right)")?;

                let mut rm: HashMap<K, Vec<W>> = HashMap::new();
                for (k, w) in right_rows {
                    rm.entry(k).or_default().push(w);
                }

                let mut out: Vec<(K, (V, Option<W>))> = Vec::with_capacity(left_rows.len());
                for (k, v) in left_rows {
                    match rm.get(&k) {
                        Some(ws) => {
                            for w in ws {
                                out.push((k.clone(), (v.clone(), Some(w.clone()))));
                            }
                        }
                        None => out.push((k, (v, None))),
                    }
                }
                Ok(Box::new(out) as Partition)
            },
        );

        let node = Node::CoGroup {
            left_chain: Arc::new(left_chain),
            right_chain: Arc::new(right_chain),
            exec,
        };

        let id = self.pipeline.insert_node(node);
        PCollection {
            pipeline: self.pipeline.clone(),
            id,
            _t: PhantomData,
        }
    }
}
