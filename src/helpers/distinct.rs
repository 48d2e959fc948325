//! Exact distinct.
//!
//! [`PCollection::distinct`] is a barrier: every partition is gathered and the
//! first occurrence of each element survives, in partition order. Sequential
//! runs therefore keep input order; parallel runs keep the order of the
//! partitions the source was split into.

use crate::node::Node;
use crate::type_token::{Partition, downcast_partition};
use crate::{Element, PCollection};
use anyhow::Result;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

impl<T: Element + Eq + Hash> PCollection<T> {
    /// Exact global distinct. Removes duplicates across the entire collection.
    ///
    /// # Example
    /// ```no_run
    /// use hotel_reviews_etl::*;
    /// let p = Pipeline::default();
    /// let out = from_vec(&p, vec![3, 1, 3, 2, 1]).distinct();
    /// assert_eq!(out.collect_seq().unwrap(), vec![3, 1, 2]);
    /// ```
    #[must_use]
    pub fn distinct(self) -> Self {
        let exec = Arc::new(|parts: Vec<Partition>| -> Result<Partition> {
            let mut seen: HashSet<T> = HashSet::new();
            let mut out: Vec<T> = Vec::new();
            for part in parts {
                for item in downcast_partition::<T>(part, "distinct")? {
                    if !seen.contains(&item) {
                        seen.insert(item.clone());
                        out.push(item);
                    }
                }
            }
            Ok(Box::new(out))
        });
        self.chain(Node::Barrier {
            label: "distinct",
            exec,
        })
    }
}
