//! Surrogate key generation.
//!
//! Every output table owns one generator. Two strategies exist:
//!
//! - [`SequenceKeys`]: an atomic counter starting at 0. Keys are unique within
//!   the table; under parallel execution they depend on scheduling, so they
//!   are neither contiguous per run order nor stable across runs.
//! - [`ContentHashKeys`]: SHA-256 over the canonical JSON of the natural key
//!   (for facts, the review plus the digest of its whole source row),
//!   truncated to a non-negative `i64`. Stable across runs; uniqueness is
//!   checked by [`validation`](crate::validation) before anything is written.

use crate::{Element, PCollection};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Which generator each table gets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    #[default]
    Sequence,
    ContentHash,
}

impl KeyStrategy {
    /// A fresh generator for one table.
    pub fn generator<T: Serialize + ?Sized>(self) -> Arc<dyn SurrogateKeys<T>> {
        match self {
            KeyStrategy::Sequence => Arc::new(SequenceKeys::default()),
            KeyStrategy::ContentHash => Arc::new(ContentHashKeys),
        }
    }
}

pub trait SurrogateKeys<T: ?Sized>: Send + Sync {
    fn next_key(&self, item: &T) -> Result<i64>;
}

#[derive(Debug, Default)]
pub struct SequenceKeys {
    next: AtomicI64,
}

impl SequenceKeys {
    /// Number of keys handed out so far.
    pub fn issued(&self) -> i64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl<T: ?Sized> SurrogateKeys<T> for SequenceKeys {
    fn next_key(&self, _item: &T) -> Result<i64> {
        Ok(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHashKeys;

/// SHA-256 over the canonical JSON of `item`.
pub fn content_digest<T: Serialize + ?Sized>(item: &T) -> Result<[u8; 32]> {
    let bytes = serde_json::to_vec(item).context("encode value for hashing")?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(&bytes));
    Ok(out)
}

impl<T: Serialize + ?Sized> SurrogateKeys<T> for ContentHashKeys {
    fn next_key(&self, item: &T) -> Result<i64> {
        let digest = content_digest(item)?;
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Ok((u64::from_be_bytes(head) >> 1) as i64)
    }
}

impl<T: Element> PCollection<T> {
    /// Attach a surrogate key to every element.
    ///
    /// `build` receives the generated key and the element and produces the
    /// output row.
    #[must_use]
    pub fn assign_keys<O, F>(self, keys: Arc<dyn SurrogateKeys<T>>, build: F) -> PCollection<O>
    where
        O: Element,
        F: 'static + Send + Sync + Fn(i64, &T) -> O,
    {
        self.try_map(move |t| Ok(build(keys.next_key(t)?, t)))
    }
}
