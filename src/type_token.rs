//! Type tags and type-erased vector helpers.
//!
//! Stages exchange data as opaque [`Partition`]s. A source node carries a
//! [`VecOps`] so the runner can count, split and clone its payload without
//! knowing the element type at compile time; the typed closures inside each
//! node downcast partitions back to `Vec<T>`.

use anyhow::{Result, anyhow};
use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// A partition buffer carried between nodes at runtime. Always a boxed `Vec<T>`.
pub type Partition = Box<dyn Any + Send + Sync>;

/// A lightweight runtime type tag used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    /// Stable Rust type identifier.
    pub id: TypeId,
    /// Human-readable type name (best-effort).
    pub name: &'static str,
}

impl TypeTag {
    /// Construct a tag for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Type-erased helpers for the `Vec<T>` payload of a source node.
///
/// Implementations return `None` when `data` is not the `Vec<T>` they were
/// built for.
pub trait VecOps: Send + Sync {
    /// Number of elements if `data` is a `Vec<T>`.
    fn len(&self, data: &dyn Any) -> Option<usize>;

    /// Split `data` into at most `n` contiguous, order-preserving partitions.
    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>>;

    /// Clone the whole payload into a single partition.
    fn clone_any(&self, data: &dyn Any) -> Option<Partition>;
}

struct VecOpsImpl<T: Clone + Send + Sync + 'static>(PhantomData<T>);

impl<T: Clone + Send + Sync + 'static> VecOps for VecOpsImpl<T> {
    fn len(&self, data: &dyn Any) -> Option<usize> {
        data.downcast_ref::<Vec<T>>().map(Vec::len)
    }

    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>> {
        let v = data.downcast_ref::<Vec<T>>()?;
        let len = v.len();
        if n <= 1 || len <= 1 {
            return Some(vec![Box::new(v.clone())]);
        }
        let chunk = len.div_ceil(n);
        Some(
            v.chunks(chunk)
                .map(|c| Box::new(c.to_vec()) as Partition)
                .collect(),
        )
    }

    fn clone_any(&self, data: &dyn Any) -> Option<Partition> {
        data.downcast_ref::<Vec<T>>()
            .map(|v| Box::new(v.clone()) as Partition)
    }
}

/// Create a type-erased `VecOps` for `Vec<T>`.
pub fn vec_ops_for<T: Clone + Send + Sync + 'static>() -> Arc<dyn VecOps> {
    Arc::new(VecOpsImpl::<T>(PhantomData))
}

/// Take ownership of a partition as `Vec<T>`, naming `stage` in the error.
pub(crate) fn downcast_partition<T: 'static>(part: Partition, stage: &str) -> Result<Vec<T>> {
    part.downcast::<Vec<T>>()
        .map(|b| *b)
        .map_err(|_| anyhow!("{stage}: expected partition of Vec<{}>", type_name::<T>()))
}

/// Concatenate partitions into one `Vec<T>` in partition order.
pub(crate) fn concat_partitions<T: 'static>(parts: Vec<Partition>, stage: &str) -> Result<Vec<T>> {
    let mut out = Vec::<T>::new();
    for part in parts {
        out.append(&mut downcast_partition::<T>(part, stage)?);
    }
    Ok(out)
}
