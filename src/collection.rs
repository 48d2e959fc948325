use crate::node::{DynOp, Node};
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::runner::{ExecMode, Runner};
use crate::type_token::{Partition, TypeTag, downcast_partition, vec_ops_for};
use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Bound shared by every element that flows through a pipeline.
pub trait Element: 'static + Send + Sync + Clone + Serialize + DeserializeOwned {}
impl<T> Element for T where T: 'static + Send + Sync + Clone + Serialize + DeserializeOwned {}

/// A lazily evaluated collection of `T` attached to a [`Pipeline`].
///
/// Transformations only append nodes to the graph; nothing runs until one of
/// the `collect_*` methods (or [`materialize`](PCollection::materialize)) is called.
#[derive(Clone)]
pub struct PCollection<T> {
    pub(crate) pipeline: Pipeline,
    pub(crate) id: NodeId,
    pub(crate) _t: PhantomData<T>,
}

/// Attach an in-memory vector as a source.
pub fn from_vec<T: Element>(p: &Pipeline, data: Vec<T>) -> PCollection<T> {
    let id = p.insert_node(Node::Source {
        payload: Arc::new(data),
        vec_ops: vec_ops_for::<T>(),
        elem_tag: TypeTag::of::<T>(),
    });
    PCollection {
        pipeline: p.clone(),
        id,
        _t: PhantomData,
    }
}

// ---- Stateless ops ----

struct MapOp<I, O, F>(F, PhantomData<(I, O)>);
impl<I, O, F> DynOp for MapOp<I, O, F>
where
    I: Element,
    O: Element,
    F: Send + Sync + Fn(&I) -> O + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = downcast_partition::<I>(input, "map")?;
        let out: Vec<O> = v.iter().map(|i| self.0(i)).collect();
        Ok(Box::new(out))
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

struct TryMapOp<I, O, F>(F, PhantomData<(I, O)>);
impl<I, O, F> DynOp for TryMapOp<I, O, F>
where
    I: Element,
    O: Element,
    F: Send + Sync + Fn(&I) -> Result<O> + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = downcast_partition::<I>(input, "try_map")?;
        let out = v.iter().map(|i| self.0(i)).collect::<Result<Vec<O>>>()?;
        Ok(Box::new(out))
    }

    fn name(&self) -> &'static str {
        "try_map"
    }
}

struct FilterOp<T, P>(P, PhantomData<T>);
impl<T, P> DynOp for FilterOp<T, P>
where
    T: Element,
    P: Send + Sync + Fn(&T) -> bool + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = downcast_partition::<T>(input, "filter")?;
        Ok(Box::new(v.into_iter().filter(|t| self.0(t)).collect::<Vec<T>>()))
    }

    fn name(&self) -> &'static str {
        "filter"
    }
}

impl<T: Element> PCollection<T> {
    pub(crate) fn chain<O: Element>(self, node: Node) -> PCollection<O> {
        let id = self.pipeline.insert_node(node);
        self.pipeline.connect(self.id, id);
        PCollection {
            pipeline: self.pipeline,
            id,
            _t: PhantomData,
        }
    }

    fn stateless<O: Element>(self, op: Arc<dyn DynOp>) -> PCollection<O> {
        self.chain(Node::Stateless(vec![op]))
    }

    #[must_use]
    pub fn map<O, F>(self, f: F) -> PCollection<O>
    where
        O: Element,
        F: 'static + Send + Sync + Fn(&T) -> O,
    {
        self.stateless(Arc::new(MapOp::<T, O, F>(f, PhantomData)))
    }

    /// Like [`map`](Self::map), but the first error aborts the run.
    #[must_use]
    pub fn try_map<O, F>(self, f: F) -> PCollection<O>
    where
        O: Element,
        F: 'static + Send + Sync + Fn(&T) -> Result<O>,
    {
        self.stateless(Arc::new(TryMapOp::<T, O, F>(f, PhantomData)))
    }

    #[must_use]
    pub fn filter<F>(self, pred: F) -> PCollection<T>
    where
        F: 'static + Send + Sync + Fn(&T) -> bool,
    {
        self.stateless(Arc::new(FilterOp::<T, F>(pred, PhantomData)))
    }

    /// Pair every element with a key computed from it.
    #[must_use]
    pub fn key_by<K, F>(self, key_fn: F) -> PCollection<(K, T)>
    where
        K: Element + Eq + Hash,
        F: 'static + Send + Sync + Fn(&T) -> K,
    {
        self.map(move |t| (key_fn(t), t.clone()))
    }

    pub fn collect_seq(self) -> Result<Vec<T>> {
        let r = Runner {
            mode: ExecMode::Sequential,
            ..Default::default()
        };
        r.run_collect::<T>(&self.pipeline, self.id)
    }

    pub fn collect_par(self, threads: Option<usize>, partitions: Option<usize>) -> Result<Vec<T>> {
        let r = Runner {
            mode: ExecMode::Parallel {
                threads,
                partitions,
            },
            ..Default::default()
        };
        r.run_collect::<T>(&self.pipeline, self.id)
    }

    pub fn collect_with(self, runner: &Runner) -> Result<Vec<T>> {
        runner.run_collect::<T>(&self.pipeline, self.id)
    }

    /// Run the plan once and replace it with a source holding the result.
    ///
    /// Needed whenever a collection is consumed twice and must yield the same
    /// rows both times (sequence-keyed dimensions are written and joined).
    pub fn materialize(self, runner: &Runner) -> Result<PCollection<T>> {
        let p = self.pipeline.clone();
        let rows = self.collect_with(runner)?;
        Ok(from_vec(&p, rows))
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl<K, V> PCollection<(K, V)>
where
    K: Element + Eq + Hash,
    V: Element,
{
    #[must_use]
    pub fn map_values<O, F>(self, f: F) -> PCollection<(K, O)>
    where
        O: Element,
        F: 'static + Send + Sync + Fn(&V) -> O,
    {
        self.map(move |kv: &(K, V)| (kv.0.clone(), f(&kv.1)))
    }
}
