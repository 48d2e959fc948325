//! # hotel-reviews-etl
//!
//! A batch ETL job that turns a CSV of hotel reviews into a star schema
//! (`dim_hotel`, `dim_reviewer`, `dim_review_text`, `fact_reviews`) stored in a
//! Hive-style directory warehouse, plus a small voting-age demo.
//!
//! ## Key Features
//!
//! - **Deferred batch engine** - chain transformations on a [`PCollection`],
//!   nothing runs until a collect call
//! - **Sequential and parallel execution** - one [`Runner`], Rayon underneath
//! - **Schema inference** - integer / double / string per column, nulls for
//!   cells that do not fit
//! - **Pluggable surrogate keys** - per-table sequence or content hash
//! - **Staged commit** - all four tables are replaced together or not at all,
//!   with crash recovery
//! - **Parquet, CSV or JSON Lines tables** (optional via feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use hotel_reviews_etl::config::load_config;
//! use hotel_reviews_etl::etl::run_job;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = load_config(None, None).map_err(|e| anyhow::anyhow!("{e}"))?;
//! let report = run_job(config)?;
//! report.print();
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Pipeline
//!
//! A [`Pipeline`] is the container for the computation graph. Sources are
//! attached with [`from_vec`]; every transformation appends a node.
//!
//! ### PCollection
//!
//! A [`PCollection<T>`] is a lazy, typed collection. The engine provides the
//! transforms the job needs:
//! - [`map`](PCollection::map), [`try_map`](PCollection::try_map),
//!   [`filter`](PCollection::filter), [`flat_map`](PCollection::flat_map)
//! - [`key_by`](PCollection::key_by), [`map_values`](PCollection::map_values),
//!   [`values`](PCollection::values)
//! - [`distinct`](PCollection::distinct) - exact global deduplication
//! - [`join_left`](PCollection::join_left) - left outer join on key
//! - [`assign_keys`](PCollection::assign_keys) - attach surrogate keys
//! - [`materialize`](PCollection::materialize) - run once, reuse the result
//!
//! ### The job
//!
//! [`etl`] holds the stages (source, clean, dimensions, facts) and the
//! [`EtlContext`](etl::EtlContext) that runs them. [`warehouse`] writes the
//! tables; [`validation`] checks them before they are committed.

pub mod collection;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod etl;
mod helpers;
pub mod io;
pub mod keys;
pub mod metrics;
pub(crate) mod node;
pub mod node_id;
pub mod pipeline;
pub mod records;
pub mod runner;
pub mod schema;
pub mod telemetry;
pub mod testing;
pub mod type_token;
pub mod validation;
pub mod value;
pub mod warehouse;

pub use collection::{Element, PCollection, from_vec};
pub use config::{EtlConfig, load_config};
pub use error::EtlError;
pub use keys::{KeyStrategy, SurrogateKeys};
pub use node_id::NodeId;
pub use pipeline::Pipeline;
pub use runner::{ExecMode, Runner};
pub use value::Value;
