//! # tally: Dynamic Metrics Engine for Messaging Analytics
//!
//! `tally` computes dashboard metrics for multi-tenant messaging analytics.
//! Each tenant defines its own metrics as database rows rather than code: a
//! **classification** metric counts message-log rows whose column matches a
//! keyword list, and a **calculated** metric evaluates an arithmetic formula
//! over the other metrics' counts. Adding a metric is a data change, not a
//! deploy.
//!
//! ## Overview
//!
//! A messaging dashboard typically wants a row of stat cards: Sent,
//! Delivered, Failed, Delivery Rate. The first three are counts over the
//! tenant's message log; the last is arithmetic over the first three. This
//! crate owns that whole computation: it loads the tenant's metric
//! definitions, counts rows per classification rule within one shared scope
//! (tenant, optional template, optional date range), freezes those counts
//! into a value table, and evaluates calculated formulas against the frozen
//! table so every stat in the batch is internally consistent.
//!
//! Formulas are tenant-authored text, so they are treated as hostile input:
//! an allow-list lexer and a recursive-descent parser reduce them to a fixed
//! arithmetic AST (with a `Math.*` function namespace) before evaluation.
//! There is no string substitution and no dynamic code path. A formula that
//! fails for any reason yields `0` with a warning; one tenant's broken
//! metric never fails the batch. Keyword matching likewise never
//! interpolates tenant text into SQL: predicates compile to parameterized
//! queries with every literal as a bind parameter.
//!
//! ## Architecture
//!
//! The engine is a library with one seam: the [`MetricStore`] trait covers
//! loading definitions and counting rows. [`PgMetricStore`] implements it
//! over PostgreSQL (sqlx); the `test-utils` feature exposes an in-memory
//! implementation for tests and embedders without a database.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tally::{Config, MetricsEngine, PgMetricStore, Scope};
//!
//! # async fn run() -> tally::Result<()> {
//! let config = Config::load("config.yaml")?;
//! let store = PgMetricStore::connect(&config).await?;
//! let engine = MetricsEngine::with_config(store, &config);
//!
//! let client_id = uuid::Uuid::new_v4();
//! let scope = Scope::client(client_id).with_template("welcome");
//! let stats = engine.compute_metric_stats(&scope).await?;
//!
//! for stat in &stats {
//!     println!("{}: {} ({:?}%)", stat.name, stat.count, stat.percentage);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod errors;
pub mod formula;
pub mod matcher;
pub mod stats;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use db::handlers::PgMetricStore;
pub use db::models::logs::LogRow;
pub use db::models::metrics::{LogColumn, MetricDefinition, MetricName, MetricRule};
pub use db::store::MetricStore;
pub use errors::{Error, Result};
pub use formula::MetricValues;
pub use matcher::{KeywordToken, RowPredicate};
pub use stats::{MetricStat, MetricsEngine};
pub use types::{ClientId, DateRange, MetricId, Scope};
