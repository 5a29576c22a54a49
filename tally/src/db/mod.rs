//! Database layer for metric configuration and log-row counting.
//!
//! The engine consumes persistence exclusively through the
//! [`store::MetricStore`] trait:
//!
//! ```text
//! ┌──────────────────┐
//! │ stats orchestrator│
//! └────────┬─────────┘
//!          │ MetricStore (db::store)
//!          ↓
//! ┌──────────────────┐      ┌───────────────────┐
//! │  PgMetricStore    │  or  │ InMemoryMetricStore│  (test_utils)
//! │  (db::handlers)   │      └───────────────────┘
//! └────────┬─────────┘
//!          ↓
//!     PostgreSQL
//! ```
//!
//! All access is read-only: the engine never mutates definitions or log
//! rows, so no transactional discipline is required here.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;
