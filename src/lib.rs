//! # pagegrep
//!
//! Spatial text search over OCR'd images in object storage buckets.
//!
//! Images dropped into a bucket are run through OCR, normalized into
//! document trees (document → pages → lines → coordinates) and stored in
//! SQLite. A JSON search DSL finds files by the text of a line, the page it
//! is on, and the region of the page it occupies.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌──────────┐
//! │ change events│──▶│ Pipeline        │──▶│  SQLite  │
//! │ (S3 / JSON)  │   │ OCR + normalize │   │  store   │
//! └──────────────┘   └─────────────────┘   └────┬─────┘
//!                                               │
//!                      ┌────────────────────────┤
//!                      ▼                        ▼
//!                 ┌──────────┐            ┌──────────┐
//!                 │   CLI    │            │   HTTP   │
//!                 │(pagegrep)│            │ /search  │
//!                 └──────────┘            └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |
//! | [`sql`] | Filter → SQL rendering |
//! | [`sqlite_store`] | SQLite `DocumentStore` |
//! | [`sigv4`] | AWS request signing |
//! | [`textract`] | Textract OCR engine |
//! | [`pipeline`] | Change-event indexing pipeline |
//! | [`ingest`] | CLI entry points for the pipeline |
//! | [`search`] | Query service |
//! | [`server`] | HTTP server |

pub mod config;
pub mod db;
pub mod ingest;
pub mod migrate;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod sigv4;
pub mod sql;
pub mod sqlite_store;
pub mod textract;
