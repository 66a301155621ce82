//! # pagegrep core
//!
//! Runtime-free logic for pagegrep: the document model, the OCR block
//! model and engine trait, normalization of OCR output into document
//! trees, the spatial search DSL and its compiler, the backend-neutral
//! filter expression, the store trait, and change-event routing.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Backends
//! and adapters live in the `pagegrep` application crate.
//!
//! ## Axis convention
//!
//! Everything persisted (and every [`filter::Filter`]) uses the OCR-native
//! convention: `y` grows downward. Search requests arrive with `y` growing
//! upward. The one place that reconciles the two is
//! [`compile::store_region`].

pub mod compile;
pub mod dsl;
pub mod events;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod ocr;
pub mod search;
pub mod store;

/// Boxed error used as the `source` of component errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
