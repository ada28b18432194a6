//! # recipe-search
//!
//! A Rust web service for searching a recipe and cocktail catalog with a
//! multi-strategy pipeline: multilingual ingredient alias expansion, an
//! ordered retrieval chain with first-hit-wins fallback, taxonomy-based
//! narrowing, and deterministic re-ranking.
//!
//! ## Architecture
//!
//! ```text
//!                          ┌──────────────┐
//!                          │ Search Query │
//!                          └──────┬───────┘
//!                                 │
//!                                 ▼
//!                      ┌─────────────────────┐   hit
//!                      │  Result Cache (TTL) │ ───────▶ response
//!                      └──────────┬──────────┘
//!                                 │ miss
//!                                 ▼
//!                      ┌─────────────────────┐
//!                      │  Alias Expansion    │
//!                      │  chicken → pollo,   │
//!                      │  murgh, poulet ...  │
//!                      └──────────┬──────────┘
//!                                 │ raw term first
//!            ┌────────────────────┼────────────────────┐
//!            ▼                    ▼                    ▼
//!     ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//!     │  Primary    │ miss │   Fuzzy     │ miss │  Substring  │
//!     │  ranked FTS │ ───▶ │  trigram    │ ───▶ │  title ∋ q  │
//!     └──────┬──────┘      └──────┬──────┘      └──────┬──────┘
//!            │ first hit wins     │                    │ all miss /
//!            └────────────────────┼────────────────────┘ store down
//!                                 │                      ──▶ fallback corpus
//!                                 ▼
//!                      ┌─────────────────────┐
//!                      │  Structured facets  │
//!                      │  type, diet, ids    │
//!                      └──────────┬──────────┘
//!                                 ▼
//!                      ┌─────────────────────┐
//!                      │  Region ▶ Country   │
//!                      │  ▶ Course narrowing │
//!                      │  (revert on empty)  │
//!                      └──────────┬──────────┘
//!                                 ▼
//!                      ┌─────────────────────┐
//!                      │  Re-rank or sort    │
//!                      │  then paginate      │
//!                      └─────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, store backend, data files and limits
//! - [`models`] - Shared data types: `CandidateDocument`, `SearchQuery`, `RankedResultSet`, response types
//! - [`store`] - `RecipeStore` trait with tantivy, PostgREST-over-HTTP and in-memory backends
//! - [`search::aliases`] - Multilingual ingredient alias dictionary and query expansion
//! - [`search::chain`] - Ordered primary / fuzzy / substring retrieval with first-hit-wins
//! - [`search::trigram`] - Trigram similarity used by the fuzzy strategy
//! - [`search::taxonomy`] - Region, country and course keyword tables
//! - [`search::filter`] - Taxonomy narrowing with revert-on-empty, plus strict catalog facets
//! - [`search::scoring`] - Field-weighted relevance scorer and sort modes
//! - [`search::cache`] - TTL result cache behind the `ResultCache` trait
//! - [`search::corpus`] - Static recipes served when the store cannot answer
//! - [`search::pipeline`] - The orchestrator tying the stages together
//! - [`api`] - Axum HTTP handlers for the two search endpoints and health
//! - [`error`] - Errors that reach the HTTP boundary
//! - [`state`] - Shared application state holding config and the pipeline

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod search;
pub mod state;
pub mod store;
