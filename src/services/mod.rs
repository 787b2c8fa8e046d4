//! Service layer containing the run pipeline and side-effect helpers.
//!
//! ## Service map
//! - `config.rs` — credentials + INI settings loading into one explicit object.
//! - `auth.rs` — OAuth2 client-credentials token exchange.
//! - `extract.rs` — repository walk and dm+d code extraction from SQL files.
//! - `terminology.rs` — FHIR $lookup: version resolution, batch reconcile.
//! - `report.rs` — HTML report + index rendering, version/filename mapping.
//! - `storage.rs` — reports-directory scanning + JSONL audit log.
//! - `runner.rs` — run controller (skip/run decision, pipeline order).
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep `main` thin; delegate to services.

pub mod auth;
pub mod config;
pub mod extract;
pub mod output;
pub mod report;
pub mod runner;
pub mod storage;
pub mod terminology;
