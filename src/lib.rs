#![warn(clippy::all, clippy::pedantic)]
#![allow(
    async_fn_in_trait,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

// ── Phase 0: Foundation ──────────────────────────────────────────────────────
pub mod config;
pub mod domain;
pub mod error;

// ── Phase 1: Infrastructure ─────────────────────────────────────────────────
pub mod blobstore;
pub mod resilience;
pub mod store;
pub mod vendors;

// ── Phase 2: Orchestration ──────────────────────────────────────────────────
pub mod events;
pub mod notify;
pub mod pipeline;
pub mod service;
pub mod sweeper;

// ── Phase 3: Edge + entry points ────────────────────────────────────────────
pub mod app;
pub mod gateway;

// ── Re-exports ───────────────────────────────────────────────────────────────
pub use config::Config;
pub use error::{CoreError, CoreResult};
