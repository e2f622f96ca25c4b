//! Daybook turns daily journal notes into explainable, consent-aware memory.
//!
//! Each journal entry is summarized into an **episodic summary** (first
//! sentence, topic labels and open loops). Users may also store explicit
//! **preferences**, but only with consent. Both kinds of memory are recallable
//! with a "why shown" explanation and can be deleted at any time. On top of
//! that memory, a check-in engine proposes at most one **proactive check-in**
//! per user per day for users who opted in.
//!
//! # Modules
//!
//! - [`config`]: TOML config plus `DAYBOOK_*` environment overrides
//! - [`db`]: SQLite initialization, schema, migrations and health checks
//! - [`journal`]: journal entry CRUD
//! - [`memory`]: summarization, episodic and preference stores, recall, deletion, audit
//! - [`checkin`]: settings, suggestions, lifecycle actions and the daily scheduler
//! - [`ratelimit`]: fixed-window rate limiting with in-memory and SQLite backends
//! - [`pipeline`]: the post-write hook run for every new or edited entry
//! - [`engine`]: async facade tying storage, limits and actors together

pub mod checkin;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod journal;
pub mod memory;
pub mod pipeline;
pub mod ratelimit;
pub mod redact;
