//! Client library for the dreamlog journal API.
//!
//! Journal entries are plain text records served by a remote API; each entry
//! can have an illustration produced by a server-side image-generation
//! worker. The interesting piece here is
//! [`services::generation::GenerationClient`], which submits that job and
//! observes it through a small status state machine
//! ([`models::generation::JobState`]) polled under bounded time and attempt
//! budgets, reporting live queue positions to a caller-supplied sink.

pub mod config;
pub mod models;
pub mod services;
