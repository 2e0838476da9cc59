//! HSC study progress core and its local HTTP/WebSocket service.
//!
//! The core modules (`store`, `progress`, `streak`, `stats`, `achievements`,
//! `xp`, `search`, `session`) are synchronous and know nothing about HTTP.
//! `state`, `logic`, `protocol` and `routes` put them behind axum.

pub mod achievements;
pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod progress;
pub mod protocol;
pub mod routes;
pub mod search;
pub mod seeds;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;
pub mod streak;
pub mod telemetry;
pub mod xp;
