//! Makerspace availability watcher
//!
//! This library walks a paginated reservation calendar, works out for every
//! watched equipment item and day whether the last bookable slot is open,
//! and reports slots that opened since the previous run exactly once.
//!
//! # Modules
//!
//! - `services`: slot parsing, last-slot reduction, paging, diffing, state
//!   persistence, calendar reconciliation and the run pipeline
//! - `render`: the headless-browser collaborator
//! - `client`: the external calendar API
//! - `notifier`: outbound email through a signed relay
//! - `handlers`/`routes`: the HTTP status and trigger surface
//!
//! # Business rule
//!
//! Only the chronologically last slot of a day decides whether that day is
//! reported. Earlier open or reserved hours have no effect.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod render;
pub mod routes;
pub mod services;

#[cfg(test)]
mod client_mock;

pub use client::{CalendarApi, GoogleCalendarClient};
pub use config::{Config, RunMode, ScanConfig};
pub use error::MonitorError;
pub use handlers::api::AppState;
pub use notifier::{Notifier, RelayNotifier};
pub use render::{CalendarRenderer, HttpRenderClient};
pub use routes::create_router;
pub use services::monitor::{AvailabilityMonitor, CalendarSync, RunReport};
pub use services::state_store::StateStore;
