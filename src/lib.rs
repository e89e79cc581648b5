//! # Bin Bridge Library
//!
//! Telemetry bridge for bin-mounted sensors.
//!
//! This library ingests periodic telemetry frames over a serial link,
//! maintains the merged bin view served to the dashboard, and drives the
//! capture-and-classify device automation fired by a lid close-after-open
//! transition.

pub mod api;
pub mod cache;
pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod lid;
pub mod serial;
pub mod store;
