//! Core library for the clinic staff roster service.
//!
//! Everything with decision logic lives here: the ordered tier hierarchy,
//! the weekly excellence evaluation cycle, the leave scheduler, and the
//! rank transition orchestrator. Outbound platform calls (membership
//! directory, remote ranking, notifications) are trait ports implemented
//! by the service crate.

pub mod config;
pub mod error;
pub mod staffing;
pub mod telemetry;
