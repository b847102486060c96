//! HTTP API handlers.

pub mod bookings;
pub mod budget;
pub mod catalog;
pub mod designs;
