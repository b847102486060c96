//! # Aisle Planner
//!
//! Booking and planning core for a wedding-services marketplace.
//!
//! The crate is organized as a functional core behind an imperative shell:
//!
//! - [`types`] holds the domain model and the shared [`types::PlannerState`]
//! - [`availability`] answers whether a listing can be booked on a date
//! - [`aggregates`] contains the booking and venue-design reducers
//! - [`linkage`] keeps design items in step with booking status
//! - [`pricing`] and [`budget`] derive prices and reconcile budgets
//! - [`store`] executes reducers behind a write lock and drains effects
//! - [`server`] and [`api`] expose the HTTP surface

pub mod aggregates;
pub mod api;
pub mod availability;
pub mod budget;
pub mod config;
pub mod error;
pub mod linkage;
pub mod pricing;
pub mod server;
pub mod store;
pub mod types;

pub use error::{PlannerError, PlannerResult};
pub use store::PlannerStore;
