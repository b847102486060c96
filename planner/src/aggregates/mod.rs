//! Reducer aggregates for the planner domain.

pub mod booking;
pub mod design;
