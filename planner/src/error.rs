//! Domain error taxonomy for the planner.
//!
//! Errors are values carried through reducer state (`last_error`) and
//! surfaced at the HTTP boundary, where `server::error` maps each variant
//! to a status code. Variants are cloneable and serializable so reducers
//! can record them as part of a `ValidationFailed` event.

use crate::types::BookingStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Business-rule and lookup failures produced by the planner core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum PlannerError {
    /// Entity absent or not visible to the caller.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity kind (e.g. "Booking", "ServiceListing")
        entity: String,
        /// Identifier as supplied by the caller
        id: String,
    },

    /// Caller is not permitted to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The booking state machine rejected a transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Status the booking is currently in
        from: BookingStatus,
        /// Status the caller requested
        to: BookingStatus,
    },

    /// Malformed or semantically invalid request data.
    #[error("{0}")]
    Validation(String),

    /// The operation conflicts with current state (double booking,
    /// duplicate payment kind, removal of a booked item).
    #[error("{0}")]
    Conflict(String),
}

impl PlannerError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a `Conflict` error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

/// Result alias used throughout the planner core.
pub type PlannerResult<T> = Result<T, PlannerError>;
