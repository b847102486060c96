//! Shared application state handed to every handler.

use crate::store::PlannerStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The planner store
    pub store: Arc<PlannerStore>,
}

impl AppState {
    /// Creates application state around a store
    #[must_use]
    pub fn new(store: Arc<PlannerStore>) -> Self {
        Self { store }
    }
}
