//! Planner store.
//!
//! The imperative shell around the reducers: owns the shared state behind a
//! write lock, dispatches actions through the right reducer, and drains the
//! feedback effects they return. Holding the write lock across validate and
//! apply is what makes the availability re-check race-free.

use crate::aggregates::booking::{BookingAction, BookingEnvironment, BookingReducer};
use crate::aggregates::design::{DesignAction, DesignEnvironment, DesignReducer};
use crate::error::PlannerError;
use crate::types::{
    ListingId, Money, NaiveDate, PlannerState, ProjectId, ServiceListing, TimeSlot,
    TimeSlotStatus, VendorId, WeddingProject,
};
use aisle_core::effect::Effect;
use aisle_core::environment::{Clock, IdGenerator};
use aisle_core::reducer::Reducer;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Flattens an effect tree into the follow-up actions it resolves to.
async fn collect_actions<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
    let mut stack: Vec<Effect<A>> = effects.into_iter().collect();
    let mut actions = Vec::new();
    while let Some(effect) = stack.pop() {
        match effect {
            Effect::None => {},
            Effect::Parallel(inner) | Effect::Sequential(inner) => stack.extend(inner),
            Effect::Future(future) => {
                if let Some(action) = future.await {
                    actions.push(action);
                }
            },
        }
    }
    actions
}

/// Shared store dispatching booking and design actions over one state
pub struct PlannerStore {
    state: Arc<RwLock<PlannerState>>,
    booking_reducer: BookingReducer,
    design_reducer: DesignReducer,
    booking_env: BookingEnvironment,
    design_env: DesignEnvironment,
}

impl PlannerStore {
    /// Creates a store with empty state around the given dependencies
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(RwLock::new(PlannerState::new())),
            booking_reducer: BookingReducer::new(),
            design_reducer: DesignReducer::new(),
            booking_env: BookingEnvironment::new(Arc::clone(&clock)),
            design_env: DesignEnvironment::new(clock, ids),
        }
    }

    /// Dispatches a booking action and drains its feedback actions.
    ///
    /// The business-rule outcome of the *initial* action is returned;
    /// feedback actions (budget recomputes) never fail the dispatch.
    ///
    /// # Errors
    ///
    /// Returns the `PlannerError` the reducer recorded, if any.
    pub async fn dispatch_booking(
        &self,
        action: BookingAction,
    ) -> Result<(), PlannerError> {
        let mut pending = vec![action];
        let mut result = Ok(());
        let mut first = true;
        while let Some(action) = pending.pop() {
            let effects = {
                let mut state = self.state.write().await;
                if first {
                    state.last_error = None;
                }
                let effects =
                    self.booking_reducer
                        .reduce(&mut state, action, &self.booking_env);
                if first {
                    if let Some(error) = state.last_error.clone() {
                        result = Err(error);
                    }
                    first = false;
                }
                effects
            };
            pending.extend(collect_actions(effects).await);
        }
        result
    }

    /// Dispatches a design action and drains its feedback actions.
    ///
    /// # Errors
    ///
    /// Returns the `PlannerError` the reducer recorded, if any.
    pub async fn dispatch_design(
        &self,
        action: DesignAction,
    ) -> Result<(), PlannerError> {
        let mut pending = vec![action];
        let mut result = Ok(());
        let mut first = true;
        while let Some(action) = pending.pop() {
            let effects = {
                let mut state = self.state.write().await;
                if first {
                    state.last_error = None;
                }
                let effects =
                    self.design_reducer
                        .reduce(&mut state, action, &self.design_env);
                if first {
                    if let Some(error) = state.last_error.clone() {
                        result = Err(error);
                    }
                    first = false;
                }
                effects
            };
            pending.extend(collect_actions(effects).await);
        }
        result
    }

    /// Runs a closure over a read snapshot of the state
    pub async fn with_state<R>(&self, f: impl FnOnce(&PlannerState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    // ------------------------------------------------------------------
    // Catalog and fixture surface. Listings, projects and budgets come
    // from outside the booking/design flows, so they are written directly
    // rather than through a reducer.
    // ------------------------------------------------------------------

    /// Inserts or replaces a service listing
    pub async fn upsert_listing(&self, listing: ServiceListing) {
        let mut state = self.state.write().await;
        debug!(listing_id = %listing.id, "listing upserted");
        state.listings.insert(listing.id, listing);
    }

    /// Inserts or replaces a wedding project
    pub async fn upsert_project(&self, project: WeddingProject) {
        let mut state = self.state.write().await;
        debug!(project_id = %project.id, "project upserted");
        state.projects.insert(project.id, project);
    }

    /// Sets (or resets) a project's total budget
    ///
    /// Planned spend is rederived in the same call, so a budget created
    /// after design work already reflects the placed items.
    pub async fn set_budget(&self, project_id: ProjectId, total_budget: Money) {
        let mut state = self.state.write().await;
        let budget = state
            .budgets
            .entry(project_id)
            .or_insert_with(|| crate::types::Budget::new(project_id, total_budget));
        budget.total_budget = total_budget;
        crate::budget::recompute_planned_spend(&mut state, project_id);
    }

    /// Overrides a quantity-based listing's capacity for one date
    pub async fn set_availability_override(
        &self,
        listing_id: ListingId,
        date: NaiveDate,
        max_quantity: u32,
    ) {
        let mut state = self.state.write().await;
        state
            .availability_overrides
            .insert((listing_id, date), max_quantity);
    }

    /// Records the actual cost of an expense and reconciles the budget
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the expense does not exist.
    pub async fn record_expense_actual(
        &self,
        expense_id: crate::types::ExpenseId,
        actual_cost: Money,
    ) -> Result<ProjectId, PlannerError> {
        let mut state = self.state.write().await;
        let Some(expense) = state.expenses.get_mut(&expense_id) else {
            return Err(PlannerError::not_found("Expense", expense_id));
        };
        expense.actual_cost = Some(actual_cost);
        let project_id = expense.project_id;
        crate::budget::recompute_planned_spend(&mut state, project_id);
        Ok(project_id)
    }

    /// Blocks a vendor's calendar date as personal time off
    pub async fn set_personal_time_off(&self, vendor_id: VendorId, date: NaiveDate) {
        let mut state = self.state.write().await;
        state.time_slots.insert(
            (vendor_id, date),
            TimeSlot {
                vendor_id,
                date,
                status: TimeSlotStatus::PersonalTimeOff,
            },
        );
    }
}
