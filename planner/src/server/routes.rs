//! Route table.

use crate::api::{bookings, budget, catalog, designs};
use crate::server::health::{health, ready};
use crate::server::state::AppState;
use axum::Router;
use axum::routing::{delete, get, patch, post, put};

/// Builds the full application router over the shared state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Catalog
        .route("/api/listings", post(catalog::create_listing))
        .route("/api/listings/:id", get(catalog::get_listing))
        .route(
            "/api/listings/:id/availability",
            get(catalog::get_availability),
        )
        .route("/api/projects", post(catalog::create_project))
        .route("/api/projects/:id", get(catalog::get_project))
        .route(
            "/api/projects/:id/catalog",
            get(catalog::browse_for_project),
        )
        // Bookings
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/status", patch(bookings::update_status))
        .route("/api/bookings/:id/payments", post(bookings::record_payment))
        // Venue design
        .route("/api/projects/:id/design", get(designs::get_design))
        .route(
            "/api/projects/:id/design/elements",
            post(designs::add_element),
        )
        .route(
            "/api/projects/:id/design/elements/:placement_id",
            patch(designs::update_element).delete(designs::remove_element),
        )
        .route(
            "/api/projects/:id/design/elements/:placement_id/reparent",
            post(designs::reparent_element),
        )
        .route(
            "/api/projects/:id/design/elements/:placement_id/duplicate",
            post(designs::duplicate_element),
        )
        .route(
            "/api/projects/:id/design/bundles/:bundle_id/duplicate",
            post(designs::duplicate_bundle),
        )
        .route(
            "/api/projects/:id/design/elements/:placement_id/tags",
            post(designs::tag_table_service),
        )
        .route(
            "/api/projects/:id/design/elements/:placement_id/tags/:listing_id",
            delete(designs::untag_table_service),
        )
        .route(
            "/api/projects/:id/design/camera",
            put(designs::set_camera),
        )
        // Project services
        .route(
            "/api/projects/:id/services",
            get(designs::list_project_services).post(designs::add_project_service),
        )
        .route(
            "/api/projects/:id/services/:listing_id",
            patch(designs::update_project_service)
                .delete(designs::remove_project_service),
        )
        // Budget
        .route(
            "/api/projects/:id/budget",
            get(budget::get_budget).put(budget::set_budget),
        )
        .route("/api/projects/:id/expenses", get(budget::list_expenses))
        .route("/api/expenses/:id/actual", post(budget::record_actual_cost))
        .route(
            "/api/projects/:id/checkout-summary",
            get(budget::checkout_summary),
        )
        .with_state(state)
}
