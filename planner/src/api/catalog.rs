//! Catalog endpoints: listings, projects, and the availability lookup.

use crate::availability::{AvailabilityReport, check_availability};
use crate::server::error::AppError;
use crate::server::state::AppState;
use crate::types::{
    AvailabilityType, CoupleId, ListingId, Money, NaiveDate, PricingPolicy, ProjectId,
    ServiceCategory, ServiceListing, VendorId, WeddingProject,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for creating a listing
#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    /// Vendor offering the listing
    pub vendor_id: Uuid,
    /// Display name
    pub name: String,
    /// Service category
    pub category: ServiceCategory,
    /// Concurrency behavior per date
    pub availability_type: AvailabilityType,
    /// Per-date capacity for quantity-based listings
    pub max_quantity: Option<u32>,
    /// Price derivation policy
    pub pricing_policy: PricingPolicy,
    /// Base price in cents
    pub base_price_cents: u64,
    /// Hourly rate in cents, for time-based pricing
    pub hourly_rate_cents: Option<u64>,
}

/// Response body describing a listing
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    /// Listing id
    pub id: ListingId,
    /// Vendor id
    pub vendor_id: VendorId,
    /// Display name
    pub name: String,
    /// Service category
    pub category: ServiceCategory,
    /// Concurrency behavior
    pub availability_type: AvailabilityType,
    /// Per-date capacity
    pub max_quantity: Option<u32>,
    /// Price derivation policy
    pub pricing_policy: PricingPolicy,
    /// Base price in cents
    pub base_price_cents: u64,
    /// Whether the listing is bookable
    pub is_active: bool,
}

impl From<&ServiceListing> for ListingResponse {
    fn from(listing: &ServiceListing) -> Self {
        Self {
            id: listing.id,
            vendor_id: listing.vendor_id,
            name: listing.name.clone(),
            category: listing.category,
            availability_type: listing.availability_type,
            max_quantity: listing.max_quantity,
            pricing_policy: listing.pricing_policy,
            base_price_cents: listing.base_price.cents(),
            is_active: listing.is_active,
        }
    }
}

/// `POST /api/listings`
pub async fn create_listing(
    State(state): State<AppState>,
    Json(request): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), AppError> {
    let listing = ServiceListing::new(
        ListingId::new(),
        VendorId::from_uuid(request.vendor_id),
        request.name,
        request.category,
        request.availability_type,
        request.max_quantity,
        request.pricing_policy,
        Money::from_cents(request.base_price_cents),
        request.hourly_rate_cents.map(Money::from_cents),
    )?;
    let response = ListingResponse::from(&listing);
    state.store.upsert_listing(listing).await;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /api/listings/:id`
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing_id = ListingId::from_uuid(listing_id);
    state
        .store
        .with_state(|s| s.listing(listing_id).map(ListingResponse::from))
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Listing not found"))
}

/// Query parameters for the availability lookup
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Calendar date to check
    pub date: NaiveDate,
}

/// `GET /api/listings/:id/availability?date=YYYY-MM-DD`
pub async fn get_availability(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityReport> {
    let listing_id = ListingId::from_uuid(listing_id);
    let report = state
        .store
        .with_state(|s| check_availability(s, listing_id, query.date))
        .await;
    Json(report)
}

/// One catalog entry with its availability for a project's wedding date
#[derive(Debug, Serialize)]
pub struct CatalogEntryResponse {
    /// The listing
    pub listing: ListingResponse,
    /// Availability on the project's wedding date, when one is set
    pub availability: Option<AvailabilityReport>,
}

/// `GET /api/projects/:id/catalog`
///
/// Browse all active listings, each annotated with its availability on the
/// project's wedding date.
pub async fn browse_for_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<CatalogEntryResponse>>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .with_state(|s| {
            let project = s.project(project_id)?;
            let wedding_date = project.wedding_date;
            let mut entries: Vec<CatalogEntryResponse> = s
                .listings
                .values()
                .filter(|listing| listing.is_active)
                .map(|listing| CatalogEntryResponse {
                    listing: ListingResponse::from(listing),
                    availability: wedding_date
                        .map(|date| check_availability(s, listing.id, date)),
                })
                .collect();
            entries.sort_by(|a, b| a.listing.name.cmp(&b.listing.name));
            Some(entries)
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Project not found"))
}

/// Request body for creating a project
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    /// Owning couple
    pub couple_id: Uuid,
    /// Display name
    pub name: String,
    /// Planned wedding date
    pub wedding_date: Option<NaiveDate>,
    /// Chosen venue listing
    pub venue_listing_id: Option<Uuid>,
    /// Event start, for time-based pricing
    pub event_start: Option<DateTime<Utc>>,
    /// Event end, for time-based pricing
    pub event_end: Option<DateTime<Utc>>,
}

/// Response body describing a project
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    /// Project id
    pub id: ProjectId,
    /// Owning couple
    pub couple_id: CoupleId,
    /// Display name
    pub name: String,
    /// Planned wedding date
    pub wedding_date: Option<NaiveDate>,
    /// Chosen venue listing
    pub venue_listing_id: Option<ListingId>,
}

impl From<&WeddingProject> for ProjectResponse {
    fn from(project: &WeddingProject) -> Self {
        Self {
            id: project.id,
            couple_id: project.couple_id,
            name: project.name.clone(),
            wedding_date: project.wedding_date,
            venue_listing_id: project.venue_listing_id,
        }
    }
}

/// `POST /api/projects`
pub async fn create_project(
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> (StatusCode, Json<ProjectResponse>) {
    let project = WeddingProject {
        id: ProjectId::new(),
        couple_id: CoupleId::from_uuid(request.couple_id),
        name: request.name,
        wedding_date: request.wedding_date,
        venue_listing_id: request.venue_listing_id.map(ListingId::from_uuid),
        event_start: request.event_start,
        event_end: request.event_end,
    };
    let response = ProjectResponse::from(&project);
    state.store.upsert_project(project).await;
    (StatusCode::CREATED, Json(response))
}

/// `GET /api/projects/:id`
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .with_state(|s| s.project(project_id).map(ProjectResponse::from))
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Project not found"))
}
