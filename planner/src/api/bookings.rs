//! Booking endpoints.

use crate::aggregates::booking::BookingAction;
use crate::server::error::AppError;
use crate::server::state::AppState;
use crate::types::{
    Booking, BookingId, BookingStatus, CoupleId, ListingId, Money, NaiveDate, PaymentId,
    PaymentKind, PaymentMethod, ProjectId, SelectedService, VendorId,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One service line in a booking request
#[derive(Debug, Deserialize)]
pub struct SelectedServiceRequest {
    /// Listing being booked
    pub service_listing_id: Uuid,
    /// Requested quantity
    pub quantity: u32,
    /// Agreed total price in cents
    pub total_price_cents: u64,
}

/// Request body for creating a booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Requesting couple
    pub couple_id: Uuid,
    /// Vendor being booked
    pub vendor_id: Uuid,
    /// Project the booking belongs to
    pub project_id: Option<Uuid>,
    /// Date being reserved
    pub reserved_date: NaiveDate,
    /// Requested service lines
    pub selected_services: Vec<SelectedServiceRequest>,
}

/// Request body for a status transition
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status
    pub new_status: BookingStatus,
    /// Vendor performing the transition
    pub actor_vendor_id: Option<Uuid>,
    /// Deposit due date set alongside a confirmation
    pub deposit_due_date: Option<NaiveDate>,
    /// Final due date set alongside a confirmation
    pub final_due_date: Option<NaiveDate>,
}

/// Request body for recording a payment
#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    /// Deposit or final
    pub kind: PaymentKind,
    /// Amount in cents
    pub amount_cents: u64,
    /// Payment method
    pub method: PaymentMethod,
    /// Optional receipt reference
    pub receipt: Option<String>,
}

/// Response body describing a booking
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking id
    pub id: BookingId,
    /// Requesting couple
    pub couple_id: CoupleId,
    /// Booked vendor
    pub vendor_id: VendorId,
    /// Owning project
    pub project_id: Option<ProjectId>,
    /// Reserved date
    pub reserved_date: NaiveDate,
    /// Current status
    pub status: BookingStatus,
    /// Booked service lines
    pub selected_services: Vec<SelectedServiceResponse>,
    /// Deposit due date
    pub deposit_due_date: Option<NaiveDate>,
    /// Final payment due date
    pub final_due_date: Option<NaiveDate>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// One service line in a booking response
#[derive(Debug, Serialize)]
pub struct SelectedServiceResponse {
    /// Listing booked
    pub service_listing_id: ListingId,
    /// Quantity booked
    pub quantity: u32,
    /// Total price in cents
    pub total_price_cents: u64,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            couple_id: booking.couple_id,
            vendor_id: booking.vendor_id,
            project_id: booking.project_id,
            reserved_date: booking.reserved_date,
            status: booking.status,
            selected_services: booking
                .selected_services
                .iter()
                .map(|s| SelectedServiceResponse {
                    service_listing_id: s.service_listing_id,
                    quantity: s.quantity,
                    total_price_cents: s.total_price.cents(),
                })
                .collect(),
            deposit_due_date: booking.deposit_due_date,
            final_due_date: booking.final_due_date,
            created_at: booking.created_at,
        }
    }
}

async fn booking_response(
    state: &AppState,
    booking_id: BookingId,
) -> Result<Json<BookingResponse>, AppError> {
    state
        .store
        .with_state(|s| s.booking(booking_id).map(BookingResponse::from))
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Booking not found"))
}

/// Query parameters scoping a booking list to one caller
#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    /// Only bookings for this vendor
    pub vendor_id: Option<Uuid>,
    /// Only bookings made by this couple
    pub couple_id: Option<Uuid>,
}

/// `GET /api/bookings?vendor_id=&couple_id=`
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> Json<Vec<BookingResponse>> {
    let vendor_id = query.vendor_id.map(VendorId::from_uuid);
    let couple_id = query.couple_id.map(CoupleId::from_uuid);
    let mut bookings = state
        .store
        .with_state(|s| {
            s.bookings
                .values()
                .filter(|b| vendor_id.is_none_or(|v| b.vendor_id == v))
                .filter(|b| couple_id.is_none_or(|c| b.couple_id == c))
                .map(BookingResponse::from)
                .collect::<Vec<_>>()
        })
        .await;
    bookings.sort_by_key(|b| (b.created_at, b.id.to_string()));
    Json(bookings)
}

/// `POST /api/bookings`
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking_id = BookingId::new();
    let selected_services = request
        .selected_services
        .into_iter()
        .map(|s| SelectedService {
            service_listing_id: ListingId::from_uuid(s.service_listing_id),
            quantity: s.quantity,
            total_price: Money::from_cents(s.total_price_cents),
        })
        .collect();

    state
        .store
        .dispatch_booking(BookingAction::CreateBooking {
            booking_id,
            couple_id: CoupleId::from_uuid(request.couple_id),
            vendor_id: VendorId::from_uuid(request.vendor_id),
            project_id: request.project_id.map(ProjectId::from_uuid),
            reserved_date: request.reserved_date,
            selected_services,
        })
        .await?;

    let response = booking_response(&state, booking_id).await?;
    Ok((StatusCode::CREATED, response))
}

/// `GET /api/bookings/:id`
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    booking_response(&state, BookingId::from_uuid(booking_id)).await
}

/// `PATCH /api/bookings/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking_id = BookingId::from_uuid(booking_id);
    state
        .store
        .dispatch_booking(BookingAction::UpdateStatus {
            booking_id,
            actor_vendor_id: request.actor_vendor_id.map(VendorId::from_uuid),
            new_status: request.new_status,
            deposit_due_date: request.deposit_due_date,
            final_due_date: request.final_due_date,
        })
        .await?;
    booking_response(&state, booking_id).await
}

/// `POST /api/bookings/:id/payments`
pub async fn record_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking_id = BookingId::from_uuid(booking_id);
    state
        .store
        .dispatch_booking(BookingAction::RecordPayment {
            payment_id: PaymentId::new(),
            booking_id,
            kind: request.kind,
            amount: Money::from_cents(request.amount_cents),
            method: request.method,
            receipt: request.receipt,
        })
        .await?;
    let response = booking_response(&state, booking_id).await?;
    Ok((StatusCode::CREATED, response))
}
