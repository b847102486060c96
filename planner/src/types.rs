//! Domain types for the wedding-planning marketplace core.
//!
//! This module contains all value objects, entities, and the shared planner
//! state consumed by the availability oracle, the booking state machine,
//! the design-booking linkage, and budget reconciliation.

use crate::error::{PlannerError, PlannerResult};
use chrono::{DateTime, Utc};
pub use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a service listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(Uuid);

impl ListingId {
    /// Creates a new random `ListingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ListingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ListingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a vendor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorId(Uuid);

impl VendorId {
    /// Creates a new random `VendorId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `VendorId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VendorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a couple
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoupleId(Uuid);

impl CoupleId {
    /// Creates a new random `CoupleId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CoupleId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CoupleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CoupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a wedding project
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Creates a new random `ProjectId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ProjectId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a payment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random `PaymentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PaymentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a placed 3D element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementId(Uuid);

impl PlacementId {
    /// Creates a new random `PlacementId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PlacementId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlacementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier shared by the elements of one placed bundle
/// (e.g. a table plus its chairs, created from one listing)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleId(Uuid);

impl BundleId {
    /// Creates a new random `BundleId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BundleId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for BundleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a budget expense line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenseId(Uuid);

impl ExpenseId {
    /// Creates a new random `ExpenseId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `ExpenseId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Money(u64);

impl Money {
    /// The zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars (saturating)
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, saturating at `u64::MAX` cents
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts two money amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Subtracts two money amounts, saturating at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity, saturating at `u64::MAX` cents
    #[must_use]
    pub const fn saturating_multiply(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// Signed cents, for remaining-budget arithmetic that may go negative
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // Budget figures stay far below i64::MAX
    pub const fn signed_cents(&self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Listing Value Objects
// ============================================================================

/// How a listing behaves with respect to concurrent bookings on a date
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityType {
    /// At most one active booking per calendar date
    Exclusive,
    /// Unlimited concurrent bookings
    Reusable,
    /// Bounded by `max_quantity` (or a per-date override) per calendar date
    QuantityBased,
}

impl fmt::Display for AvailabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exclusive => "exclusive",
            Self::Reusable => "reusable",
            Self::QuantityBased => "quantity_based",
        };
        write!(f, "{name}")
    }
}

/// How a listing's price is derived
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingPolicy {
    /// Flat package price
    FixedPackage,
    /// Price per explicitly requested unit
    PerUnit,
    /// Price per table tagged with the listing in the 3D design
    PerTable,
    /// Hourly rate over the event duration
    TimeBased,
}

/// Vendor service category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    /// Wedding venue (always exclusive, fixed package)
    Venue,
    /// Catering service
    Catering,
    /// Photography service
    Photography,
    /// Floral arrangements
    Florals,
    /// Music / entertainment
    Music,
    /// Decor and rentals
    Decor,
    /// Anything else
    Other,
}

/// A vendor-offered service or item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceListing {
    /// Unique listing identifier
    pub id: ListingId,
    /// Vendor offering this listing
    pub vendor_id: VendorId,
    /// Display name
    pub name: String,
    /// Service category
    pub category: ServiceCategory,
    /// Concurrency behavior per calendar date
    pub availability_type: AvailabilityType,
    /// Per-date capacity; required and positive for quantity-based listings
    pub max_quantity: Option<u32>,
    /// Price derivation policy
    pub pricing_policy: PricingPolicy,
    /// Base price (package price or per-unit/per-table price)
    pub base_price: Money,
    /// Hourly rate, used by time-based pricing
    pub hourly_rate: Option<Money>,
    /// Inactive listings are never available
    pub is_active: bool,
}

impl ServiceListing {
    /// Creates a validated `ServiceListing`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a quantity-based listing has no
    /// positive `max_quantity`, or when a venue listing is not exclusive
    /// with fixed-package pricing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ListingId,
        vendor_id: VendorId,
        name: String,
        category: ServiceCategory,
        availability_type: AvailabilityType,
        max_quantity: Option<u32>,
        pricing_policy: PricingPolicy,
        base_price: Money,
        hourly_rate: Option<Money>,
    ) -> PlannerResult<Self> {
        if availability_type == AvailabilityType::QuantityBased
            && !max_quantity.is_some_and(|q| q > 0)
        {
            return Err(PlannerError::validation(
                "quantity_based listings require a positive max_quantity",
            ));
        }
        if category == ServiceCategory::Venue
            && (availability_type != AvailabilityType::Exclusive
                || pricing_policy != PricingPolicy::FixedPackage)
        {
            return Err(PlannerError::validation(
                "venue listings must be exclusive with fixed_package pricing",
            ));
        }
        Ok(Self {
            id,
            vendor_id,
            name,
            category,
            availability_type,
            max_quantity,
            pricing_policy,
            base_price,
            hourly_rate,
            is_active: true,
        })
    }
}

// ============================================================================
// Booking
// ============================================================================

/// Booking lifecycle status.
///
/// `rejected`, `cancelled` and `completed` are terminal. Every status other
/// than `rejected`/`cancelled` is *active* - it locks the booking's linked
/// design items and claims availability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Awaiting vendor confirmation (initial status)
    PendingVendorConfirmation,
    /// Vendor confirmed; awaiting deposit payment
    PendingDepositPayment,
    /// Deposit paid
    Confirmed,
    /// Awaiting final balance payment
    PendingFinalPayment,
    /// Final balance paid
    Completed,
    /// Vendor rejected the request
    Rejected,
    /// Couple or vendor cancelled after confirmation started
    Cancelled,
}

impl BookingStatus {
    /// Statuses reachable from this one via a vendor-driven transition.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [BookingStatus] {
        match self {
            Self::PendingVendorConfirmation => {
                &[Self::PendingDepositPayment, Self::Rejected]
            },
            Self::PendingDepositPayment => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::PendingFinalPayment, Self::Cancelled],
            Self::PendingFinalPayment => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Rejected | Self::Cancelled => &[],
        }
    }

    /// Whether `to` is a legal next status from this one.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Active statuses lock linked design items and claim availability.
    /// Note `completed` is still active - a finished booking keeps its
    /// items locked.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Rejected)
    }

    /// Terminal statuses have no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PendingVendorConfirmation => "pending_vendor_confirmation",
            Self::PendingDepositPayment => "pending_deposit_payment",
            Self::Confirmed => "confirmed",
            Self::PendingFinalPayment => "pending_final_payment",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// One service line inside a booking request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedService {
    /// Listing being booked
    pub service_listing_id: ListingId,
    /// Requested quantity
    pub quantity: u32,
    /// Agreed total price for this line
    pub total_price: Money,
}

/// A couple's booking request against one vendor for one date
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// Couple who created the request
    pub couple_id: CoupleId,
    /// Vendor the request is addressed to
    pub vendor_id: VendorId,
    /// Wedding project the booking belongs to, if any
    pub project_id: Option<ProjectId>,
    /// Calendar date being reserved (one canonical day, UTC)
    pub reserved_date: NaiveDate,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Booked service lines
    pub selected_services: Vec<SelectedService>,
    /// Due date for the deposit payment, set by the vendor
    pub deposit_due_date: Option<NaiveDate>,
    /// Due date for the final payment, set by the vendor
    pub final_due_date: Option<NaiveDate>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new `Booking` in the initial status
    #[must_use]
    pub const fn new(
        id: BookingId,
        couple_id: CoupleId,
        vendor_id: VendorId,
        project_id: Option<ProjectId>,
        reserved_date: NaiveDate,
        selected_services: Vec<SelectedService>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            couple_id,
            vendor_id,
            project_id,
            reserved_date,
            status: BookingStatus::PendingVendorConfirmation,
            selected_services,
            deposit_due_date: None,
            final_due_date: None,
            created_at,
        }
    }

    /// Whether this booking carries a service line for the listing
    #[must_use]
    pub fn references_listing(&self, listing_id: ListingId) -> bool {
        self.selected_services
            .iter()
            .any(|s| s.service_listing_id == listing_id)
    }

    /// Total quantity booked for the listing across service lines
    #[must_use]
    pub fn quantity_for(&self, listing_id: ListingId) -> u32 {
        self.selected_services
            .iter()
            .filter(|s| s.service_listing_id == listing_id)
            .map(|s| s.quantity)
            .sum()
    }

    /// Set of listing ids this booking references
    #[must_use]
    pub fn listing_ids(&self) -> Vec<ListingId> {
        self.selected_services
            .iter()
            .map(|s| s.service_listing_id)
            .collect()
    }
}

// ============================================================================
// Payments and time slots
// ============================================================================

/// Payment kind - at most one of each per booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Deposit, permitted while awaiting deposit payment
    Deposit,
    /// Final balance, permitted while awaiting final payment
    Final,
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Final => write!(f, "final"),
        }
    }
}

/// Payment method
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment
    Card,
    /// Bank transfer
    BankTransfer,
    /// Cash on meeting
    Cash,
}

/// A recorded payment against a booking
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment identifier
    pub id: PaymentId,
    /// Booking this payment belongs to
    pub booking_id: BookingId,
    /// Deposit or final
    pub kind: PaymentKind,
    /// Amount paid
    pub amount: Money,
    /// How it was paid
    pub method: PaymentMethod,
    /// Optional receipt reference
    pub receipt: Option<String>,
    /// When the payment was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Status of a vendor calendar slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlotStatus {
    /// Reserved by a confirmed-track booking
    Booked,
    /// Vendor is unavailable on this date
    PersonalTimeOff,
}

/// A vendor calendar entry, unique per (vendor, date)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Vendor the slot belongs to
    pub vendor_id: VendorId,
    /// Calendar date of the slot
    pub date: NaiveDate,
    /// Slot status
    pub status: TimeSlotStatus,
}

// ============================================================================
// Project and venue design
// ============================================================================

/// A couple's overall wedding plan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeddingProject {
    /// Unique project identifier
    pub id: ProjectId,
    /// Owning couple
    pub couple_id: CoupleId,
    /// Display name
    pub name: String,
    /// Planned wedding date; availability checks use this day
    pub wedding_date: Option<NaiveDate>,
    /// Chosen venue listing, if any
    pub venue_listing_id: Option<ListingId>,
    /// Event start, used for time-based pricing
    pub event_start: Option<DateTime<Utc>>,
    /// Event end, used for time-based pricing
    pub event_end: Option<DateTime<Utc>>,
}

/// 3D transform of a placed element
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World position (x, y, z)
    pub position: [f32; 3],
    /// Rotation around the vertical axis, degrees
    pub rotation_deg: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation_deg: 0.0,
        }
    }
}

/// What kind of object a placed element is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Guest table - the only kind that accepts per-table service tags
    Table,
    /// Chair
    Chair,
    /// Decor piece
    Decor,
    /// Stage
    Stage,
    /// Dance floor
    DanceFloor,
    /// Anything else
    Other,
}

/// One 3D object instance in a venue design
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedElement {
    /// Unique placement identifier
    pub id: PlacementId,
    /// Object kind
    pub kind: ElementKind,
    /// World transform
    pub transform: Transform,
    /// User-set edit lock
    pub locked: bool,
    /// Parent element for stacking (one level deep only)
    pub parent_id: Option<PlacementId>,
    /// True while an active booking claims this element
    pub is_booked: bool,
    /// The claiming booking, when `is_booked`
    pub booking_id: Option<BookingId>,
    /// Per-table service tags (tables only)
    pub service_listing_ids: Vec<ListingId>,
}

impl PlacedElement {
    /// Creates a new unbooked `PlacedElement`
    #[must_use]
    pub const fn new(
        id: PlacementId,
        kind: ElementKind,
        transform: Transform,
        parent_id: Option<PlacementId>,
    ) -> Self {
        Self {
            id,
            kind,
            transform,
            locked: false,
            parent_id,
            is_booked: false,
            booking_id: None,
            service_listing_ids: Vec::new(),
        }
    }
}

/// Role of an element within its bundle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementRole {
    /// The bundle's primary element (e.g. the table)
    Primary,
    /// A secondary bundle member (e.g. a chair)
    Member,
}

/// Listing association for one placement.
///
/// This is the keyed relation the budget and linkage components walk;
/// every placed element has exactly one meta entry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementMeta {
    /// Listing the placement came from
    pub service_listing_id: ListingId,
    /// Bundle the placement belongs to, if created as part of one
    pub bundle_id: Option<BundleId>,
    /// Role within the bundle
    pub role: PlacementRole,
    /// Ordinal of this unit among duplicates of the same listing
    pub quantity_index: u32,
    /// Listing unit price at placement time
    pub unit_price: Money,
}

/// Saved camera state for the 3D editor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    /// Camera position
    pub position: [f32; 3],
    /// Look-at target
    pub target: [f32; 3],
    /// Zoom factor
    pub zoom: f32,
}

/// A project's 3D venue layout - at most one per project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VenueDesign {
    /// Owning project
    pub project_id: ProjectId,
    /// Placed elements by id
    pub elements: HashMap<PlacementId, PlacedElement>,
    /// Listing association per placement
    pub placements_meta: HashMap<PlacementId, PlacementMeta>,
    /// Saved camera state
    pub camera: Option<CameraState>,
}

impl VenueDesign {
    /// Creates an empty design for the project
    #[must_use]
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            elements: HashMap::new(),
            placements_meta: HashMap::new(),
            camera: None,
        }
    }

    /// Number of table elements tagged with the listing
    #[must_use]
    pub fn tables_tagged_with(&self, listing_id: ListingId) -> u32 {
        #[allow(clippy::cast_possible_truncation)] // Table counts are tiny
        let count = self
            .elements
            .values()
            .filter(|e| {
                e.kind == ElementKind::Table && e.service_listing_ids.contains(&listing_id)
            })
            .count() as u32;
        count
    }

    /// Placement ids belonging to the bundle
    #[must_use]
    pub fn bundle_members(&self, bundle_id: BundleId) -> Vec<PlacementId> {
        self.placements_meta
            .iter()
            .filter(|(_, meta)| meta.bundle_id == Some(bundle_id))
            .map(|(id, _)| *id)
            .collect()
    }
}

// ============================================================================
// Project services, budget, expenses
// ============================================================================

/// A non-3D service line on a project, unique per (project, listing)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectService {
    /// Owning project
    pub project_id: ProjectId,
    /// Listing the line refers to
    pub service_listing_id: ListingId,
    /// Requested quantity
    pub quantity: u32,
    /// True while an active booking claims this line
    pub is_booked: bool,
    /// The claiming booking, when `is_booked`
    pub booking_id: Option<BookingId>,
}

/// A project's financial ledger header
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Owning project
    pub project_id: ProjectId,
    /// Total budget the couple set
    pub total_budget: Money,
    /// Sum of actual costs across expenses
    pub total_spent: Money,
    /// Derived estimate implied by the current design and services
    pub planned_spend: Money,
    /// `total_budget - total_spent - planned_spend`, may go negative
    pub total_remaining_cents: i64,
}

impl Budget {
    /// Creates a fresh budget with no spend
    #[must_use]
    pub const fn new(project_id: ProjectId, total_budget: Money) -> Self {
        Self {
            project_id,
            total_budget,
            total_spent: Money::ZERO,
            planned_spend: Money::ZERO,
            total_remaining_cents: total_budget.signed_cents(),
        }
    }

    /// Re-derives `total_remaining_cents` from the other three figures
    pub const fn recompute_remaining(&mut self) {
        self.total_remaining_cents = self.total_budget.signed_cents()
            - self.total_spent.signed_cents()
            - self.planned_spend.signed_cents();
    }
}

/// A budget expense line, optionally promoted from a per-table service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique expense identifier
    pub id: ExpenseId,
    /// Owning project
    pub project_id: ProjectId,
    /// Budget category name
    pub category: String,
    /// Listing this expense tracks, when promoted from a per-table service
    pub service_listing_id: Option<ListingId>,
    /// Estimated cost
    pub estimated_cost: Money,
    /// Actual cost once known; contributes to `total_spent`
    pub actual_cost: Option<Money>,
}

// ============================================================================
// Shared planner state
// ============================================================================

/// The single shared state all planner reducers operate on.
///
/// This is the explicit store handle the components receive by injection;
/// keys mirror the unique constraints of the relational schema
/// ((vendor, date) time slots, (project, listing) project services).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlannerState {
    /// Service listings by id
    pub listings: HashMap<ListingId, ServiceListing>,
    /// Per-date capacity overrides for quantity-based listings
    pub availability_overrides: HashMap<(ListingId, NaiveDate), u32>,
    /// Bookings by id
    pub bookings: HashMap<BookingId, Booking>,
    /// Payments by id
    pub payments: HashMap<PaymentId, Payment>,
    /// Vendor calendar, unique per (vendor, date)
    pub time_slots: HashMap<(VendorId, NaiveDate), TimeSlot>,
    /// Wedding projects by id
    pub projects: HashMap<ProjectId, WeddingProject>,
    /// Venue designs, at most one per project
    pub designs: HashMap<ProjectId, VenueDesign>,
    /// Non-3D service lines, unique per (project, listing)
    pub project_services: HashMap<(ProjectId, ListingId), ProjectService>,
    /// Budgets by project
    pub budgets: HashMap<ProjectId, Budget>,
    /// Expense lines by id
    pub expenses: HashMap<ExpenseId, Expense>,
    /// Last business-rule failure recorded by a reducer
    pub last_error: Option<crate::error::PlannerError>,
}

impl PlannerState {
    /// Creates a new empty `PlannerState`
    #[must_use]
    pub fn new() -> Self {
        Self {
            listings: HashMap::new(),
            availability_overrides: HashMap::new(),
            bookings: HashMap::new(),
            payments: HashMap::new(),
            time_slots: HashMap::new(),
            projects: HashMap::new(),
            designs: HashMap::new(),
            project_services: HashMap::new(),
            budgets: HashMap::new(),
            expenses: HashMap::new(),
            last_error: None,
        }
    }

    /// Gets a listing by id
    #[must_use]
    pub fn listing(&self, id: ListingId) -> Option<&ServiceListing> {
        self.listings.get(&id)
    }

    /// Gets a booking by id
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.get(&id)
    }

    /// Gets a project by id
    #[must_use]
    pub fn project(&self, id: ProjectId) -> Option<&WeddingProject> {
        self.projects.get(&id)
    }

    /// Gets a project's design, if one exists
    #[must_use]
    pub fn design(&self, project_id: ProjectId) -> Option<&VenueDesign> {
        self.designs.get(&project_id)
    }

    /// Gets or creates the project's design
    pub fn design_mut_or_create(&mut self, project_id: ProjectId) -> &mut VenueDesign {
        self.designs
            .entry(project_id)
            .or_insert_with(|| VenueDesign::new(project_id))
    }

    /// Active (non-cancelled, non-rejected) bookings reserving the date
    pub fn active_bookings_on(
        &self,
        date: NaiveDate,
    ) -> impl Iterator<Item = &Booking> {
        self.bookings
            .values()
            .filter(move |b| b.reserved_date == date && b.status.is_active())
    }

    /// Whether any active booking claims the exclusive listing on the date
    #[must_use]
    pub fn exclusive_claimed(&self, listing_id: ListingId, date: NaiveDate) -> bool {
        self.active_bookings_on(date)
            .any(|b| b.references_listing(listing_id))
    }

    /// Total quantity claimed by active bookings for (listing, date)
    #[must_use]
    pub fn booked_quantity(&self, listing_id: ListingId, date: NaiveDate) -> u32 {
        self.active_bookings_on(date)
            .map(|b| b.quantity_for(listing_id))
            .sum()
    }

    /// Per-date capacity: override if present, listing default otherwise
    #[must_use]
    pub fn effective_max_quantity(
        &self,
        listing: &ServiceListing,
        date: NaiveDate,
    ) -> u32 {
        self.availability_overrides
            .get(&(listing.id, date))
            .copied()
            .or(listing.max_quantity)
            .unwrap_or(0)
    }

    /// Whether the vendor blocked the date as personal time off
    #[must_use]
    pub fn vendor_time_off(&self, vendor_id: VendorId, date: NaiveDate) -> bool {
        self.time_slots
            .get(&(vendor_id, date))
            .is_some_and(|slot| slot.status == TimeSlotStatus::PersonalTimeOff)
    }

    /// Whether a payment of the kind already exists for the booking
    #[must_use]
    pub fn payment_exists(&self, booking_id: BookingId, kind: PaymentKind) -> bool {
        self.payments
            .values()
            .any(|p| p.booking_id == booking_id && p.kind == kind)
    }

    /// The promoted per-table expense for (project, listing), if any
    #[must_use]
    pub fn expense_for_listing(
        &self,
        project_id: ProjectId,
        listing_id: ListingId,
    ) -> Option<ExpenseId> {
        self.expenses
            .values()
            .find(|e| {
                e.project_id == project_id && e.service_listing_id == Some(listing_id)
            })
            .map(|e| e.id)
    }

    /// Sum of actual costs across the project's expenses
    #[must_use]
    pub fn actual_spent(&self, project_id: ProjectId) -> Money {
        self.expenses
            .values()
            .filter(|e| e.project_id == project_id)
            .filter_map(|e| e.actual_cost)
            .fold(Money::ZERO, Money::saturating_add)
    }
}

impl Default for PlannerState {
    fn default() -> Self {
        Self::new()
    }
}
