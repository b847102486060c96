//! Availability oracle.
//!
//! Answers the one question every booking path has to agree on: can this
//! listing be booked on this calendar date, and at what remaining capacity?
//! The same function backs the read-side availability endpoint and the
//! re-validation performed inside the booking reducer under the state lock.

use crate::types::{AvailabilityType, ListingId, PlannerState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Verdict returned by the oracle for one (listing, date) pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    /// Whether at least one more unit can be booked
    pub available: bool,
    /// Human-readable reason when unavailable
    pub reason: Option<String>,
    /// The listing's availability type, echoed for clients
    pub availability_type: Option<AvailabilityType>,
    /// Remaining capacity (quantity-based listings only)
    pub available_quantity: Option<u32>,
    /// Effective capacity for the date (quantity-based listings only)
    pub max_quantity: Option<u32>,
    /// Quantity already claimed by active bookings (quantity-based only)
    pub booked_quantity: Option<u32>,
}

impl AvailabilityReport {
    fn unavailable(reason: &str, availability_type: Option<AvailabilityType>) -> Self {
        Self {
            available: false,
            reason: Some(reason.to_string()),
            availability_type,
            available_quantity: None,
            max_quantity: None,
            booked_quantity: None,
        }
    }

    fn available(availability_type: AvailabilityType) -> Self {
        Self {
            available: true,
            reason: None,
            availability_type: Some(availability_type),
            available_quantity: None,
            max_quantity: None,
            booked_quantity: None,
        }
    }
}

/// Reports whether the listing can be booked on the date.
///
/// Active bookings are everything except cancelled and rejected; a completed
/// booking still occupies its date. Quantity-based listings report aggregate
/// capacity across all couples, not a per-requester view.
#[must_use]
pub fn check_availability(
    state: &PlannerState,
    listing_id: ListingId,
    date: NaiveDate,
) -> AvailabilityReport {
    let Some(listing) = state.listing(listing_id) else {
        return AvailabilityReport::unavailable("Service not found", None);
    };
    if !listing.is_active {
        return AvailabilityReport::unavailable("Service is not active", None);
    }
    if state.vendor_time_off(listing.vendor_id, date) {
        return AvailabilityReport::unavailable(
            "Vendor is unavailable on this date",
            Some(listing.availability_type),
        );
    }

    match listing.availability_type {
        AvailabilityType::Exclusive => {
            if state.exclusive_claimed(listing_id, date) {
                AvailabilityReport::unavailable(
                    "Already booked for this date",
                    Some(AvailabilityType::Exclusive),
                )
            } else {
                AvailabilityReport::available(AvailabilityType::Exclusive)
            }
        },
        AvailabilityType::Reusable => {
            AvailabilityReport::available(AvailabilityType::Reusable)
        },
        AvailabilityType::QuantityBased => {
            let max = state.effective_max_quantity(listing, date);
            let booked = state.booked_quantity(listing_id, date);
            let remaining = max.saturating_sub(booked);
            AvailabilityReport {
                available: remaining > 0,
                reason: (remaining == 0)
                    .then(|| "No remaining quantity for this date".to_string()),
                availability_type: Some(AvailabilityType::QuantityBased),
                available_quantity: Some(remaining),
                max_quantity: Some(max),
                booked_quantity: Some(booked),
            }
        },
    }
}
