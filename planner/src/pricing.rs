//! Listing price calculation.
//!
//! One pure function per concern: derive a listing's price from its pricing
//! policy plus the context the policy needs, and derive an event duration in
//! whole billable hours.

use crate::error::{PlannerError, PlannerResult};
use crate::types::{Money, PricingPolicy, ServiceListing};
use chrono::{DateTime, Utc};

/// The policy-specific input a price calculation needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceContext {
    /// Flat package, no extra input
    FixedPackage,
    /// Explicit requested unit count
    PerUnit {
        /// Units requested
        quantity: u32,
    },
    /// Count of tables tagged with the listing in the design
    PerTable {
        /// Tagged table count
        table_count: u32,
    },
    /// Billable event duration
    TimeBased {
        /// Duration in whole hours, rounded up
        duration_hours: u32,
    },
}

/// Calculates the listing's price for the given context.
///
/// # Errors
///
/// Returns a validation error when the context does not match the listing's
/// pricing policy, or when a time-based listing has no hourly rate. Callers
/// unable to supply a matching context should fall back to
/// [`fallback_price`].
pub fn calculate_price(
    listing: &ServiceListing,
    context: PriceContext,
) -> PlannerResult<Money> {
    match (listing.pricing_policy, context) {
        (PricingPolicy::FixedPackage, PriceContext::FixedPackage) => {
            Ok(listing.base_price)
        },
        (PricingPolicy::PerUnit, PriceContext::PerUnit { quantity }) => {
            Ok(listing.base_price.saturating_multiply(quantity))
        },
        (PricingPolicy::PerTable, PriceContext::PerTable { table_count }) => {
            Ok(listing.base_price.saturating_multiply(table_count))
        },
        (PricingPolicy::TimeBased, PriceContext::TimeBased { duration_hours }) => {
            let rate = listing.hourly_rate.ok_or_else(|| {
                PlannerError::validation("time_based listing has no hourly rate")
            })?;
            Ok(rate.saturating_multiply(duration_hours))
        },
        (policy, _) => Err(PlannerError::validation(format!(
            "price context does not match pricing policy {policy:?}"
        ))),
    }
}

/// Best-effort price when the policy's context is unavailable: quantity
/// scaling for unit and table policies, flat base price otherwise.
#[must_use]
pub fn fallback_price(listing: &ServiceListing, quantity: u32) -> Money {
    match listing.pricing_policy {
        PricingPolicy::PerUnit | PricingPolicy::PerTable => {
            listing.base_price.saturating_multiply(quantity)
        },
        PricingPolicy::FixedPackage | PricingPolicy::TimeBased => listing.base_price,
    }
}

/// Event duration in whole billable hours, rounded up. Returns `None` when
/// the end does not follow the start.
#[must_use]
pub fn calculate_event_duration(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<u32> {
    let minutes = (end - start).num_minutes();
    if minutes <= 0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // Event durations are hours, not millennia
    let hours = (minutes as u64).div_ceil(60) as u32;
    Some(hours)
}
