//! Design-booking linkage.
//!
//! Keeps 3D design elements and project service lines in step with the
//! bookings that claim them. Runs after every booking status change, inside
//! the same state mutation, so flags can never drift from booking status.

use crate::types::{BookingId, BookingStatus, PlannerState};
use tracing::debug;

/// Synchronizes linked design elements and project services with a booking's
/// status.
///
/// While the booking is active, every element whose placement meta points at
/// one of the booking's listings, and every matching project service line, is
/// flagged as booked by it. When the booking becomes cancelled or rejected,
/// every item carrying its id is released, whichever listing it points at.
/// A booking without a project is a no-op.
pub fn sync_linked_items(state: &mut PlannerState, booking_id: BookingId) {
    let Some(booking) = state.bookings.get(&booking_id) else {
        return;
    };
    let Some(project_id) = booking.project_id else {
        return;
    };
    let status = booking.status;
    let listing_ids = booking.listing_ids();

    if is_claiming(status) {
        claim(state, booking_id, project_id, &listing_ids);
    } else {
        release(state, booking_id);
    }
    debug!(
        booking_id = %booking_id,
        status = %status,
        "synchronized linked design items"
    );
}

fn claim(
    state: &mut PlannerState,
    booking_id: BookingId,
    project_id: crate::types::ProjectId,
    listing_ids: &[crate::types::ListingId],
) {
    if let Some(design) = state.designs.get_mut(&project_id) {
        let matching: Vec<_> = design
            .placements_meta
            .iter()
            .filter(|(_, meta)| listing_ids.contains(&meta.service_listing_id))
            .map(|(id, _)| *id)
            .collect();
        for placement_id in matching {
            if let Some(element) = design.elements.get_mut(&placement_id) {
                element.is_booked = true;
                element.booking_id = Some(booking_id);
            }
        }
    }
    for ((pid, listing_id), service) in &mut state.project_services {
        if *pid == project_id && listing_ids.contains(listing_id) {
            service.is_booked = true;
            service.booking_id = Some(booking_id);
        }
    }
}

/// Release by booking id rather than by listing set, so items claimed under
/// an earlier service selection are still cleared.
fn release(state: &mut PlannerState, booking_id: BookingId) {
    for design in state.designs.values_mut() {
        for element in design.elements.values_mut() {
            if element.booking_id == Some(booking_id) {
                element.is_booked = false;
                element.booking_id = None;
            }
        }
    }
    for service in state.project_services.values_mut() {
        if service.booking_id == Some(booking_id) {
            service.is_booked = false;
            service.booking_id = None;
        }
    }
}

/// Whether the status counts as claiming for linkage purposes.
/// Exposed for callers that need the predicate without a full sync.
#[must_use]
pub const fn is_claiming(status: BookingStatus) -> bool {
    status.is_active()
}
