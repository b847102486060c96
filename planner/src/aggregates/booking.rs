//! Booking aggregate.
//!
//! Owns the booking lifecycle: creation with availability re-validation,
//! the vendor-driven status machine, payment recording, and the vendor
//! calendar side effects. Every mutation that touches a project ends with a
//! budget recompute fed back through the store.

use crate::availability::check_availability;
use crate::budget;
use crate::error::PlannerError;
use crate::linkage::sync_linked_items;
use crate::types::{
    Booking, BookingId, BookingStatus, CoupleId, Money, NaiveDate, Payment, PaymentId,
    PaymentKind, PaymentMethod, PlannerState, ProjectId, SelectedService, TimeSlot,
    TimeSlotStatus, VendorId,
};
use aisle_core::effect::Effect;
use aisle_core::environment::Clock;
use aisle_core::reducer::Reducer;
use aisle_core::{SmallVec, smallvec};
use aisle_macros::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Commands and events processed by the [`BookingReducer`]
#[derive(Action, Clone, Debug, Serialize, Deserialize)]
pub enum BookingAction {
    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------
    /// Create a booking request for a vendor and date
    #[command]
    CreateBooking {
        /// Id for the new booking
        booking_id: BookingId,
        /// Requesting couple
        couple_id: CoupleId,
        /// Vendor being booked
        vendor_id: VendorId,
        /// Project the booking belongs to, if any
        project_id: Option<ProjectId>,
        /// Date being reserved
        reserved_date: NaiveDate,
        /// Requested service lines
        selected_services: Vec<SelectedService>,
    },

    /// Move a booking to a new lifecycle status
    #[command]
    UpdateStatus {
        /// Booking to transition
        booking_id: BookingId,
        /// Vendor performing the transition, when vendor-initiated
        actor_vendor_id: Option<VendorId>,
        /// Target status
        new_status: BookingStatus,
        /// Deposit due date set alongside a confirmation
        deposit_due_date: Option<NaiveDate>,
        /// Final payment due date set alongside a confirmation
        final_due_date: Option<NaiveDate>,
    },

    /// Record a deposit or final payment against a booking
    #[command]
    RecordPayment {
        /// Id for the new payment
        payment_id: PaymentId,
        /// Booking being paid
        booking_id: BookingId,
        /// Deposit or final
        kind: PaymentKind,
        /// Amount paid
        amount: Money,
        /// Payment method
        method: PaymentMethod,
        /// Optional receipt reference
        receipt: Option<String>,
    },

    /// Re-derive a project's planned spend and remaining budget
    #[command]
    RecomputeBudget {
        /// Project to reconcile
        project_id: ProjectId,
    },

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------
    /// A booking request was created
    #[event]
    BookingCreated {
        /// The created booking
        booking: Booking,
    },

    /// A booking changed status
    #[event]
    BookingStatusChanged {
        /// Booking that changed
        booking_id: BookingId,
        /// Previous status
        from: BookingStatus,
        /// New status
        to: BookingStatus,
        /// Deposit due date recorded with the change, if any
        deposit_due_date: Option<NaiveDate>,
        /// Final due date recorded with the change, if any
        final_due_date: Option<NaiveDate>,
    },

    /// A vendor calendar slot was reserved for a booking's date
    #[event]
    TimeSlotReserved {
        /// Vendor whose calendar gains the slot
        vendor_id: VendorId,
        /// Reserved date
        date: NaiveDate,
    },

    /// A payment was recorded
    #[event]
    PaymentRecorded {
        /// The recorded payment
        payment: Payment,
    },

    /// A command failed a business rule
    #[event]
    ValidationFailed {
        /// The failure
        error: PlannerError,
    },
}

/// Injected dependencies for the booking reducer
pub struct BookingEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl BookingEnvironment {
    /// Creates an environment around the given clock
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

/// Reducer driving the booking lifecycle
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fail(
        state: &mut PlannerState,
        error: PlannerError,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        warn!(error = %error, "booking command rejected");
        Self::apply_event(state, &BookingAction::ValidationFailed { error });
        smallvec![]
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_create(
        state: &mut PlannerState,
        env: &BookingEnvironment,
        booking_id: BookingId,
        couple_id: CoupleId,
        vendor_id: VendorId,
        project_id: Option<ProjectId>,
        reserved_date: NaiveDate,
        selected_services: Vec<SelectedService>,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        if state.bookings.contains_key(&booking_id) {
            return Self::fail(state, PlannerError::conflict("Booking already exists"));
        }
        if selected_services.is_empty() {
            return Self::fail(
                state,
                PlannerError::validation("A booking needs at least one service"),
            );
        }
        if selected_services.iter().any(|s| s.quantity == 0) {
            return Self::fail(
                state,
                PlannerError::validation("Service quantity must be positive"),
            );
        }

        // Requested quantity per listing, so multi-line requests are checked
        // against capacity as a whole.
        let mut requested: HashMap<_, u32> = HashMap::new();
        for line in &selected_services {
            *requested.entry(line.service_listing_id).or_default() += line.quantity;
        }

        for (&listing_id, &quantity) in &requested {
            let Some(listing) = state.listing(listing_id) else {
                return Self::fail(
                    state,
                    PlannerError::not_found("Service listing", listing_id),
                );
            };
            if listing.vendor_id != vendor_id {
                return Self::fail(
                    state,
                    PlannerError::validation("Service belongs to a different vendor"),
                );
            }
            // Re-validate under the state lock; a read-side check the couple
            // did earlier may be stale by now.
            let report = check_availability(state, listing_id, reserved_date);
            if !report.available {
                let reason = report
                    .reason
                    .unwrap_or_else(|| "Service is unavailable".to_string());
                return Self::fail(state, PlannerError::conflict(reason));
            }
            if let Some(remaining) = report.available_quantity {
                if remaining < quantity {
                    return Self::fail(
                        state,
                        PlannerError::conflict(format!(
                            "Only {remaining} of {quantity} requested units are available"
                        )),
                    );
                }
            }
        }

        let booking = Booking::new(
            booking_id,
            couple_id,
            vendor_id,
            project_id,
            reserved_date,
            selected_services,
            env.clock.now(),
        );
        info!(booking_id = %booking_id, vendor_id = %vendor_id, "booking created");
        Self::apply_event(state, &BookingAction::BookingCreated { booking });
        Self::budget_feedback(project_id)
    }

    fn handle_update_status(
        state: &mut PlannerState,
        booking_id: BookingId,
        actor_vendor_id: Option<VendorId>,
        new_status: BookingStatus,
        deposit_due_date: Option<NaiveDate>,
        final_due_date: Option<NaiveDate>,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        let Some(booking) = state.booking(booking_id) else {
            return Self::fail(state, PlannerError::not_found("Booking", booking_id));
        };
        if let Some(actor) = actor_vendor_id {
            if actor != booking.vendor_id {
                return Self::fail(
                    state,
                    PlannerError::Forbidden(
                        "Only the booked vendor can update this booking".to_string(),
                    ),
                );
            }
        }
        let from = booking.status;
        let (vendor_id, date, project_id) =
            (booking.vendor_id, booking.reserved_date, booking.project_id);

        if from != new_status && !from.can_transition_to(new_status) {
            return Self::fail(
                state,
                PlannerError::InvalidTransition { from, to: new_status },
            );
        }

        Self::apply_event(
            state,
            &BookingAction::BookingStatusChanged {
                booking_id,
                from,
                to: new_status,
                deposit_due_date,
                final_due_date,
            },
        );
        // Vendor confirmation claims the calendar day.
        if from == BookingStatus::PendingVendorConfirmation
            && new_status == BookingStatus::PendingDepositPayment
        {
            Self::apply_event(
                state,
                &BookingAction::TimeSlotReserved { vendor_id, date },
            );
        }
        info!(booking_id = %booking_id, from = %from, to = %new_status, "booking status changed");
        Self::budget_feedback(project_id)
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_record_payment(
        state: &mut PlannerState,
        env: &BookingEnvironment,
        payment_id: PaymentId,
        booking_id: BookingId,
        kind: PaymentKind,
        amount: Money,
        method: PaymentMethod,
        receipt: Option<String>,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        if state.payments.contains_key(&payment_id) {
            return Self::fail(state, PlannerError::conflict("Payment already exists"));
        }
        if amount.is_zero() {
            return Self::fail(
                state,
                PlannerError::validation("Payment amount must be positive"),
            );
        }
        let Some(booking) = state.booking(booking_id) else {
            return Self::fail(state, PlannerError::not_found("Booking", booking_id));
        };
        let (from, project_id) = (booking.status, booking.project_id);

        let expected_status = match kind {
            PaymentKind::Deposit => BookingStatus::PendingDepositPayment,
            PaymentKind::Final => BookingStatus::PendingFinalPayment,
        };
        if from != expected_status {
            return Self::fail(
                state,
                PlannerError::validation(format!(
                    "A {kind} payment is not accepted while the booking is {from}"
                )),
            );
        }
        if state.payment_exists(booking_id, kind) {
            return Self::fail(
                state,
                PlannerError::conflict(format!("A {kind} payment was already recorded")),
            );
        }

        let to = match kind {
            PaymentKind::Deposit => BookingStatus::Confirmed,
            PaymentKind::Final => BookingStatus::Completed,
        };
        let payment = Payment {
            id: payment_id,
            booking_id,
            kind,
            amount,
            method,
            receipt,
            recorded_at: env.clock.now(),
        };
        Self::apply_event(state, &BookingAction::PaymentRecorded { payment });
        Self::apply_event(
            state,
            &BookingAction::BookingStatusChanged {
                booking_id,
                from,
                to,
                deposit_due_date: None,
                final_due_date: None,
            },
        );
        info!(booking_id = %booking_id, kind = %kind, amount = %amount, "payment recorded");
        Self::budget_feedback(project_id)
    }

    /// Applies an event to state. Events always apply; business rules were
    /// checked before they were emitted.
    fn apply_event(state: &mut PlannerState, event: &BookingAction) {
        match event {
            BookingAction::BookingCreated { booking } => {
                let (id, project_id) = (booking.id, booking.project_id);
                state.bookings.insert(id, booking.clone());
                // A fresh booking is active and claims its linked items
                // immediately.
                if project_id.is_some() {
                    sync_linked_items(state, id);
                }
            },
            BookingAction::BookingStatusChanged {
                booking_id,
                to,
                deposit_due_date,
                final_due_date,
                ..
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = *to;
                    if deposit_due_date.is_some() {
                        booking.deposit_due_date = *deposit_due_date;
                    }
                    if final_due_date.is_some() {
                        booking.final_due_date = *final_due_date;
                    }
                }
                sync_linked_items(state, *booking_id);
            },
            BookingAction::TimeSlotReserved { vendor_id, date } => {
                state
                    .time_slots
                    .entry((*vendor_id, *date))
                    .or_insert(TimeSlot {
                        vendor_id: *vendor_id,
                        date: *date,
                        status: TimeSlotStatus::Booked,
                    });
            },
            BookingAction::PaymentRecorded { payment } => {
                state.payments.insert(payment.id, payment.clone());
            },
            BookingAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            _ => {},
        }
    }

    fn budget_feedback(
        project_id: Option<ProjectId>,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        match project_id {
            Some(project_id) => {
                smallvec![Effect::feedback(BookingAction::RecomputeBudget {
                    project_id
                })]
            },
            None => smallvec![],
        }
    }
}

impl Reducer for BookingReducer {
    type State = PlannerState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            BookingAction::CreateBooking {
                booking_id,
                couple_id,
                vendor_id,
                project_id,
                reserved_date,
                selected_services,
            } => Self::handle_create(
                state,
                env,
                booking_id,
                couple_id,
                vendor_id,
                project_id,
                reserved_date,
                selected_services,
            ),
            BookingAction::UpdateStatus {
                booking_id,
                actor_vendor_id,
                new_status,
                deposit_due_date,
                final_due_date,
            } => Self::handle_update_status(
                state,
                booking_id,
                actor_vendor_id,
                new_status,
                deposit_due_date,
                final_due_date,
            ),
            BookingAction::RecordPayment {
                payment_id,
                booking_id,
                kind,
                amount,
                method,
                receipt,
            } => Self::handle_record_payment(
                state, env, payment_id, booking_id, kind, amount, method, receipt,
            ),
            BookingAction::RecomputeBudget { project_id } => {
                budget::recompute_planned_spend(state, project_id);
                smallvec![]
            },
            // Events replayed directly (e.g. from a log) just apply.
            event => {
                Self::apply_event(state, &event);
                smallvec![]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{
        AvailabilityType, ListingId, PricingPolicy, ServiceCategory, ServiceListing,
    };
    use aisle_testing::{ReducerTest, test_clock};

    fn env() -> BookingEnvironment {
        BookingEnvironment::new(Arc::new(test_clock()))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    fn state_with_listing(
        availability_type: AvailabilityType,
        max: Option<u32>,
    ) -> (PlannerState, ListingId, VendorId) {
        let mut state = PlannerState::new();
        let category = if availability_type == AvailabilityType::Exclusive {
            ServiceCategory::Venue
        } else {
            ServiceCategory::Catering
        };
        let policy = if availability_type == AvailabilityType::Exclusive {
            PricingPolicy::FixedPackage
        } else {
            PricingPolicy::PerUnit
        };
        let listing = ServiceListing::new(
            ListingId::new(),
            VendorId::new(),
            "Listing".to_string(),
            category,
            availability_type,
            max,
            policy,
            Money::from_dollars(100),
            None,
        )
        .unwrap();
        let (id, vendor) = (listing.id, listing.vendor_id);
        state.listings.insert(id, listing);
        (state, id, vendor)
    }

    fn create_action(
        booking_id: BookingId,
        listing_id: ListingId,
        vendor_id: VendorId,
        quantity: u32,
    ) -> BookingAction {
        BookingAction::CreateBooking {
            booking_id,
            couple_id: CoupleId::new(),
            vendor_id,
            project_id: None,
            reserved_date: date(),
            selected_services: vec![SelectedService {
                service_listing_id: listing_id,
                quantity,
                total_price: Money::from_dollars(100),
            }],
        }
    }

    #[test]
    fn create_booking_starts_pending_vendor_confirmation() {
        let (state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::Exclusive, None);
        let booking_id = BookingId::new();

        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(create_action(booking_id, listing_id, vendor_id, 1))
            .then_state(move |state| {
                let booking = state.booking(booking_id).unwrap();
                assert_eq!(booking.status, BookingStatus::PendingVendorConfirmation);
                assert!(state.last_error.is_none());
            })
            .run();
    }

    #[test]
    fn create_rejects_already_claimed_exclusive_date() {
        let (mut state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::Exclusive, None);
        let reducer = BookingReducer::new();
        let env = env();

        let first = BookingId::new();
        reducer.reduce(
            &mut state,
            create_action(first, listing_id, vendor_id, 1),
            &env,
        );
        assert!(state.last_error.is_none());

        let second = BookingId::new();
        reducer.reduce(
            &mut state,
            create_action(second, listing_id, vendor_id, 1),
            &env,
        );
        assert_eq!(
            state.last_error,
            Some(PlannerError::conflict("Already booked for this date"))
        );
        assert!(state.booking(second).is_none());
    }

    #[test]
    fn create_rejects_quantity_beyond_capacity() {
        let (mut state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::QuantityBased, Some(10));
        let reducer = BookingReducer::new();
        let env = env();

        reducer.reduce(
            &mut state,
            create_action(BookingId::new(), listing_id, vendor_id, 7),
            &env,
        );
        assert!(state.last_error.is_none());

        reducer.reduce(
            &mut state,
            create_action(BookingId::new(), listing_id, vendor_id, 4),
            &env,
        );
        assert!(matches!(state.last_error, Some(PlannerError::Conflict(_))));

        // Three units remain and can still be booked.
        state.last_error = None;
        reducer.reduce(
            &mut state,
            create_action(BookingId::new(), listing_id, vendor_id, 3),
            &env,
        );
        assert!(state.last_error.is_none());
    }

    #[test]
    fn create_rejects_empty_service_list() {
        let (state, _, vendor_id) = state_with_listing(AvailabilityType::Exclusive, None);
        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(BookingAction::CreateBooking {
                booking_id: BookingId::new(),
                couple_id: CoupleId::new(),
                vendor_id,
                project_id: None,
                reserved_date: date(),
                selected_services: vec![],
            })
            .then_state(|state| {
                assert!(matches!(
                    state.last_error,
                    Some(PlannerError::Validation(_))
                ));
            })
            .run();
    }

    #[test]
    fn vendor_confirmation_reserves_a_time_slot() {
        let (mut state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::Exclusive, None);
        let reducer = BookingReducer::new();
        let env = env();
        let booking_id = BookingId::new();
        reducer.reduce(
            &mut state,
            create_action(booking_id, listing_id, vendor_id, 1),
            &env,
        );

        reducer.reduce(
            &mut state,
            BookingAction::UpdateStatus {
                booking_id,
                actor_vendor_id: Some(vendor_id),
                new_status: BookingStatus::PendingDepositPayment,
                deposit_due_date: Some(date()),
                final_due_date: None,
            },
            &env,
        );
        assert!(state.last_error.is_none());
        let booking = state.booking(booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::PendingDepositPayment);
        assert_eq!(booking.deposit_due_date, Some(date()));
        let slot = state.time_slots.get(&(vendor_id, date())).unwrap();
        assert_eq!(slot.status, TimeSlotStatus::Booked);
    }

    #[test]
    fn skipping_a_status_is_an_invalid_transition() {
        let (mut state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::Exclusive, None);
        let reducer = BookingReducer::new();
        let env = env();
        let booking_id = BookingId::new();
        reducer.reduce(
            &mut state,
            create_action(booking_id, listing_id, vendor_id, 1),
            &env,
        );

        reducer.reduce(
            &mut state,
            BookingAction::UpdateStatus {
                booking_id,
                actor_vendor_id: Some(vendor_id),
                new_status: BookingStatus::Confirmed,
                deposit_due_date: None,
                final_due_date: None,
            },
            &env,
        );
        assert_eq!(
            state.last_error,
            Some(PlannerError::InvalidTransition {
                from: BookingStatus::PendingVendorConfirmation,
                to: BookingStatus::Confirmed,
            })
        );
    }

    #[test]
    fn only_the_booked_vendor_can_transition() {
        let (mut state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::Exclusive, None);
        let reducer = BookingReducer::new();
        let env = env();
        let booking_id = BookingId::new();
        reducer.reduce(
            &mut state,
            create_action(booking_id, listing_id, vendor_id, 1),
            &env,
        );

        reducer.reduce(
            &mut state,
            BookingAction::UpdateStatus {
                booking_id,
                actor_vendor_id: Some(VendorId::new()),
                new_status: BookingStatus::PendingDepositPayment,
                deposit_due_date: None,
                final_due_date: None,
            },
            &env,
        );
        assert!(matches!(state.last_error, Some(PlannerError::Forbidden(_))));
        assert_eq!(
            state.booking(booking_id).unwrap().status,
            BookingStatus::PendingVendorConfirmation
        );
    }

    #[test]
    fn deposit_payment_confirms_the_booking() {
        let (mut state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::Exclusive, None);
        let reducer = BookingReducer::new();
        let env = env();
        let booking_id = BookingId::new();
        reducer.reduce(
            &mut state,
            create_action(booking_id, listing_id, vendor_id, 1),
            &env,
        );
        reducer.reduce(
            &mut state,
            BookingAction::UpdateStatus {
                booking_id,
                actor_vendor_id: Some(vendor_id),
                new_status: BookingStatus::PendingDepositPayment,
                deposit_due_date: None,
                final_due_date: None,
            },
            &env,
        );

        reducer.reduce(
            &mut state,
            BookingAction::RecordPayment {
                payment_id: PaymentId::new(),
                booking_id,
                kind: PaymentKind::Deposit,
                amount: Money::from_dollars(500),
                method: PaymentMethod::Card,
                receipt: None,
            },
            &env,
        );
        assert!(state.last_error.is_none());
        assert_eq!(
            state.booking(booking_id).unwrap().status,
            BookingStatus::Confirmed
        );
        assert_eq!(state.payments.len(), 1);
    }

    #[test]
    fn duplicate_deposit_is_a_conflict() {
        let (mut state, listing_id, vendor_id) =
            state_with_listing(AvailabilityType::Exclusive, None);
        let reducer = BookingReducer::new();
        let env = env();
        let booking_id = BookingId::new();
        reducer.reduce(
            &mut state,
            create_action(booking_id, listing_id, vendor_id, 1),
            &env,
        );
        reducer.reduce(
            &mut state,
            BookingAction::UpdateStatus {
                booking_id,
                actor_vendor_id: Some(vendor_id),
                new_status: BookingStatus::PendingDepositPayment,
                deposit_due_date: None,
                final_due_date: None,
            },
            &env,
        );
        let pay = |payment_id| BookingAction::RecordPayment {
            payment_id,
            booking_id,
            kind: PaymentKind::Deposit,
            amount: Money::from_dollars(500),
            method: PaymentMethod::Card,
            receipt: None,
        };
        reducer.reduce(&mut state, pay(PaymentId::new()), &env);
        assert!(state.last_error.is_none());

        // A second deposit is rejected; the booking is already confirmed.
        reducer.reduce(&mut state, pay(PaymentId::new()), &env);
        assert!(state.last_error.is_some());
        assert_eq!(state.payments.len(), 1);
    }

    #[test]
    fn action_macro_classifies_commands_and_events() {
        let action = BookingAction::RecomputeBudget {
            project_id: ProjectId::new(),
        };
        assert!(action.is_command());
        let event = BookingAction::ValidationFailed {
            error: PlannerError::validation("x"),
        };
        assert!(event.is_event());
        assert_eq!(event.event_type(), "ValidationFailed.v1");
    }
}
