//! Budget reconciliation tests across the design and booking surfaces.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use aisle_planner::aggregates::booking::BookingAction;
use aisle_planner::aggregates::design::DesignAction;
use aisle_planner::budget::gather_planned_items;
use aisle_planner::store::PlannerStore;
use aisle_planner::types::{
    AvailabilityType, BookingId, CoupleId, ElementKind, ListingId, Money, NaiveDate,
    PlacementId, PricingPolicy, ProjectId, SelectedService, ServiceCategory,
    ServiceListing, Transform, VendorId, WeddingProject,
};
use aisle_testing::{SequentialIdGenerator, test_clock};
use std::sync::Arc;

fn wedding_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 14).expect("valid date")
}

fn store() -> PlannerStore {
    PlannerStore::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIdGenerator::new()),
    )
}

fn listing(policy: PricingPolicy, dollars: u64) -> ServiceListing {
    ServiceListing::new(
        ListingId::new(),
        VendorId::new(),
        format!("{policy:?} listing"),
        ServiceCategory::Decor,
        AvailabilityType::Reusable,
        None,
        policy,
        Money::from_dollars(dollars),
        None,
    )
    .expect("valid listing")
}

async fn seed_project(store: &PlannerStore, budget_dollars: u64) -> ProjectId {
    let project_id = ProjectId::new();
    store
        .upsert_project(WeddingProject {
            id: project_id,
            couple_id: CoupleId::new(),
            name: "Budgeted wedding".to_string(),
            wedding_date: Some(wedding_date()),
            venue_listing_id: None,
            event_start: None,
            event_end: None,
        })
        .await;
    store
        .set_budget(project_id, Money::from_dollars(budget_dollars))
        .await;
    project_id
}

async fn place_table(
    store: &PlannerStore,
    project_id: ProjectId,
    listing_id: ListingId,
) -> PlacementId {
    let placement_id = PlacementId::new();
    store
        .dispatch_design(DesignAction::AddElement {
            placement_id,
            project_id,
            listing_id,
            kind: ElementKind::Table,
            transform: Transform::default(),
            parent_id: None,
        })
        .await
        .expect("placement succeeds");
    placement_id
}

#[tokio::test]
async fn design_edits_keep_the_budget_current() {
    let store = store();
    let tables = listing(PricingPolicy::PerUnit, 80);
    store.upsert_listing(tables.clone()).await;
    let project_id = seed_project(&store, 1000).await;

    let first = place_table(&store, project_id, tables.id).await;
    place_table(&store, project_id, tables.id).await;

    store
        .with_state(|s| {
            let budget = &s.budgets[&project_id];
            assert_eq!(budget.planned_spend, Money::from_dollars(160));
            assert_eq!(budget.total_remaining_cents, 84_000);
        })
        .await;

    // Removing one element is reflected immediately.
    store
        .dispatch_design(DesignAction::RemoveElement {
            project_id,
            placement_id: first,
        })
        .await
        .expect("removal succeeds");
    store
        .with_state(|s| {
            assert_eq!(s.budgets[&project_id].planned_spend, Money::from_dollars(80));
        })
        .await;
}

#[tokio::test]
async fn per_table_tags_scale_the_expense_and_planned_spend() {
    let store = store();
    let tables = listing(PricingPolicy::PerUnit, 80);
    let linens = listing(PricingPolicy::PerTable, 25);
    store.upsert_listing(tables.clone()).await;
    store.upsert_listing(linens.clone()).await;
    let project_id = seed_project(&store, 10_000).await;

    let mut table_ids = Vec::new();
    for _ in 0..3 {
        table_ids.push(place_table(&store, project_id, tables.id).await);
    }
    for id in &table_ids {
        store
            .dispatch_design(DesignAction::TagTableService {
                project_id,
                placement_id: *id,
                listing_id: linens.id,
            })
            .await
            .expect("tag succeeds");
    }

    store
        .with_state(|s| {
            let expense_id = s
                .expense_for_listing(project_id, linens.id)
                .expect("expense promoted");
            assert_eq!(
                s.expenses[&expense_id].estimated_cost,
                Money::from_dollars(75)
            );
            // 3 tables at $80 plus 3 linen sets at $25.
            assert_eq!(
                s.budgets[&project_id].planned_spend,
                Money::from_dollars(315)
            );
        })
        .await;

    // Dropping to two tagged tables rescales both figures.
    store
        .dispatch_design(DesignAction::UntagTableService {
            project_id,
            placement_id: table_ids[0],
            listing_id: linens.id,
        })
        .await
        .expect("untag succeeds");
    store
        .with_state(|s| {
            let expense_id = s
                .expense_for_listing(project_id, linens.id)
                .expect("expense remains");
            assert_eq!(
                s.expenses[&expense_id].estimated_cost,
                Money::from_dollars(50)
            );
            assert_eq!(
                s.budgets[&project_id].planned_spend,
                Money::from_dollars(290)
            );
        })
        .await;
}

#[tokio::test]
async fn venue_moves_from_planned_spend_to_the_booking() {
    let store = store();
    let venue = ServiceListing::new(
        ListingId::new(),
        VendorId::new(),
        "Garden Hall".to_string(),
        ServiceCategory::Venue,
        AvailabilityType::Exclusive,
        None,
        PricingPolicy::FixedPackage,
        Money::from_dollars(8000),
        None,
    )
    .expect("valid listing");
    store.upsert_listing(venue.clone()).await;
    let project_id = seed_project(&store, 20_000).await;
    let couple_id = store
        .with_state(|s| s.project(project_id).expect("project").couple_id)
        .await;
    store
        .upsert_project(WeddingProject {
            id: project_id,
            couple_id,
            name: "Budgeted wedding".to_string(),
            wedding_date: Some(wedding_date()),
            venue_listing_id: Some(venue.id),
            event_start: None,
            event_end: None,
        })
        .await;

    store
        .dispatch_booking(BookingAction::RecomputeBudget { project_id })
        .await
        .expect("recompute succeeds");
    store
        .with_state(|s| {
            assert_eq!(
                s.budgets[&project_id].planned_spend,
                Money::from_dollars(8000)
            );
        })
        .await;

    // An active booking for the venue takes over its cost.
    store
        .dispatch_booking(BookingAction::CreateBooking {
            booking_id: BookingId::new(),
            couple_id,
            vendor_id: venue.vendor_id,
            project_id: Some(project_id),
            reserved_date: wedding_date(),
            selected_services: vec![SelectedService {
                service_listing_id: venue.id,
                quantity: 1,
                total_price: venue.base_price,
            }],
        })
        .await
        .expect("booking succeeds");
    store
        .with_state(|s| {
            assert_eq!(s.budgets[&project_id].planned_spend, Money::ZERO);
            let items = gather_planned_items(s, project_id);
            assert!(items.is_empty());
        })
        .await;
}

#[tokio::test]
async fn actual_costs_reduce_the_remaining_budget() {
    let store = store();
    let tables = listing(PricingPolicy::PerUnit, 80);
    let linens = listing(PricingPolicy::PerTable, 25);
    store.upsert_listing(tables.clone()).await;
    store.upsert_listing(linens.clone()).await;
    let project_id = seed_project(&store, 1000).await;

    let table = place_table(&store, project_id, tables.id).await;
    store
        .dispatch_design(DesignAction::TagTableService {
            project_id,
            placement_id: table,
            listing_id: linens.id,
        })
        .await
        .expect("tag succeeds");

    let expense_id = store
        .with_state(|s| s.expense_for_listing(project_id, linens.id).expect("expense"))
        .await;
    store
        .record_expense_actual(expense_id, Money::from_dollars(30))
        .await
        .expect("actual cost recorded");

    store
        .with_state(|s| {
            let budget = &s.budgets[&project_id];
            assert_eq!(budget.total_spent, Money::from_dollars(30));
            // $1000 - $30 spent - ($80 table + $25 linen planned).
            assert_eq!(budget.total_remaining_cents, 86_500);
        })
        .await;
}

#[tokio::test]
async fn budget_set_after_design_edits_reflects_placed_items() {
    let store = store();
    let tables = listing(PricingPolicy::PerUnit, 80);
    store.upsert_listing(tables.clone()).await;

    // Project without a budget row yet.
    let project_id = ProjectId::new();
    store
        .upsert_project(WeddingProject {
            id: project_id,
            couple_id: CoupleId::new(),
            name: "Design-first wedding".to_string(),
            wedding_date: Some(wedding_date()),
            venue_listing_id: None,
            event_start: None,
            event_end: None,
        })
        .await;

    // Design work happens before any budget exists.
    place_table(&store, project_id, tables.id).await;

    store
        .set_budget(project_id, Money::from_dollars(1000))
        .await;

    store
        .with_state(|s| {
            let budget = &s.budgets[&project_id];
            assert_eq!(budget.planned_spend, Money::from_dollars(80));
            assert_eq!(budget.total_remaining_cents, 92_000);
        })
        .await;
}
