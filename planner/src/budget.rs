//! Budget reconciliation.
//!
//! Derives a project's planned spend from its current design and service
//! lines, keeps the remaining figure in step, and mirrors per-table service
//! tags into expense lines. Recomputation is idempotent and never fails the
//! surrounding operation; problems are logged and the previous figures stand.

use crate::pricing::{self, PriceContext};
use crate::types::{
    ExpenseId, Expense, ListingId, Money, PlannerState, PricingPolicy, ProjectId,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Budget category used for expenses promoted from per-table tags
pub const PER_TABLE_CATEGORY: &str = "Per-table services";

/// Where a planned-spend line came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannedItemSource {
    /// Placed elements in the 3D design
    Design,
    /// Per-table service tags on tables
    TableService,
    /// Non-3D project service line
    ProjectService,
    /// The project's chosen venue
    Venue,
}

/// One priced line of the planned spend
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedItem {
    /// Listing the line prices
    pub listing_id: ListingId,
    /// Listing display name
    pub name: String,
    /// Unit count the price was derived from
    pub quantity: u32,
    /// Priced amount
    pub amount: Money,
    /// Which surface contributed the line
    pub source: PlannedItemSource,
}

/// Prices everything the project currently implies it will pay for.
///
/// Design placements are deduplicated by bundle, so a table-with-chairs set
/// counts as one unit of its listing. Per-table services are priced by
/// tagged table count. Project service lines whose listing already appears
/// in the design are skipped rather than double counted. The venue is
/// included until an active booking claims it, at which point its cost lives
/// in the booking instead.
#[must_use]
pub fn gather_planned_items(state: &PlannerState, project_id: ProjectId) -> Vec<PlannedItem> {
    let mut items = Vec::new();
    let mut priced_listings: HashSet<ListingId> = HashSet::new();

    let duration_hours = state.project(project_id).and_then(|p| {
        let (start, end) = (p.event_start?, p.event_end?);
        pricing::calculate_event_duration(start, end)
    });

    if let Some(design) = state.design(project_id) {
        // Unit count per listing: each bundle is one unit, each standalone
        // placement is one unit.
        let mut units: HashMap<ListingId, HashSet<String>> = HashMap::new();
        for (placement_id, meta) in &design.placements_meta {
            let key = meta
                .bundle_id
                .map_or_else(|| placement_id.to_string(), |b| b.to_string());
            units.entry(meta.service_listing_id).or_default().insert(key);
        }

        for (listing_id, unit_keys) in units {
            let Some(listing) = state.listing(listing_id) else {
                warn!(listing_id = %listing_id, "design references unknown listing");
                continue;
            };
            if listing.pricing_policy == PricingPolicy::PerTable {
                // Priced by table tags below, not by placement count.
                continue;
            }
            #[allow(clippy::cast_possible_truncation)] // Placement counts are small
            let quantity = unit_keys.len() as u32;
            let amount = price_with_fallback(state, listing_id, quantity, duration_hours);
            priced_listings.insert(listing_id);
            items.push(PlannedItem {
                listing_id,
                name: listing.name.clone(),
                quantity,
                amount,
                source: PlannedItemSource::Design,
            });
        }

        // Per-table services, priced by how many tables carry the tag.
        let mut tagged: HashSet<ListingId> = HashSet::new();
        for element in design.elements.values() {
            for listing_id in &element.service_listing_ids {
                tagged.insert(*listing_id);
            }
        }
        for listing_id in tagged {
            let Some(listing) = state.listing(listing_id) else {
                continue;
            };
            let table_count = design.tables_tagged_with(listing_id);
            if table_count == 0 {
                continue;
            }
            let amount = listing.base_price.saturating_multiply(table_count);
            priced_listings.insert(listing_id);
            items.push(PlannedItem {
                listing_id,
                name: listing.name.clone(),
                quantity: table_count,
                amount,
                source: PlannedItemSource::TableService,
            });
        }
    }

    for ((pid, listing_id), service) in &state.project_services {
        if *pid != project_id || priced_listings.contains(listing_id) {
            continue;
        }
        let Some(listing) = state.listing(*listing_id) else {
            warn!(listing_id = %listing_id, "project service references unknown listing");
            continue;
        };
        if listing.pricing_policy == PricingPolicy::PerTable {
            // Per-table listings are priced through design tags only.
            continue;
        }
        let amount =
            price_with_fallback(state, *listing_id, service.quantity, duration_hours);
        priced_listings.insert(*listing_id);
        items.push(PlannedItem {
            listing_id: *listing_id,
            name: listing.name.clone(),
            quantity: service.quantity,
            amount,
            source: PlannedItemSource::ProjectService,
        });
    }

    if let Some(project) = state.project(project_id) {
        if let Some(venue_id) = project.venue_listing_id {
            let claimed_by_booking = state
                .bookings
                .values()
                .any(|b| {
                    b.project_id == Some(project_id)
                        && b.status.is_active()
                        && b.references_listing(venue_id)
                });
            if !claimed_by_booking && !priced_listings.contains(&venue_id) {
                if let Some(listing) = state.listing(venue_id) {
                    items.push(PlannedItem {
                        listing_id: venue_id,
                        name: listing.name.clone(),
                        quantity: 1,
                        amount: listing.base_price,
                        source: PlannedItemSource::Venue,
                    });
                }
            }
        }
    }

    items
}

fn price_with_fallback(
    state: &PlannerState,
    listing_id: ListingId,
    quantity: u32,
    duration_hours: Option<u32>,
) -> Money {
    let Some(listing) = state.listing(listing_id) else {
        return Money::ZERO;
    };
    let context = match listing.pricing_policy {
        PricingPolicy::FixedPackage => PriceContext::FixedPackage,
        PricingPolicy::PerUnit => PriceContext::PerUnit { quantity },
        PricingPolicy::PerTable => PriceContext::PerTable { table_count: quantity },
        PricingPolicy::TimeBased => match duration_hours {
            Some(duration_hours) => PriceContext::TimeBased { duration_hours },
            None => return pricing::fallback_price(listing, quantity),
        },
    };
    pricing::calculate_price(listing, context)
        .unwrap_or_else(|_| pricing::fallback_price(listing, quantity))
}

/// Recomputes the project's planned spend and remaining budget in place.
///
/// Idempotent; a project without a budget row is a no-op.
pub fn recompute_planned_spend(state: &mut PlannerState, project_id: ProjectId) {
    let planned = gather_planned_items(state, project_id)
        .iter()
        .fold(Money::ZERO, |acc, item| acc.saturating_add(item.amount));
    let spent = state.actual_spent(project_id);

    let Some(budget) = state.budgets.get_mut(&project_id) else {
        debug!(project_id = %project_id, "no budget to reconcile");
        return;
    };
    budget.planned_spend = planned;
    budget.total_spent = spent;
    budget.recompute_remaining();
    debug!(
        project_id = %project_id,
        planned = %planned,
        spent = %spent,
        remaining_cents = budget.total_remaining_cents,
        "reconciled budget"
    );
}

/// Mirrors the per-table tag count for (project, listing) into its expense
/// line: created on the first tag, rescaled as the count changes, deleted
/// when the last tag is removed.
pub fn update_per_table_service_expenses(
    state: &mut PlannerState,
    project_id: ProjectId,
    listing_id: ListingId,
) {
    let table_count = state
        .design(project_id)
        .map_or(0, |d| d.tables_tagged_with(listing_id));
    let existing = state.expense_for_listing(project_id, listing_id);

    if table_count == 0 {
        if let Some(expense_id) = existing {
            state.expenses.remove(&expense_id);
            debug!(listing_id = %listing_id, "removed per-table expense");
        }
        return;
    }

    let Some(listing) = state.listing(listing_id) else {
        warn!(listing_id = %listing_id, "per-table tag references unknown listing");
        return;
    };
    let estimated = listing.base_price.saturating_multiply(table_count);

    match existing {
        Some(expense_id) => {
            if let Some(expense) = state.expenses.get_mut(&expense_id) {
                expense.estimated_cost = estimated;
            }
        },
        None => {
            let expense_id = ExpenseId::new();
            state.expenses.insert(
                expense_id,
                Expense {
                    id: expense_id,
                    project_id,
                    category: PER_TABLE_CATEGORY.to_string(),
                    service_listing_id: Some(listing_id),
                    estimated_cost: estimated,
                    actual_cost: None,
                },
            );
        },
    }
}
