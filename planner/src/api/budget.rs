//! Budget and checkout-summary endpoints.

use crate::budget::{PlannedItem, PlannedItemSource, gather_planned_items};
use crate::server::error::AppError;
use crate::server::state::AppState;
use crate::types::{ExpenseId, ListingId, Money, ProjectId};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for setting a project's total budget
#[derive(Debug, Deserialize)]
pub struct SetBudgetRequest {
    /// Total budget in cents
    pub total_budget_cents: u64,
}

/// Request body for recording an expense's actual cost
#[derive(Debug, Deserialize)]
pub struct RecordActualCostRequest {
    /// Actual cost in cents
    pub actual_cost_cents: u64,
}

/// Response body describing a project's budget
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    /// Total budget in cents
    pub total_budget_cents: u64,
    /// Sum of actual expense costs in cents
    pub total_spent_cents: u64,
    /// Derived planned spend in cents
    pub planned_spend_cents: u64,
    /// Remaining budget in cents; negative when over budget
    pub total_remaining_cents: i64,
}

/// One expense line in a budget response
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    /// Expense id
    pub id: ExpenseId,
    /// Budget category
    pub category: String,
    /// Listing the expense tracks, when promoted from a per-table tag
    pub service_listing_id: Option<ListingId>,
    /// Estimated cost in cents
    pub estimated_cost_cents: u64,
    /// Actual cost in cents, once known
    pub actual_cost_cents: Option<u64>,
}

/// One line of the checkout summary
#[derive(Debug, Serialize)]
pub struct CheckoutLineResponse {
    /// Listing being priced
    pub listing_id: ListingId,
    /// Listing display name
    pub name: String,
    /// Unit count behind the price
    pub quantity: u32,
    /// Priced amount in cents
    pub amount_cents: u64,
    /// Which surface contributed the line
    pub source: &'static str,
}

/// Response body for the checkout summary
#[derive(Debug, Serialize)]
pub struct CheckoutSummaryResponse {
    /// Priced lines
    pub items: Vec<CheckoutLineResponse>,
    /// Total across all lines in cents
    pub total_cents: u64,
}

fn source_name(source: PlannedItemSource) -> &'static str {
    match source {
        PlannedItemSource::Design => "design",
        PlannedItemSource::TableService => "table_service",
        PlannedItemSource::ProjectService => "project_service",
        PlannedItemSource::Venue => "venue",
    }
}

fn summary_from_items(items: Vec<PlannedItem>) -> CheckoutSummaryResponse {
    let total = items
        .iter()
        .fold(Money::ZERO, |acc, item| acc.saturating_add(item.amount));
    let mut lines: Vec<CheckoutLineResponse> = items
        .into_iter()
        .map(|item| CheckoutLineResponse {
            listing_id: item.listing_id,
            name: item.name,
            quantity: item.quantity,
            amount_cents: item.amount.cents(),
            source: source_name(item.source),
        })
        .collect();
    lines.sort_by(|a, b| a.name.cmp(&b.name));
    CheckoutSummaryResponse {
        items: lines,
        total_cents: total.cents(),
    }
}

/// `GET /api/projects/:id/budget`
pub async fn get_budget(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<BudgetResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .with_state(|s| {
            s.budgets.get(&project_id).map(|b| BudgetResponse {
                total_budget_cents: b.total_budget.cents(),
                total_spent_cents: b.total_spent.cents(),
                planned_spend_cents: b.planned_spend.cents(),
                total_remaining_cents: b.total_remaining_cents,
            })
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Budget not found"))
}

/// `PUT /api/projects/:id/budget`
pub async fn set_budget(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<SetBudgetRequest>,
) -> Result<StatusCode, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    let exists = state
        .store
        .with_state(|s| s.project(project_id).is_some())
        .await;
    if !exists {
        return Err(AppError::not_found("Project not found"));
    }
    state
        .store
        .set_budget(project_id, Money::from_cents(request.total_budget_cents))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/projects/:id/expenses`
pub async fn list_expenses(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ExpenseResponse>>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .with_state(|s| {
            s.project(project_id)?;
            let mut expenses: Vec<ExpenseResponse> = s
                .expenses
                .values()
                .filter(|e| e.project_id == project_id)
                .map(|e| ExpenseResponse {
                    id: e.id,
                    category: e.category.clone(),
                    service_listing_id: e.service_listing_id,
                    estimated_cost_cents: e.estimated_cost.cents(),
                    actual_cost_cents: e.actual_cost.map(|m| m.cents()),
                })
                .collect();
            expenses.sort_by(|a, b| a.category.cmp(&b.category));
            Some(expenses)
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Project not found"))
}

/// `POST /api/expenses/:id/actual`
pub async fn record_actual_cost(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Json(request): Json<RecordActualCostRequest>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .record_expense_actual(
            ExpenseId::from_uuid(expense_id),
            Money::from_cents(request.actual_cost_cents),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/projects/:id/checkout-summary`
pub async fn checkout_summary(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<CheckoutSummaryResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .with_state(|s| {
            s.project(project_id)?;
            Some(summary_from_items(gather_planned_items(s, project_id)))
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Project not found"))
}
