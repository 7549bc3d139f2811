// handlers/admin/expenses.rs - expense CRUD and summaries (admin only)

use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::{parse_id, JsonBody, Payload};
use crate::database::models::{Expense, ExpenseCategory, ExpenseChanges, ExpenseOrder, ExpenseRecord, NewExpense};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::expense_summary::{self, GroupBy};
use crate::AppState;

const EXPENSE_NOT_FOUND: &str = "Expense not found";

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub project_id: Option<String>,
    pub group_by: Option<String>,
}

fn invalid_category() -> ApiError {
    ApiError::bad_request("Invalid category. Must be one of: material, service, workers, utility, or null")
}

/// Empty or null means no category; anything else must be a known one.
fn category(body: &Payload) -> Result<Option<ExpenseCategory>, ApiError> {
    match body.text("category") {
        Some(raw) => ExpenseCategory::parse(&raw).map(Some).ok_or_else(invalid_category),
        None => Ok(None),
    }
}

fn expense_id(raw: &str) -> Result<Uuid, ApiError> {
    Ok(parse_id(raw, "Expense ID")?)
}

/// GET /api/expenses - newest first
pub async fn expenses_get(State(state): State<AppState>) -> ApiResult<Vec<ExpenseRecord>> {
    let expenses = state.repo.list_expenses(None, ExpenseOrder::NewestFirst).await?;
    Ok(ApiResponse::success(expenses))
}

/// POST /api/expenses
pub async fn expenses_post(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    JsonBody(body): JsonBody<Payload>,
) -> ApiResult<ExpenseRecord> {
    let missing = || ApiError::bad_request("Missing required fields: project_id, amount, description, expense_date");

    let project_id = body.uuid("project_id")?.ok_or_else(missing)?;
    let amount = body
        .decimal("amount")?
        .filter(|a| !a.is_zero())
        .ok_or_else(missing)?;
    let description = body.text("description").ok_or_else(missing)?;
    let expense_date = body.date("expense_date")?.ok_or_else(missing)?;
    let category = category(&body)?;

    state
        .repo
        .find_project(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let expense = NewExpense {
        project_id,
        amount,
        description,
        detail: body.text("detail"),
        expense_date,
        category,
        vendor: body.text("vendor"),
        created_by: user.id,
    };

    let record = state.repo.insert_expense(expense).await?;
    info!("User {} recorded expense {} on project {}", user.id, record.expense.id, project_id);
    Ok(ApiResponse::created(record))
}

/// GET /api/expenses/:id
pub async fn expense_get(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<ExpenseRecord> {
    let id = expense_id(&raw_id)?;
    let record = state
        .repo
        .find_expense(id)
        .await?
        .ok_or_else(|| ApiError::not_found(EXPENSE_NOT_FOUND))?;
    Ok(ApiResponse::success(record))
}

fn expense_changes(body: &Payload) -> Result<ExpenseChanges, ApiError> {
    let category = if body.contains("category") {
        Some(category(body)?)
    } else {
        None
    };

    Ok(ExpenseChanges {
        amount: body.decimal("amount")?,
        description: body.text("description"),
        detail: body.present("detail", |p, k| Ok(p.text(k)))?,
        expense_date: body.date("expense_date")?,
        category,
        vendor: body.present("vendor", |p, k| Ok(p.text(k)))?,
    })
}

/// PUT /api/expenses/:id - updates only the fields sent
pub async fn expense_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(raw_id): Path<String>,
    JsonBody(body): JsonBody<Payload>,
) -> ApiResult<ExpenseRecord> {
    let id = expense_id(&raw_id)?;
    state
        .repo
        .find_expense(id)
        .await?
        .ok_or_else(|| ApiError::not_found(EXPENSE_NOT_FOUND))?;

    let changes = expense_changes(&body)?;
    if changes.is_empty() {
        return Err(ApiError::bad_request("No data to update"));
    }

    let record = state
        .repo
        .update_expense(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(EXPENSE_NOT_FOUND))?;
    info!("User {} updated expense {}", user.id, id);
    Ok(ApiResponse::success(record))
}

/// DELETE /api/expenses/:id
pub async fn expense_delete(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(raw_id): Path<String>,
) -> ApiResult<Value> {
    let id = expense_id(&raw_id)?;
    if !state.repo.delete_expense(id).await? {
        return Err(ApiError::not_found(EXPENSE_NOT_FOUND));
    }
    info!("User {} deleted expense {}", user.id, id);
    Ok(ApiResponse::success(json!({ "message": "Expense deleted successfully" })))
}

/// GET /api/expenses/project/:id - a project's expenses with totals per category
pub async fn project_expenses_get(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&raw_id, "Project ID")?;
    let project = state
        .repo
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let expenses: Vec<Expense> = state
        .repo
        .list_expenses(Some(id), ExpenseOrder::ExpenseDateDesc)
        .await?
        .into_iter()
        .map(|r| r.expense)
        .collect();

    Ok(ApiResponse::success(json!({
        "project": project.summary(),
        "totalAmount": expense_summary::total_amount(&expenses),
        "expensesByCategory": expense_summary::by_category(&expenses),
        "count": expenses.len(),
        "expenses": expenses,
    })))
}

/// GET /api/expenses/chart-data?project_id=&group_by=
pub async fn chart_data_get(State(state): State<AppState>, Query(query): Query<ChartQuery>) -> ApiResult<Value> {
    let project_id = query.project_id.filter(|s| !s.trim().is_empty());
    let project_uuid = project_id
        .as_deref()
        .map(|raw| parse_id(raw, "project_id"))
        .transpose()?;
    let group_by = query.group_by.filter(|s| !s.is_empty()).unwrap_or_else(|| "date".to_string());

    let expenses: Vec<Expense> = state
        .repo
        .list_expenses(project_uuid, ExpenseOrder::ExpenseDateAsc)
        .await?
        .into_iter()
        .map(|r| r.expense)
        .collect();

    Ok(ApiResponse::success(json!({
        "chartData": expense_summary::chart_data(&expenses, GroupBy::parse(Some(group_by.as_str()))),
        "statistics": expense_summary::statistics(&expenses),
        "groupBy": group_by,
        "projectId": project_id,
    })))
}
