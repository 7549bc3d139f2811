use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use super::project::ProjectSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub project_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub detail: Option<String>,
    pub expense_date: NaiveDate,
    pub category: Option<String>,
    pub vendor: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An expense joined with its project, serialized as the expense columns
/// plus a `projects` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseRecord {
    #[serde(flatten)]
    pub expense: Expense,
    pub projects: ProjectSummary,
}

impl<'r> FromRow<'r, PgRow> for ExpenseRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            expense: Expense::from_row(row)?,
            projects: ProjectSummary {
                id: row.try_get("project_ref_id")?,
                name: row.try_get("project_name")?,
                access_code: row.try_get("project_access_code")?,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Material,
    Service,
    Workers,
    Utility,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 4] = [
        ExpenseCategory::Material,
        ExpenseCategory::Service,
        ExpenseCategory::Workers,
        ExpenseCategory::Utility,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Material => "material",
            ExpenseCategory::Service => "service",
            ExpenseCategory::Workers => "workers",
            ExpenseCategory::Utility => "utility",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub project_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub detail: Option<String>,
    pub expense_date: NaiveDate,
    pub category: Option<ExpenseCategory>,
    pub vendor: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseChanges {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub detail: Option<Option<String>>,
    pub expense_date: Option<NaiveDate>,
    pub category: Option<Option<ExpenseCategory>>,
    pub vendor: Option<Option<String>>,
}

impl ExpenseChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.description.is_none()
            && self.detail.is_none()
            && self.expense_date.is_none()
            && self.category.is_none()
            && self.vendor.is_none()
    }
}

/// Row order for expense listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseOrder {
    NewestFirst,
    ExpenseDateAsc,
    ExpenseDateDesc,
}

impl ExpenseOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            ExpenseOrder::NewestFirst => "e.created_at DESC",
            ExpenseOrder::ExpenseDateAsc => "e.expense_date ASC, e.created_at ASC",
            ExpenseOrder::ExpenseDateDesc => "e.expense_date DESC, e.created_at DESC",
        }
    }
}
