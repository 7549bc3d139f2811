//! In-memory reductions behind the expense summary and chart endpoints.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::database::models::Expense;

/// Bucket name for expenses without a category.
pub const UNCATEGORIZED: &str = "ไม่มีหมวดหมู่";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Date,
    Category,
}

impl GroupBy {
    /// `date` (or no value) groups by day; anything else groups by category.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("date") => GroupBy::Date,
            Some(_) => GroupBy::Category,
        }
    }

    fn key(&self, expense: &Expense) -> String {
        match self {
            GroupBy::Date => expense.expense_date.format("%Y-%m-%d").to_string(),
            GroupBy::Category => category_key(expense),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_amount: Decimal,
    pub average_amount: Decimal,
    pub max_amount: Decimal,
    pub min_amount: Decimal,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBucket {
    pub category: String,
    pub total: Decimal,
    pub count: usize,
    pub expenses: Vec<Expense>,
}

fn category_key(expense: &Expense) -> String {
    match expense.category.as_deref() {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => UNCATEGORIZED.to_string(),
    }
}

pub fn total_amount(expenses: &[Expense]) -> Decimal {
    expenses.iter().map(|e| e.amount).sum()
}

/// Totals per group, in the order each group first appears in `expenses`.
pub fn chart_data(expenses: &[Expense], group_by: GroupBy) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for expense in expenses {
        let key = group_by.key(expense);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            points.push(ChartPoint {
                name: key,
                value: Decimal::ZERO,
                count: 0,
            });
            points.len() - 1
        });
        points[slot].value += expense.amount;
        points[slot].count += 1;
    }

    points
}

pub fn statistics(expenses: &[Expense]) -> Statistics {
    let total = total_amount(expenses);
    let count = expenses.len();
    let amounts = expenses.iter().map(|e| e.amount);

    Statistics {
        total_amount: total,
        average_amount: if count == 0 {
            Decimal::ZERO
        } else {
            total / Decimal::from(count)
        },
        max_amount: amounts.clone().max().unwrap_or(Decimal::ZERO),
        min_amount: amounts.min().unwrap_or(Decimal::ZERO),
        total_count: count,
    }
}

/// Group expenses by category, keeping each bucket's expenses in input order.
pub fn by_category(expenses: &[Expense]) -> BTreeMap<String, CategoryBucket> {
    let mut buckets: BTreeMap<String, CategoryBucket> = BTreeMap::new();
    for expense in expenses {
        let key = category_key(expense);
        let bucket = buckets.entry(key.clone()).or_insert_with(|| CategoryBucket {
            category: key,
            total: Decimal::ZERO,
            count: 0,
            expenses: Vec::new(),
        });
        bucket.total += expense.amount;
        bucket.count += 1;
        bucket.expenses.push(expense.clone());
    }
    buckets
}
