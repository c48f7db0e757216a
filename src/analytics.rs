//! Aggregation of transactions into monthly and category report view models.
//!
//! These reports are pure functions over the full transaction list,
//! recomputed on every fetch. Nothing here is cached or persisted.

use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState,
    transaction::{Category, Transaction, TransactionQuery, TransactionType, query_transactions},
};

/// The display colors cycled over categories in rank order.
///
/// Colors follow rank, not category: a category's color can change between
/// renders when the category set changes.
pub const CATEGORY_COLORS: [&str; 7] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D", "#FFC658",
];

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A month's transactions summed into a single chartable bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    /// The three-letter month label, e.g. "Mar".
    pub month: &'static str,
    /// The absolute value of [MonthlySummary::net_amount], so both
    /// income-heavy and expense-heavy months chart as positive bars.
    pub total_amount: f64,
    /// How many transactions fell in the month.
    pub transaction_count: usize,
    /// The month's income minus its expenses.
    pub net_amount: f64,
}

/// A category's transactions summed into one breakdown entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// The category.
    pub name: Category,
    /// The sum of all transaction amounts in the category, income and
    /// expense magnitudes combined.
    pub total: f64,
    /// How many transactions fell in the category.
    pub count: usize,
    /// The category's share of the grand total, 0-100.
    pub percentage: f64,
    /// The display color assigned by rank.
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, Default)]
struct MonthBucket {
    income: f64,
    expenses: f64,
    count: usize,
}

/// Group transactions by calendar month label and sum each group.
///
/// The label ignores the year: transactions from March of different years
/// merge into one "Mar" entry. Months with no transactions are omitted, and
/// the result is in calendar order (Jan..Dec), not first-appearance order.
pub fn summarize_months(transactions: &[Transaction]) -> Vec<MonthlySummary> {
    let mut buckets = [MonthBucket::default(); 12];

    for transaction in transactions {
        let bucket = &mut buckets[u8::from(transaction.date.month()) as usize - 1];

        match transaction.transaction_type {
            TransactionType::Income => bucket.income += transaction.amount,
            TransactionType::Expense => bucket.expenses += transaction.amount,
        }

        bucket.count += 1;
    }

    buckets
        .iter()
        .enumerate()
        .filter(|(_, bucket)| bucket.count > 0)
        .map(|(month_index, bucket)| {
            let net_amount = bucket.income - bucket.expenses;

            MonthlySummary {
                month: MONTH_LABELS[month_index],
                total_amount: net_amount.abs(),
                transaction_count: bucket.count,
                net_amount,
            }
        })
        .collect()
}

/// Sum transactions per category and rank the categories by total.
///
/// Income and expense amounts are combined, not netted, so each category's
/// total is a sign-independent magnitude. Each entry's percentage is its
/// share of the grand total of all category totals; the shares sum to 100
/// whenever at least one transaction exists. Colors cycle
/// [CATEGORY_COLORS] over the descending-total order.
pub fn summarize_categories(transactions: &[Transaction]) -> Vec<CategorySummary> {
    let mut totals: HashMap<Category, (f64, usize)> = HashMap::new();

    for transaction in transactions {
        let (total, count) = totals.entry(transaction.category).or_insert((0.0, 0));
        *total += transaction.amount;
        *count += 1;
    }

    let grand_total: f64 = totals.values().map(|(total, _)| total).sum();

    let mut summaries: Vec<CategorySummary> = totals
        .into_iter()
        .map(|(name, (total, count))| CategorySummary {
            name,
            total,
            count,
            percentage: if grand_total > 0.0 {
                total / grand_total * 100.0
            } else {
                0.0
            },
            color: "",
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.as_str().cmp(b.name.as_str()))
    });

    for (rank, summary) in summaries.iter_mut().enumerate() {
        summary.color = CATEGORY_COLORS[rank % CATEGORY_COLORS.len()];
    }

    summaries
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The state needed by the analytics endpoints.
#[derive(Debug, Clone)]
pub struct AnalyticsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AnalyticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the per-month transaction summary report.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_monthly_summary_endpoint(
    State(state): State<AnalyticsState>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    query_transactions(TransactionQuery::default(), &connection)
        .map(|transactions| Json(summarize_months(&transactions)))
}

/// A route handler for the per-category breakdown report.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_category_breakdown_endpoint(
    State(state): State<AnalyticsState>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    query_transactions(TransactionQuery::default(), &connection)
        .map(|transactions| Json(summarize_categories(&transactions)))
}

// ============================================================================
// TESTS
// ============================================================================
