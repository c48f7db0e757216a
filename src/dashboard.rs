//! The dashboard summary report: an overview of all recorded activity.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState,
    analytics::summarize_categories,
    transaction::{
        Category, SortOrder, Transaction, TransactionQuery, TransactionType, query_transactions,
    },
};

/// A top-spending category shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCategory {
    /// The category.
    pub name: Category,
    /// The sum of all transaction amounts in the category.
    pub total: f64,
    /// How many transactions fell in the category.
    pub count: usize,
    /// The category's share of all recorded amounts, 0-100.
    pub percentage: f64,
}

/// The dashboard overview of the full transaction history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// The sum of all income amounts.
    pub total_income: f64,
    /// The sum of all expense amounts.
    pub total_expenses: f64,
    /// Income minus expenses.
    pub net_amount: f64,
    /// How many transactions exist in total.
    pub transaction_count: usize,
    /// The five largest categories by summed amount.
    pub top_categories: Vec<TopCategory>,
    /// The five most recent transactions, newest first.
    pub recent_transactions: Vec<Transaction>,
}

/// Summarize the full transaction list for the dashboard.
pub fn summarize_dashboard(transactions: Vec<Transaction>) -> DashboardSummary {
    let mut total_income = 0.0;
    let mut total_expenses = 0.0;

    for transaction in &transactions {
        match transaction.transaction_type {
            TransactionType::Income => total_income += transaction.amount,
            TransactionType::Expense => total_expenses += transaction.amount,
        }
    }

    let top_categories = summarize_categories(&transactions)
        .into_iter()
        .take(5)
        .map(|summary| TopCategory {
            name: summary.name,
            total: summary.total,
            count: summary.count,
            percentage: summary.percentage,
        })
        .collect();

    let transaction_count = transactions.len();

    let mut recent_transactions = transactions;
    recent_transactions.sort_by(|a, b| b.date.cmp(&a.date));
    recent_transactions.truncate(5);

    DashboardSummary {
        total_income,
        total_expenses,
        net_amount: total_income - total_expenses,
        transaction_count,
        top_categories,
        recent_transactions,
    }
}

/// The state needed by the dashboard endpoint.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the dashboard summary report.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_dashboard_endpoint(State(state): State<DashboardState>) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    query_transactions(
        TransactionQuery {
            sort_date: Some(SortOrder::Descending),
            ..Default::default()
        },
        &connection,
    )
    .map(|transactions| Json(summarize_dashboard(transactions)))
}

// ============================================================================
// TESTS
// ============================================================================
