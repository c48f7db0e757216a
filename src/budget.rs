//! Monthly category budgets and the budget-vs-actual comparison report.
//!
//! A budget is a spending ceiling for one category in one calendar month.
//! Budgets are keyed by `(month, category)`: creating a budget for a pair
//! that already has one overwrites the amount instead of inserting a second
//! row. The comparison report joins a month's budgets against that month's
//! expense transactions.

use std::{
    collections::HashMap,
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    AppState, Error,
    database_id::DatabaseID,
    transaction::{Category, Transaction, TransactionQuery, TransactionType, query_transactions},
};

// ============================================================================
// MODELS
// ============================================================================

/// A spending ceiling for one category in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The ID of the budget.
    pub id: DatabaseID,
    /// The month the budget applies to, as a YYYY-MM string.
    pub month: String,
    /// The category the budget applies to. Never [Category::Income].
    pub category: Category,
    /// The maximum amount to spend in the category for the month.
    pub amount: f64,
}

/// Parse a YYYY-MM month string into a year and month.
///
/// # Errors
/// This function will return an [Error::InvalidMonth] if `month` is not of
/// the form YYYY-MM or names a month outside 1-12.
pub fn parse_month(month: &str) -> Result<(i32, Month), Error> {
    let invalid = || Error::InvalidMonth(month.to_string());

    let (year_text, month_text) = month.split_once('-').ok_or_else(invalid)?;

    let year: i32 = year_text.parse().map_err(|_| invalid())?;
    let month_number: u8 = month_text.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month_number).map_err(|_| invalid())?;

    Ok((year, month))
}

/// The inclusive range of dates covered by a YYYY-MM month string, i.e.
/// the first through last day of that calendar month.
///
/// # Errors
/// This function will return an [Error::InvalidMonth] if `month` cannot be
/// parsed by [parse_month].
pub fn month_date_range(month: &str) -> Result<RangeInclusive<Date>, Error> {
    let (year, month_of_year) = parse_month(month)?;

    let first_day = Date::from_calendar_date(year, month_of_year, 1)
        .map_err(|_| Error::InvalidMonth(month.to_string()))?;
    let last_day = Date::from_calendar_date(
        year,
        month_of_year,
        time::util::days_in_year_month(year, month_of_year),
    )
    .map_err(|_| Error::InvalidMonth(month.to_string()))?;

    Ok(first_day..=last_day)
}

// ============================================================================
// COMPARISON REPORT
// ============================================================================

/// One budget's performance against the month's actual spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetComparison {
    /// The budgeted category.
    pub category: Category,
    /// The budgeted amount.
    pub budget: f64,
    /// The amount actually spent on the category in the month.
    pub actual: f64,
    /// `budget - actual`. Negative when the category is over budget.
    pub remaining: f64,
    /// `actual / budget` as a rounded percentage, or 0 when nothing was spent.
    pub percentage: i64,
}

/// Aggregate figures and insight buckets derived from a month's comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInsights {
    /// The sum of all budgeted amounts for the month.
    pub total_budget: f64,
    /// The sum of all expense spending in the month, budgeted or not.
    pub total_spent: f64,
    /// `total_budget - total_spent`.
    pub total_remaining: f64,
    /// `total_spent / total_budget` as a rounded percentage, or 0 when no
    /// budgets are set.
    pub overall_percentage: i64,
    /// Comparisons where spending exceeded the budget.
    pub over_budget_categories: Vec<BudgetComparison>,
    /// Comparisons with spending below the budget.
    pub under_budget_categories: Vec<BudgetComparison>,
    /// Comparisons with no spending at all.
    pub unused_categories: Vec<BudgetComparison>,
}

/// Compare a month's budgets against its expense transactions.
///
/// `expenses` should contain only transactions of type expense whose dates
/// fall within the budgets' month; callers are expected to have filtered
/// with [query_transactions] and [month_date_range].
///
/// The insight buckets use strict comparisons: a category whose spending
/// exactly equals its budget lands in none of them.
pub fn compare_budgets(
    budgets: &[Budget],
    expenses: &[Transaction],
) -> (Vec<BudgetComparison>, BudgetInsights) {
    let mut category_spending: HashMap<Category, f64> = HashMap::new();
    for transaction in expenses {
        *category_spending.entry(transaction.category).or_insert(0.0) += transaction.amount;
    }

    let comparison: Vec<BudgetComparison> = budgets
        .iter()
        .map(|budget| {
            let actual = category_spending
                .get(&budget.category)
                .copied()
                .unwrap_or(0.0);

            BudgetComparison {
                category: budget.category,
                budget: budget.amount,
                actual,
                remaining: budget.amount - actual,
                percentage: if actual == 0.0 {
                    0
                } else {
                    (actual / budget.amount * 100.0).round() as i64
                },
            }
        })
        .collect();

    let total_budget: f64 = budgets.iter().map(|budget| budget.amount).sum();
    let total_spent: f64 = category_spending.values().sum();

    let insights = BudgetInsights {
        total_budget,
        total_spent,
        total_remaining: total_budget - total_spent,
        overall_percentage: if total_budget > 0.0 {
            (total_spent / total_budget * 100.0).round() as i64
        } else {
            0
        },
        over_budget_categories: comparison
            .iter()
            .filter(|item| item.actual > item.budget)
            .cloned()
            .collect(),
        under_budget_categories: comparison
            .iter()
            .filter(|item| item.actual < item.budget && item.actual > 0.0)
            .cloned()
            .collect(),
        unused_categories: comparison
            .iter()
            .filter(|item| item.actual == 0.0)
            .cloned()
            .collect(),
    };

    (comparison, insights)
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The state needed by the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating or updating a budget.
#[derive(Debug, Serialize, Deserialize)]
pub struct BudgetForm {
    /// The month the budget applies to, as a YYYY-MM string.
    pub month: String,
    /// The category the budget applies to.
    pub category: Category,
    /// The maximum amount to spend in the category for the month.
    pub amount: f64,
}

impl BudgetForm {
    /// Check that the month parses and the category can carry a budget.
    ///
    /// # Errors
    /// This function will return an [Error::InvalidMonth] if the month is not
    /// of the form YYYY-MM, or an [Error::IncomeBudgetCategory] if the
    /// category is [Category::Income].
    pub fn validate(&self) -> Result<(), Error> {
        parse_month(&self.month)?;

        if self.category == Category::Income {
            return Err(Error::IncomeBudgetCategory);
        }

        Ok(())
    }
}

/// The query parameters accepted by the budget list endpoint.
#[derive(Debug, Deserialize)]
pub struct BudgetListQuery {
    /// Restrict the listing to a single YYYY-MM month.
    pub month: Option<String>,
}

/// The query parameters accepted by the comparison endpoint.
#[derive(Debug, Deserialize)]
pub struct ComparisonQuery {
    /// The YYYY-MM month to report on. Required.
    pub month: Option<String>,
}

/// The response body of the comparison endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComparisonResponse {
    /// One entry per budget set for the month.
    pub comparison: Vec<BudgetComparison>,
    /// Aggregate figures and insight buckets for the month.
    pub insights: BudgetInsights,
}

/// The response body for a successful delete.
#[derive(Debug, Serialize)]
struct DeleteMessage {
    message: &'static str,
}

/// A route handler for listing budgets, optionally restricted to one month,
/// sorted by category.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_budgets_endpoint(
    State(state): State<BudgetState>,
    Query(query): Query<BudgetListQuery>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    query_budgets(query.month.as_deref(), &connection).map(Json)
}

/// A route handler for creating or updating a budget.
///
/// Budgets upsert by `(month, category)`: responds with 201 and the new
/// budget when the pair was unused, or 200 and the overwritten budget when
/// one already existed.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn upsert_budget_endpoint(
    State(state): State<BudgetState>,
    payload: Result<Json<BudgetForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            return Error::InvalidRequestBody(rejection.body_text()).into_response();
        }
    };

    if let Err(error) = form.validate() {
        return error.into_response();
    }

    let connection = state.db_connection.lock().unwrap();

    match upsert_budget(&form.month, form.category, form.amount, &connection) {
        Ok((budget, true)) => (StatusCode::CREATED, Json(budget)).into_response(),
        Ok((budget, false)) => (StatusCode::OK, Json(budget)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for deleting a budget by its database ID.
///
/// Responds with 404 if the budget does not exist.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<DatabaseID>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    delete_budget(budget_id, &connection).map(|()| {
        (
            StatusCode::OK,
            Json(DeleteMessage {
                message: "Budget deleted successfully",
            }),
        )
    })
}

/// A route handler for the month's budget-vs-actual comparison report.
///
/// Responds with 400 when the `month` query parameter is missing or
/// malformed.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_budget_comparison_endpoint(
    State(state): State<BudgetState>,
    Query(query): Query<ComparisonQuery>,
) -> Response {
    let month = match query.month {
        Some(month) => month,
        None => return Error::MissingMonthParameter.into_response(),
    };

    let date_range = match month_date_range(&month) {
        Ok(date_range) => date_range,
        Err(error) => return error.into_response(),
    };

    let connection = state.db_connection.lock().unwrap();

    let budgets = match query_budgets(Some(&month), &connection) {
        Ok(budgets) => budgets,
        Err(error) => return error.into_response(),
    };

    let expenses = match query_transactions(
        TransactionQuery {
            date_range: Some(date_range),
            transaction_type: Some(TransactionType::Expense),
            sort_date: None,
        },
        &connection,
    ) {
        Ok(expenses) => expenses,
        Err(error) => return error.into_response(),
    };

    let (comparison, insights) = compare_budgets(&budgets, &expenses);

    (
        StatusCode::OK,
        Json(ComparisonResponse {
            comparison,
            insights,
        }),
    )
        .into_response()
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a budget, or overwrite the amount of the existing budget for the
/// same `(month, category)` pair.
///
/// Returns the stored budget and `true` if a new row was inserted, `false`
/// if an existing row was overwritten.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn upsert_budget(
    month: &str,
    category: Category,
    amount: f64,
    connection: &Connection,
) -> Result<(Budget, bool), Error> {
    let existing_id: Option<DatabaseID> = connection
        .query_row(
            "SELECT id FROM budget WHERE month = ?1 AND category = ?2",
            (month, category),
            |row| row.get(0),
        )
        .optional()?;

    match existing_id {
        Some(id) => {
            connection.execute("UPDATE budget SET amount = ?1 WHERE id = ?2", (amount, id))?;

            Ok((
                Budget {
                    id,
                    month: month.to_string(),
                    category,
                    amount,
                },
                false,
            ))
        }
        None => {
            let budget = connection
                .prepare(
                    "INSERT INTO budget (month, category, amount) VALUES (?1, ?2, ?3)
                     RETURNING id, month, category, amount",
                )?
                .query_row((month, category, amount), map_budget_row)?;

            Ok((budget, true))
        }
    }
}

/// Query for budgets in the database, sorted by category.
///
/// Passing a month restricts the results to that month's budgets.
///
/// # Errors
/// This function will return an [Error::SqlError] there is a SQL error.
pub fn query_budgets(month: Option<&str>, connection: &Connection) -> Result<Vec<Budget>, Error> {
    match month {
        Some(month) => connection
            .prepare(
                "SELECT id, month, category, amount FROM budget
                 WHERE month = ?1 ORDER BY category ASC",
            )?
            .query_map([month], map_budget_row)?
            .map(|budget_result| budget_result.map_err(Error::SqlError))
            .collect(),
        None => connection
            .prepare("SELECT id, month, category, amount FROM budget ORDER BY category ASC")?
            .query_map([], map_budget_row)?
            .map(|budget_result| budget_result.map_err(Error::SqlError))
            .collect(),
    }
}

/// Delete a budget from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingBudget] if `id` does not refer to a valid budget,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_budget(id: DatabaseID, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute("DELETE FROM budget WHERE id = ?1", [id])?;

    if rows_deleted == 0 {
        Err(Error::DeleteMissingBudget)
    } else {
        Ok(())
    }
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                month TEXT NOT NULL,
                category TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount >= 0),
                UNIQUE (month, category)
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Budget.
fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        month: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod budget_db_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize, transaction::Category};

    use super::{delete_budget, query_budgets, upsert_budget};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn upsert_inserts_then_overwrites() {
        let connection = get_test_connection();

        let (created, was_inserted) =
            upsert_budget("2024-03", Category::FoodAndDining, 150.0, &connection).unwrap();
        assert!(was_inserted);
        assert_eq!(created.amount, 150.0);

        let (updated, was_inserted) =
            upsert_budget("2024-03", Category::FoodAndDining, 200.0, &connection).unwrap();
        assert!(!was_inserted);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.amount, 200.0);

        let budgets = query_budgets(Some("2024-03"), &connection).unwrap();
        assert_eq!(budgets, vec![updated]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let connection = get_test_connection();

        let (first, _) =
            upsert_budget("2024-03", Category::FoodAndDining, 150.0, &connection).unwrap();
        let (second, _) =
            upsert_budget("2024-03", Category::FoodAndDining, 150.0, &connection).unwrap();

        assert_eq!(first, second);
        assert_eq!(query_budgets(None, &connection).unwrap().len(), 1);
    }

    #[test]
    fn same_category_in_different_months_stays_separate() {
        let connection = get_test_connection();

        upsert_budget("2024-03", Category::FoodAndDining, 150.0, &connection).unwrap();
        upsert_budget("2024-04", Category::FoodAndDining, 175.0, &connection).unwrap();

        assert_eq!(query_budgets(None, &connection).unwrap().len(), 2);
        assert_eq!(query_budgets(Some("2024-04"), &connection).unwrap().len(), 1);
    }

    #[test]
    fn query_sorts_by_category() {
        let connection = get_test_connection();

        upsert_budget("2024-03", Category::Utilities, 80.0, &connection).unwrap();
        upsert_budget("2024-03", Category::Entertainment, 60.0, &connection).unwrap();
        upsert_budget("2024-03", Category::FoodAndDining, 150.0, &connection).unwrap();

        let budgets = query_budgets(Some("2024-03"), &connection).unwrap();
        let categories: Vec<_> = budgets.iter().map(|budget| budget.category).collect();

        assert_eq!(
            categories,
            vec![
                Category::Entertainment,
                Category::FoodAndDining,
                Category::Utilities
            ]
        );
    }

    #[test]
    fn delete_removes_budget() {
        let connection = get_test_connection();

        let (created, _) =
            upsert_budget("2024-03", Category::FoodAndDining, 150.0, &connection).unwrap();

        delete_budget(created.id, &connection).unwrap();

        assert!(query_budgets(None, &connection).unwrap().is_empty());
    }

    #[test]
    fn delete_fails_on_invalid_id() {
        let connection = get_test_connection();

        assert_eq!(
            delete_budget(999, &connection),
            Err(Error::DeleteMissingBudget)
        );
    }
}

#[cfg(test)]
mod comparison_tests {
    use time::macros::date;

    use crate::transaction::{
        Category, PaymentMethod, Transaction, TransactionType,
    };

    use super::{Budget, compare_budgets};

    fn budget(category: Category, amount: f64) -> Budget {
        Budget {
            id: 0,
            month: "2024-03".to_string(),
            category,
            amount,
        }
    }

    fn expense(category: Category, amount: f64) -> Transaction {
        Transaction {
            id: 0,
            date: date!(2024 - 03 - 05),
            description: "Expense".to_string(),
            amount,
            category,
            payment_method: PaymentMethod::Cash,
            transaction_type: TransactionType::Expense,
        }
    }

    #[test]
    fn compares_spending_against_budget() {
        let budgets = vec![budget(Category::FoodAndDining, 150.0)];
        let expenses = vec![expense(Category::FoodAndDining, 100.0)];

        let (comparison, insights) = compare_budgets(&budgets, &expenses);

        assert_eq!(comparison.len(), 1);
        assert_eq!(comparison[0].category, Category::FoodAndDining);
        assert_eq!(comparison[0].budget, 150.0);
        assert_eq!(comparison[0].actual, 100.0);
        assert_eq!(comparison[0].remaining, 50.0);
        assert_eq!(comparison[0].percentage, 67);

        assert_eq!(insights.total_budget, 150.0);
        assert_eq!(insights.total_spent, 100.0);
        assert_eq!(insights.total_remaining, 50.0);
        assert_eq!(insights.overall_percentage, 67);
    }

    #[test]
    fn buckets_partition_the_comparison() {
        let budgets = vec![
            budget(Category::FoodAndDining, 100.0),
            budget(Category::Entertainment, 50.0),
            budget(Category::Utilities, 80.0),
        ];
        let expenses = vec![
            expense(Category::FoodAndDining, 150.0),
            expense(Category::Entertainment, 10.0),
        ];

        let (comparison, insights) = compare_budgets(&budgets, &expenses);

        assert_eq!(insights.over_budget_categories.len(), 1);
        assert_eq!(
            insights.over_budget_categories[0].category,
            Category::FoodAndDining
        );
        assert_eq!(insights.under_budget_categories.len(), 1);
        assert_eq!(
            insights.under_budget_categories[0].category,
            Category::Entertainment
        );
        assert_eq!(insights.unused_categories.len(), 1);
        assert_eq!(insights.unused_categories[0].category, Category::Utilities);

        let bucketed_count = insights.over_budget_categories.len()
            + insights.under_budget_categories.len()
            + insights.unused_categories.len();
        assert_eq!(bucketed_count, comparison.len());
    }

    #[test]
    fn unbudgeted_spending_counts_towards_total_spent() {
        let budgets = vec![budget(Category::FoodAndDining, 100.0)];
        let expenses = vec![
            expense(Category::FoodAndDining, 40.0),
            expense(Category::Shopping, 60.0),
        ];

        let (comparison, insights) = compare_budgets(&budgets, &expenses);

        assert_eq!(comparison.len(), 1);
        assert_eq!(insights.total_spent, 100.0);
        assert_eq!(insights.overall_percentage, 100);
    }

    #[test]
    fn overall_percentage_is_zero_without_budgets() {
        let expenses = vec![expense(Category::Shopping, 60.0)];

        let (comparison, insights) = compare_budgets(&[], &expenses);

        assert!(comparison.is_empty());
        assert_eq!(insights.total_budget, 0.0);
        assert_eq!(insights.overall_percentage, 0);
    }

    #[test]
    fn repeated_expenses_accumulate() {
        let budgets = vec![budget(Category::FoodAndDining, 100.0)];
        let expenses = vec![
            expense(Category::FoodAndDining, 30.0),
            expense(Category::FoodAndDining, 45.0),
        ];

        let (comparison, _) = compare_budgets(&budgets, &expenses);

        assert_eq!(comparison[0].actual, 75.0);
        assert_eq!(comparison[0].percentage, 75);
    }
}
