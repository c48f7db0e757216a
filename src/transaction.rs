//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and its category, payment method, and type enums
//! - Database functions for storing, querying, and managing transactions
//! - The JSON CRUD handlers for the transaction endpoints

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{
    Connection, Row, ToSql, params_from_iter,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{AppState, Error, database_id::DatabaseID};

// ============================================================================
// MODELS
// ============================================================================

/// The fixed set of categories a transaction can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Groceries, restaurants, cafes.
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    /// Fuel, public transport, vehicle costs.
    Transportation,
    /// General retail purchases.
    Shopping,
    /// Movies, games, events.
    Entertainment,
    /// Medical, dental, pharmacy.
    Healthcare,
    /// Power, water, internet, phone.
    Utilities,
    /// Wages and other money coming in.
    Income,
    /// The catch-all category.
    Other,
}

impl Category {
    /// The display label for the category, as stored in the database and
    /// serialized over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FoodAndDining => "Food & Dining",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Utilities => "Utilities",
            Category::Income => "Income",
            Category::Other => "Other",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Food & Dining" => Some(Category::FoodAndDining),
            "Transportation" => Some(Category::Transportation),
            "Shopping" => Some(Category::Shopping),
            "Entertainment" => Some(Category::Entertainment),
            "Healthcare" => Some(Category::Healthcare),
            "Utilities" => Some(Category::Utilities),
            "Income" => Some(Category::Income),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        Category::from_label(label).ok_or(FromSqlError::InvalidType)
    }
}

/// How a transaction was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// A credit card.
    #[serde(rename = "Credit Card")]
    CreditCard,
    /// A debit card.
    #[serde(rename = "Debit Card")]
    DebitCard,
    /// A direct bank transfer.
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    /// An app-based wallet.
    #[serde(rename = "Digital Wallet")]
    DigitalWallet,
    /// A paper check.
    Check,
}

impl PaymentMethod {
    /// The display label for the payment method, as stored in the database
    /// and serialized over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::DigitalWallet => "Digital Wallet",
            PaymentMethod::Check => "Check",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Cash" => Some(PaymentMethod::Cash),
            "Credit Card" => Some(PaymentMethod::CreditCard),
            "Debit Card" => Some(PaymentMethod::DebitCard),
            "Bank Transfer" => Some(PaymentMethod::BankTransfer),
            "Digital Wallet" => Some(PaymentMethod::DigitalWallet),
            "Check" => Some(PaymentMethod::Check),
            _ => None,
        }
    }
}

impl ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        PaymentMethod::from_label(label).ok_or(FromSqlError::InvalidType)
    }
}

/// Whether a transaction records money coming in or going out.
///
/// The amount of a transaction is always non-negative, so this is the only
/// place the direction of the money movement is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

impl TransactionType {
    /// The label for the transaction type, as stored in the database and
    /// serialized over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseID,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// The category that describes the type of the transaction.
    pub category: Category,
    /// How the transaction was paid for.
    pub payment_method: PaymentMethod,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

/// A validated set of fields for creating or updating a [Transaction].
///
/// Build one from a [TransactionForm] with [TransactionForm::into_builder],
/// then finalize it with [create_transaction] or [update_transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The date the transaction occurred.
    ///
    /// `None` means the caller did not supply a date: [create_transaction]
    /// uses today's date, while [update_transaction] keeps the stored date.
    pub date: Option<Date>,
    /// A non-empty description of the transaction.
    pub description: String,
    /// The transaction amount. Always greater than zero.
    pub amount: f64,
    /// The category of the transaction.
    pub category: Category,
    /// How the transaction was paid for.
    pub payment_method: PaymentMethod,
    /// Whether the transaction is income or an expense.
    pub transaction_type: TransactionType,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating or updating a transaction.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    /// The date when the transaction occurred. Defaults to today when omitted
    /// on create; leaves the stored date unchanged on update.
    #[serde(default)]
    pub date: Option<Date>,
    /// Text detailing the transaction.
    pub description: String,
    /// The value of the transaction in dollars.
    pub amount: f64,
    /// The category of the transaction.
    pub category: Category,
    /// How the transaction was paid for.
    pub payment_method: PaymentMethod,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

impl TransactionForm {
    /// Validate the form and convert it into a [TransactionBuilder].
    ///
    /// # Errors
    /// This function will return an [Error::EmptyDescription] if the
    /// description is empty or whitespace, or an [Error::NonPositiveAmount]
    /// if the amount is zero or negative.
    pub fn into_builder(self) -> Result<TransactionBuilder, Error> {
        if self.description.trim().is_empty() {
            return Err(Error::EmptyDescription);
        }

        if self.amount <= 0.0 {
            return Err(Error::NonPositiveAmount);
        }

        Ok(TransactionBuilder {
            date: self.date,
            description: self.description,
            amount: self.amount,
            category: self.category,
            payment_method: self.payment_method,
            transaction_type: self.transaction_type,
        })
    }
}

/// The response body for a successful delete.
#[derive(Debug, Serialize)]
struct DeleteMessage {
    message: &'static str,
}

/// A route handler for listing all transactions, newest first.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionState>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    query_transactions(
        TransactionQuery {
            sort_date: Some(SortOrder::Descending),
            ..Default::default()
        },
        &connection,
    )
    .map(Json)
}

/// A route handler for creating a new transaction.
///
/// Responds with status 201 and the created transaction on success, or 400
/// if the request body is missing fields or fails validation.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    payload: Result<Json<TransactionForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            return Error::InvalidRequestBody(rejection.body_text()).into_response();
        }
    };

    let builder = match form.into_builder() {
        Ok(builder) => builder,
        Err(error) => return error.into_response(),
    };

    let connection = state.db_connection.lock().unwrap();

    match create_transaction(builder, &connection) {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for getting a transaction by its database ID.
///
/// This function will return the status code 404 if the requested resource
/// does not exist (e.g., not created yet).
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<DatabaseID>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    get_transaction(transaction_id, &connection)
        .map(|transaction| (StatusCode::OK, Json(transaction)))
}

/// A route handler for replacing a transaction's fields by its database ID.
///
/// The same validation as [create_transaction_endpoint] applies. Responds
/// with 404 if the transaction does not exist.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<DatabaseID>,
    payload: Result<Json<TransactionForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            return Error::InvalidRequestBody(rejection.body_text()).into_response();
        }
    };

    let builder = match form.into_builder() {
        Ok(builder) => builder,
        Err(error) => return error.into_response(),
    };

    let connection = state.db_connection.lock().unwrap();

    match update_transaction(transaction_id, builder, &connection) {
        Ok(transaction) => (StatusCode::OK, Json(transaction)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for deleting a transaction by its database ID.
///
/// Responds with 404 if the transaction does not exist, never 200.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<DatabaseID>,
) -> impl IntoResponse {
    let connection = state.db_connection.lock().unwrap();

    delete_transaction(transaction_id, &connection).map(|()| {
        (
            StatusCode::OK,
            Json(DeleteMessage {
                message: "Transaction deleted successfully",
            }),
        )
    })
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// A builder without a date produces a transaction dated today (UTC).
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let date = builder
        .date
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (date, description, amount, category, payment_method, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, date, description, amount, category, payment_method, type",
        )?
        .query_row(
            (
                date,
                builder.description,
                builder.amount,
                builder.category,
                builder.payment_method,
                builder.transaction_type,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: DatabaseID, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, date, description, amount, category, payment_method, type
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Defines how transactions should be fetched from [query_transactions].
#[derive(Default)]
pub struct TransactionQuery {
    /// Include transactions within `date_range` (inclusive).
    pub date_range: Option<RangeInclusive<Date>>,
    /// Include only transactions of this type.
    pub transaction_type: Option<TransactionType>,
    /// Orders transactions by date in the order `sort_date`. None returns
    /// transactions in the order they are stored.
    pub sort_date: Option<SortOrder>,
}

/// The order to sort transactions in a [TransactionQuery].
pub enum SortOrder {
    /// Sort in order of increasing value.
    // TODO: Remove #[allow(dead_code)] once Ascending is used
    #[allow(dead_code)]
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

/// Query for transactions in the database.
///
/// # Errors
/// This function will return an [Error::SqlError] there is a SQL error.
pub fn query_transactions(
    filter: TransactionQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut query_string_parts = vec![
        "SELECT id, date, description, amount, category, payment_method, type FROM \"transaction\""
            .to_string(),
    ];
    let mut where_clause_parts = vec![];
    let mut query_parameters = vec![];

    if let Some(date_range) = filter.date_range {
        where_clause_parts.push(format!(
            "date BETWEEN ?{} AND ?{}",
            query_parameters.len() + 1,
            query_parameters.len() + 2,
        ));
        query_parameters.push(Value::Text(date_range.start().to_string()));
        query_parameters.push(Value::Text(date_range.end().to_string()));
    }

    if let Some(transaction_type) = filter.transaction_type {
        where_clause_parts.push(format!("type = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(transaction_type.as_str().to_string()));
    }

    if !where_clause_parts.is_empty() {
        query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));
    }

    match filter.sort_date {
        Some(SortOrder::Ascending) => query_string_parts.push("ORDER BY date ASC".to_string()),
        Some(SortOrder::Descending) => query_string_parts.push("ORDER BY date DESC".to_string()),
        None => {}
    }

    let query_string = query_string_parts.join(" ");
    let params = params_from_iter(query_parameters.iter());

    connection
        .prepare(&query_string)?
        .query_map(params, map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Replace a transaction's fields in the database.
///
/// A builder without a date keeps the transaction's stored date.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: DatabaseID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "UPDATE \"transaction\"
             SET date = COALESCE(?2, date), description = ?3, amount = ?4,
                 category = ?5, payment_method = ?6, type = ?7
             WHERE id = ?1
             RETURNING id, date, description, amount, category, payment_method, type",
        )?
        .query_row(
            (
                id,
                builder.date,
                builder.description,
                builder.amount,
                builder.category,
                builder.payment_method,
                builder.transaction_type,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => error.into(),
        })
}

/// Delete a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(id: DatabaseID, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_deleted == 0 {
        Err(Error::DeleteMissingTransaction)
    } else {
        Ok(())
    }
}

/// Create the transaction table and its indexes in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount >= 0),
                category TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                type TEXT NOT NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS transaction_date_index ON \"transaction\" (date)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS transaction_category_index ON \"transaction\" (category)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS transaction_type_index ON \"transaction\" (type)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        payment_method: row.get(5)?,
        transaction_type: row.get(6)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod transaction_form_tests {
    use time::macros::date;

    use super::{Category, Error, PaymentMethod, TransactionForm, TransactionType};

    fn form() -> TransactionForm {
        TransactionForm {
            date: Some(date!(2024 - 03 - 05)),
            description: "Weekly groceries".to_string(),
            amount: 42.50,
            category: Category::FoodAndDining,
            payment_method: PaymentMethod::CreditCard,
            transaction_type: TransactionType::Expense,
        }
    }

    #[test]
    fn into_builder_succeeds_on_valid_form() {
        let builder = form().into_builder().unwrap();

        assert_eq!(builder.date, Some(date!(2024 - 03 - 05)));
        assert_eq!(builder.description, "Weekly groceries");
        assert_eq!(builder.amount, 42.50);
    }

    #[test]
    fn into_builder_fails_on_empty_description() {
        let mut empty = form();
        empty.description = "".to_string();

        assert_eq!(empty.into_builder(), Err(Error::EmptyDescription));

        let mut whitespace = form();
        whitespace.description = "   ".to_string();

        assert_eq!(whitespace.into_builder(), Err(Error::EmptyDescription));
    }

    #[test]
    fn into_builder_fails_on_zero_amount() {
        let mut zero = form();
        zero.amount = 0.0;

        assert_eq!(zero.into_builder(), Err(Error::NonPositiveAmount));
    }

    #[test]
    fn into_builder_fails_on_negative_amount() {
        let mut negative = form();
        negative.amount = -9.99;

        assert_eq!(negative.into_builder(), Err(Error::NonPositiveAmount));
    }
}


#[cfg(test)]
mod transaction_endpoint_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use time::macros::date;

    use crate::{AppState, build_router, endpoints, endpoints::format_endpoint};

    use super::{Category, PaymentMethod, Transaction, TransactionForm, TransactionType};

    fn new_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection).expect("Could not initialize database.");

        TestServer::new(build_router(state)).expect("Could not create test server.")
    }

    fn groceries_form() -> TransactionForm {
        TransactionForm {
            date: Some(date!(2024 - 03 - 05)),
            description: "Weekly groceries".to_string(),
            amount: 42.50,
            category: Category::FoodAndDining,
            payment_method: PaymentMethod::CreditCard,
            transaction_type: TransactionType::Expense,
        }
    }

    #[tokio::test]
    async fn create_transaction_returns_created_row() {
        let server = new_test_server();

        let response = server.post(endpoints::TRANSACTIONS).json(&groceries_form()).await;

        response.assert_status(axum::http::StatusCode::CREATED);

        let transaction = response.json::<Transaction>();
        assert_eq!(transaction.date, date!(2024 - 03 - 05));
        assert_eq!(transaction.description, "Weekly groceries");
        assert_eq!(transaction.amount, 42.50);
        assert_eq!(transaction.category, Category::FoodAndDining);
        assert_eq!(transaction.payment_method, PaymentMethod::CreditCard);
        assert_eq!(transaction.transaction_type, TransactionType::Expense);
    }

    #[tokio::test]
    async fn create_transaction_serializes_display_labels() {
        let server = new_test_server();

        let response = server.post(endpoints::TRANSACTIONS).json(&groceries_form()).await;

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["category"], "Food & Dining");
        assert_eq!(body["paymentMethod"], "Credit Card");
        assert_eq!(body["type"], "expense");
        assert_eq!(body["date"], "2024-03-05");
    }

    #[tokio::test]
    async fn create_transaction_fails_on_missing_fields() {
        let server = new_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({ "description": "Missing everything else" }))
            .await;

        response.assert_status_bad_request();
        assert!(response.json::<serde_json::Value>().get("error").is_some());
    }

    #[tokio::test]
    async fn create_transaction_fails_on_unknown_category() {
        let server = new_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "description": "Weekly groceries",
                "amount": 42.5,
                "category": "Gambling",
                "paymentMethod": "Cash",
                "type": "expense"
            }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn create_transaction_fails_on_zero_amount() {
        let server = new_test_server();

        let mut form = groceries_form();
        form.amount = 0.0;

        let response = server.post(endpoints::TRANSACTIONS).json(&form).await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn create_transaction_without_date_defaults_to_today() {
        let server = new_test_server();

        let mut form = groceries_form();
        form.date = None;

        let response = server.post(endpoints::TRANSACTIONS).json(&form).await;

        response.assert_status(axum::http::StatusCode::CREATED);
        assert_eq!(
            response.json::<Transaction>().date,
            time::OffsetDateTime::now_utc().date()
        );
    }

    #[tokio::test]
    async fn list_transactions_sorted_newest_first() {
        let server = new_test_server();

        for (amount, date) in [
            (1.0, date!(2024 - 01 - 15)),
            (2.0, date!(2024 - 06 - 15)),
            (3.0, date!(2024 - 03 - 15)),
        ] {
            let mut form = groceries_form();
            form.amount = amount;
            form.date = Some(date);
            server.post(endpoints::TRANSACTIONS).json(&form).await;
        }

        let response = server.get(endpoints::TRANSACTIONS).await;
        response.assert_status_ok();

        let transactions = response.json::<Vec<Transaction>>();
        let dates: Vec<_> = transactions.iter().map(|t| t.date).collect();

        assert_eq!(
            dates,
            vec![
                date!(2024 - 06 - 15),
                date!(2024 - 03 - 15),
                date!(2024 - 01 - 15)
            ]
        );
    }

    #[tokio::test]
    async fn get_transaction_by_id() {
        let server = new_test_server();

        let created = server
            .post(endpoints::TRANSACTIONS)
            .json(&groceries_form())
            .await
            .json::<Transaction>();

        let response = server
            .get(&format_endpoint(endpoints::TRANSACTION, created.id))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Transaction>(), created);
    }

    #[tokio::test]
    async fn get_transaction_fails_on_invalid_id() {
        let server = new_test_server();

        let response = server
            .get(&format_endpoint(endpoints::TRANSACTION, 999))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn update_transaction_replaces_fields() {
        let server = new_test_server();

        let created = server
            .post(endpoints::TRANSACTIONS)
            .json(&groceries_form())
            .await
            .json::<Transaction>();

        let mut form = groceries_form();
        form.description = "Monthly groceries".to_string();
        form.amount = 180.0;

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, created.id))
            .json(&form)
            .await;

        response.assert_status_ok();

        let updated = response.json::<Transaction>();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.description, "Monthly groceries");
        assert_eq!(updated.amount, 180.0);
    }

    #[tokio::test]
    async fn update_transaction_fails_on_invalid_id() {
        let server = new_test_server();

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, 999))
            .json(&groceries_form())
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_transaction_removes_row() {
        let server = new_test_server();

        let created = server
            .post(endpoints::TRANSACTIONS)
            .json(&groceries_form())
            .await
            .json::<Transaction>();

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, created.id))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<serde_json::Value>()["message"],
            "Transaction deleted successfully"
        );

        server
            .get(&format_endpoint(endpoints::TRANSACTION, created.id))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_transaction_fails_on_invalid_id() {
        let server = new_test_server();

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, 999))
            .await;

        response.assert_status_not_found();
        assert!(response.json::<serde_json::Value>().get("error").is_some());
    }
}
