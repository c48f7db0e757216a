//! Application router configuration.

use axum::{
    Router,
    response::{IntoResponse, Response},
    routing::{delete, get},
};

use crate::{
    AppState, Error,
    analytics::{get_category_breakdown_endpoint, get_monthly_summary_endpoint},
    budget::{
        delete_budget_endpoint, get_budget_comparison_endpoint, get_budgets_endpoint,
        upsert_budget_endpoint,
    },
    dashboard::get_dashboard_endpoint,
    endpoints,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        get_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            get(get_budgets_endpoint).post(upsert_budget_endpoint),
        )
        .route(
            endpoints::BUDGET_COMPARISON,
            get(get_budget_comparison_endpoint),
        )
        .route(endpoints::BUDGET, delete(delete_budget_endpoint))
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .route(endpoints::MONTHLY_SUMMARY, get(get_monthly_summary_endpoint))
        .route(
            endpoints::CATEGORY_BREAKDOWN,
            get(get_category_breakdown_endpoint),
        )
        .fallback(get_not_found)
        .with_state(state)
}

/// All unknown paths respond with the standard JSON not-found error.
async fn get_not_found() -> Response {
    Error::NotFound.into_response()
}

#[cfg(test)]
mod routing_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{AppState, build_router, endpoints};

    fn new_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection).expect("Could not initialize database.");

        TestServer::new(build_router(state)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn unknown_path_returns_json_not_found() {
        let server = new_test_server();

        let response = server.get("/api/nope").await;

        response.assert_status_not_found();
        assert!(response.json::<serde_json::Value>().get("error").is_some());
    }

    #[tokio::test]
    async fn comparison_route_is_not_shadowed_by_budget_id() {
        let server = new_test_server();

        let response = server
            .get(endpoints::BUDGET_COMPARISON)
            .add_query_param("month", "2024-03")
            .await;

        response.assert_status_ok();
    }
}
