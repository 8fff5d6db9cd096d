//! Query relay: run SQL with the session's bearer token, render rows.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use tabletalk_relay::warehouse::default_query;
use tracing::{debug, info, warn};
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::schemas::ResultsRequest;
use crate::routes::auth::sign_in_url;
use crate::session::UserSession;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(run_results), components(schemas(ResultsRequest)))]
pub struct ResultsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/results", get(list_table).post(run_results))
}

/// Run the submitted SQL (`POST /results`) and return the table fragment.
///
/// A session without an access token gets a sign-in fragment and the
/// warehouse is never contacted.
#[utoipa::path(
    post,
    path = "/results",
    tag = "query",
    request_body = ResultsRequest,
    responses(
        (status = 200, description = "Rendered result table", body = String, content_type = "text/html"),
        (status = 400, description = "Empty or oversized SQL"),
        (status = 401, description = "No access token in session", body = String, content_type = "text/html"),
        (status = 422, description = "Result columns do not match the configured fields"),
        (status = 502, description = "Warehouse error"),
    )
)]
pub async fn run_results(
    State(state): State<Arc<AppState>>,
    session: UserSession,
    Json(req): Json<ResultsRequest>,
) -> Result<Response, ServerError> {
    req.validate()?;

    let Some(token) = session.access_token().await? else {
        warn!(session = ?session.id(), "query attempted without an access token");
        let auth_url = sign_in_url(&state, &session).await?;
        let page = state.views.reauth(&auth_url)?;
        return Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response());
    };

    debug!(sql_len = req.command.len(), "running query");
    let rows = state.warehouse.run_query(&token, &req.command).await?;
    info!(rows = rows.len(), "query finished");

    let page = state.views.results_table(&state.config.fields, &rows)?;
    session.update(|data| data.last_results = Some(rows)).await?;
    Ok(Html(page).into_response())
}

/// `GET /results`: list the whole table with the default projection.
async fn list_table(
    State(state): State<Arc<AppState>>,
    session: UserSession,
) -> Result<Response, ServerError> {
    let Some(token) = session.access_token().await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let config = &state.config;
    let sql = default_query(&config.table, &config.fields);
    let rows = state.warehouse.run_query(&token, &sql).await?;
    info!(rows = rows.len(), "table listed");

    let page = state
        .views
        .results_page(&config.table, &sql, &config.fields, &rows)?;
    session.update(|data| data.last_results = Some(rows)).await?;
    Ok(Html(page).into_response())
}

#[cfg(test)]
mod test {
    use crate::routes::test_support::{body_text, harness, json_request, request, ISSUED_TOKEN};
    use axum::body::Body;
    use axum::http::header::LOCATION;
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn query_without_token_never_reaches_warehouse() {
        let h = harness();
        let req = json_request(
            "POST",
            "/results",
            None,
            json!({ "command": "SELECT * FROM `acme-prod.crm.people`" }),
        );
        let resp = h.app().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(h.warehouse.queries.lock().unwrap().is_empty());
        let html = body_text(resp).await;
        assert!(html.contains("Sign in"));
        assert!(html.contains("state="));
    }

    #[tokio::test]
    async fn query_forwards_sql_verbatim_with_session_token() {
        let h = harness();
        let cookie = h.sign_in().await;
        let sql = "SELECT unique_id, firstname, lastname, email FROM `acme-prod.crm.people` WHERE lastname = 'Doe'";

        let resp = h
            .app()
            .oneshot(json_request("POST", "/results", Some(&cookie), json!({ "command": sql })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            *h.warehouse.queries.lock().unwrap(),
            vec![(ISSUED_TOKEN.to_owned(), sql.to_owned())]
        );
        let html = body_text(resp).await;
        assert!(html.contains("jane@x.com"));

        let stored = h.store.all_data();
        let rows = stored[0].last_results.as_ref().unwrap();
        assert_eq!(rows[0].get("lastname"), Some("Doe"));
    }

    #[tokio::test]
    async fn empty_command_is_bad_request() {
        let h = harness();
        let cookie = h.sign_in().await;
        let resp = h
            .app()
            .oneshot(json_request("POST", "/results", Some(&cookie), json!({ "command": "" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(h.warehouse.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_runs_default_query() {
        let h = harness();
        let cookie = h.sign_in().await;
        let resp = h
            .app()
            .oneshot(request("GET", "/results", Some(&cookie)).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let queries = h.warehouse.queries.lock().unwrap().clone();
        assert_eq!(
            queries[0].1,
            "SELECT unique_id, firstname, lastname, email FROM `acme-prod.crm.people`"
        );
        assert!(body_text(resp).await.contains("Jane"));
    }

    #[tokio::test]
    async fn logged_out_cookie_cannot_list_table() {
        let h = harness();
        let cookie = h.sign_in().await;
        h.app()
            .oneshot(request("GET", "/logout", Some(&cookie)).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let resp = h
            .app()
            .oneshot(request("GET", "/results", Some(&cookie)).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(resp.status().is_redirection());
        assert!(h.store.all_data().iter().all(|d| d.access_token.is_none()));
        assert!(h.warehouse.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_without_token_redirects_home() {
        let h = harness();
        let resp = h
            .app()
            .oneshot(request("GET", "/results", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.status().is_redirection());
        assert_eq!(resp.headers()[LOCATION], "/");
        assert!(h.warehouse.queries.lock().unwrap().is_empty());
    }
}
