//! HTTP client for the Vapi call-log endpoint.
//!
//! `GET {base_url}?assistantId=..&limit=..[&createdAtLt=..]` with a bearer
//! token; the response body is a JSON array of calls. Requests are sent once:
//! any non-success status or transport fault is returned to the caller.

use async_trait::async_trait;
use callsheet_core::config::VapiConfig;
use callsheet_core::{CallListQuery, CallLogSource, CallRecord, FetchError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct VapiClient {
    client: Client,
    base_url: String,
    bearer_token: SecretString,
}

impl VapiClient {
    pub fn new(base_url: impl Into<String>, bearer_token: SecretString) -> Self {
        Self { client: Client::new(), base_url: base_url.into(), bearer_token }
    }

    pub fn from_config(config: &VapiConfig) -> Self {
        Self::new(config.base_url.clone(), config.bearer_token.clone())
    }
}

fn query_params(query: &CallListQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("assistantId", query.assistant_id.clone()),
        ("limit", query.limit.to_string()),
    ];
    if let Some(cursor) = &query.created_at_lt {
        params.push(("createdAtLt", cursor.clone()));
    }
    params
}

#[async_trait]
impl CallLogSource for VapiClient {
    async fn list_calls(&self, query: &CallListQuery) -> Result<Vec<CallRecord>, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .bearer_auth(self.bearer_token.expose_secret())
            .query(&query_params(query))
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "export.fetch.http_error",
                assistant_id = %query.assistant_id,
                status = status.as_u16(),
                "call log request rejected"
            );
            return Err(FetchError::Status { status: status.as_u16(), body });
        }

        let body = response.text().await.map_err(|error| FetchError::Transport(error.to_string()))?;
        serde_json::from_str::<Vec<CallRecord>>(&body)
            .map_err(|error| FetchError::Decode(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use callsheet_core::{fetch_all_calls, CallListQuery, CallLogSource, FetchError};
    use serde_json::{json, Value};

    use super::VapiClient;

    #[derive(Clone, Default)]
    struct StubState {
        requests: Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>,
        fail_with: Option<StatusCode>,
        body: Option<String>,
    }

    async fn list_calls(
        State(state): State<StubState>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        state.requests.lock().expect("request log lock").push((auth, params.clone()));

        if let Some(status) = state.fail_with {
            return (status, "upstream said no").into_response();
        }
        if let Some(body) = state.body.clone() {
            return body.into_response();
        }

        // 150 calls newest first; createdAtLt filters strictly older ones.
        let limit: usize = params.get("limit").and_then(|value| value.parse().ok()).unwrap_or(100);
        let upper = params
            .get("createdAtLt")
            .and_then(|cursor| cursor.strip_prefix("t-"))
            .and_then(|index| index.parse::<usize>().ok())
            .unwrap_or(150);
        let calls: Vec<Value> = (0..upper)
            .rev()
            .take(limit)
            .map(|index| {
                json!({ "id": format!("call-{index}"), "createdAt": format!("t-{index}") })
            })
            .collect();
        Json(calls).into_response()
    }

    async fn spawn_stub(state: StubState) -> String {
        let app = Router::new().route("/call", get(list_calls)).with_state(state);
        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
        let addr = listener.local_addr().expect("stub listener address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/call")
    }

    fn client(base_url: String) -> VapiClient {
        VapiClient::new(base_url, "vapi-test-token".to_string().into())
    }

    #[tokio::test]
    async fn sends_bearer_token_and_query_parameters() {
        let state = StubState::default();
        let vapi = client(spawn_stub(state.clone()).await);

        let calls = vapi
            .list_calls(&CallListQuery {
                assistant_id: "asst-out".to_string(),
                limit: 100,
                created_at_lt: Some("t-120".to_string()),
            })
            .await
            .expect("list should succeed");

        assert_eq!(calls.len(), 100);
        assert_eq!(calls[0].id, "call-119");
        let requests = state.requests.lock().expect("request log lock");
        assert_eq!(requests[0].0.as_deref(), Some("Bearer vapi-test-token"));
        assert_eq!(requests[0].1.get("assistantId").map(String::as_str), Some("asst-out"));
        assert_eq!(requests[0].1.get("limit").map(String::as_str), Some("100"));
        assert_eq!(requests[0].1.get("createdAtLt").map(String::as_str), Some("t-120"));
    }

    #[tokio::test]
    async fn first_page_has_no_cursor_and_pagination_reaches_every_call() {
        let state = StubState::default();
        let vapi = client(spawn_stub(state.clone()).await);

        let calls = fetch_all_calls(&vapi, "asst-in").await.expect("fetch should succeed");

        assert_eq!(calls.len(), 150);
        let requests = state.requests.lock().expect("request log lock");
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].1.contains_key("createdAtLt"));
        assert_eq!(requests[1].1.get("createdAtLt").map(String::as_str), Some("t-50"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let state =
            StubState { fail_with: Some(StatusCode::UNAUTHORIZED), ..StubState::default() };
        let vapi = client(spawn_stub(state).await);

        let error = fetch_all_calls(&vapi, "asst-in").await.expect_err("fetch should fail");

        assert_eq!(
            error,
            FetchError::Status { status: 401, body: "upstream said no".to_string() }
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let state = StubState {
            body: Some(r#"{"message":"not a list"}"#.to_string()),
            ..StubState::default()
        };
        let vapi = client(spawn_stub(state).await);

        let error = fetch_all_calls(&vapi, "asst-in").await.expect_err("fetch should fail");

        assert!(matches!(error, FetchError::Decode(_)));
    }
}
