//! # cf-api Handlers
//!
//! Bridges axum requests and WebSocket upgrades into the GraphQL schema.

use std::sync::Arc;

use async_graphql::http::{GraphiQLSource, ALL_WEBSOCKET_PROTOCOLS};
use async_graphql::Data;
use async_graphql_axum::{GraphQLProtocol, GraphQLRequest, GraphQLResponse, GraphQLWebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use cf_core::AuthProvider;
use serde_json::{json, Value};

use crate::graphql::{ConnectifySchema, Viewer};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub schema: ConnectifySchema,
    pub auth: Arc<dyn AuthProvider>,
}

pub async fn graphql_handler(State(state): State<AppState>, headers: HeaderMap, req: GraphQLRequest) -> GraphQLResponse {
    let bearer = headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok());
    let viewer = Viewer::from_bearer(state.auth.as_ref(), bearer);
    state.schema.execute(req.into_inner().data(viewer)).await.into()
}

pub async fn graphiql() -> impl IntoResponse {
    Html(
        GraphiQLSource::build()
            .endpoint("/graphql")
            .subscription_endpoint("/ws")
            .finish(),
    )
}

/// Reads the caller from the `connection_init` payload:
/// `{"authorization": "Bearer <jwt>"}` or `{"token": "<jwt>"}`.
pub async fn connection_init(auth: Arc<dyn AuthProvider>, payload: Value) -> async_graphql::Result<Data> {
    let bearer = ["authorization", "Authorization", "token"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str));

    let mut data = Data::default();
    data.insert(Viewer::from_bearer(auth.as_ref(), bearer));
    Ok(data)
}

pub async fn graphql_ws(State(state): State<AppState>, protocol: GraphQLProtocol, upgrade: WebSocketUpgrade) -> Response {
    upgrade
        .protocols(ALL_WEBSOCKET_PROTOCOLS)
        .on_upgrade(move |stream| {
            let auth = state.auth.clone();
            GraphQLWebSocket::new(stream, state.schema.clone(), protocol)
                .on_connection_init(move |payload| connection_init(auth, payload))
                .serve()
        })
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
