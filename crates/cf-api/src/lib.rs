//! # cf-api
//!
//! The GraphQL surface of Connectify, served over axum.

pub mod bus;
pub mod graphql;
pub mod handlers;
pub mod middleware;

use axum::routing::get;
use axum::Router;

pub use bus::BroadcastBus;
pub use graphql::{build_schema, ConnectifySchema, Services, Viewer};
pub use handlers::AppState;

/// Builds the HTTP router.
///
/// # Developer Note
/// `GET /graphql` serves GraphiQL; queries and mutations are `POST /graphql`
/// and subscriptions use `GET /ws`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", get(handlers::graphiql).post(handlers::graphql_handler))
        .route("/ws", get(handlers::graphql_ws))
        .route("/health", get(handlers::health))
        .layer(middleware::cors_policy())
        .layer(middleware::propagate_request_id())
        .layer(middleware::standard_middleware())
        .layer(middleware::set_request_id())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cf_core::{MockAuthProvider, MockMailer, MockPostRepo, MockUserRepo, RetryPolicy};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let bus = BroadcastBus::new(16);
        let auth = Arc::new(MockAuthProvider::new());
        let services = Services::new(
            Arc::new(MockUserRepo::new()),
            Arc::new(MockPostRepo::new()),
            auth.clone(),
            Arc::new(MockMailer::new()),
            Arc::new(bus.clone()),
            RetryPolicy::default(),
        );
        router(AppState {
            schema: build_schema(services, bus),
            auth,
        })
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_anonymous_me_is_unauthenticated() {
        let request = Request::post("/graphql")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"query":"{ me { id } }"}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    }
}
