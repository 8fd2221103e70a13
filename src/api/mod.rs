//! HTTP surface: the edge gate wrapped around the served application, plus
//! the ungated `/health` endpoint.

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod gate;
pub(crate) mod handlers;
pub mod identity;

pub use gate::GateState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Put `content` behind the gate. Every route and the fallback of `content`
/// are covered; static assets pass straight through.
#[must_use]
pub fn gated(content: Router, gate: GateState) -> Router {
    content.layer(middleware::from_fn_with_state(gate, gate::enforce))
}

/// Full application router: `/health` plus the gated content, with request
/// ids and tracing spans on every request.
#[must_use]
pub fn router(content: Router, gate: GateState) -> Router {
    Router::new()
        .route("/health", get(handlers::health).options(handlers::health))
        .merge(gated(content, gate))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, app: Router) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::access::Session;
    use crate::api::identity::{
        IdentityError, IdentityProvider, ResolveFuture, StaticIdentityProvider,
    };
    use axum::{
        body::to_bytes,
        http::{
            header::{HOST, LOCATION},
            HeaderMap, StatusCode,
        },
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tower::ServiceExt;

    /// Counts lookups so tests can assert when the provider is consulted.
    struct CountingProvider {
        session: Session,
        calls: AtomicUsize,
    }

    impl IdentityProvider for CountingProvider {
        fn resolve<'a>(&'a self, _headers: &'a HeaderMap) -> ResolveFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let session = self.session.clone();
            Box::pin(async move { Ok(session) })
        }
    }

    struct FailingProvider;

    impl IdentityProvider for FailingProvider {
        fn resolve<'a>(&'a self, _headers: &'a HeaderMap) -> ResolveFuture<'a> {
            Box::pin(async move {
                Err(IdentityError::Status(StatusCode::BAD_GATEWAY))
            })
        }
    }

    fn content() -> Router {
        Router::new()
            .route("/dashboard", get(|| async { "dashboard" }))
            .route("/onboarding", get(|| async { "onboarding" }))
            .route("/sign-in", get(|| async { "sign in" }))
            .route("/api/webhooks/identity", get(|| async { "webhook" }))
            .fallback(|| async { "page" })
    }

    fn app(session: Session) -> Router {
        let gate = GateState::new(Arc::new(StaticIdentityProvider::new(session)));
        router(content(), gate)
    }

    async fn get_path(app: Router, path: &str) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .uri(path)
                .header(HOST, "fleet.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn public_route_passes_without_session() {
        let response = get_path(app(Session::anonymous()), "/sign-in").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "sign in");
    }

    #[tokio::test]
    async fn public_route_skips_identity_provider() {
        let provider = Arc::new(CountingProvider {
            session: Session::anonymous(),
            calls: AtomicUsize::new(0),
        });
        let gate = GateState::new(provider.clone());
        let app = router(content(), gate);

        let response = get_path(app.clone(), "/api/webhooks/identity").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let response = get_path(app, "/dashboard").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn anonymous_is_sent_to_sign_in() {
        let response = get_path(app(Session::anonymous()), "/dashboard").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "https://fleet.example.com/sign-in");
    }

    #[tokio::test]
    async fn anonymous_on_onboarding_is_sent_to_sign_in() {
        let response = get_path(app(Session::anonymous()), "/onboarding").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "https://fleet.example.com/sign-in");
    }

    #[tokio::test]
    async fn provider_failure_is_treated_as_signed_out() {
        let gate = GateState::new(Arc::new(FailingProvider));
        let response = get_path(router(content(), gate), "/dashboard").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "https://fleet.example.com/sign-in");
    }

    #[tokio::test]
    async fn signed_in_without_org_is_sent_to_onboarding() {
        let app = app(Session::signed_in("user_1", None));

        let response = get_path(app.clone(), "/dashboard").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "https://fleet.example.com/onboarding");

        let response = get_path(app, "/onboarding").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "onboarding");
    }

    #[tokio::test]
    async fn onboarded_user_is_sent_home_from_onboarding() {
        let app = app(Session::signed_in("user_1", Some("org_1".to_string())));

        let response = get_path(app.clone(), "/onboarding/step-2").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "https://fleet.example.com/");

        let response = get_path(app.clone(), "/dashboard").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "dashboard");

        let response = get_path(app, "/master/vehicles").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "page");
    }

    #[tokio::test]
    async fn static_assets_bypass_gate() {
        let provider = Arc::new(CountingProvider {
            session: Session::anonymous(),
            calls: AtomicUsize::new(0),
        });
        let app = router(content(), GateState::new(provider.clone()));

        for path in ["/_next/static/app.js", "/favicon.ico", "/img/truck.png"] {
            let response = get_path(app.clone(), path).await;
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn health_is_not_gated() {
        let response = get_path(app(Session::anonymous()), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-app"));
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        let body: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let response = app(Session::anonymous())
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .header(REQUEST_ID_HEADER, "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("req-123")
        );
        assert_eq!(location(&response), "/sign-in");
    }

    #[tokio::test]
    async fn signed_in_bounce_is_opt_in() {
        let session = Session::signed_in("user_1", Some("org_1".to_string()));

        let response = get_path(app(session.clone()), "/sign-in").await;
        assert_eq!(response.status(), StatusCode::OK);

        let gate = GateState::new(Arc::new(StaticIdentityProvider::new(session)))
            .with_redirect_signed_in(true);
        let app = router(content(), gate);

        let response = get_path(app.clone(), "/sign-in").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "https://fleet.example.com/");

        let response = get_path(app, "/api/webhooks/identity").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_in_bounce_without_org_goes_to_onboarding() {
        let gate = GateState::new(Arc::new(StaticIdentityProvider::new(Session::signed_in(
            "user_1", None,
        ))))
        .with_redirect_signed_in(true)
        .with_default_scheme("http".to_string());
        let response = get_path(router(content(), gate), "/sign-up").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "http://fleet.example.com/onboarding");
    }

    #[tokio::test]
    async fn forwarded_host_is_ignored_unless_trusted() {
        let request = || {
            Request::builder()
                .uri("/dashboard")
                .header(HOST, "fleet.example.com")
                .header("x-forwarded-host", "evil.example")
                .body(Body::empty())
                .unwrap()
        };

        let response = app(Session::anonymous()).oneshot(request()).await.unwrap();
        assert_eq!(location(&response), "https://fleet.example.com/sign-in");

        let gate = GateState::new(Arc::new(StaticIdentityProvider::new(Session::anonymous())))
            .with_trust_forwarded_headers(true);
        let response = router(content(), gate).oneshot(request()).await.unwrap();
        assert_eq!(location(&response), "https://evil.example/sign-in");
    }
}
