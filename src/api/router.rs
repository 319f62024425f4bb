//! Portal API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Rate limiter → 2. Gate (auth / patient / doctor) → 3. Audit logger

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::middleware::from_fn;
use axum::routing::{get, patch, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the portal API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn portal_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let authenticated = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/auth/user", get(endpoints::auth::current_user))
        .route("/users/profile", get(endpoints::users::profile))
        .route("/users/:id", patch(endpoints::users::update))
        .route("/medical-staff", get(endpoints::medical_staff::list))
        .route(
            "/patients/download-data",
            get(endpoints::patients::download_data),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::get).patch(endpoints::patients::update),
        )
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/:id",
            patch(endpoints::appointments::update).delete(endpoints::appointments::delete),
        )
        .route("/health-metrics", post(endpoints::health_metrics::create))
        .route(
            "/health-metrics/patient/:id",
            get(endpoints::health_metrics::list),
        )
        .route(
            "/health-metrics/patient/:id/latest",
            get(endpoints::health_metrics::latest),
        )
        .route(
            "/health-metrics/patient/:id/summary",
            get(endpoints::health_metrics::summary),
        )
        .route(
            "/prescriptions/patient/:id",
            get(endpoints::prescriptions::list),
        )
        .route(
            "/prescriptions/patient/:id/active",
            get(endpoints::prescriptions::active),
        )
        .route("/device-alerts", post(endpoints::device_alerts::create))
        .route(
            "/device-alerts/patient/:id",
            get(endpoints::device_alerts::list),
        )
        .route(
            "/device-alerts/patient/:id/unread",
            get(endpoints::device_alerts::unread),
        )
        .route(
            "/device-alerts/patient/:id/unread-count",
            get(endpoints::device_alerts::unread_count),
        )
        .route(
            "/device-alerts/:id/read",
            patch(endpoints::device_alerts::mark_read),
        )
        .route(
            "/device-alerts/:id/resolve",
            patch(endpoints::device_alerts::resolve),
        )
        .route("/updates", post(endpoints::updates::create))
        .route("/updates/patient/:id", get(endpoints::updates::list))
        .route("/messages", post(endpoints::messages::send))
        .route("/messages/user/:id", get(endpoints::messages::for_user))
        .route(
            "/messages/conversation/:a/:b",
            get(endpoints::messages::conversation),
        )
        .route("/messages/:id/read", patch(endpoints::messages::mark_read))
        .route(
            "/support-requests",
            post(endpoints::support_requests::create),
        )
        .route(
            "/support-requests/patient/:id",
            get(endpoints::support_requests::list),
        )
        .route(
            "/timeline/patient/:id",
            get(endpoints::timeline::for_patient),
        )
        // Layers: bottom (innermost) to top (outermost).
        // `with_state` turns Router<ApiContext> into Router<()>.
        .with_state(ctx.clone())
        .layer(from_fn(middleware::audit::log_access))
        .layer(from_fn(middleware::auth::require_auth))
        .layer(from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let patient_only = Router::new()
        .route(
            "/prescriptions/:id/refill",
            post(endpoints::prescriptions::refill),
        )
        .with_state(ctx.clone())
        .layer(from_fn(middleware::audit::log_access))
        .layer(from_fn(middleware::auth::require_patient))
        .layer(from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let doctor_only = Router::new()
        .route("/patients", get(endpoints::patients::list))
        .route("/prescriptions", post(endpoints::prescriptions::create))
        .route("/prescriptions/:id", patch(endpoints::prescriptions::update))
        .route(
            "/support-requests/:id/status",
            patch(endpoints::support_requests::update_status),
        )
        .route(
            "/support-requests/:id/assign",
            patch(endpoints::support_requests::assign),
        )
        .with_state(ctx.clone())
        .layer(from_fn(middleware::audit::log_access))
        .layer(from_fn(middleware::auth::require_doctor))
        .layer(from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (rate-limited only, no session required)
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(from_fn(middleware::audit::log_access))
        .layer(from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    Router::new()
        .nest("/api", authenticated)
        .nest("/api", patient_only)
        .nest("/api", doctor_only)
        .nest("/api", public)
        .fallback(|| async { ApiError::NotFound("Route not found".into()) })
        .layer(security_headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{Request, Response, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::PortalConfig;
    use crate::crypto;
    use crate::db::seed::{self, SeedSummary, DEMO_DOCTOR_USERNAME, DEMO_PASSWORD, DEMO_PATIENT_USERNAME};
    use crate::db::*;
    use crate::models::*;

    const TEST_ITERATIONS: u32 = 1_000;

    fn client(last: u8) -> SocketAddr {
        SocketAddr::from(([198, 51, 100, last], 40_000))
    }

    fn test_app() -> (Router, Arc<CoreState>, SeedSummary) {
        let store = Arc::new(MemoryStore::new());
        let ids = seed::seed_demo_data(store.as_ref(), TEST_ITERATIONS, Utc::now()).unwrap();
        let config = PortalConfig {
            password_iterations: TEST_ITERATIONS,
            ..PortalConfig::default()
        };
        let core = Arc::new(CoreState::with_storage(store, config));
        (portal_router(core.clone()), core, ids)
    }

    /// Second patient account with no history.
    fn new_patient(core: &CoreState, username: &str) -> Patient {
        let user = core
            .storage()
            .create_user(InsertUser {
                username: username.into(),
                password_hash: crypto::hash_password("pw", TEST_ITERATIONS).unwrap(),
                first_name: "Jo".into(),
                last_name: "Lee".into(),
                email: None,
                role: UserRole::Patient,
            })
            .unwrap();
        core.storage()
            .create_patient(InsertPatient {
                user_id: user.id,
                ..Default::default()
            })
            .unwrap()
    }

    /// Request as if it arrived over a connection from `client(1)`.
    fn make_request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .extension(ConnectInfo(client(1)));
        if let Some(c) = cookie {
            builder = builder.header("Cookie", c);
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn response_json(response: Response<Body>) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Log in and return the `name=value` part of the session cookie.
    async fn login(app: &Router, username: &str) -> String {
        let req = make_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": DEMO_PASSWORD })),
        );
        let response = send(app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get("Set-Cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    // ── Public routes ──────────────────────────────────────────

    #[tokio::test]
    async fn health_is_public() {
        let (app, _, _) = test_app();
        let response = send(&app, make_request("GET", "/api/health", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("X-Content-Type-Options").unwrap(), "nosniff");
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn health_does_not_reveal_session_count() {
        let (app, _, _) = test_app();
        login(&app, DEMO_PATIENT_USERNAME).await;
        let response = send(&app, make_request("GET", "/api/health", None, None)).await;
        let json = response_json(response).await;
        assert!(json.get("activeSessions").is_none());
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let (app, _, _) = test_app();
        let response = send(&app, make_request("GET", "/api/nonexistent", None, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response_json(response).await["error"]["code"], "NOT_FOUND");
    }

    // ── Login / session ────────────────────────────────────────

    #[tokio::test]
    async fn gated_route_requires_session() {
        let (app, _, _) = test_app();
        let response = send(&app, make_request("GET", "/api/auth/user", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response_json(response).await["error"]["code"], "AUTH_REQUIRED");

        let forged = make_request("GET", "/api/auth/user", Some("portal_session=forged"), None);
        assert_eq!(send(&app, forged).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_then_current_user() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        assert!(cookie.starts_with("portal_session="));

        let response = send(&app, make_request("GET", "/api/auth/user", Some(&cookie), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
        let json = response_json(response).await;
        assert_eq!(json["id"], ids.patient_user_id);
        assert_eq!(json["username"], DEMO_PATIENT_USERNAME);
        assert!(json.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn wrong_password_sets_no_cookie() {
        let (app, core, _) = test_app();
        for username in [DEMO_PATIENT_USERNAME, "nobody"] {
            let req = make_request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": "wrong" })),
            );
            let response = send(&app, req).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(response.headers().get("Set-Cookie").is_none());
            assert_eq!(response_json(response).await["error"]["code"], "INVALID_CREDENTIALS");
        }
        assert!(core.read_sessions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_cookie_lifetime_matches_session_ttl() {
        let (app, core, _) = test_app();
        let req = make_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": DEMO_PATIENT_USERNAME, "password": DEMO_PASSWORD })),
        );
        let response = send(&app, req).await;
        let cookie = response.headers().get("Set-Cookie").unwrap().to_str().unwrap();
        let ttl = core.read_sessions().unwrap().ttl().as_secs();
        assert!(cookie.contains(&format!("Max-Age={ttl}")));
    }

    #[tokio::test]
    async fn logout_invalidates_session() {
        let (app, _, _) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;

        let response = send(&app, make_request("POST", "/api/auth/logout", Some(&cookie), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = response.headers().get("Set-Cookie").unwrap().to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let after = send(&app, make_request("GET", "/api/auth/user", Some(&cookie), None)).await;
        assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    }

    fn login_from(peer: SocketAddr, password: &str) -> Request<Body> {
        let mut req = make_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": DEMO_PATIENT_USERNAME, "password": password })),
        );
        req.extensions_mut().insert(ConnectInfo(peer));
        req
    }

    #[tokio::test]
    async fn login_is_rate_limited_per_client() {
        let (app, _, _) = test_app();

        for _ in 0..10 {
            let response = send(&app, login_from(client(4), "guess")).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        let blocked = send(&app, login_from(client(4), DEMO_PASSWORD)).await;
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(blocked.headers().contains_key("Retry-After"));

        // Another address is unaffected by the first one's failures.
        let other = send(&app, login_from(client(5), DEMO_PASSWORD)).await;
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_for_does_not_reset_login_limit() {
        let (app, _, _) = test_app();
        for _ in 0..10 {
            send(&app, login_from(client(6), "guess")).await;
        }

        let mut rotated = login_from(client(6), "guess");
        rotated
            .headers_mut()
            .insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.99"));
        assert_eq!(send(&app, rotated).await.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn malformed_login_body_is_bad_request() {
        let (app, _, _) = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("Content-Type", "application/json")
            .body(Body::from("{\"username\":"))
            .unwrap();
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    // ── Role gates and ownership ───────────────────────────────

    #[tokio::test]
    async fn role_gates_are_independent() {
        let (app, _, _) = test_app();
        let patient = login(&app, DEMO_PATIENT_USERNAME).await;
        let doctor = login(&app, DEMO_DOCTOR_USERNAME).await;

        let req = make_request("GET", "/api/patients", Some(&patient), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);
        let req = make_request("GET", "/api/patients", Some(&doctor), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);

        let req = make_request("POST", "/api/prescriptions/1/refill", Some(&doctor), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn download_data_scoped_by_patient_id() {
        let (app, core, ids) = test_app();
        let patient = login(&app, DEMO_PATIENT_USERNAME).await;
        let doctor = login(&app, DEMO_DOCTOR_USERNAME).await;
        let other = new_patient(&core, "jo");
        let own = format!("/api/patients/download-data?patientId={}", ids.patient_id);
        let foreign = format!("/api/patients/download-data?patientId={}", other.id);

        let req = make_request("GET", "/api/patients/download-data", Some(&patient), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);
        let req = make_request("GET", &own, Some(&patient), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);
        let req = make_request("GET", &foreign, Some(&patient), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = make_request("GET", "/api/patients/download-data", Some(&doctor), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
        let req = make_request("GET", &foreign, Some(&doctor), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);

        let req = make_request("GET", "/api/patients/download-data?patientId=abc", Some(&doctor), None);
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(response).await["error"]["code"], "BAD_REQUEST");

        let req = make_request("GET", "/api/patients/download-data", None, None);
        assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn patient_cannot_read_another_patients_metrics() {
        let (app, core, _) = test_app();
        let other = new_patient(&core, "other");

        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let uri = format!("/api/health-metrics/patient/{}", other.id);
        let response = send(&app, make_request("GET", &uri, Some(&cookie), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response_json(response).await["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let (app, _, _) = test_app();
        let cookie = login(&app, DEMO_DOCTOR_USERNAME).await;
        let req = make_request("GET", "/api/health-metrics/patient/abc", Some(&cookie), None);
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    // ── Profile / patients ─────────────────────────────────────

    #[tokio::test]
    async fn profile_carries_role_record() {
        let (app, _, ids) = test_app();
        let patient = login(&app, DEMO_PATIENT_USERNAME).await;
        let json = response_json(
            send(&app, make_request("GET", "/api/users/profile", Some(&patient), None)).await,
        )
        .await;
        assert_eq!(json["patient"]["id"], ids.patient_id);
        assert!(json.get("medicalStaff").is_none());

        let doctor = login(&app, DEMO_DOCTOR_USERNAME).await;
        let json = response_json(
            send(&app, make_request("GET", "/api/users/profile", Some(&doctor), None)).await,
        )
        .await;
        assert_eq!(json["medicalStaff"]["id"], ids.staff_id);
        assert!(json.get("patient").is_none());
    }

    #[tokio::test]
    async fn patient_patch_blanks_to_null_and_ignores_unknown_keys() {
        let (app, core, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let uri = format!("/api/patients/{}", ids.patient_id);
        let req = make_request(
            "PATCH",
            &uri,
            Some(&cookie),
            Some(json!({ "phone": "", "address": "12 Elm St", "favouriteColour": "blue" })),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert!(json["phone"].is_null());
        assert_eq!(json["address"], "12 Elm St");
        assert!(json.get("favouriteColour").is_none());

        let stored = core.storage().get_patient(ids.patient_id).unwrap().unwrap();
        assert!(stored.phone.is_none());
    }

    #[tokio::test]
    async fn user_can_only_patch_self() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;

        let uri = format!("/api/users/{}", ids.doctor_user_id);
        let req = make_request("PATCH", &uri, Some(&cookie), Some(json!({ "firstName": "X" })));
        assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);

        let uri = format!("/api/users/{}", ids.patient_user_id);
        let req = make_request("PATCH", &uri, Some(&cookie), Some(json!({ "firstName": "Sam" })));
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["firstName"], "Sam");
    }

    #[tokio::test]
    async fn csv_download_headers() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let response = send(
            &app,
            make_request("GET", "/api/patients/download-data", Some(&cookie), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/csv; charset=utf-8"
        );
        let disposition = response
            .headers()
            .get("Content-Disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains(&format!("patient-{}-data.csv", ids.patient_id)));

        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("Patient\r\n"));
        assert!(text.contains("Device Alerts\r\n"));
    }

    // ── Device alerts ──────────────────────────────────────────

    #[tokio::test]
    async fn alert_lifecycle_end_to_end() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let pid = ids.patient_id;

        let req = make_request(
            "POST",
            "/api/device-alerts",
            Some(&cookie),
            Some(json!({
                "patientId": pid,
                "alertType": "error",
                "severity": "high",
                "message": "Actuator stalled"
            })),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let alert_id = response_json(response).await["id"].as_i64().unwrap();

        let unread_uri = format!("/api/device-alerts/patient/{pid}/unread");
        let unread = response_json(send(&app, make_request("GET", &unread_uri, Some(&cookie), None)).await).await;
        assert!(unread.as_array().unwrap().iter().any(|a| a["id"] == alert_id));

        let resolve_uri = format!("/api/device-alerts/{alert_id}/resolve");
        let req = make_request("PATCH", &resolve_uri, Some(&cookie), Some(json!({ "resolutionNotes": "fixed" })));
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);

        let unread = response_json(send(&app, make_request("GET", &unread_uri, Some(&cookie), None)).await).await;
        assert!(!unread.as_array().unwrap().iter().any(|a| a["id"] == alert_id));

        let all_uri = format!("/api/device-alerts/patient/{pid}");
        let all = response_json(send(&app, make_request("GET", &all_uri, Some(&cookie), None)).await).await;
        let resolved = all
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["id"] == alert_id)
            .unwrap();
        assert_eq!(resolved["isResolved"], true);
        assert_eq!(resolved["isRead"], true);
        assert_eq!(resolved["resolutionNotes"], "fixed");

        // Resolved is terminal
        let req = make_request("PATCH", &resolve_uri, Some(&cookie), Some(json!({ "resolutionNotes": "again" })));
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response_json(response).await["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn unread_count_matches_unread_list() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let pid = ids.patient_id;

        let list_uri = format!("/api/device-alerts/patient/{pid}/unread");
        let unread = response_json(send(&app, make_request("GET", &list_uri, Some(&cookie), None)).await).await;
        let count_uri = format!("/api/device-alerts/patient/{pid}/unread-count");
        let count = response_json(send(&app, make_request("GET", &count_uri, Some(&cookie), None)).await).await;
        assert_eq!(count["unreadCount"], unread.as_array().unwrap().len());

        let first = unread[0]["id"].as_i64().unwrap();
        let req = make_request("PATCH", &format!("/api/device-alerts/{first}/read"), Some(&cookie), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);

        let after = response_json(send(&app, make_request("GET", &count_uri, Some(&cookie), None)).await).await;
        assert_eq!(
            after["unreadCount"].as_u64().unwrap() + 1,
            count["unreadCount"].as_u64().unwrap()
        );
    }

    #[tokio::test]
    async fn alert_with_unknown_severity_is_bad_request() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let req = make_request(
            "POST",
            "/api/device-alerts",
            Some(&cookie),
            Some(json!({
                "patientId": ids.patient_id,
                "alertType": "error",
                "severity": "catastrophic",
                "message": "x"
            })),
        );
        assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    // ── Appointments ───────────────────────────────────────────

    #[tokio::test]
    async fn appointment_moves_from_upcoming_to_past() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;

        let req = make_request(
            "POST",
            "/api/appointments",
            Some(&cookie),
            Some(json!({
                "patientId": ids.patient_id,
                "doctorId": ids.staff_id,
                "title": "Gait review",
                "dateTime": Utc::now() + Duration::days(1),
            })),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = response_json(response).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["isPast"], false);
        assert_eq!(created["doctor"]["username"], DEMO_DOCTOR_USERNAME);

        let upcoming = response_json(
            send(&app, make_request("GET", "/api/appointments?when=upcoming", Some(&cookie), None)).await,
        )
        .await;
        assert!(upcoming.as_array().unwrap().iter().any(|a| a["id"] == id));

        let req = make_request(
            "PATCH",
            &format!("/api/appointments/{id}"),
            Some(&cookie),
            Some(json!({ "status": "completed" })),
        );
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);

        let upcoming = response_json(
            send(&app, make_request("GET", "/api/appointments?when=upcoming", Some(&cookie), None)).await,
        )
        .await;
        assert!(!upcoming.as_array().unwrap().iter().any(|a| a["id"] == id));
        let past = response_json(
            send(&app, make_request("GET", "/api/appointments?when=past", Some(&cookie), None)).await,
        )
        .await;
        assert!(past.as_array().unwrap().iter().any(|a| a["id"] == id));
    }

    #[tokio::test]
    async fn illegal_status_transition_is_bad_request() {
        let (app, _, _) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let all = response_json(send(&app, make_request("GET", "/api/appointments", Some(&cookie), None)).await).await;
        let cancelled = all
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["status"] == "cancelled")
            .unwrap()["id"]
            .as_i64()
            .unwrap();

        let req = make_request(
            "PATCH",
            &format!("/api/appointments/{cancelled}"),
            Some(&cookie),
            Some(json!({ "status": "scheduled" })),
        );
        assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn doctor_sees_appointments_booked_with_them() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_DOCTOR_USERNAME).await;
        let all = response_json(send(&app, make_request("GET", "/api/appointments", Some(&cookie), None)).await).await;
        let all = all.as_array().unwrap();
        assert!(!all.is_empty());
        assert!(all.iter().all(|a| a["doctorId"] == ids.staff_id));
    }

    #[tokio::test]
    async fn delete_appointment() {
        let (app, core, _) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let all = response_json(send(&app, make_request("GET", "/api/appointments", Some(&cookie), None)).await).await;
        let id = all[0]["id"].as_i64().unwrap();

        let req = make_request("DELETE", &format!("/api/appointments/{id}"), Some(&cookie), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::NO_CONTENT);
        assert!(core.storage().get_appointment(id).unwrap().is_none());

        let req = make_request("DELETE", &format!("/api/appointments/{id}"), Some(&cookie), None);
        assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    // ── Health metrics ─────────────────────────────────────────

    #[tokio::test]
    async fn latest_metric_and_range_validation() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let pid = ids.patient_id;

        let req = make_request(
            "POST",
            "/api/health-metrics",
            Some(&cookie),
            Some(json!({
                "patientId": pid,
                "mobilityScore": 88,
                "phantomPainScore": 1,
                "sensorSensitivity": 90,
                "stepCount": 8000,
                "gaitStability": 85
            })),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created_id = response_json(response).await["id"].clone();

        let latest = response_json(
            send(&app, make_request("GET", &format!("/api/health-metrics/patient/{pid}/latest"), Some(&cookie), None)).await,
        )
        .await;
        assert_eq!(latest["id"], created_id);

        let summary = response_json(
            send(&app, make_request("GET", &format!("/api/health-metrics/patient/{pid}/summary"), Some(&cookie), None)).await,
        )
        .await;
        assert_eq!(summary["latest"]["id"], created_id);
        assert!(summary["mobilityChange"].is_i64());

        let req = make_request(
            "POST",
            "/api/health-metrics",
            Some(&cookie),
            Some(json!({
                "patientId": pid,
                "mobilityScore": 88,
                "phantomPainScore": 11,
                "sensorSensitivity": 90,
                "stepCount": 8000,
                "gaitStability": 85
            })),
        );
        assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn latest_metric_of_empty_patient_is_404() {
        let (app, core, _) = test_app();
        let empty = new_patient(&core, "fresh");

        let cookie = login(&app, DEMO_DOCTOR_USERNAME).await;
        let uri = format!("/api/health-metrics/patient/{}/latest", empty.id);
        assert_eq!(
            send(&app, make_request("GET", &uri, Some(&cookie), None)).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    // ── Prescriptions ──────────────────────────────────────────

    #[tokio::test]
    async fn refill_appends_note_and_update() {
        let (app, core, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let pid = ids.patient_id;

        let active = response_json(
            send(&app, make_request("GET", &format!("/api/prescriptions/patient/{pid}/active"), Some(&cookie), None)).await,
        )
        .await;
        let rx = &active.as_array().unwrap()[0];
        let rx_id = rx["id"].as_i64().unwrap();
        let refills_before = rx["refillsRemaining"].clone();
        let updates_before = core.storage().list_patient_updates(pid).unwrap().len();

        let req = make_request("POST", &format!("/api/prescriptions/{rx_id}/refill"), Some(&cookie), None);
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = response_json(response).await;
        assert_eq!(outcome["prescription"]["refillsRemaining"], refills_before);
        assert!(outcome["prescription"]["notes"].as_str().unwrap().contains("Refill requested"));
        assert_eq!(outcome["update"]["updateType"], "prescription_change");
        assert_eq!(core.storage().list_patient_updates(pid).unwrap().len(), updates_before + 1);
    }

    #[tokio::test]
    async fn only_doctors_prescribe() {
        let (app, _, ids) = test_app();
        let body = json!({
            "patientId": ids.patient_id,
            "doctorId": ids.staff_id,
            "medicationName": "Ibuprofen",
            "dosage": "200mg",
            "frequency": "As needed"
        });

        let patient = login(&app, DEMO_PATIENT_USERNAME).await;
        let req = make_request("POST", "/api/prescriptions", Some(&patient), Some(body.clone()));
        assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);

        let doctor = login(&app, DEMO_DOCTOR_USERNAME).await;
        let req = make_request("POST", "/api/prescriptions", Some(&doctor), Some(body));
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response_json(response).await["isActive"], true);
    }

    // ── Messages ───────────────────────────────────────────────

    #[tokio::test]
    async fn messaging_scoped_to_participants() {
        let (app, _, ids) = test_app();
        let patient = login(&app, DEMO_PATIENT_USERNAME).await;
        let doctor = login(&app, DEMO_DOCTOR_USERNAME).await;

        let req = make_request(
            "POST",
            "/api/messages",
            Some(&patient),
            Some(json!({ "receiverId": ids.doctor_user_id, "content": "Socket feels loose" })),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let message = response_json(response).await;
        assert_eq!(message["senderId"], ids.patient_user_id);
        let message_id = message["id"].as_i64().unwrap();

        let uri = format!("/api/messages/conversation/{}/{}", ids.patient_user_id, ids.doctor_user_id);
        let thread = response_json(send(&app, make_request("GET", &uri, Some(&doctor), None)).await).await;
        assert_eq!(thread.as_array().unwrap().last().unwrap()["id"], message_id);

        let uri = format!("/api/messages/user/{}", ids.doctor_user_id);
        assert_eq!(
            send(&app, make_request("GET", &uri, Some(&patient), None)).await.status(),
            StatusCode::FORBIDDEN
        );

        let read_uri = format!("/api/messages/{message_id}/read");
        assert_eq!(
            send(&app, make_request("PATCH", &read_uri, Some(&patient), None)).await.status(),
            StatusCode::FORBIDDEN
        );
        let response = send(&app, make_request("PATCH", &read_uri, Some(&doctor), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["isRead"], true);
    }

    // ── Support requests ───────────────────────────────────────

    #[tokio::test]
    async fn support_request_workflow() {
        let (app, _, ids) = test_app();
        let patient = login(&app, DEMO_PATIENT_USERNAME).await;
        let doctor = login(&app, DEMO_DOCTOR_USERNAME).await;

        let req = make_request(
            "POST",
            "/api/support-requests",
            Some(&patient),
            Some(json!({
                "patientId": ids.patient_id,
                "subject": "Charger broken",
                "description": "The cable frays at the plug",
                "priority": "high"
            })),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let ticket = response_json(response).await;
        assert_eq!(ticket["status"], "open");
        let id = ticket["id"].as_i64().unwrap();

        let assign_uri = format!("/api/support-requests/{id}/assign");
        let req = make_request("PATCH", &assign_uri, Some(&patient), Some(json!({ "staffId": ids.staff_id })));
        assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = make_request("PATCH", &assign_uri, Some(&doctor), Some(json!({ "staffId": ids.staff_id })));
        let assigned = response_json(send(&app, req).await).await;
        assert_eq!(assigned["assignedTo"], ids.staff_id);
        assert_eq!(assigned["status"], "in_progress");

        let req = make_request(
            "PATCH",
            &format!("/api/support-requests/{id}/status"),
            Some(&doctor),
            Some(json!({ "status": "resolved" })),
        );
        assert_eq!(response_json(send(&app, req).await).await["status"], "resolved");
    }

    // ── Timeline ───────────────────────────────────────────────

    #[tokio::test]
    async fn timeline_filters_and_limits() {
        let (app, _, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        let base = format!("/api/timeline/patient/{}", ids.patient_id);

        let full = response_json(send(&app, make_request("GET", &base, Some(&cookie), None)).await).await;
        let events = full["events"].as_array().unwrap();
        let dates: Vec<&str> = events.iter().map(|e| e["date"].as_str().unwrap()).collect();
        let parsed: Vec<chrono::DateTime<Utc>> = dates.iter().map(|d| d.parse().unwrap()).collect();
        assert!(parsed.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(full["eventCounts"]["healthMetrics"], seed::SAMPLE_METRIC_WEEKS);

        let uri = format!("{base}?types=device_alert,update&limit=2");
        let filtered = response_json(send(&app, make_request("GET", &uri, Some(&cookie), None)).await).await;
        let events = filtered["events"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| e["eventType"] == "device_alert" || e["eventType"] == "update"));
        assert_eq!(filtered["eventCounts"], full["eventCounts"]);

        let uri = format!("{base}?types=lab_result");
        assert_eq!(
            send(&app, make_request("GET", &uri, Some(&cookie), None)).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    // ── Audit ──────────────────────────────────────────────────

    #[tokio::test]
    async fn gated_requests_are_audited_with_user() {
        let (app, core, ids) = test_app();
        let cookie = login(&app, DEMO_PATIENT_USERNAME).await;
        send(&app, make_request("GET", "/api/auth/user", Some(&cookie), None)).await;

        let entries = core.audit_entries();
        let entry = entries
            .iter()
            .find(|e| e.action == "GET /api/auth/user")
            .unwrap();
        assert_eq!(entry.user_id, Some(ids.patient_user_id));
        assert_eq!(entry.status, 200);
    }
}
