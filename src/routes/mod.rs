pub mod archive;
pub mod claims;
pub mod conversions;
pub mod deliveries;
pub mod requests;

use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::require_auth;
use crate::state::AppState;

/// Every route here sits behind the JWT check.
pub fn create_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(requests::routes())
        .merge(claims::routes())
        .merge(conversions::routes())
        .merge(deliveries::routes())
        .merge(archive::routes())
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// The full application under `/dispatch`, with the public root and health
/// endpoints alongside the protected API.
pub fn app(state: AppState) -> Router {
    let api = create_router(state.clone())
        .route("/", get(|| async { "Supply Dispatch API" }))
        .route("/health", get(health_check));

    Router::new()
        .nest("/dispatch", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::jwt::sign_token;
    use crate::services::test_support::{Fixture, BRANCH_ID};

    fn token(id: i64, role: &str, name: &str, branch_id: Option<i64>) -> String {
        sign_token(id, role, name, branch_id, "test-secret").unwrap()
    }

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    fn new_request_body() -> Value {
        json!({
            "items": [
                { "item_code": "RICE", "description": "Rice", "quantity": 3, "unit": "box", "unit_price": "10" },
                { "item_code": "SOAP", "description": "Soap", "quantity": 2, "unit": "bar", "unit_price": "5" }
            ],
            "total_amount": "999"
        })
    }

    #[tokio::test]
    async fn health_is_public_and_api_needs_a_token() {
        let app = super::app(Fixture::new().state);

        let (status, body) = send(&app, Method::GET, "/dispatch/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("OK"));

        let (status, body) = send(&app, Method::GET, "/dispatch/requests", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "Unauthorized");

        let forged = sign_token(1, "admin", "root", None, "wrong-secret").unwrap();
        let (status, _) = send(&app, Method::GET, "/dispatch/requests", Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_to_delivery_over_http() {
        let app = super::app(Fixture::new().state);
        let branch = token(7, "branch", "north", Some(BRANCH_ID));
        let admin = token(1, "admin", "root", None);
        let ana = token(11, "warehouse", "ana", None);
        let ben = token(12, "warehouse", "ben", None);

        let (status, created) = send(&app, Method::POST, "/dispatch/requests", Some(&branch), Some(new_request_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "pending");
        assert_eq!(created["total_amount"], "40.00");
        let id = created["id"].as_i64().unwrap();

        // Branch users cannot claim, and pending requests cannot be converted.
        let claim_uri = format!("/dispatch/requests/{id}/claim");
        let (status, _) = send(&app, Method::POST, &claim_uri, Some(&branch), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let begin_uri = format!("/dispatch/requests/{id}/conversion/begin");
        let (status, body) = send(&app, Method::POST, &begin_uri, Some(&ana), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "InvalidState");

        let approve = json!({ "entity_kind": "request", "id": id, "new_status": "approved" });
        let (status, approved) = send(&app, Method::POST, "/dispatch/transition-status", Some(&admin), Some(approve)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "approved");

        let (status, draft) = send(&app, Method::POST, &begin_uri, Some(&ana), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(draft["delivery"]["recipient_name"], "North Branch");
        assert_eq!(draft["claim"]["holder"], "ana");

        let (status, busy) = send(&app, Method::POST, &claim_uri, Some(&ben), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(busy["kind"], "Busy");
        assert_eq!(busy["holder"], "ana");
        assert_eq!(busy["holder_id"], 11);

        let commit_uri = format!("/dispatch/requests/{id}/conversion/commit");
        let (status, _) = send(&app, Method::POST, &commit_uri, Some(&ben), Some(draft["delivery"].clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, delivery) = send(&app, Method::POST, &commit_uri, Some(&ana), Some(draft["delivery"].clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(delivery["status"], "pending");
        assert_eq!(delivery["request_id"], id);

        let (_, request) = send(&app, Method::GET, &format!("/dispatch/requests/{id}"), Some(&branch), None).await;
        assert_eq!(request["status"], "processing");
        assert_eq!(request["delivery_id"], delivery["id"]);

        let (_, claim) = send(&app, Method::GET, &claim_uri, Some(&ben), None).await;
        assert_eq!(claim["held"], false);
    }

    #[tokio::test]
    async fn branch_users_cannot_read_other_branches_claims() {
        let app = super::app(Fixture::new().state);
        let north = token(7, "branch", "north", Some(BRANCH_ID));
        let south = token(8, "branch", "south", Some(BRANCH_ID + 1));
        let wes = token(2, "warehouse", "wes", None);

        let (_, created) = send(&app, Method::POST, "/dispatch/requests", Some(&north), Some(new_request_body())).await;
        let id = created["id"].as_i64().unwrap();
        let claim_uri = format!("/dispatch/requests/{id}/claim");

        let (status, _) = send(&app, Method::GET, &claim_uri, Some(&north), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, Method::GET, &claim_uri, Some(&south), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "Forbidden");
        let (status, _) = send(&app, Method::GET, &claim_uri, Some(&wes), None).await;
        assert_eq!(status, StatusCode::OK);

        let eligibility = format!("/dispatch/archive/eligibility?entity_kind=request&id={id}");
        let (status, _) = send(&app, Method::GET, &eligibility, Some(&south), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, check) = send(&app, Method::GET, &eligibility, Some(&wes), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(check["archivable"], false);
    }

    #[tokio::test]
    async fn oversized_prices_are_rejected_not_crashed() {
        let app = super::app(Fixture::new().state);
        let north = token(7, "branch", "north", Some(BRANCH_ID));
        let body = json!({
            "items": [{ "item_code": "GOLD", "quantity": 2, "unit": "bar", "unit_price": "79228162514264337593543950335" }]
        });

        let (status, body) = send(&app, Method::POST, "/dispatch/requests", Some(&north), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "ValidationError");
    }

    #[tokio::test]
    async fn archive_endpoints_enforce_policy_and_roles() {
        let app = super::app(Fixture::new().state);
        let admin = token(1, "admin", "root", None);
        let wes = token(2, "warehouse", "wes", None);

        let body = json!({
            "branch_id": BRANCH_ID,
            "recipient_name": "Pier 4",
            "recipient_address": "Harbor Rd",
            "package_description": "pallets",
            "scheduled_date": "2026-03-20"
        });
        let (status, delivery) = send(&app, Method::POST, "/dispatch/deliveries", Some(&wes), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = delivery["id"].as_i64().unwrap();

        let eligibility = format!("/dispatch/archive/eligibility?entity_kind=delivery&id={id}");
        let (_, check) = send(&app, Method::GET, &eligibility, Some(&wes), None).await;
        assert_eq!(check["archivable"], false);

        let archive = json!({ "entity_kind": "delivery", "id": id });
        let (status, body) = send(&app, Method::POST, "/dispatch/archive", Some(&wes), Some(archive.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "ArchiveForbidden");

        let (status, advanced) = send(&app, Method::POST, &format!("/dispatch/deliveries/{id}/advance"), Some(&wes), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(advanced["status"], "preparing");

        let cancel = json!({ "entity_kind": "delivery", "id": id, "new_status": "cancelled" });
        let (status, _) = send(&app, Method::POST, "/dispatch/transition-status", Some(&wes), Some(cancel)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::POST, "/dispatch/archive", Some(&wes), Some(archive)).await;
        assert_eq!(status, StatusCode::OK);
        let (_, archived) = send(&app, Method::GET, "/dispatch/deliveries?archived=true", Some(&wes), None).await;
        assert_eq!(archived.as_array().map(Vec::len), Some(1));

        let (status, _) = send(&app, Method::DELETE, "/dispatch/archive?confirm=true", Some(&wes), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = send(&app, Method::DELETE, "/dispatch/archive", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "ValidationError");
        let (status, counts) = send(&app, Method::DELETE, "/dispatch/archive?confirm=true", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(counts, json!({ "requests": 0, "deliveries": 1 }));
    }
}
