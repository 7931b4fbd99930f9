//! Integration tests: build the router over an in-memory directory and drive
//! it request by request.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use warden_api::{AppState, router};
use warden_core::auth::gate::ADMIN_ROLE;
use warden_core::auth::jwt::{TokenConfig, TokenService};
use warden_core::auth::password::CredentialHasher;
use warden_core::directory::{Directory, MemoryDirectory, seed_default_roles};

struct TestApp {
    app: Router,
    directory: Arc<MemoryDirectory>,
    tokens: Arc<TokenService>,
}

async fn test_app() -> TestApp {
    let directory = Arc::new(MemoryDirectory::new());
    seed_default_roles(directory.as_ref()).await.unwrap();
    let tokens = Arc::new(TokenService::new(TokenConfig::new("integration-secret")).unwrap());

    let state = AppState {
        directory: directory.clone(),
        tokens: tokens.clone(),
        hasher: CredentialHasher::new(4).unwrap(),
    };

    TestApp {
        app: router(state),
        directory,
        tokens,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(request).await.expect("request");
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("parse JSON")
        };
        (status, json)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    /// Register and return `(user id, access token, refresh token)`.
    async fn register(&self, email: &str, name: &str) -> (String, String, String) {
        let (status, json) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "password123", "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        let data = &json["data"];
        (
            data["user"]["id"].as_str().unwrap().to_string(),
            data["access_token"].as_str().unwrap().to_string(),
            data["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    async fn login(&self, email: &str) -> String {
        let (status, json) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        json["data"]["access_token"].as_str().unwrap().to_string()
    }

    async fn promote(&self, user_id: &str) {
        let id = user_id.parse().unwrap();
        let admin = self.directory.ensure_role(ADMIN_ROLE).await.unwrap();
        self.directory.assign_role(id, &admin).await.unwrap();
    }

    /// A registered user holding `admin`, with a token issued after promotion.
    async fn admin(&self) -> String {
        let (id, _, _) = self.register("root@example.com", "Root").await;
        self.promote(&id).await;
        self.login("root@example.com").await
    }
}

#[tokio::test]
async fn health_is_bare_ok() {
    let t = test_app().await;
    let (status, json) = t.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "status": "ok" }));
}

#[tokio::test]
async fn register_login_profile_and_promotion() {
    let t = test_app().await;

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "alice@example.com",
                "password": "password123",
                "name": "Alice",
                "city": "Lisbon"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let user = &json["data"]["user"];
    assert_eq!(user["roles"], json!(["user"]));
    assert_eq!(user["city"], "Lisbon");
    assert_eq!(user["email_verified"], false);
    assert!(user.get("password_hash").is_none());
    assert!(user.get("password").is_none());
    let alice_id = user["id"].as_str().unwrap().to_string();
    let first_token = json["data"]["access_token"].as_str().unwrap().to_string();

    let token = t.login("alice@example.com").await;

    let (status, json) = t.call(Method::GET, "/api/profile", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["email"], "alice@example.com");
    assert_eq!(json["data"]["id"], alice_id.as_str());

    let (status, json) = t.call(Method::GET, "/api/users", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json, json!({ "error": "Insufficient permissions" }));

    t.promote(&alice_id).await;

    // Roles are read from the directory on every request.
    let (status, _) = t
        .call(Method::GET, "/api/users", Some(first_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let fresh = t.login("alice@example.com").await;
    let (status, json) = t.call(Method::GET, "/api/users", Some(fresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["roles"], json!(["admin", "user"]));

    // The earlier token keeps its issuance-time snapshot.
    let old_claims = t.tokens.validate(&first_token).unwrap();
    assert_eq!(old_claims.roles, vec!["user".to_string()]);
    let new_claims = t.tokens.validate(&fresh).unwrap();
    assert_eq!(new_claims.roles, vec!["admin".to_string(), "user".to_string()]);
}

#[tokio::test]
async fn registration_rejects_bad_input_and_duplicates() {
    let t = test_app().await;
    t.register("bob@example.com", "Bob").await;

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "bob@example.com", "password": "password123", "name": "Bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "User already exists" }));

    for body in [
        json!({ "email": "carol@example.com", "password": "short", "name": "Carol" }),
        json!({ "email": "carol@example.com", "password": "password123", "name": "C" }),
        json!({ "email": "not-an-email", "password": "password123", "name": "Carol" }),
        json!({ "email": "carol@example.com", "name": "Carol" }),
    ] {
        let (status, json) = t
            .call(Method::POST, "/api/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Invalid input" }));
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = t.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "Invalid input" }));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let t = test_app().await;
    t.register("dave@example.com", "Dave").await;

    for (email, password) in [
        ("dave@example.com", "wrong-password"),
        ("nobody@example.com", "password123"),
    ] {
        let (status, json) = t
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, json!({ "error": "Invalid email or password" }));
    }
}

#[tokio::test]
async fn passwords_past_the_bcrypt_limit_are_not_truncated() {
    let t = test_app().await;
    // Longest password bcrypt hashes without truncation.
    let prefix = "a".repeat(71);

    let (status, _) = t
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "long@example.com", "password": prefix, "name": "Long" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "long@example.com", "password": format!("{prefix}WRONG") })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "error": "Invalid email or password" }));

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "longer@example.com",
                "password": format!("{prefix}correct"),
                "name": "Longer"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "Invalid input" }));
}

#[tokio::test]
async fn refresh_issues_a_new_pair() {
    let t = test_app().await;
    let (id, _, refresh) = t.register("erin@example.com", "Erin").await;
    t.promote(&id).await;

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = json["data"]["access_token"].as_str().unwrap();
    assert!(json["data"]["refresh_token"].is_string());
    assert!(json["data"].get("user").is_none());

    // The new pair reflects roles as of the refresh.
    let claims = t.tokens.validate(access).unwrap();
    assert!(claims.roles.contains(&ADMIN_ROLE.to_string()));

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": "garbage" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "error": "Invalid refresh token" }));

    let (status, _) = t
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bearer_header_problems_are_unauthorized() {
    let t = test_app().await;
    let (_, token, _) = t.register("frank@example.com", "Frank").await;

    let (status, json) = t.call(Method::GET, "/api/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "error": "Missing authorization header" }));

    let request = Request::builder()
        .uri("/api/profile")
        .header(AUTHORIZATION, format!("Token {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, json) = t.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "error": "Invalid authorization header format" }));

    let (status, json) = t
        .call(Method::GET, "/api/profile", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "error": "Invalid or expired token" }));

    // Admin routes authenticate before checking roles.
    let (status, _) = t.call(Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_user_loses_access_and_email() {
    let t = test_app().await;
    let admin = t.admin().await;
    let (grace_id, grace_token, grace_refresh) = t.register("grace@example.com", "Grace").await;

    let uri = format!("/api/users/{grace_id}");
    let (status, json) = t.call(Method::DELETE, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "data": { "message": "User deleted successfully" } }));

    let (status, json) = t
        .call(Method::GET, "/api/profile", Some(grace_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "error": "User not found" }));

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": grace_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({ "error": "User not found" }));

    let (status, _) = t.call(Method::GET, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.call(Method::DELETE, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = t.call(Method::GET, "/api/users", Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        json["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|u| u["id"] != grace_id.as_str())
    );

    let (status, _) = t
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "grace@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = t
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "grace@example.com", "password": "password123", "name": "Grace" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "User already exists" }));
}

#[tokio::test]
async fn role_assignment_and_removal() {
    let t = test_app().await;
    let admin = t.admin().await;
    let (heidi_id, _, _) = t.register("heidi@example.com", "Heidi").await;
    let uri = format!("/api/users/{heidi_id}/roles");

    let (status, json) = t
        .call(
            Method::POST,
            &uri,
            Some(admin.as_str()),
            Some(json!({ "role_name": " Editor " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["roles"], json!(["editor", "user"]));

    let (status, json) = t
        .call(
            Method::POST,
            &uri,
            Some(admin.as_str()),
            Some(json!({ "role_name": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "User already has this role" }));

    let (status, json) = t
        .call(
            Method::DELETE,
            &uri,
            Some(admin.as_str()),
            Some(json!({ "role_name": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["roles"], json!(["user"]));

    let (status, json) = t
        .call(
            Method::DELETE,
            &uri,
            Some(admin.as_str()),
            Some(json!({ "role_name": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "User doesn't have this role" }));

    let (status, _) = t
        .call(
            Method::POST,
            &uri,
            Some(admin.as_str()),
            Some(json!({ "role_name": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = format!("/api/users/{}/roles", uuid::Uuid::now_v7());
    let (status, json) = t
        .call(
            Method::POST,
            &missing,
            Some(admin.as_str()),
            Some(json!({ "role_name": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, json!({ "error": "User not found" }));
}

#[tokio::test]
async fn updates_are_self_or_admin() {
    let t = test_app().await;
    let admin = t.admin().await;
    let (ivan_id, ivan_token, _) = t.register("ivan@example.com", "Ivan").await;
    let (judy_id, _, _) = t.register("judy@example.com", "Judy").await;

    let (status, json) = t
        .call(
            Method::PUT,
            &format!("/api/users/{ivan_id}"),
            Some(ivan_token.as_str()),
            Some(json!({ "name": "Ivan P", "age": 41, "tel": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Ivan P");
    assert_eq!(json["data"]["age"], 41);

    let judy_uri = format!("/api/users/{judy_id}");
    let (status, _) = t
        .call(
            Method::PUT,
            &judy_uri,
            Some(ivan_token.as_str()),
            Some(json!({ "name": "Hacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = t
        .call(
            Method::PUT,
            &judy_uri,
            Some(admin.as_str()),
            Some(json!({ "country": "Norway" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["country"], "Norway");
    assert_eq!(json["data"]["name"], "Judy");

    let (status, _) = t
        .call(
            Method::PUT,
            "/api/users/not-a-uuid",
            Some(ivan_token.as_str()),
            Some(json!({ "name": "Ivan" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .call(
            Method::PUT,
            "/api/users/not-a-uuid",
            Some(admin.as_str()),
            Some(json!({ "name": "Ivan" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .call(
            Method::PUT,
            &format!("/api/users/{ivan_id}"),
            Some(ivan_token.as_str()),
            Some(json!({ "name": "I" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_reads_single_users() {
    let t = test_app().await;
    let admin = t.admin().await;
    let (id, token, _) = t.register("ken@example.com", "Ken").await;

    let uri = format!("/api/users/{id}");
    let (status, json) = t.call(Method::GET, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["email"], "ken@example.com");

    let (status, _) = t.call(Method::GET, &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = t
        .call(Method::GET, "/api/users/not-a-uuid", Some(admin.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, json!({ "error": "User not found" }));
}
