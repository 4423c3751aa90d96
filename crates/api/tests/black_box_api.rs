use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use beacon_api::app::{AppState, build_app};
use beacon_auth::{
    AuthConfig, CredentialStore, NewUser, PasswordHashConfig, TokenService, seed_default_catalog,
};
use beacon_core::UserId;
use beacon_infra::InMemoryCredentialStore;

const SECRET: &str = "black-box-secret";
const ROOT_EMAIL: &str = "root@example.com";
const ROOT_PASSWORD: &str = "root-password";

fn config() -> AuthConfig {
    AuthConfig {
        password_hash: PasswordHashConfig::insecure_fast(),
        ..AuthConfig::with_secret(SECRET)
    }
}

struct TestServer {
    base_url: String,
    store: Arc<dyn CredentialStore>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over a seeded in-memory store, plus one system
    /// admin account.
    async fn spawn() -> Self {
        let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
        seed_default_catalog(store.as_ref()).await.unwrap();

        let state = AppState::new(store.clone(), config()).unwrap();
        state
            .accounts
            .create_user(NewUser::new("Root", ROOT_EMAIL, ROOT_PASSWORD).system_admin())
            .await
            .unwrap();

        let app = build_app(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, name: &str, email: &str, tenant: Option<&str>) -> (UserId, String) {
        let mut body = json!({ "name": name, "email": email, "password": "secret123" });
        if let Some(tenant) = tenant {
            body["tenantId"] = json!(tenant);
        }
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        let id: UserId = body["user"]["id"].as_str().unwrap().parse().unwrap();
        (id, body["token"].as_str().unwrap().to_string())
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn root_token(&self) -> String {
        let res = self.login(ROOT_EMAIL, ROOT_PASSWORD).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_tenant(&self, root: &str, name: &str) -> String {
        let res = self
            .client
            .post(self.url("/admin/tenants"))
            .bearer_auth(root)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    async fn grant(&self, token: &str, user: UserId, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/admin/users/{user}/roles")))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str, token: &str, tenant: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path)).bearer_auth(token);
        if let Some(tenant) = tenant {
            req = req.header("X-Tenant-Id", tenant);
        }
        req.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn error_of(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_malformed_credentials() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/auth/profile")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Access token required");

    let res = srv
        .client
        .get(srv.url("/auth/profile"))
        .header("Authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Access token required");

    let res = srv.get("/auth/profile", "not-a-jwt", None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Invalid token");
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_invalid() {
    let srv = TestServer::spawn().await;
    let (user_id, _) = srv.register("Ann", "ann@example.com", None).await;

    let now = Utc::now();
    let claims = json!({
        "userId": user_id,
        "email": "ann@example.com",
        "iss": "beacon",
        "iat": now.timestamp(),
        "exp": (now + ChronoDuration::minutes(10)).timestamp(),
        "jti": "forged",
    });
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"someone-else"),
    )
    .expect("failed to encode jwt");

    let res = srv.get("/auth/profile", &forged, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Invalid token");
}

#[tokio::test]
async fn expired_tokens_are_reported_as_expired() {
    let srv = TestServer::spawn().await;
    let (user_id, _) = srv.register("Ann", "ann@example.com", None).await;
    let user = srv.store.get_user(user_id).await.unwrap().unwrap();

    let tokens = TokenService::new(&config()).unwrap();
    let stale = tokens
        .issue_at(&user, Utc::now() - ChronoDuration::days(2))
        .unwrap();

    let res = srv.get("/auth/profile", &stale.token, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Token expired");
}

#[tokio::test]
async fn tokens_for_deleted_or_deactivated_users_are_rejected() {
    let srv = TestServer::spawn().await;
    let (gone, gone_token) = srv.register("Gone", "gone@example.com", None).await;
    let (idle, idle_token) = srv.register("Idle", "idle@example.com", None).await;

    assert!(srv.store.delete_user(gone).await.unwrap());
    srv.store.set_user_active(idle, false).await.unwrap();

    let res = srv.get("/auth/profile", &gone_token, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "User not found");

    let res = srv.get("/auth/profile", &idle_token, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Account is deactivated");

    let res = srv.login("idle@example.com", "secret123").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "Carol", "email": "Carol@Example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["email"], "carol@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "Carol", "email": "carol@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(error_of(res).await, "User with this email already exists");

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Name, email, and password are required");

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "Dan", "email": "dan@example.com", "password": "abc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(res).await,
        "Password must be at least 6 characters long"
    );
}

#[tokio::test]
async fn login_profile_change_password_and_logout() {
    let srv = TestServer::spawn().await;
    srv.register("Eve", "eve@example.com", None).await;

    let res = srv.login("eve@example.com", "wrong-pass").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Invalid email or password");

    let res = srv.login("eve@example.com", "secret123").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Login successful");
    let token = body["token"].as_str().unwrap().to_string();

    let res = srv.get("/auth/profile", &token, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["user"]["email"], "eve@example.com");
    assert!(profile["user"]["last_login"].is_string());
    assert_eq!(profile["roles"], json!([]));
    assert_eq!(profile["permissions"], json!([]));

    let res = srv
        .client
        .post(srv.url("/auth/change-password"))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": "nope-nope", "newPassword": "fresh-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Current password is incorrect");

    let res = srv
        .client
        .post(srv.url("/auth/change-password"))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": "secret123", "newPassword": "fresh-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(
        srv.login("eve@example.com", "secret123").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        srv.login("eve@example.com", "fresh-pass").await.status(),
        StatusCode::OK
    );

    let res = srv
        .client
        .post(srv.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn whoami_degrades_to_anonymous() {
    let srv = TestServer::spawn().await;
    let (user_id, token) = srv.register("Fay", "fay@example.com", None).await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], false);

    let res = srv.get("/whoami", "garbage", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], false);

    let res = srv.get("/whoami", &token, None).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
}

#[tokio::test]
async fn system_admin_resolves_to_everything() {
    let srv = TestServer::spawn().await;
    let root = srv.root_token().await;

    let res = srv.get("/auth/profile", &root, None).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["roles"], json!(["super_admin"]));
    assert_eq!(body["permissions"], json!(["*"]));

    let res = srv.get("/admin/catalog", &root, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let catalog: Value = res.json().await.unwrap();
    assert_eq!(catalog["permissions"].as_array().unwrap().len(), 16);
    let tenant_user = catalog["roles"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "tenant_user")
        .unwrap();
    assert_eq!(
        tenant_user["permissions"],
        json!(["metric:read", "tenant:read", "user:read"])
    );

    assert_eq!(
        srv.get("/metrics/overview", &root, None).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn ordinary_users_are_kept_out_of_admin_routes() {
    let srv = TestServer::spawn().await;
    let (other, token) = srv.register("Gus", "gus@example.com", None).await;

    let res = srv.get("/admin/catalog", &token, None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Admin access required");

    let res = srv
        .get(&format!("/admin/users/{other}/roles"), &token, None)
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Tenant admin access required");

    let res = srv.get("/metrics/overview", &token, None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Insufficient permissions");
}

#[tokio::test]
async fn malformed_tenant_header_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.register("Hal", "hal@example.com", None).await;

    let res = srv.get("/auth/profile", &token, Some("not-a-uuid")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Invalid X-Tenant-Id header");

    // Optional authentication ignores it instead.
    let res = srv.get("/whoami", &token, Some("not-a-uuid")).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenant_admin_authority_stops_at_the_tenant_boundary() {
    let srv = TestServer::spawn().await;
    let root = srv.root_token().await;
    let t1 = srv.create_tenant(&root, "acme").await;
    let t2 = srv.create_tenant(&root, "globex").await;

    let (alice, alice_token) = srv.register("Alice", "alice@example.com", Some(t1.as_str())).await;
    let (bob, bob_token) = srv.register("Bob", "bob@example.com", Some(t1.as_str())).await;

    let res = srv
        .grant(&root, alice, json!({ "role": "tenant_admin", "tenant_id": t1 }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    // The token predates the grant; roles are resolved per request.
    let res = srv
        .get(&format!("/admin/users/{bob}/roles"), &alice_token, None)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .get(&format!("/admin/users/{bob}/roles"), &alice_token, Some(t2.as_str()))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Tenant admin access required");

    let res = srv
        .grant(&alice_token, bob, json!({ "role": "tenant_user", "tenant_id": t2 }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        error_of(res).await,
        "Tenant admins can only manage roles within their own tenant"
    );

    let res = srv
        .grant(&alice_token, bob, json!({ "role": "super_admin" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Only a super admin can manage super_admin");

    let res = srv
        .grant(&alice_token, bob, json!({ "role": "tenant_user" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["assignment"]["tenant_id"].as_str().unwrap(), t1);
    assert_eq!(body["assignment"]["role"], "tenant_user");

    let res = srv
        .grant(&alice_token, bob, json!({ "role": "tenant_user" }))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(error_of(res).await, "Role already assigned");

    // tenant_user carries metric:read, but only inside t1.
    assert_eq!(
        srv.get("/metrics/overview", &bob_token, None).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        srv.get("/metrics/overview", &bob_token, Some(t2.as_str()))
            .await
            .status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn revoking_a_role_takes_effect_on_the_next_request() {
    let srv = TestServer::spawn().await;
    let root = srv.root_token().await;
    let t1 = srv.create_tenant(&root, "initech").await;
    let (bob, bob_token) = srv.register("Bob", "bob@example.com", Some(t1.as_str())).await;

    let res = srv
        .grant(&root, bob, json!({ "role": "tenant_user", "tenant_id": t1 }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        srv.get("/metrics/overview", &bob_token, None).await.status(),
        StatusCode::OK
    );

    let res = srv
        .client
        .delete(srv.url(&format!("/admin/users/{bob}/roles/tenant_user?tenant_id={t1}")))
        .bearer_auth(&root)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["revoked"], 1);

    let res = srv.get("/metrics/overview", &bob_token, None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .get(&format!("/admin/users/{bob}/roles"), &root, None)
        .await;
    let history: Value = res.json().await.unwrap();
    let rows = history["assignments"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["is_active"], false);
    assert_eq!(rows[0]["role"], "tenant_user");
}

#[tokio::test]
async fn granting_to_unknown_users_or_roles_is_not_found() {
    let srv = TestServer::spawn().await;
    let root = srv.root_token().await;
    let (bob, _) = srv.register("Bob", "bob@example.com", None).await;

    let res = srv
        .grant(&root, UserId::new(), json!({ "role": "tenant_user", "global": true }))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_of(res).await, "User not found");

    let res = srv
        .grant(&root, bob, json!({ "role": "auditor", "global": true }))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url("/admin/users/not-a-uuid/roles"))
        .bearer_auth(&root)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tenant_admin_manages_users_of_their_own_tenant_only() {
    let srv = TestServer::spawn().await;
    let root = srv.root_token().await;
    let t1 = srv.create_tenant(&root, "acme").await;
    let t2 = srv.create_tenant(&root, "globex").await;
    let (alice, alice_token) = srv.register("Alice", "alice@example.com", Some(t1.as_str())).await;
    let (bob, bob_token) = srv.register("Bob", "bob@example.com", Some(t1.as_str())).await;
    let (zed, _) = srv.register("Zed", "zed@example.com", Some(t2.as_str())).await;
    let res = srv
        .grant(&root, alice, json!({ "role": "tenant_admin", "tenant_id": t1 }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv.get("/admin/users", &bob_token, None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Asking for another tenant still lists the admin's own.
    let res = srv
        .get(&format!("/admin/users?tenant_id={t2}"), &alice_token, None)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let mut emails: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["email"].as_str())
        .collect();
    emails.sort();
    assert_eq!(emails, vec!["alice@example.com", "bob@example.com"]);

    let res = srv.get(&format!("/admin/users/{zed}"), &alice_token, None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Access denied");

    let res = srv
        .client
        .patch(srv.url(&format!("/admin/users/{bob}")))
        .bearer_auth(&alice_token)
        .json(&json!({ "name": "Robert" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["name"], "Robert");

    let res = srv
        .client
        .patch(srv.url(&format!("/admin/users/{bob}")))
        .bearer_auth(&alice_token)
        .json(&json!({ "tenantId": t2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Cannot change user tenant");

    let res = srv
        .client
        .post(srv.url(&format!("/admin/users/{bob}/deactivate")))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        srv.login("bob@example.com", "secret123").await.status(),
        StatusCode::UNAUTHORIZED
    );

    let res = srv
        .client
        .post(srv.url(&format!("/admin/users/{bob}/activate")))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        srv.login("bob@example.com", "secret123").await.status(),
        StatusCode::OK
    );

    let res = srv
        .client
        .delete(srv.url(&format!("/admin/users/{alice}")))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Cannot delete yourself");

    let res = srv
        .client
        .delete(srv.url(&format!("/admin/users/{bob}")))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.get(&format!("/admin/users/{bob}"), &alice_token, None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Super admins see across tenants.
    let res = srv
        .get(&format!("/admin/users?tenant_id={t2}"), &root, None)
        .await;
    let body: Value = res.json().await.unwrap();
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"].as_str().unwrap(), zed.to_string());
}

#[tokio::test]
async fn tenant_details_need_a_tenant_role_and_membership() {
    let srv = TestServer::spawn().await;
    let root = srv.root_token().await;
    let t1 = srv.create_tenant(&root, "acme").await;
    let t2 = srv.create_tenant(&root, "globex").await;
    let (bob, bob_token) = srv.register("Bob", "bob@example.com", Some(t1.as_str())).await;

    let res = srv.get(&format!("/tenants/{t1}"), &bob_token, None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Insufficient role");

    let res = srv
        .grant(&root, bob, json!({ "role": "tenant_user", "tenant_id": t1 }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv.get(&format!("/tenants/{t1}"), &bob_token, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "acme");

    let res = srv.get(&format!("/tenants/{t2}"), &bob_token, None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Access denied: tenant access not allowed");

    let res = srv.get(&format!("/tenants/{t2}"), &root, None).await;
    assert_eq!(res.status(), StatusCode::OK);
}
