//! Shared harness for API-level tests: in-memory SQLite, migrated schema,
//! seeded users, and a router driven through `tower::ServiceExt::oneshot`.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

use storefront_api::entities::user;
use storefront_api::migrator::Migrator;
use storefront_api::{auth, config::AppConfig, AppState};

pub const JWT_SECRET: &str = "integration-test-secret-key-that-is-long-enough-for-hs256";

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;
pub const ADMIN: i64 = 3;

pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
}

impl TestApp {
    pub async fn new() -> Self {
        // One connection only: each pooled connection to sqlite::memory:
        // would otherwise see its own empty database.
        let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
        opt.max_connections(1).sqlx_logging(false);

        let db = Database::connect(opt).await.expect("sqlite connection");
        Migrator::up(&db, None).await.expect("migrations");

        let db = Arc::new(db);
        seed_users(&db).await;

        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: JWT_SECRET.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: 1,
            db_min_connections: 1,
            db_connect_timeout_secs: 5,
            db_idle_timeout_secs: 60,
            db_acquire_timeout_secs: 5,
            cors_allowed_origins: None,
        };

        let state = AppState::new(db.clone(), config);
        let router = storefront_api::app_router(state);

        Self { router, db }
    }

    pub fn token_for(&self, user_id: i64, roles: &[&str]) -> String {
        auth::mint_token(JWT_SECRET, user_id, None, None, roles, Duration::minutes(30))
            .expect("token")
    }

    pub fn customer_token(&self, user_id: i64) -> String {
        self.token_for(user_id, &["customer"])
    }

    pub fn admin_token(&self) -> String {
        self.token_for(ADMIN, &["admin"])
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        json: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match json {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router.clone().oneshot(request).await.expect("response")
    }
}

async fn seed_users(db: &DatabaseConnection) {
    for (user_id, name, email) in [
        (ALICE, "Alice Doe", "alice@example.com"),
        (BOB, "Bob Roe", "bob@example.com"),
        (ADMIN, "Site Admin", "admin@example.com"),
    ] {
        user::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .expect("seed user");
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Reads a monetary field that may serialize as a string or a bare number.
pub fn decimal_of(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a monetary value, got {other:?}"),
    }
}
