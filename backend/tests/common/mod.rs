// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use social_backend::{
    config::Config,
    events::{ChannelNotifier, UserEvent},
    models::user::NewUser,
    routes,
    state::AppState,
    store::{MemoryUserStore, UserStore},
    utils::hash::hash_password,
};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryUserStore>,
    pub events: UnboundedReceiver<UserEvent>,
    pub config: Config,
}

/// Spawns the app on a random port, backed by the in-memory store.
pub async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        app_url: Url::parse("http://api.test").unwrap(),
        verify_redirect_url: Url::parse("http://app.test/login").unwrap(),
        admin_nick: None,
        admin_email: None,
        admin_password: None,
    };

    let store = Arc::new(MemoryUserStore::new());
    let (notifier, events) = ChannelNotifier::new();

    let state = AppState {
        store: store.clone(),
        notifier: Arc::new(notifier),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Verification answers with a redirect we want to inspect, not follow.
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        client,
        store,
        events,
        config,
    }
}

/// A short random suffix so nicks never collide between tests.
pub fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

pub fn registration(nick: &str) -> Value {
    json!({
        "nick": nick,
        "name": "Test User",
        "email": format!("{}@example.com", nick),
        "password": PASSWORD,
        "password_confirmation": PASSWORD,
        "description": "hello"
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/users"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers `nick` and returns its id.
    pub async fn register_user(&self, nick: &str) -> i64 {
        let response = self.register(&registration(nick)).await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["data"]["id"].as_i64().unwrap()
    }

    pub async fn login(&self, login: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn token_for(&self, login: &str) -> String {
        let body: Value = self.login(login, PASSWORD).await.json().await.unwrap();
        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Inserts a verified admin directly into the store and logs in.
    pub async fn admin_token(&self) -> String {
        let nick = unique("admin");
        let admin = self
            .store
            .profile_by_name("admin")
            .await
            .unwrap()
            .unwrap();
        self.store
            .create_user(NewUser {
                profile_id: admin.id,
                nick: nick.clone(),
                name: "Admin".to_string(),
                email: format!("{}@example.com", nick),
                password: hash_password(PASSWORD).unwrap(),
                description: None,
                enabled: true,
                verified: true,
                verification_email_token: None,
            })
            .await
            .unwrap();
        self.token_for(&nick).await
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Drains every event published so far.
    pub fn drain_events(&mut self) -> Vec<UserEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
