// tests/user_tests.rs

mod common;

use chrono::{Duration, Utc};
use common::{PASSWORD, registration, spawn_app, unique};
use serde_json::{Value, json};
use social_backend::{events::UserEvent, store::UserStore};

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_creates_unverified_user_and_fires_event() {
    let mut app = spawn_app().await;
    let nick = unique("u_");

    let response = app.register(&registration(&nick)).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["nick"], nick);
    assert_eq!(data["verified"], false);
    assert_eq!(data["enabled"], true);
    assert!(data.get("password").is_none());
    assert!(data.get("verification_email_token").is_none());

    let id = data["id"].as_i64().unwrap();
    let stored = app.store.raw_user(id).await.unwrap();
    assert!(!stored.verified);
    assert_eq!(stored.verification_email_token.as_ref().map(String::len), Some(45));
    assert_ne!(stored.password, PASSWORD);

    let events = app.drain_events();
    assert_eq!(events.len(), 1);
    let UserEvent::Registered(mail) = &events[0];
    assert_eq!(mail.user_id, id);
    assert_eq!(mail.verification_email_token, stored.verification_email_token);
}

#[tokio::test]
async fn register_lowercases_nick_and_email() {
    let app = spawn_app().await;
    let nick = unique("MiXeD_");

    let mut body = registration(&nick);
    body["email"] = json!(format!("{}@Example.COM", nick));

    let response: Value = app.register(&body).await.json().await.unwrap();
    assert_eq!(response["data"]["nick"], nick.to_lowercase());
    assert_eq!(
        response["data"]["email"],
        format!("{}@example.com", nick.to_lowercase())
    );
}

#[tokio::test]
async fn register_duplicate_nick_or_email_is_422() {
    let app = spawn_app().await;
    let nick = unique("dup_");
    app.register_user(&nick).await;

    // Same nick, different case and a fresh email.
    let mut same_nick = registration(&nick.to_uppercase());
    same_nick["email"] = json!(format!("{}@other.com", unique("x")));
    let response = app.register(&same_nick).await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]["nick"].is_array());

    // Fresh nick, same email.
    let mut same_email = registration(&unique("other_"));
    same_email["email"] = json!(format!("{}@example.com", nick));
    let response = app.register(&same_email).await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]["email"].is_array());
    assert_eq!(body["code"], 422);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    let response = app
        .register(&json!({
            "nick": unique("v_"),
            "name": "R2D2",
            "email": "not-an-email",
            "password": "abc",
            "password_confirmation": "xyz"
        }))
        .await;
    assert_eq!(response.status().as_u16(), 422);

    let body: Value = response.json().await.unwrap();
    for field in ["name", "email", "password"] {
        assert!(body["error"][field].is_array(), "missing error for {}", field);
    }
}

#[tokio::test]
async fn register_rejects_blank_nick_and_name() {
    let app = spawn_app().await;
    let mut body = registration(&unique("b_"));
    body["nick"] = json!("   ");
    body["name"] = json!("   ");

    let response = app.register(&body).await;
    assert_eq!(response.status().as_u16(), 422);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"]["nick"].is_array());
    assert!(body["error"]["name"].is_array());
    assert!(app.store.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_keeps_error_envelope() {
    let app = spawn_app().await;
    let mut body = registration(&unique("m_"));
    body.as_object_mut().unwrap().remove("nick");

    let response = app.register(&body).await;
    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 422);
    assert_eq!(body["error"]["nick"][0], "The nick field is required.");

    let mut wrong_type = registration(&unique("m_"));
    wrong_type["email"] = json!(42);
    let body: Value = app.register(&wrong_type).await.json().await.unwrap();
    assert!(body["error"]["email"].is_array());

    let response = app
        .client
        .post(app.url("/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn non_numeric_ids_are_404() {
    let app = spawn_app().await;
    let nick = unique("n_");
    app.register_user(&nick).await;
    let token = app.token_for(&nick).await;

    let response = app.get("/users/abc", &token).await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 404);

    let resend = app.client.post(app.url("/resend/abc")).send().await.unwrap();
    assert_eq!(resend.status().as_u16(), 404);

    let page = app.get("/users/1/post/x/10", &token).await;
    assert_eq!(page.status().as_u16(), 404);
}

#[tokio::test]
async fn login_prefers_nick_over_email() {
    let app = spawn_app().await;
    let ana = unique("ana_");
    app.register_user(&ana).await;

    // Another user's nick is spelled like ana's email.
    let mut body = registration(&unique("x_"));
    body["nick"] = json!(format!("{}@example.com", ana));
    let response = app.register(&body).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    let lookalike = body["data"]["id"].as_i64().unwrap();

    let token = app.token_for(&format!("{}@example.com", ana)).await;
    let me: Value = app.get("/auth/me", &token).await.json().await.unwrap();
    assert_eq!(me["data"]["id"], lookalike);
}

#[tokio::test]
async fn login_requires_valid_credentials() {
    let app = spawn_app().await;
    let nick = unique("l_");
    app.register_user(&nick).await;

    let ok: Value = app.login(&nick, PASSWORD).await.json().await.unwrap();
    assert_eq!(ok["type"], "Bearer");
    assert_eq!(ok["verified"], false);

    let by_email = app.login(&format!("{}@example.com", nick), PASSWORD).await;
    assert_eq!(by_email.status().as_u16(), 200);

    let wrong = app.login(&nick, "wrong-password").await;
    assert_eq!(wrong.status().as_u16(), 401);
}

#[tokio::test]
async fn list_users_is_admin_only() {
    let app = spawn_app().await;
    let nick = unique("plain_");
    app.register_user(&nick).await;
    let user_token = app.token_for(&nick).await;

    let anonymous = app.client.get(app.url("/users")).send().await.unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let forbidden = app.get("/users", &user_token).await;
    assert_eq!(forbidden.status().as_u16(), 403);

    let admin_token = app.admin_token().await;
    let listed = app.get("/users", &admin_token).await;
    assert_eq!(listed.status().as_u16(), 200);
    let users: Vec<Value> = listed.json().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));
}

#[tokio::test]
async fn show_user_includes_posts_and_follow_graph() {
    let app = spawn_app().await;
    let ana = unique("ana_");
    let bob = unique("bob_");
    let ana_id = app.register_user(&ana).await;
    let bob_id = app.register_user(&bob).await;
    let token = app.token_for(&bob).await;

    let base = Utc::now();
    app.store.add_post_at(ana_id, "first", base).await;
    app.store
        .add_post_at(ana_id, "second", base + Duration::seconds(1))
        .await;
    app.store.add_follow(bob_id, ana_id).await;

    let body: Value = app
        .get(&format!("/users/{}", ana_id), &token)
        .await
        .json()
        .await
        .unwrap();
    let data = &body["data"];
    assert_eq!(data["nick"], ana);
    assert_eq!(data["post"][0]["content"], "second");
    assert_eq!(data["follower"][0]["id"], bob_id);
    assert_eq!(data["following"].as_array().unwrap().len(), 0);

    let following: Vec<Value> = app
        .get(&format!("/users/{}/following", bob_id), &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(following[0]["id"], ana_id);

    let followers: Vec<Value> = app
        .get(&format!("/users/{}/follower", ana_id), &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(followers[0]["id"], bob_id);
}

#[tokio::test]
async fn posts_are_paged_newest_first() {
    let app = spawn_app().await;
    let nick = unique("p_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;

    let base = Utc::now();
    for i in 0..5 {
        app.store
            .add_post_at(id, &format!("post {}", i), base + Duration::seconds(i))
            .await;
    }

    let all: Vec<Value> = app
        .get(&format!("/users/{}/post", id), &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0]["content"], "post 4");

    let page: Vec<Value> = app
        .get(&format!("/users/{}/post/1/2", id), &token)
        .await
        .json()
        .await
        .unwrap();
    let contents: Vec<&str> = page.iter().map(|p| p["content"].as_str().unwrap()).collect();
    assert_eq!(contents, ["post 3", "post 2"]);
}

#[tokio::test]
async fn likes_and_comments_are_listed() {
    let app = spawn_app().await;
    let nick = unique("c_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;

    let post = app.store.add_post(id, "a post").await;
    app.store.add_like(id, post.id).await;
    app.store.add_comment(id, post.id, "nice").await;

    let likes: Vec<Value> = app
        .get(&format!("/users/{}/like", id), &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0]["post_id"], post.id);

    let comments: Vec<Value> = app
        .get(&format!("/users/{}/comment", id), &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(comments[0]["content"], "nice");
}

#[tokio::test]
async fn update_without_changes_is_422() {
    let app = spawn_app().await;
    let nick = unique("n_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;
    let path = format!("/users/{}", id);

    let empty = app.put(&path, &token, &json!({})).await;
    assert_eq!(empty.status().as_u16(), 422);

    let same = app
        .put(&path, &token, &json!({ "nick": nick, "name": "Test User" }))
        .await;
    assert_eq!(same.status().as_u16(), 422);
    let body: Value = same.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn update_changes_fields_and_round_trips_image() {
    let app = spawn_app().await;
    let nick = unique("up_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;
    let path = format!("/users/{}", id);
    let image = "data:image/png;base64,aGVsbG8=";

    let response = app
        .put(
            &path,
            &token,
            &json!({ "name": "Nuevo Nombre", "description": null, "image": image }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Nuevo Nombre");
    assert_eq!(body["data"]["description"], Value::Null);
    assert_eq!(body["data"]["image"], image);

    let stored = app.store.raw_user(id).await.unwrap();
    assert_eq!(stored.image.as_deref(), Some(&b"hello"[..]));
    assert_eq!(stored.mime.as_deref(), Some("data:image/png;base64"));

    // Same image again is not a change.
    let again = app.put(&path, &token, &json!({ "image": image })).await;
    assert_eq!(again.status().as_u16(), 422);

    let broken = app.put(&path, &token, &json!({ "image": "garbage" })).await;
    assert_eq!(broken.status().as_u16(), 422);
}

#[tokio::test]
async fn update_email_keeps_verification_state() {
    let app = spawn_app().await;
    let nick = unique("e_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;
    let before = app.store.raw_user(id).await.unwrap();

    let response = app
        .put(
            &format!("/users/{}", id),
            &token,
            &json!({ "email": format!("{}@NEW.example.com", nick) }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let after = app.store.raw_user(id).await.unwrap();
    assert_eq!(after.email, format!("{}@new.example.com", nick));
    assert_eq!(after.verified, before.verified);
    assert_eq!(after.verification_email_token, before.verification_email_token);
}

#[tokio::test]
async fn update_rejects_blank_nick_and_name() {
    let app = spawn_app().await;
    let nick = unique("u_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;

    let response = app
        .put(
            &format!("/users/{}", id),
            &token,
            &json!({ "nick": "  ", "name": " " }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]["nick"].is_array());
    assert!(body["error"]["name"].is_array());

    let user = app.store.raw_user(id).await.unwrap();
    assert_eq!(user.nick, nick);
    assert_eq!(user.name, "Test User");
}

#[tokio::test]
async fn update_rejects_taken_nick() {
    let app = spawn_app().await;
    let ana = unique("ana_");
    let bob = unique("bob_");
    app.register_user(&ana).await;
    let bob_id = app.register_user(&bob).await;
    let token = app.token_for(&bob).await;

    let response = app
        .put(&format!("/users/{}", bob_id), &token, &json!({ "nick": ana }))
        .await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]["nick"].is_array());
}

#[tokio::test]
async fn users_cannot_edit_others_or_admin_fields() {
    let app = spawn_app().await;
    let ana = unique("ana_");
    let bob = unique("bob_");
    let ana_id = app.register_user(&ana).await;
    let bob_id = app.register_user(&bob).await;
    let bob_token = app.token_for(&bob).await;

    let other = app
        .put(&format!("/users/{}", ana_id), &bob_token, &json!({ "name": "Hacked" }))
        .await;
    assert_eq!(other.status().as_u16(), 403);

    let disable_self = app
        .put(&format!("/users/{}", bob_id), &bob_token, &json!({ "enabled": false }))
        .await;
    assert_eq!(disable_self.status().as_u16(), 403);

    let admin_token = app.admin_token().await;
    let disabled = app
        .put(&format!("/users/{}", ana_id), &admin_token, &json!({ "enabled": false }))
        .await;
    assert_eq!(disabled.status().as_u16(), 200);

    let login = app.login(&ana, PASSWORD).await;
    assert_eq!(login.status().as_u16(), 403);
}

#[tokio::test]
async fn delete_is_soft() {
    let app = spawn_app().await;
    let ana = unique("ana_");
    let bob = unique("bob_");
    let ana_id = app.register_user(&ana).await;
    let bob_id = app.register_user(&bob).await;
    let ana_token = app.token_for(&ana).await;
    let bob_token = app.token_for(&bob).await;
    app.store.add_follow(bob_id, ana_id).await;

    let response = app
        .client
        .delete(app.url(&format!("/users/{}", bob_id)))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["deleted_at"].is_string());

    // Row retained but hidden.
    assert!(app.store.raw_user(bob_id).await.unwrap().deleted_at.is_some());
    assert!(app.store.find_user(bob_id).await.unwrap().is_none());

    let gone = app.get(&format!("/users/{}", bob_id), &ana_token).await;
    assert_eq!(gone.status().as_u16(), 404);

    let followers: Vec<Value> = app
        .get(&format!("/users/{}/follower", ana_id), &ana_token)
        .await
        .json()
        .await
        .unwrap();
    assert!(followers.is_empty());

    // The deleted user's token no longer authenticates.
    let stale = app.get("/auth/me", &bob_token).await;
    assert_eq!(stale.status().as_u16(), 401);

    // Nick is free again.
    assert_eq!(app.register(&registration(&bob)).await.status().as_u16(), 201);
}

#[tokio::test]
async fn change_password_checks_old_password() {
    let app = spawn_app().await;
    let nick = unique("pw_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;
    let path = format!("/users/{}/password", id);

    let wrong = app
        .put(
            &path,
            &token,
            &json!({ "password_old": "not-it", "password_new": "brand-new" }),
        )
        .await;
    assert_eq!(wrong.status().as_u16(), 400);

    let ok = app
        .put(
            &path,
            &token,
            &json!({ "password_old": PASSWORD, "password_new": "brand-new" }),
        )
        .await;
    assert_eq!(ok.status().as_u16(), 200);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["data"], "OK");

    assert_eq!(app.login(&nick, PASSWORD).await.status().as_u16(), 401);
    assert_eq!(app.login(&nick, "brand-new").await.status().as_u16(), 200);

    let short = app
        .put(&path, &token, &json!({ "password_old": "brand-new", "password_new": "x" }))
        .await;
    assert_eq!(short.status().as_u16(), 422);
}

#[tokio::test]
async fn me_returns_current_user() {
    let app = spawn_app().await;
    let nick = unique("me_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;

    let body: Value = app.get("/auth/me", &token).await.json().await.unwrap();
    assert_eq!(body["data"]["id"], id);

    let bogus = app.get("/auth/me", "not-a-jwt").await;
    assert_eq!(bogus.status().as_u16(), 401);
}

#[tokio::test]
async fn profile_change_invalidates_old_tokens() {
    let app = spawn_app().await;
    let nick = unique("p_");
    let id = app.register_user(&nick).await;
    let token = app.token_for(&nick).await;
    let admin_token = app.admin_token().await;

    let promoted = app
        .put(&format!("/users/{}", id), &admin_token, &json!({ "profile_id": 1 }))
        .await;
    assert_eq!(promoted.status().as_u16(), 200);

    let stale = app.get("/auth/me", &token).await;
    assert_eq!(stale.status().as_u16(), 401);

    let fresh = app.token_for(&nick).await;
    let users = app.get("/users", &fresh).await;
    assert_eq!(users.status().as_u16(), 200);
}
