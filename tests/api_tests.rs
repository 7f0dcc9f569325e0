// tests/api_tests.rs

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use peerpath::{
    config::{Config, ReviewConfig},
    models::review::Appraisal,
    notify::TracingNotifier,
    routes,
    services::offset::FixedOffset,
    state::AppState,
    store::{MemoryStore, Store},
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestApp {
    fn token(&self, user_id: i64, role: &str) -> String {
        sign_jwt(user_id, role, SECRET, 600).unwrap()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    async fn admin_post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(self.token(99, "admin"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

fn test_state(store: Arc<MemoryStore>) -> AppState {
    let config = Config {
        database_url: String::new(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        review: ReviewConfig::default(),
    };

    AppState {
        store,
        notifier: Arc::new(TracingNotifier),
        offsets: Arc::new(FixedOffset(0)),
        config,
    }
}

/// Spawns the app on a random port, backed by an in-memory store.
async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let app = routes::create_router(test_state(store.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

/// Creates a stack with `len` chained challenges through the admin API.
async fn create_chain(app: &TestApp, len: usize) -> (i64, Vec<i64>) {
    let stack: Value = app
        .admin_post("/admin/stacks", json!({ "title": "Rust basics" }))
        .await
        .json()
        .await
        .unwrap();
    let stack_id = stack["id"].as_i64().unwrap();

    let mut ids: Vec<i64> = Vec::new();
    for i in 0..len {
        let response = app
            .admin_post(
                "/admin/challenges",
                json!({
                    "stack_id": stack_id,
                    "title": format!("Challenge {}", i + 1),
                    "prerequisite_id": ids.last(),
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let challenge: Value = response.json().await.unwrap();
        ids.push(challenge["id"].as_i64().unwrap());
    }
    (stack_id, ids)
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = routes::create_router(test_state(store));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/stacks/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/admin/stacks"))
        .bearer_auth(app.token(1, "learner"))
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn branching_chain_is_rejected() {
    let app = spawn_app().await;
    let (stack_id, ids) = create_chain(&app, 2).await;

    let response = app
        .admin_post(
            "/admin/challenges",
            json!({ "stack_id": stack_id, "title": "Branch", "prerequisite_id": ids[0] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    let response = app
        .admin_post("/admin/challenges", json!({ "stack_id": stack_id, "title": "Second head" }))
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn stack_overview_lists_chain_in_order() {
    let app = spawn_app().await;
    let (stack_id, ids) = create_chain(&app, 3).await;

    let overview: Value = app
        .client
        .get(app.url(&format!("/stacks/{}", stack_id)))
        .bearer_auth(app.token(1, "learner"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let challenges = overview["challenges"].as_array().unwrap();
    let order: Vec<i64> = challenges
        .iter()
        .map(|c| c["challenge"]["id"].as_i64().unwrap())
        .collect();
    assert_eq!(order, ids);
    assert_eq!(challenges[0]["status"], 0);
    assert_eq!(challenges[0]["enabled"], true);
    assert_eq!(challenges[1]["enabled"], false);
    assert_eq!(challenges[2]["is_final"], true);
}

#[tokio::test]
async fn learner_drafts_submits_and_reviews() {
    let app = spawn_app().await;
    let (_, ids) = create_chain(&app, 1).await;
    let challenge_id = ids[0];
    let token = app.token(1, "learner");

    let question: Value = app
        .admin_post(
            &format!("/admin/challenges/{}/questions", challenge_id),
            json!({ "position": 0, "text": "What would you improve?" }),
        )
        .await
        .json()
        .await
        .unwrap();

    // Reviewing before submitting is refused.
    let response = app
        .client
        .get(app.url(&format!("/challenges/{}/review", challenge_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .client
        .put(app.url(&format!("/challenges/{}/elaboration", challenge_id)))
        .bearer_auth(&token)
        .json(&json!({ "text": "first draft" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .post(app.url(&format!("/challenges/{}/elaboration/submit", challenge_id)))
        .bearer_auth(&token)
        .json(&json!({ "text": "<p>final</p>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // Nobody else has submitted yet.
    let assignment: Value = app
        .client
        .get(app.url(&format!("/challenges/{}/review", challenge_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(assignment["review"].is_null());

    let peer = app
        .store
        .seed_elaboration(challenge_id, 2, "peer work", Some(Utc::now() - Duration::days(1)))
        .await;

    let assignment: Value = app
        .client
        .get(app.url(&format!("/challenges/{}/review", challenge_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(assignment["review"]["elaboration_id"], peer.id);
    assert_eq!(assignment["elaboration_text"], "peer work");
    assert_eq!(assignment["questions"].as_array().unwrap().len(), 1);
    let review_id = assignment["review"]["id"].as_i64().unwrap();

    let response = app
        .client
        .post(app.url(&format!("/reviews/{}/submit", review_id)))
        .bearer_auth(&token)
        .json(&json!({
            "appraisal": "success",
            "answers": [{ "question_id": question["id"], "answer": "More tests" }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let review: Value = response.json().await.unwrap();
    assert_eq!(review["appraisal"], "success");

    // The peer sees the review and can rate it.
    let received: Value = app
        .client
        .get(app.url(&format!("/challenges/{}/received-reviews", challenge_id)))
        .bearer_auth(app.token(2, "learner"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(received.as_array().unwrap().len(), 1);
    assert_eq!(received[0]["answers"][0]["text"], "More tests");

    let response = app
        .client
        .put(app.url(&format!("/reviews/{}/evaluation", review_id)))
        .bearer_auth(app.token(2, "learner"))
        .json(&json!({ "rating": "positive" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let progress: Value = app
        .client
        .get(app.url(&format!("/challenges/{}", challenge_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["status"], 2);
    assert_eq!(progress["status_label"], "submitted");
}

#[tokio::test]
async fn blocked_learner_sees_status_three() {
    let app = spawn_app().await;
    let (_, ids) = create_chain(&app, 2).await;

    let mine = app
        .store
        .seed_elaboration(ids[0], 1, "mine", Some(Utc::now()))
        .await;
    app.store
        .seed_review(&mine, 2, Appraisal::Fail, Some(Utc::now()))
        .await;

    let progress: Value = app
        .client
        .get(app.url(&format!("/challenges/{}", ids[0])))
        .bearer_auth(app.token(1, "learner"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["status"], 3);

    let response = app
        .client
        .post(app.url(&format!("/challenges/{}/elaboration/submit", ids[1])))
        .bearer_auth(app.token(1, "learner"))
        .json(&json!({ "text": "skip ahead" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn missing_challenge_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/challenges/4242"))
        .bearer_auth(app.token(1, "learner"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    assert!(app.store.challenge_get(4242).await.unwrap().is_none());
}

#[tokio::test]
async fn open_assignment_is_returned_after_quorum() {
    let app = spawn_app().await;
    let (_, ids) = create_chain(&app, 1).await;
    let challenge_id = ids[0];
    let token = app.token(1, "learner");
    let aged = Some(Utc::now() - Duration::days(1));

    app.store.seed_elaboration(challenge_id, 1, "mine", aged).await;
    for peer in [2, 3] {
        let elaboration = app
            .store
            .seed_elaboration(challenge_id, peer, "peer work", aged)
            .await;
        app.store
            .seed_review(&elaboration, 1, Appraisal::Success, Some(Utc::now()))
            .await;
    }
    let last = app
        .store
        .seed_elaboration(challenge_id, 4, "peer work", aged)
        .await;

    let mut seen = Vec::new();
    for _ in 0..2 {
        let response = app
            .client
            .get(app.url(&format!("/challenges/{}/review", challenge_id)))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let assignment: Value = response.json().await.unwrap();
        assert_eq!(assignment["review"]["elaboration_id"], last.id);
        seen.push(assignment["review"]["id"].as_i64().unwrap());
    }
    assert_eq!(seen[0], seen[1]);

    // Once the third review is submitted the quorum refusal applies.
    let response = app
        .client
        .post(app.url(&format!("/reviews/{}/submit", seen[0])))
        .bearer_auth(&token)
        .json(&json!({ "appraisal": "success" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .get(app.url(&format!("/challenges/{}/review", challenge_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
