//! HTTP tests for the radio content routes under `/api`
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use shoplens::api::{build_router, AppState};
use shoplens::application::dto::{
    BlogPostFixture, CategoryFixture, EventFixture, RadioFixtures, StationFixture,
};
use shoplens::application::services::{RadioService, RecommendationService};
use shoplens::config::{CatalogConfig, ServerConfig, VectorDbConfig};
use shoplens::infrastructure::ocr::TesseractBackend;
use shoplens::infrastructure::persistence::SqliteRadioRepository;
use shoplens::infrastructure::vision::{CentroidClassifier, FastEmbedImageEmbedder, ImageModelKind};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

fn station(name: &str, category: &str, listeners: i64) -> StationFixture {
    StationFixture {
        name: name.to_string(),
        description: format!("{} on air", name),
        stream_url: format!("http://stream.example/{}", name.to_lowercase().replace(' ', "-")),
        logo_url: None,
        category: Some(category.to_string()),
        country: "US".to_string(),
        language: "English".to_string(),
        quality: "128kbps".to_string(),
        listeners_count: listeners,
        is_active: true,
    }
}

fn event(station: &str, title: &str, starts_in_hours: i64, featured: bool) -> EventFixture {
    let start = Utc::now() + Duration::hours(starts_in_hours);
    EventFixture {
        station: station.to_string(),
        title: title.to_string(),
        description: String::new(),
        event_type: "show".to_string(),
        host: "DJ Test".to_string(),
        start_time: start,
        end_time: start + Duration::hours(2),
        is_featured: featured,
    }
}

fn post(title: &str, featured: bool, status: &str) -> BlogPostFixture {
    BlogPostFixture {
        title: title.to_string(),
        slug: None,
        author: "editor".to_string(),
        content: format!("{} body", title),
        excerpt: String::new(),
        tags: "radio".to_string(),
        status: status.to_string(),
        is_featured: featured,
        published_at: None,
    }
}

/// Test helper: router with seeded radio data and a user; returns the user's token
async fn setup_app() -> (Router, String) {
    let radio = RadioService::new(Box::new(SqliteRadioRepository::new_in_memory().unwrap()));
    radio
        .import_fixtures(&RadioFixtures {
            categories: vec![
                CategoryFixture {
                    name: "Jazz".to_string(),
                    description: "Smooth".to_string(),
                },
                CategoryFixture {
                    name: "Talk".to_string(),
                    description: String::new(),
                },
            ],
            stations: vec![
                station("Blue Note FM", "Jazz", 40),
                station("Late Talk", "Talk", 90),
                station("Quiet Room", "Jazz", 0),
            ],
            events: vec![
                event("Blue Note FM", "Morning Sessions", -1, false),
                event("Late Talk", "Call-in Hour", 3, true),
            ],
            blog_posts: vec![
                post("Welcome to the Station", true, "published"),
                post("Draft Notes", false, "draft"),
            ],
        })
        .await
        .unwrap();
    let (_, token) = radio.create_user("listener").await.unwrap();

    let missing = std::env::temp_dir().join("shoplens-radio-tests");
    let recommendations = RecommendationService::new(
        CatalogConfig {
            dataset_path: missing.join("raw.csv"),
            cleaned_dataset_path: missing.join("cleaned.csv"),
            ..CatalogConfig::default()
        },
        VectorDbConfig::default(),
        Arc::new(TesseractBackend::new(&Default::default())),
        Arc::new(CentroidClassifier::new(
            missing.join("model.json"),
            Arc::new(FastEmbedImageEmbedder::new(ImageModelKind::default(), None)),
        )),
    );

    let state = AppState {
        recommendations: Arc::new(recommendations),
        radio: Arc::new(radio),
        server: ServerConfig::default(),
    };
    (build_router(state), token)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn names(body: &Value, field: &str) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item[field].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_categories() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/api/categories?ordering=-name", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body, "name"), vec!["Talk", "Jazz"]);

    let id = body[1]["id"].as_i64().unwrap();
    let (status, body) = send(&app, request("GET", &format!("/api/categories/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Smooth");

    let (status, body) = send(&app, request("GET", "/api/categories/999", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Not found."}));
}

#[tokio::test]
async fn test_station_listing_and_filters() {
    let (app, _) = setup_app().await;

    let (_, body) = send(&app, request("GET", "/api/stations", None, None)).await;
    assert_eq!(names(&body, "name"), vec!["Late Talk", "Blue Note FM", "Quiet Room"]);

    let jazz_id = body[1]["category_id"].as_i64().unwrap();
    let uri = format!("/api/stations?category={}&ordering=name", jazz_id);
    let (_, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(names(&body, "name"), vec!["Blue Note FM", "Quiet Room"]);

    let (_, body) = send(&app, request("GET", "/api/stations?search=talk", None, None)).await;
    assert_eq!(names(&body, "name"), vec!["Late Talk"]);

    let (_, body) = send(&app, request("GET", "/api/stations/popular", None, None)).await;
    assert_eq!(body[0]["name"], "Late Talk");
}

#[tokio::test]
async fn test_listener_counts() {
    let (app, _) = setup_app().await;
    let (_, body) = send(&app, request("GET", "/api/stations?search=quiet", None, None)).await;
    let id = body[0]["id"].as_i64().unwrap();

    let uri = format!("/api/stations/{}/decrement_listeners", id);
    let (status, body) = send(&app, request("POST", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listeners_count"], 0);

    let uri = format!("/api/stations/{}/increment_listeners", id);
    let (_, body) = send(&app, request("POST", &uri, None, None)).await;
    assert_eq!(body["listeners_count"], 1);

    let (status, _) = send(&app, request("POST", "/api/stations/999/increment_listeners", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authentication() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/api/profile/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Authentication credentials were not provided.");

    let (status, body) = send(&app, request("GET", "/api/profile/me", Some("bogus"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token.");
}

#[tokio::test]
async fn test_profile_and_favorites() {
    let (app, token) = setup_app().await;
    let token = Some(token.as_str());

    let (_, body) = send(&app, request("GET", "/api/profile", token, None)).await;
    assert_eq!(body, json!([]));

    let (status, body) = send(&app, request("GET", "/api/profile/me", token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "listener");
    assert_eq!(body["favorite_station_ids"], json!([]));

    let update = json!({"bio": "Night owl"});
    let (status, body) = send(&app, request("PUT", "/api/profile/me", token, Some(update))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Night owl");

    let (_, stations) = send(&app, request("GET", "/api/stations", None, None)).await;
    let id = stations[0]["id"].as_i64().unwrap();
    let uri = format!("/api/stations/{}/toggle_favorite", id);

    let (status, _) = send(&app, request("POST", &uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = send(&app, request("POST", &uri, token, None)).await;
    assert_eq!(body, json!({"is_favorited": true, "message": "Station added to favorites"}));

    let (_, body) = send(&app, request("GET", "/api/profile/favorites", token, None)).await;
    assert_eq!(names(&body, "name"), vec!["Late Talk"]);

    let (_, body) = send(&app, request("POST", &uri, token, None)).await;
    assert_eq!(body["message"], "Station removed from favorites");

    let (_, body) = send(&app, request("GET", "/api/profile/favorites", token, None)).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_profile_detail_update_and_delete() {
    let (app, token) = setup_app().await;
    let token = Some(token.as_str());

    let (_, body) = send(&app, request("GET", "/api/profile/me", token, None)).await;
    let uri = format!("/api/profile/{}", body["id"].as_i64().unwrap());

    let (status, _) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, request("GET", &uri, token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "listener");

    let update = json!({"avatar_url": "http://img.example/me.png"});
    let (status, body) = send(&app, request("PATCH", &uri, token, Some(update))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["avatar_url"], "http://img.example/me.png");

    let (status, _) = send(&app, request("GET", "/api/profile/9999", token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request("DELETE", &uri, token, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, request("GET", &uri, token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Not found."}));

    let (_, body) = send(&app, request("GET", "/api/profile", token, None)).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_events() {
    let (app, _) = setup_app().await;

    let (_, body) = send(&app, request("GET", "/api/events", None, None)).await;
    assert_eq!(names(&body, "title"), vec!["Morning Sessions", "Call-in Hour"]);
    assert_eq!(body[0]["station_name"], "Blue Note FM");

    let (_, body) = send(&app, request("GET", "/api/events/live", None, None)).await;
    assert_eq!(names(&body, "title"), vec!["Morning Sessions"]);

    let (_, body) = send(&app, request("GET", "/api/events/upcoming", None, None)).await;
    assert_eq!(names(&body, "title"), vec!["Call-in Hour"]);

    let (_, body) = send(&app, request("GET", "/api/events/featured", None, None)).await;
    assert_eq!(names(&body, "title"), vec!["Call-in Hour"]);

    let (_, body) = send(&app, request("GET", "/api/events?search=sessions", None, None)).await;
    let id = body[0]["id"].as_i64().unwrap();
    let (status, body) = send(&app, request("GET", &format!("/api/events/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["host"], "DJ Test");
}

#[tokio::test]
async fn test_blog() {
    let (app, _) = setup_app().await;

    let (_, body) = send(&app, request("GET", "/api/blog", None, None)).await;
    assert_eq!(names(&body, "slug"), vec!["welcome-to-the-station"]);

    let (status, body) = send(&app, request("GET", "/api/blog/welcome-to-the-station", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "published");

    let (status, _) = send(&app, request("GET", "/api/blog/draft-notes", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, request("GET", "/api/blog/featured", None, None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, request("GET", "/api/blog/recent", None, None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_listening_history() {
    let (app, token) = setup_app().await;
    let token = Some(token.as_str());
    let (_, stations) = send(&app, request("GET", "/api/stations", None, None)).await;
    let station_id = stations[1]["id"].as_i64().unwrap();

    let entry = json!({"station": station_id, "duration_minutes": 45});
    let (status, body) = send(&app, request("POST", "/api/history", token, Some(entry))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["station_name"], "Blue Note FM");
    let history_id = body["id"].as_i64().unwrap();

    let entry = json!({"station": 999, "duration_minutes": 5});
    let (status, body) = send(&app, request("POST", "/api/history", token, Some(entry))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["station"].is_array());

    let (_, body) = send(&app, request("GET", "/api/history/stats", token, None)).await;
    assert_eq!(body["total_sessions"], 1);
    assert_eq!(body["total_minutes"], 45);
    assert_eq!(body["total_hours"], 0.8);
    assert_eq!(body["most_listened_stations"][0]["count"], 1);

    let uri = format!("/api/history/{}", history_id);
    let (status, _) = send(&app, request("DELETE", &uri, token, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request("GET", &uri, token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, request("GET", "/api/history", token, None)).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_contact() {
    let (app, _) = setup_app().await;

    let message = json!({
        "name": "Ada",
        "email": "ada@example.com",
        "subject": "Requests",
        "message": "More jazz please"
    });
    let (status, body) = send(&app, request("POST", "/api/contact", None, Some(message))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["message"],
        "Thank you for your message. We will get back to you soon!"
    );
    assert_eq!(body["data"]["email"], "ada@example.com");

    let (status, body) = send(&app, request("POST", "/api/contact", None, Some(json!({"name": "Ada"})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["email"], json!(["This field is required."]));
}

#[tokio::test]
async fn test_malformed_requests_get_field_errors() {
    let (app, token) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/api/stations?category=", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = send(&app, request("GET", "/api/stations?category=jazz", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"category": ["Select a valid choice. That choice is not one of the available choices."]})
    );

    let (status, body) = send(&app, request("GET", "/api/events?is_featured=True", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body, "title"), vec!["Call-in Hour"]);

    let (status, body) = send(
        &app,
        request("POST", "/api/history", Some(&token), Some(json!({"duration_minutes": 5}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"station": ["This field is required."]}));

    let (status, body) = send(
        &app,
        request("POST", "/api/history", Some(&token), Some(json!({"station": "jazz"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"station": ["A valid integer is required."]}));

    let broken = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("JSON parse error - "));

    let plain = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let (status, body) = send(&app, plain).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["detail"], "Unsupported media type \"text/plain\" in request.");
}
