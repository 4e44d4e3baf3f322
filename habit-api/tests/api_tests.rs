//! Integration tests for habit-api HTTP endpoints
//!
//! The router is driven in-process with `oneshot`; sources are the fixture
//! adapter plus small in-memory doubles.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use habit_api::aggregator::SourceAggregator;
use habit_api::error::SourceError;
use habit_api::sources::{CalendarFeed, MockSource};
use habit_api::{build_router, AppState};
use habit_common::config::TomlConfig;
use habit_common::Event;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

struct FixedCalendar(Vec<String>);

#[async_trait]
impl CalendarFeed for FixedCalendar {
    fn name(&self) -> &str {
        "fixed_calendar"
    }

    async fn try_upcoming_today(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.0.clone())
    }
}

fn event(id: &str, name: &str, date: &str, duration: u32, categories: &[&str]) -> Event {
    Event {
        id: id.to_string(),
        name: name.to_string(),
        timestamp: date.to_string(),
        participants: None,
        duration_minutes: duration,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        source: None,
    }
}

/// Test helper: fixture source only, no database, no calendar
fn setup_app() -> axum::Router {
    let mut aggregator = SourceAggregator::new();
    aggregator.register(Arc::new(MockSource::new()));
    build_router(AppState::new(aggregator, None, None, TomlConfig::default()))
}

/// Test helper: fixture source plus a second source sharing one id
fn setup_two_source_app() -> axum::Router {
    let mut aggregator = SourceAggregator::new();
    aggregator.register(Arc::new(MockSource::new()));
    aggregator.register(Arc::new(MockSource::with_events(
        "backup",
        vec![
            event("cal_001", "Morning Workout (edited)", "2025-01-14T06:00:00Z", 75, &["fitness"]),
            event("bk_1", "Laundry", "2025-01-12T09:00:00Z", 40, &["home", "laundry"]),
        ],
    )));
    aggregator.set_calendar(Arc::new(FixedCalendar(vec!["6:00 PM - Gym".to_string()])));
    build_router(AppState::new(aggregator, None, None, TomlConfig::default()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Service endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let response = setup_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "habit-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_root_lists_available_sources() {
    let response = setup_app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "Habit Tracker API");
    assert_eq!(body["available_sources"], json!(["mock_data"]));
}

#[tokio::test]
async fn test_buildinfo_fields() {
    let response = setup_app().oneshot(get("/api/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    for field in ["version", "git_hash", "build_timestamp", "build_profile"] {
        assert!(body[field].is_string(), "missing {}", field);
    }
}

// =============================================================================
// Sources
// =============================================================================

#[tokio::test]
async fn test_sources_reports_primary() {
    let response = setup_two_source_app().oneshot(get("/api/sources")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["available_sources"], json!(["mock_data", "backup"]));
    assert_eq!(body["primary_source"], "mock_data");
}

#[tokio::test]
async fn test_set_primary_unknown_is_404() {
    let response = setup_app()
        .oneshot(json_request("PUT", "/api/sources/primary", json!({"name": "nope"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_set_primary_switches_default_listing() {
    let app = setup_two_source_app();

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/api/sources/primary", json!({"name": "backup"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["primary_source"], "backup");

    let response = app.oneshot(get("/api/habits")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let habits = body.as_array().unwrap();
    assert_eq!(habits.len(), 2);
    assert!(habits.iter().all(|h| h["source"] == "backup"));
}

#[tokio::test]
async fn test_database_status_without_database_is_503() {
    let response = setup_app()
        .oneshot(get("/api/sources/database/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Habits
// =============================================================================

#[tokio::test]
async fn test_list_habits_wire_format() {
    let response = setup_app().oneshot(get("/api/habits")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let habits = body.as_array().unwrap();
    assert_eq!(habits.len(), 6);

    let first = &habits[0];
    assert_eq!(first["id"], "cal_001");
    assert_eq!(first["date"], "2025-01-14T06:00:00.000Z");
    assert_eq!(first["duration"], 60);
    assert_eq!(first["participants"], Value::Null);
    assert_eq!(first["categories"], json!(["fitness", "morning"]));
    assert_eq!(first["source"], "mock_data");
}

#[tokio::test]
async fn test_unknown_source_is_empty_not_error() {
    let response = setup_app()
        .oneshot(get("/api/habits?source=does_not_exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!([]));
}

#[tokio::test]
async fn test_all_sources_merges_and_dedupes() {
    let response = setup_two_source_app()
        .oneshot(get("/api/habits?source=all"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let habits = body.as_array().unwrap();

    // 6 fixture events + 2 backup events, one id shared
    assert_eq!(habits.len(), 7);
    let shared: Vec<_> = habits.iter().filter(|h| h["id"] == "cal_001").collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0]["name"], "Morning Workout (edited)");
    assert_eq!(shared[0]["source"], "backup");
}

#[tokio::test]
async fn test_recent_days_validation() {
    for uri in ["/api/habits/recent?days=0", "/api/habits/recent?days=366"] {
        let response = setup_app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }

    let response = setup_app()
        .oneshot(get("/api/habits/recent?days=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(extract_json(response.into_body()).await.is_array());
}

#[tokio::test]
async fn test_today_is_array() {
    let response = setup_app().oneshot(get("/api/habits/today")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(extract_json(response.into_body()).await.is_array());
}

#[tokio::test]
async fn test_create_without_database_is_503() {
    let body = json!({
        "id": "new_1",
        "name": "Evening Walk",
        "date": "2025-01-15T19:00:00Z",
        "duration": 25,
        "categories": ["transportation", "walking-errand"]
    });
    let response = setup_app()
        .oneshot(json_request("POST", "/api/habits", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_create_with_blank_name_is_400() {
    let body = json!({"id": "x", "name": " ", "date": "2025-01-15", "duration": 0});
    let response = setup_app()
        .oneshot(json_request("POST", "/api/habits", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Metrics and analytics
// =============================================================================

#[tokio::test]
async fn test_daily_metrics_shape() {
    let response = setup_app().oneshot(get("/api/metrics/daily")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    // Fixture dates are long past, so the trailing 24 hours are empty
    assert_eq!(body["total_events"], 0);
    assert_eq!(body["total_duration"], 0);
    assert_eq!(body["average_duration"], 0.0);
    assert_eq!(body["categories_count"], json!({}));
}

#[tokio::test]
async fn test_dashboard_without_calendar_uses_fallback() {
    let response = setup_app().oneshot(get("/api/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["upcoming_today"],
        json!(["Evening meditation", "Reading session"])
    );
    assert!(body["recent_events"].is_array());
    assert!(body["daily_metrics"].is_object());
    assert_eq!(body["available_sources"], json!(["mock_data"]));
}

#[tokio::test]
async fn test_overview_uses_calendar_feed() {
    let response = setup_two_source_app()
        .oneshot(get("/api/tabs/overview"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["upcoming_today"], json!(["6:00 PM - Gym"]));
}

#[tokio::test]
async fn test_category_analytics() {
    let response = setup_app()
        .oneshot(get("/api/analytics/categories"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["food"]["count"], 3);
    assert_eq!(body["food"]["total_duration"], 255);
    assert_eq!(body["fitness"]["count"], 2);
    assert_eq!(body["fitness"]["average_duration"], 45.0);
    assert_eq!(body["fitness"]["events"][0]["name"], "Morning Workout");
}

#[tokio::test]
async fn test_trend_days_validation() {
    let response = setup_app()
        .oneshot(get("/api/analytics/trends?days=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_habits_tab_sort_and_limit() {
    let response = setup_app()
        .oneshot(get("/api/tabs/habits?sort_by=duration&sort_order=asc&limit=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let names: Vec<_> = body["habits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Evening Run", "Grocery Shopping"]);
    assert_eq!(body["total_count"], 6);
    assert_eq!(body["applied_filters"]["sort_by"], "duration");
    assert!(body["available_categories"]
        .as_array()
        .unwrap()
        .contains(&json!("cooking")));
}

#[tokio::test]
async fn test_habits_tab_search_and_category() {
    let response = setup_app()
        .oneshot(get("/api/tabs/habits?search=COOK&category=food"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    // Default sort: date descending
    let ids: Vec<_> = body["habits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["cal_003", "cal_006"]);
    assert_eq!(body["filtered_count"], 2);
}

#[tokio::test]
async fn test_habits_tab_limit_bounds() {
    let response = setup_app()
        .oneshot(get("/api/tabs/habits?limit=1001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analytics_tab_category_filter() {
    let response = setup_app()
        .oneshot(get(
            "/api/tabs/analytics?category_filter=cooking&include_trends=false",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let categories = body["category_analytics"].as_object().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories["cooking"]["count"], 2);
    assert!(body.get("trend_analytics").is_none());
    assert_eq!(body["summary"]["total_categories"], 1);
    assert_eq!(body["summary"]["category_filter"], "cooking");
    assert_eq!(body["summary"]["time_range_days"], 30);
}

#[tokio::test]
async fn test_analytics_tab_unknown_filter_keeps_all() {
    let response = setup_app()
        .oneshot(get("/api/tabs/analytics?category_filter=gardening&include_trends=false"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body["category_analytics"].as_object().unwrap().len() > 1);
}

#[tokio::test]
async fn test_analytics_tab_without_categories_has_no_summary() {
    let response = setup_app()
        .oneshot(get("/api/tabs/analytics?include_categories=false&time_range=7"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body.get("category_analytics").is_none());
    assert!(body.get("summary").is_none());
    assert!(body["trend_analytics"].is_array());
}

// =============================================================================
// Tags
// =============================================================================

#[tokio::test]
async fn test_validate_tags_normalizes() {
    let response = setup_app()
        .oneshot(json_request(
            "POST",
            "/api/tags/validate",
            json!(["Health", "Meal Prep"]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["normalized_tags"], json!(["health", "meal-prep"]));
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn test_validate_tags_requires_umbrella() {
    let response = setup_app()
        .oneshot(json_request("POST", "/api/tags/validate", json!(["cooking"])))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["is_valid"], false);
    assert!(body["suggestions"]
        .as_array()
        .unwrap()
        .contains(&json!("Consider adding umbrella tag(s): food")));
}

#[tokio::test]
async fn test_suggest_tags() {
    let response = setup_app()
        .oneshot(get("/api/tags/suggest?habit_name=Gym%20session&limit=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["habit_name"], "Gym session");
    assert_eq!(body["suggested_tags"], json!(["health", "exercise"]));
    assert_eq!(body["validation_rules"]["requires_umbrella_tag"], true);
}

#[tokio::test]
async fn test_suggest_limit_bounds() {
    let response = setup_app()
        .oneshot(get("/api/tags/suggest?habit_name=run&limit=21"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approved_tags() {
    let response = setup_app().oneshot(get("/api/tags/approved")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(
        body["umbrella_tags"],
        json!(["health", "food", "home", "transportation"])
    );
    assert_eq!(body["all_approved_tags"].as_array().unwrap().len(), 19);
    assert_eq!(body["tag_hierarchy"]["home"], json!(["cleaning", "laundry", "bathroom"]));
    assert_eq!(body["contextual_tags"], json!(["cost-saving", "restock"]));
    assert_eq!(body["format_requirements"]["case_format"], "kebab-case");
}

// =============================================================================
// Calendar
// =============================================================================

#[tokio::test]
async fn test_calendar_auth_status_without_calendar() {
    let response = setup_app()
        .oneshot(get("/api/calendar/auth-status"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["message"], "Calendar source not initialized");
}

#[tokio::test]
async fn test_calendar_auth_url_without_calendar_is_500() {
    let response = setup_app()
        .oneshot(get("/api/calendar/auth-url"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_callback_without_calendar_redirects_with_error() {
    let response = setup_app()
        .oneshot(get("/auth/google/callback?code=abc&state=xyz"))
        .await
        .unwrap();
    assert!(response.status().is_redirection());

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("http://localhost:3000/?calendar_auth=error"));
}

#[tokio::test]
async fn test_upcoming_endpoint() {
    let response = setup_two_source_app()
        .oneshot(get("/api/calendar/upcoming"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["upcoming_events"], json!(["6:00 PM - Gym"]));
}
