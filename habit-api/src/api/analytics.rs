//! Metrics, dashboard and analytics tabs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Duration;
use habit_common::query::{
    analytics_summary, category_analytics, daily_metrics, filter_and_sort, trend_analytics,
    AnalyticsSummary, CategoryStats, DailyMetrics, DailyTrend, HabitListing, HabitQuery,
};
use habit_common::{time, Event};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::habits::SourceParams;
use super::{day_range, source_name};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const RECENT_EVENT_DAYS: u32 = 7;
const MAX_LISTING_LIMIT: usize = 1000;

fn default_trend_days() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct TrendParams {
    #[serde(default = "default_trend_days")]
    pub days: i64,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HabitsTabParams {
    pub source: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsTabParams {
    pub source: Option<String>,
    #[serde(default = "default_trend_days")]
    pub time_range: i64,
    pub category_filter: Option<String>,
    #[serde(default = "default_true")]
    pub include_trends: bool,
    #[serde(default = "default_true")]
    pub include_categories: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub daily_metrics: DailyMetrics,
    pub recent_events: Vec<Event>,
    pub upcoming_today: Vec<String>,
    pub available_sources: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsTabResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_analytics: Option<BTreeMap<String, CategoryStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_analytics: Option<Vec<DailyTrend>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AnalyticsSummary>,
}

async fn last_day_metrics(state: &AppState, source: Option<&str>) -> DailyMetrics {
    let (start, end) = time::trailing_window(time::now(), Duration::hours(24));
    let events = state.aggregator.fetch_by_range(start, end, source).await;
    daily_metrics(&events)
}

async fn trends(state: &AppState, days: u32, source: Option<&str>) -> Vec<DailyTrend> {
    let (start, end) = time::trailing_window(time::now(), Duration::days(i64::from(days)));
    let events = state.aggregator.fetch_by_range(start, end, source).await;
    trend_analytics(&events)
}

/// GET /api/metrics/daily
///
/// Totals over the trailing 24 hours.
pub async fn get_daily_metrics(
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> Json<DailyMetrics> {
    Json(last_day_metrics(&state, source_name(&params.source)).await)
}

/// GET /api/dashboard and GET /api/tabs/overview
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> Json<DashboardResponse> {
    let source = source_name(&params.source);
    let (daily_metrics, recent_events, upcoming_today, available_sources) = tokio::join!(
        last_day_metrics(&state, source),
        state.aggregator.fetch_recent(RECENT_EVENT_DAYS, source),
        state.aggregator.upcoming_today(),
        state.aggregator.available_sources(),
    );

    Json(DashboardResponse {
        daily_metrics,
        recent_events,
        upcoming_today,
        available_sources,
    })
}

/// GET /api/analytics/categories
pub async fn get_category_analytics(
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> Json<BTreeMap<String, CategoryStats>> {
    let events = state.aggregator.fetch_all(source_name(&params.source)).await;
    Json(category_analytics(&events))
}

/// GET /api/analytics/trends
pub async fn get_trend_analytics(
    State(state): State<AppState>,
    Query(params): Query<TrendParams>,
) -> ApiResult<Json<Vec<DailyTrend>>> {
    let days = day_range("days", params.days)?;
    Ok(Json(trends(&state, days, source_name(&params.source)).await))
}

/// GET /api/tabs/habits
pub async fn get_habits_tab(
    State(state): State<AppState>,
    Query(params): Query<HabitsTabParams>,
) -> ApiResult<Json<HabitListing>> {
    let limit = match params.limit {
        None => None,
        Some(n) if (1..=MAX_LISTING_LIMIT as i64).contains(&n) => Some(n as usize),
        Some(n) => {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LISTING_LIMIT, n
            )))
        }
    };

    let defaults = HabitQuery::default();
    let query = HabitQuery {
        search: params.search,
        category: params.category,
        sort_by: params.sort_by.unwrap_or(defaults.sort_by),
        sort_order: params.sort_order.unwrap_or(defaults.sort_order),
        limit,
    };

    let events = state.aggregator.fetch_all(source_name(&params.source)).await;
    Ok(Json(filter_and_sort(events, query)))
}

/// GET /api/tabs/analytics
pub async fn get_analytics_tab(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsTabParams>,
) -> ApiResult<Json<AnalyticsTabResponse>> {
    let time_range = day_range("time_range", params.time_range)?;
    let source = source_name(&params.source);

    let category_analytics = if params.include_categories {
        let events = state.aggregator.fetch_all(source).await;
        let mut categories = category_analytics(&events);
        if let Some(filter) = params.category_filter.as_deref() {
            if let Some(stats) = categories.remove(filter) {
                categories = BTreeMap::from([(filter.to_string(), stats)]);
            }
        }
        Some(categories)
    } else {
        None
    };

    let trend_analytics = if params.include_trends {
        Some(trends(&state, time_range, source).await)
    } else {
        None
    };

    let summary = category_analytics
        .as_ref()
        .map(|categories| analytics_summary(categories, time_range, params.category_filter.clone()));

    Ok(Json(AnalyticsTabResponse {
        category_analytics,
        trend_analytics,
        summary,
    }))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/metrics/daily", get(get_daily_metrics))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/tabs/overview", get(get_dashboard))
        .route("/api/analytics/categories", get(get_category_analytics))
        .route("/api/analytics/trends", get(get_trend_analytics))
        .route("/api/tabs/habits", get(get_habits_tab))
        .route("/api/tabs/analytics", get(get_analytics_tab))
}
