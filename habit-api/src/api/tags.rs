//! Tag validation, suggestion and taxonomy endpoints

use axum::{
    extract::Query,
    routing::{get, post},
    Json, Router,
};
use habit_common::tags::{
    approved_tags, suggest_for_name, validate_and_normalize, CONTEXTUAL_TAGS, TAG_HIERARCHY,
    UMBRELLA_TAGS,
};
use habit_common::ValidationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const MAX_SUGGESTIONS: i64 = 20;

fn default_suggestion_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    pub habit_name: String,
    #[serde(default = "default_suggestion_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct ValidationRules {
    pub requires_umbrella_tag: bool,
    pub must_be_kebab_case: bool,
    pub approved_umbrellas: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub habit_name: String,
    pub suggested_tags: Vec<String>,
    pub validation_rules: ValidationRules,
}

#[derive(Debug, Serialize)]
pub struct FormatRequirements {
    pub case_format: &'static str,
    pub requires_umbrella: bool,
    pub allows_multiple_umbrellas: bool,
}

#[derive(Debug, Serialize)]
pub struct ApprovedTagsResponse {
    pub umbrella_tags: Vec<&'static str>,
    pub all_approved_tags: Vec<&'static str>,
    pub tag_hierarchy: BTreeMap<&'static str, Vec<&'static str>>,
    pub contextual_tags: Vec<&'static str>,
    pub format_requirements: FormatRequirements,
}

/// POST /api/tags/validate
pub async fn validate_tags(Json(raw_tags): Json<Vec<String>>) -> Json<ValidationResult> {
    Json(validate_and_normalize(&raw_tags))
}

/// GET /api/tags/suggest
pub async fn suggest_tags(Query(params): Query<SuggestParams>) -> ApiResult<Json<SuggestResponse>> {
    if !(1..=MAX_SUGGESTIONS).contains(&params.limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_SUGGESTIONS, params.limit
        )));
    }

    let suggested_tags = suggest_for_name(&params.habit_name, params.limit as usize);
    Ok(Json(SuggestResponse {
        habit_name: params.habit_name,
        suggested_tags,
        validation_rules: ValidationRules {
            requires_umbrella_tag: true,
            must_be_kebab_case: true,
            approved_umbrellas: UMBRELLA_TAGS.to_vec(),
        },
    }))
}

/// GET /api/tags/approved
pub async fn approved() -> Json<ApprovedTagsResponse> {
    let tag_hierarchy = TAG_HIERARCHY
        .iter()
        .map(|(umbrella, specific)| (*umbrella, specific.to_vec()))
        .collect();

    Json(ApprovedTagsResponse {
        umbrella_tags: UMBRELLA_TAGS.to_vec(),
        all_approved_tags: approved_tags(),
        tag_hierarchy,
        contextual_tags: CONTEXTUAL_TAGS.to_vec(),
        format_requirements: FormatRequirements {
            case_format: "kebab-case",
            requires_umbrella: true,
            allows_multiple_umbrellas: true,
        },
    })
}

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags/validate", post(validate_tags))
        .route("/api/tags/suggest", get(suggest_tags))
        .route("/api/tags/approved", get(approved))
}
