//! Tag taxonomy, normalization and validation
//!
//! The taxonomy is closed and known at compile time. Validation never fails
//! with an error value: problems are reported structurally in
//! [`ValidationResult`], where only `errors` affect validity.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Top-level categories; every valid tag set contains at least one
pub const UMBRELLA_TAGS: &[&str] = &["health", "food", "home", "transportation"];

/// Umbrella → specific tags
pub const TAG_HIERARCHY: &[(&str, &[&str])] = &[
    ("health", &["exercise", "workout"]),
    (
        "food",
        &["cooking", "meal-prep", "meal", "takeout", "grocery", "restock"],
    ),
    ("home", &["cleaning", "laundry", "bathroom"]),
    (
        "transportation",
        &["public-transit", "walking-errand", "rideshare", "cost-saving"],
    ),
];

/// Tags valid under several umbrellas; they do not count as "specific"
pub const CONTEXTUAL_TAGS: &[&str] = &["cost-saving", "restock"];

/// Keyword → suggested tags, matched as lowercase substrings of a habit name
///
/// Substring matching is a heuristic: "run" also matches "running" and "brunch".
const KEYWORD_TAGS: &[(&str, &[&str])] = &[
    ("workout", &["health", "exercise", "workout"]),
    ("gym", &["health", "exercise", "workout"]),
    ("run", &["health", "exercise"]),
    ("exercise", &["health", "exercise"]),
    ("fitness", &["health", "exercise"]),
    ("cook", &["food", "cooking"]),
    ("meal", &["food", "cooking", "meal"]),
    ("prep", &["food", "meal-prep"]),
    ("grocery", &["food", "grocery", "restock"]),
    ("trader", &["food", "grocery", "restock"]),
    ("safeway", &["food", "grocery", "restock"]),
    ("takeout", &["food", "takeout"]),
    ("pickup", &["food", "takeout"]),
    ("dinner", &["food", "cooking", "meal"]),
    ("lunch", &["food", "cooking", "meal"]),
    ("breakfast", &["food", "cooking", "meal"]),
    ("clean", &["home", "cleaning"]),
    ("laundry", &["home", "laundry", "cleaning"]),
    ("bathroom", &["home", "bathroom", "cleaning"]),
    ("house", &["home", "cleaning"]),
    ("bart", &["transportation", "public-transit"]),
    ("bus", &["transportation", "public-transit"]),
    ("train", &["transportation", "public-transit"]),
    ("transit", &["transportation", "public-transit"]),
    ("walk", &["transportation", "walking-errand"]),
    ("uber", &["transportation", "rideshare"]),
    ("lyft", &["transportation", "rideshare"]),
];

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\s]+").expect("valid regex"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));
static KEBAB_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+(-[a-z]+)*$").expect("valid regex"));

/// Outcome of [`validate_and_normalize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub normalized_tags: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Every approved tag: umbrellas followed by their specific tags
pub fn approved_tags() -> Vec<&'static str> {
    TAG_HIERARCHY
        .iter()
        .flat_map(|(umbrella, specific)| std::iter::once(*umbrella).chain(specific.iter().copied()))
        .collect()
}

pub fn is_umbrella(tag: &str) -> bool {
    UMBRELLA_TAGS.contains(&tag)
}

pub fn is_contextual(tag: &str) -> bool {
    CONTEXTUAL_TAGS.contains(&tag)
}

pub fn is_approved(tag: &str) -> bool {
    TAG_HIERARCHY
        .iter()
        .any(|(umbrella, specific)| *umbrella == tag || specific.contains(&tag))
}

/// Umbrella owning `tag` (an umbrella maps to itself)
pub fn umbrella_for(tag: &str) -> Option<&'static str> {
    TAG_HIERARCHY
        .iter()
        .find(|(umbrella, specific)| *umbrella == tag || specific.contains(&tag))
        .map(|(umbrella, _)| *umbrella)
}

/// Convert a raw tag to kebab-case
///
/// Lowercases, turns whitespace/underscore runs into a hyphen, drops every
/// character outside `[a-z0-9-]`, collapses hyphen runs and trims hyphens.
/// Idempotent, but not injective.
pub fn normalize(tag: &str) -> String {
    let lowered = tag.trim().to_lowercase();
    let hyphenated = SEPARATORS.replace_all(&lowered, "-");
    let stripped = DISALLOWED.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// True iff `tag` is lowercase letters joined by single hyphens
pub fn is_kebab_case(tag: &str) -> bool {
    KEBAB_CASE.is_match(tag)
}

/// Umbrellas implied by `tags` through the hierarchy that are not already present
fn suggest_umbrellas(tags: &[String]) -> Vec<&'static str> {
    let present: HashSet<&str> = tags.iter().map(String::as_str).collect();
    tags.iter()
        .filter_map(|tag| umbrella_for(tag))
        .filter(|umbrella| !present.contains(umbrella))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Normalize a tag list and check it against the taxonomy
pub fn validate_and_normalize<S: AsRef<str>>(tags: &[S]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    let mut seen = HashSet::new();
    let mut normalized_tags = Vec::new();
    for raw in tags {
        let raw: &str = raw.as_ref();
        if raw.trim().is_empty() {
            continue;
        }
        let normalized = normalize(raw);
        if normalized.is_empty() {
            continue;
        }
        if normalized != raw {
            suggestions.push(format!("'{}' normalized to '{}'", raw, normalized));
        }
        if seen.insert(normalized.clone()) {
            normalized_tags.push(normalized);
        }
    }

    let bad_format: Vec<&str> = normalized_tags
        .iter()
        .map(String::as_str)
        .filter(|tag| !is_kebab_case(tag))
        .collect();
    if !bad_format.is_empty() {
        errors.push(format!(
            "Tags must use kebab-case format: {}",
            bad_format.join(", ")
        ));
    }

    let unapproved: Vec<&str> = normalized_tags
        .iter()
        .map(String::as_str)
        .filter(|tag| !is_approved(tag))
        .collect();
    if !unapproved.is_empty() {
        warnings.push(format!("Unapproved tags detected: {}", unapproved.join(", ")));
        suggestions.push(
            "Consider using approved tags from the taxonomy or request new tag approval"
                .to_string(),
        );
    }

    let umbrella_count = normalized_tags.iter().filter(|t| is_umbrella(t)).count();
    if umbrella_count == 0 {
        errors.push(format!(
            "At least one umbrella tag is required ({})",
            UMBRELLA_TAGS.join(", ")
        ));
        let umbrellas = suggest_umbrellas(&normalized_tags);
        if !umbrellas.is_empty() {
            suggestions.push(format!(
                "Consider adding umbrella tag(s): {}",
                umbrellas.join(", ")
            ));
        }
    }

    let specific_count = normalized_tags
        .iter()
        .filter(|t| !is_umbrella(t) && !is_contextual(t))
        .count();
    if umbrella_count > 0 && specific_count == 0 {
        suggestions
            .push("Consider adding specific tags to provide more detail about the activity".to_string());
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        normalized_tags,
        errors,
        warnings,
        suggestions,
    }
}

/// Suggest tags for a habit name by keyword substring matching
///
/// The union of all matched tag lists is returned with umbrella tags first,
/// each group in first-match order, truncated to `limit`.
pub fn suggest_for_name(name: &str, limit: usize) -> Vec<String> {
    let lowered = name.to_lowercase();
    let mut matched: Vec<&'static str> = Vec::new();
    for (keyword, tags) in KEYWORD_TAGS {
        if lowered.contains(keyword) {
            for tag in tags.iter().copied() {
                if !matched.contains(&tag) {
                    matched.push(tag);
                }
            }
        }
    }

    let (umbrellas, specific): (Vec<&str>, Vec<&str>) =
        matched.into_iter().partition(|tag| is_umbrella(tag));
    umbrellas
        .into_iter()
        .chain(specific)
        .take(limit)
        .map(str::to_string)
        .collect()
}
