use std::sync::OnceLock;

use axum::extract::{MatchedPath, Request};
use regex::RegexSet;

/// Route template for a request.
///
/// Uses the router's `MatchedPath` when there is one. Unrouted requests
/// (fallbacks, preflights) get their literal path with id-like segments
/// collapsed to `:id` so they still group sensibly.
pub fn route_pattern(req: &Request) -> String {
    match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(req.uri().path()),
    }
}

fn id_patterns() -> &'static RegexSet {
    static IDS: OnceLock<RegexSet> = OnceLock::new();
    IDS.get_or_init(|| {
        RegexSet::new([
            r"^[0-9a-fA-F]{24}$", // ObjectId
            r"^[0-9a-fA-F-]{36}$", // UUID
            r"^\d+$",
            r"^[0-9a-fA-F]{12,}$",
        ])
        .expect("static id patterns compile")
    })
}

/// Replace id-like path segments with `:id`.
pub fn normalize_path(path: &str) -> String {
    let ids = id_patterns();
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && ids.is_match(segment) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
