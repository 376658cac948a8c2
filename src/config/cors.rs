use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Origin of the kiosk front end in local development.
pub const DEFAULT_KIOSK_ORIGIN: &str = "http://localhost:3000";

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

/// The kiosk posts JSON codes and staff pages send a bearer token in the
/// `Authorization` header. No cookies cross origins, so credentials stay off.
pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origin_values(allowed_origins)))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(PREFLIGHT_MAX_AGE)
}

/// Splits a comma separated origin list, dropping blanks.
pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect()
}

fn origin_values(origins: &[String]) -> Vec<HeaderValue> {
    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: ignoring invalid origin '{origin}': {e}");
                None
            }
        })
        .collect();

    if values.is_empty() {
        tracing::warn!("CORS: no kiosk origin configured, cross-origin requests will be refused");
    } else {
        tracing::info!(origins = ?origins, "CORS: kiosk origins allowed");
    }

    values
}
