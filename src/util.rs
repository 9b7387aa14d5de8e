use std::path::Path;
use std::time::Duration;

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Load environment overrides, then install the global tracing subscriber.
///
/// Env file lookup order: `ENV_FILE` / `ENVFILE` / `DOTENV_PATH`, then
/// `.envfile`, then `.env` in the working directory. Variables already set in
/// the process environment are never overwritten. The filter comes from
/// `RUST_LOG` (possibly set by the env file).
pub fn init_tracing() {
    let env_source = load_env_file();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::info!("Environment loaded from: {}", env_source);
}

fn load_env_file() -> String {
    for key in ["ENV_FILE", "ENVFILE", "DOTENV_PATH"] {
        if let Ok(p) = std::env::var(key) {
            let p = p.trim();
            if !p.is_empty() && Path::new(p).is_file() && dotenvy::from_filename(p).is_ok() {
                return format!("{p} ({key})");
            }
        }
    }
    if Path::new(".envfile").is_file() && dotenvy::from_filename(".envfile").is_ok() {
        return ".envfile".into();
    }
    match dotenvy::dotenv() {
        Ok(path) => path.display().to_string(),
        Err(_) => "none".into(),
    }
}

fn env_flag(key: &str) -> bool {
    truthy(std::env::var(key).ok())
}

fn truthy(value: Option<String>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim().to_ascii_lowercase();
        v == "1" || v == "true" || v == "yes" || v == "on"
    })
}

/// Build the backend HTTP client honoring proxy and timeout environment variables.
///
/// Environment:
/// - MESSAGES2CHAT_NO_PROXY = 1|true|yes|on    -> disable all proxies
/// - MESSAGES2CHAT_PROXY_URL = <url>           -> proxy for all schemes
/// - HTTP_PROXY / http_proxy                   -> HTTP proxy
/// - HTTPS_PROXY / https_proxy                 -> HTTPS proxy
/// - MESSAGES2CHAT_HTTP_TIMEOUT_SECONDS        -> overall request timeout (unset: none)
pub fn build_http_client_from_env() -> reqwest::Client {
    let mut builder = reqwest::Client::builder();

    if let Ok(secs) = std::env::var("MESSAGES2CHAT_HTTP_TIMEOUT_SECONDS") {
        if let Ok(n) = secs.trim().parse::<u64>() {
            builder = builder.timeout(Duration::from_secs(n));
        }
    }

    if env_flag("MESSAGES2CHAT_NO_PROXY") {
        builder = builder.no_proxy();
    } else {
        let proxies: [(&str, fn(&str) -> reqwest::Result<reqwest::Proxy>); 3] = [
            ("MESSAGES2CHAT_PROXY_URL", |u| reqwest::Proxy::all(u)),
            ("HTTP_PROXY", |u| reqwest::Proxy::http(u)),
            ("HTTPS_PROXY", |u| reqwest::Proxy::https(u)),
        ];
        for (key, make) in proxies {
            let value = std::env::var(key).or_else(|_| std::env::var(key.to_ascii_lowercase()));
            if let Ok(url) = value {
                let u = url.trim();
                if u.is_empty() {
                    continue;
                }
                match make(u) {
                    Ok(p) => builder = builder.proxy(p),
                    Err(e) => {
                        tracing::warn!(error = %e, variable = key, "ignoring invalid proxy url")
                    }
                }
            }
        }
    }

    builder = builder.user_agent(format!("messages2chat/{}", env!("CARGO_PKG_VERSION")));

    builder.build().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default HTTP client");
        reqwest::Client::new()
    })
}

/// Build a JSON error response with the given HTTP status and message.
pub fn error_response(status: StatusCode, msg: &str) -> Response {
    let body = serde_json::json!({ "error": { "message": msg } });
    (status, axum::Json(body)).into_response()
}

/// Build a CORS layer from environment variables.
///
/// Environment variables:
/// - CORS_ALLOWED_ORIGINS: "*" or comma-separated origins (e.g., "https://a.com, https://b.com")
/// - CORS_ALLOWED_METHODS: "*" or comma-separated methods (e.g., "GET,POST,OPTIONS")
/// - CORS_ALLOWED_HEADERS: "*" or comma-separated request header names
/// - CORS_ALLOW_CREDENTIALS: enable with 1,true,yes,on
/// - CORS_MAX_AGE: max age in seconds (u64)
///
/// Unset or unparsable lists fall back to permissive (Any). With credentials
/// enabled a wildcard is not allowed, so those fall back to mirroring the
/// request instead.
pub fn cors_layer_from_env() -> tower_http::cors::CorsLayer {
    cors_layer_from(|key| std::env::var(key).ok())
}

fn cors_layer_from(lookup: impl Fn(&str) -> Option<String>) -> tower_http::cors::CorsLayer {
    use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

    let credentials = truthy(lookup("CORS_ALLOW_CREDENTIALS"));
    let mut layer = CorsLayer::new();

    let origins = lookup("CORS_ALLOWED_ORIGINS");
    layer = match parse_list(origins.as_deref(), |p| http::HeaderValue::from_str(p).ok()) {
        Some(vals) => layer.allow_origin(AllowOrigin::list(vals)),
        None if credentials => layer.allow_origin(AllowOrigin::mirror_request()),
        None => layer.allow_origin(Any),
    };
    let methods = lookup("CORS_ALLOWED_METHODS");
    layer = match parse_list(methods.as_deref(), |p| {
        http::Method::from_bytes(p.to_ascii_uppercase().as_bytes()).ok()
    }) {
        Some(vals) => layer.allow_methods(AllowMethods::list(vals)),
        None if credentials => layer.allow_methods(AllowMethods::mirror_request()),
        None => layer.allow_methods(Any),
    };
    let headers = lookup("CORS_ALLOWED_HEADERS");
    layer = match parse_list(headers.as_deref(), |p| {
        http::header::HeaderName::try_from(p).ok()
    }) {
        Some(vals) => layer.allow_headers(AllowHeaders::list(vals)),
        None if credentials => layer.allow_headers(AllowHeaders::mirror_request()),
        None => layer.allow_headers(Any),
    };

    if credentials {
        layer = layer.allow_credentials(true);
    }
    if let Some(n) = lookup("CORS_MAX_AGE").and_then(|s| s.trim().parse::<u64>().ok()) {
        layer = layer.max_age(Duration::from_secs(n));
    }

    layer
}

/// Parse a comma-separated list. `None` for unset, `"*"`, or nothing valid.
fn parse_list<T>(raw: Option<&str>, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    let raw = raw?.trim();
    if raw == "*" {
        return None;
    }
    let vals: Vec<T> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(parse)
        .collect();
    if vals.is_empty() {
        None
    } else {
        Some(vals)
    }
}
