use axum::http::HeaderMap;

/// Best-effort identity of the calling client, used as a rate-limit key.
///
/// Prefers the first `X-Forwarded-For` entry, then `X-Real-IP`, and falls
/// back to the user agent.
pub fn client_identity(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(xff) = header("x-forwarded-for") {
        let first = xff.split(',').next().map(str::trim).unwrap_or_default();
        return if first.is_empty() {
            "unknown".to_string()
        } else {
            first.to_string()
        };
    }

    header("x-real-ip")
        .or_else(|| header("user-agent"))
        .unwrap_or("unknown")
        .to_string()
}
