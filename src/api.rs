pub(crate) mod assessments;
pub(crate) mod attempts;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod router;
pub(crate) mod security;

use axum::http::HeaderMap;

use crate::services::attempts::ClientMeta;

/// Pulls the caller's address and agent out of proxy headers. Best effort,
/// both fields are optional.
pub(crate) fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .filter(|value| !value.is_empty());

    ClientMeta { ip_address, user_agent }
}
