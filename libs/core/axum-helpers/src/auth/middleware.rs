use super::jwt::JwtAuth;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

/// Reads a token from `Authorization: Bearer <token>` or the `access_token` cookie.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    bearer.or_else(|| {
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| {
                cookies.split(';').find_map(|cookie| {
                    let (name, value) = cookie.trim().split_once('=')?;
                    (name == "access_token").then_some(value)
                })
            })
    })
}

/// Attaches [`super::JwtClaims`] to the request when a valid token is present.
///
/// Anonymous and invalid-token requests pass through untouched, so public
/// routes keep working; protected handlers enforce presence through
/// [`super::CurrentUser`].
pub async fn optional_jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = extract_token(request.headers()).map(|token| auth.verify_token(token));

    match claims {
        Some(Ok(claims)) => {
            request.extensions_mut().insert(claims);
        }
        Some(Err(e)) => tracing::debug!("Ignoring invalid JWT: {}", e),
        None => {}
    }

    next.run(request).await
}
