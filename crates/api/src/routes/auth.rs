use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::google::{GoogleOAuth, TokenResponse};
use crate::session::{
    cookie, expired_cookie, SessionClaims, REFRESH_COOKIE, SESSION_COOKIE, STATE_COOKIE,
    STATE_TTL_SECS,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/google", get(start_sign_in))
        .route("/api/auth/google/callback", get(callback))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/session", get(session))
        .route("/api/auth/logout", post(logout))
}

fn google(state: &AppState) -> ApiResult<&GoogleOAuth> {
    state.google().ok_or(ApiError::NotConfigured("Google sign-in"))
}

fn cookie_value<'a>(cookies: &'a Option<TypedHeader<Cookie>>, name: &str) -> Option<&'a str> {
    cookies.as_ref().and_then(|TypedHeader(c)| c.get(name))
}

/// Redirect to Google's consent screen with a fresh CSRF state.
async fn start_sign_in(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let oauth = google(&state)?;
    let csrf = Uuid::new_v4().simple().to_string();
    Ok((
        AppendHeaders([(SET_COOKIE, cookie(STATE_COOKIE, &csrf, STATE_TTL_SECS))]),
        Redirect::to(&oauth.authorize_url(&csrf)),
    ))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Exchange the authorization code, start a session and send the browser on.
async fn callback(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<impl IntoResponse> {
    let oauth = google(&state)?;
    if let Some(error) = params.error {
        return Err(ApiError::BadRequest(format!("Google sign-in failed: {error}")));
    }
    let expected = cookie_value(&cookies, STATE_COOKIE);
    if expected.is_none() || expected != params.state.as_deref() {
        tracing::warn!("OAuth callback with mismatched state");
        return Err(ApiError::BadRequest("invalid OAuth state".into()));
    }
    let code = params
        .code
        .ok_or_else(|| ApiError::BadRequest("missing authorization code".into()))?;

    let tokens = oauth.exchange_code(&code).await?;
    let user = oauth.user_info(&tokens.access_token).await?;
    let session = state
        .sessions()
        .issue(&user)
        .map_err(|e| ApiError::Internal(format!("failed to sign session: {e}")))?;
    tracing::info!(sub = %user.sub, "signed in with Google");

    let ttl = state.sessions().ttl_secs();
    let mut set_cookies = vec![
        (SET_COOKIE, cookie(SESSION_COOKIE, &session, ttl)),
        (SET_COOKIE, expired_cookie(STATE_COOKIE)),
    ];
    if let Some(refresh_token) = &tokens.refresh_token {
        set_cookies.push((SET_COOKIE, cookie(REFRESH_COOKIE, refresh_token, ttl)));
    }

    Ok((
        AppendHeaders(set_cookies),
        Redirect::to(&state.config().post_login_redirect),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// New access token for a refresh token given in the body or, failing that,
/// the one stored at sign-in.
async fn refresh(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    body: Bytes,
) -> ApiResult<Json<TokenResponse>> {
    let oauth = google(&state)?;
    let request: RefreshRequest = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let refresh_token = request
        .refresh_token
        .as_deref()
        .or_else(|| cookie_value(&cookies, REFRESH_COOKIE))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("refreshToken is required".into()))?;

    Ok(Json(oauth.refresh(refresh_token).await?))
}

async fn session(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
) -> ApiResult<Json<SessionClaims>> {
    let token = cookie_value(&cookies, SESSION_COOKIE).ok_or(ApiError::Unauthorized)?;
    let claims = state.sessions().verify(token).map_err(|e| {
        tracing::debug!("rejected session token: {e}");
        ApiError::Unauthorized
    })?;
    Ok(Json(claims))
}

async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([
            (SET_COOKIE, expired_cookie(SESSION_COOKIE)),
            (SET_COOKIE, expired_cookie(REFRESH_COOKIE)),
        ]),
        Json(serde_json::json!({ "status": "ok" })),
    )
}
