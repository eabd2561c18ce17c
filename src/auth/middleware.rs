//! Route guards that require a valid auth cookie.
//!
//! Authenticated requests get the user's [UserID](crate::UserID) as a request
//! extension, so handlers can take `Extension(user_id): Extension<UserID>`.
//! Each authenticated response also refreshes the auth cookie so that active
//! users stay logged in.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE, response::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::{Duration, UtcOffset};

use crate::{
    AppState, UserID,
    auth::{
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    timezone::get_local_offset,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How long the auth cookie stays valid after each authenticated request.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Redirect to the log-in page with a full page load.
///
/// Route handlers can use `Extension(user_id): Extension<UserID>` to get the
/// logged-in user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    guard(state, request, next, |log_in_url| {
        Redirect::to(&log_in_url).into_response()
    })
    .await
}

/// Like [auth_guard], but for routes called by htmx, which only follows
/// redirects given in the `HX-Redirect` header.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard(state, request, next, |log_in_url| {
        (HxRedirect(log_in_url), StatusCode::OK).into_response()
    })
    .await
}

async fn guard(
    state: AuthState,
    request: Request,
    next: Next,
    redirect_to_log_in: impl Fn(String) -> Response,
) -> Response {
    let log_in_url = log_in_url_for(&request);

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!(
            "Invalid timezone {}, redirecting to log in page.",
            state.local_timezone
        );
        return redirect_to_log_in(log_in_url);
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not read the cookie jar: {error:?}");
            return redirect_to_log_in(log_in_url);
        }
    };

    let Some(user_id) = authenticated_user(&jar) else {
        return redirect_to_log_in(log_in_url);
    };

    parts.extensions.insert(user_id);
    let response = next.run(Request::from_parts(parts, body)).await;

    let (mut parts, body) = response.into_parts();
    let jar = refresh_cookie(jar, state.cookie_duration, local_offset);
    append_set_cookie_headers(&mut parts, jar);

    Response::from_parts(parts, body)
}

/// The log-in URL that brings the user back to the page they were on.
///
/// Falls back to the dashboard when the current page cannot be used, e.g. an
/// htmx request that is missing its `HX-Current-URL` header.
fn log_in_url_for(request: &Request) -> String {
    build_log_in_redirect_url(request).unwrap_or_else(|| {
        tracing::warn!(
            "Could not build a redirect URL for {}, falling back to the dashboard.",
            request.uri().path()
        );

        build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    })
}

fn authenticated_user(jar: &PrivateCookieJar) -> Option<UserID> {
    match get_token_from_cookies(jar) {
        Ok(token) if token.is_expired() => {
            tracing::debug!("Auth token for user {} has expired.", token.user_id);
            None
        }
        Ok(token) => Some(token.user_id),
        Err(_) => None,
    }
}

fn refresh_cookie(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> PrivateCookieJar {
    match extend_auth_cookie_duration_if_needed(jar.clone(), duration, local_offset) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not extend the auth cookie: {error}");
            jar
        }
    }
}

fn append_set_cookie_headers(parts: &mut Parts, jar: PrivateCookieJar) {
    for value in jar.into_response().headers().get_all(SET_COOKIE) {
        parts.headers.append(SET_COOKIE, value.to_owned());
    }
}
