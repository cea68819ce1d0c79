#![cfg(feature = "web")]

use axum::{
    Form,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::error::AppError;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// Login form data
///
/// Missing fields deserialize as empty strings so the gate can reject them
/// with a readable message instead of a form rejection.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

fn token_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Serve the login page HTML
///
/// A browser that already holds the current token goes straight to the dashboard.
pub async fn serve_login_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if state
        .auth
        .is_authorized(jar.get(TOKEN_COOKIE).map(|cookie| cookie.value()))
    {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    Ok(Html(state.views.login(None, "")?).into_response())
}

/// Handle user login requests
///
/// Any non-empty username and password sign in. The issued token is stored by
/// the auth gate and handed to the browser as a cookie.
///
/// # Returns
/// * `Response` - Redirect to the dashboard, or the login page with an inline error
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.auth.login(&form.username, &form.password) {
        Ok(token) => Ok((jar.add(token_cookie(token)), Redirect::to("/dashboard")).into_response()),
        Err(e) => {
            let html = state.views.login(Some(&e.to_string()), &form.username)?;
            Ok((StatusCode::UNAUTHORIZED, Html(html)).into_response())
        }
    }
}

/// Handle user logout
///
/// Clears the token in the gate and in the browser, then redirects to the login page.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    state.auth.logout();
    let cookie = Cookie::build(TOKEN_COOKIE).path("/").build();
    (jar.remove(cookie), Redirect::to("/login"))
}

/// Authentication middleware
///
/// Lets the request through only when the browser presents the gate's
/// current token; anything else is redirected to `/login` without a message.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if state
        .auth
        .is_authorized(jar.get(TOKEN_COOKIE).map(|cookie| cookie.value()))
    {
        return next.run(request).await;
    }

    log::debug!("Unauthenticated request for {}", request.uri().path());
    Redirect::to("/login").into_response()
}
