//! The registration page and the endpoint for creating a new user account.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use email_address::EmailAddress;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error, PasswordHash, Username, ValidatedPassword,
    app_state::create_cookie_key,
    auth::{DEFAULT_COOKIE_DURATION, create_user, log_in::is_logged_in, set_auth_cookie},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner,
        log_in_register, password_input,
    },
    timezone::get_local_offset,
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 14;

/// Error messages shown under each field of the registration form.
#[derive(Debug, Default)]
struct RegistrationErrors {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
}

impl RegistrationErrors {
    fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.confirm_password.is_none()
    }
}

fn text_input(
    label: &str,
    name: &str,
    type_: &str,
    value: &str,
    autocomplete: &str,
    error_message: Option<&str>,
) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            input
                type=(type_)
                name=(name)
                id=(name)
                autocomplete=(autocomplete)
                class=(FORM_TEXT_INPUT_STYLE)
                required
                value=(value);

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Confirm Password"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length);

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

fn registration_form(username: &str, email: &str, errors: &RegistrationErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #email, #password, #confirm-password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("Username", "username", "text", username, "username", errors.username.as_deref()))
            (text_input("Email", "email", "email", email, "email", errors.email.as_deref()))
            (password_input("", PASSWORD_INPUT_MIN_LENGTH, errors.password.as_deref()))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, errors.confirm_password.as_deref()))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page, or send users who are already logged in to the dashboard.
pub async fn get_register_page(jar: PrivateCookieJar) -> Response {
    if is_logged_in(&jar) {
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    let registration_form = registration_form("", "", &RegistrationErrors::default());
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl RegistrationState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(
        cookie_secret: &str,
        local_timezone: &str,
        db_connection: Arc<Mutex<Connection>>,
    ) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection,
        }
    }
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

fn get_internal_server_error_redirect() -> Response {
    (
        HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
        .into_response()
}

/// Handler for creating a new user via the POST method.
///
/// On success the auth cookie is set and the client is redirected to the dashboard.
/// Otherwise, the form is returned with an error message under each invalid field.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let mut errors = RegistrationErrors::default();

    let username = Username::new(&user_data.username)
        .inspect_err(|error| errors.username = Some(error.to_string()))
        .ok();

    let email = EmailAddress::from_str(user_data.email.trim())
        .inspect_err(|_| errors.email = Some(Error::InvalidEmail.to_string()))
        .ok();

    let user_inputs = [user_data.username.trim(), user_data.email.trim()];
    let validated_password = ValidatedPassword::new(&user_data.password, &user_inputs)
        .inspect_err(|error| errors.password = Some(error.to_string()))
        .ok();

    if user_data.password != user_data.confirm_password {
        errors.confirm_password = Some("Passwords do not match".to_owned());
    }

    let (Some(username), Some(email), Some(validated_password)) =
        (username, email, validated_password)
    else {
        return registration_form(&user_data.username, &user_data.email, &errors).into_response();
    };

    if !errors.is_empty() {
        return registration_form(&user_data.username, &user_data.email, &errors).into_response();
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return get_internal_server_error_redirect();
        }
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return get_internal_server_error_redirect();
            }
        };

        match create_user(username, email, password_hash, &connection) {
            Ok(user) => user,
            Err(Error::DuplicateUsername) => {
                let errors = RegistrationErrors {
                    username: Some(Error::DuplicateUsername.to_string()),
                    ..Default::default()
                };
                return registration_form(&user_data.username, &user_data.email, &errors)
                    .into_response();
            }
            Err(error) => {
                tracing::error!("An unhandled error occurred while inserting a new user: {error}");
                return get_internal_server_error_redirect();
            }
        }
    };

    tracing::info!("Registered user {} ({})", user.username, user.id);

    match set_auth_cookie(jar, user.id, state.cookie_duration, local_offset) {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");
            get_internal_server_error_redirect()
        }
    }
}


#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;

    use crate::{
        auth::{COOKIE_TOKEN, get_user_by_username},
        endpoints,
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{RegisterForm, RegistrationState, register_user};

    fn get_test_state() -> RegistrationState {
        RegistrationState::new(
            "42",
            "Etc/UTC",
            Arc::new(Mutex::new(get_test_connection())),
        )
    }

    fn get_test_server(state: RegistrationState) -> TestServer {
        let app = Router::new()
            .route(endpoints::USERS, post(register_user))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn register_form(username: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm.to_owned(),
        }
    }

    fn error_messages(html: &str) -> Vec<String> {
        let fragment = scraper::Html::parse_fragment(html);
        let p_selector = scraper::Selector::parse("p.text-red-500").unwrap();

        fragment
            .select(&p_selector)
            .map(|p| p.text().collect::<String>().trim().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn create_user_succeeds() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let response = server
            .post(endpoints::USERS)
            .form(&register_form(
                "alice",
                "alice@example.com",
                "iamtestingwhethericancreateanewuser",
                "iamtestingwhethericancreateanewuser",
            ))
            .await;

        response.assert_status_see_other();
        response.assert_header("hx-redirect", endpoints::DASHBOARD_VIEW);
        response.cookie(COOKIE_TOKEN);

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_username("alice", &connection).unwrap();
        assert_eq!(user.email.as_str(), "alice@example.com");
        assert!(
            user.password_hash
                .verify("iamtestingwhethericancreateanewuser")
                .unwrap()
        );
    }

    #[tokio::test]
    async fn create_user_fails_with_taken_username() {
        let state = get_test_state();
        create_test_user(&state.db_connection.lock().unwrap(), "alice");
        let server = get_test_server(state);

        let response = server
            .post(endpoints::USERS)
            .form(&register_form(
                "alice",
                "alice2@example.com",
                "averystrongandsecurepassword",
                "averystrongandsecurepassword",
            ))
            .await;

        response.assert_status_ok();
        assert_eq!(
            error_messages(&response.text()),
            vec!["A user with that username already exists."]
        );
    }

    #[tokio::test]
    async fn create_user_fails_with_invalid_username_and_email() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&register_form(
                "alice smith",
                "not an email",
                "averystrongandsecurepassword",
                "averystrongandsecurepassword",
            ))
            .await;

        response.assert_status_ok();
        assert_eq!(
            error_messages(&response.text()),
            vec![
                "Username may only contain letters, numbers, and @/./+/-/_ characters.",
                "Enter a valid email address.",
            ]
        );
    }

    #[tokio::test]
    async fn create_user_fails_when_password_is_weak() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&register_form("alice", "alice@example.com", "foo", "foo"))
            .await;

        let errors = error_messages(&response.text());
        assert_eq!(errors.len(), 1, "want 1 error, got {errors:?}");
        assert!(
            errors[0].to_lowercase().contains("password is too weak"),
            "'{}' does not contain the text 'password is too weak'",
            errors[0]
        );
    }

    #[tokio::test]
    async fn create_user_fails_when_passwords_do_not_match() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&register_form(
                "alice",
                "alice@example.com",
                "iamtestingwhethericancreateanewuser",
                "thisisadifferentpassword",
            ))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            error_messages(&response.text()),
            vec!["Passwords do not match"]
        );
    }
}
