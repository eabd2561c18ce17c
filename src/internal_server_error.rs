//! The 500 page.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// What went wrong and what the user or admin can do about it.
pub struct InternalServerError {
    description: &'static str,
    fix: String,
}

impl InternalServerError {
    /// The server was started with a timezone name that `time-tz` does not know.
    pub fn invalid_timezone(timezone: &str) -> Self {
        Self {
            description: "Invalid Timezone Settings",
            fix: format!(
                "Could not get local timezone \"{timezone}\". Check your server settings and \
                make sure the timezone is a valid, canonical name such as \"Pacific/Auckland\"."
            ),
        }
    }
}

impl Default for InternalServerError {
    fn default() -> Self {
        Self {
            description: "Sorry, something went wrong.",
            fix: "Try again later or check the server logs".to_owned(),
        }
    }
}

impl IntoResponse for InternalServerError {
    fn into_response(self) -> Response {
        let page = error_view("Internal Server Error", "500", self.description, &self.fix);

        (StatusCode::INTERNAL_SERVER_ERROR, Html(page.into_string())).into_response()
    }
}

/// Where htmx endpoints send the browser after an unexpected error.
pub async fn get_internal_server_error_page() -> Response {
    InternalServerError::default().into_response()
}
