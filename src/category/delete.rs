//! Category deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    alert::Alert,
    category::{CategoryId, delete_custom_category, get_category},
};

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle deletion of one of the user's custom categories. Returns success alert or error.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<DeleteCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let category = match get_category(category_id, &connection) {
        Ok(category) => category,
        Err(Error::NotFound) => {
            tracing::warn!("User {user_id} tried to delete missing category {category_id}");
            return Error::DeleteMissingCategory.into_alert_response();
        }
        Err(error) => {
            tracing::error!("Could not retrieve category {category_id}: {error}");
            return error.into_alert_response();
        }
    };

    match delete_custom_category(category_id, user_id, &connection) {
        Ok(_) => Alert::Success {
            message: "Category deleted successfully".to_owned(),
            details: format!("Expenses in {} are now uncategorized.", category.name),
        }
        .into_response(),
        Err(Error::DeleteMissingCategory) => {
            tracing::warn!("User {user_id} tried to delete missing category {category_id}");
            Error::DeleteMissingCategory.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting category {category_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
