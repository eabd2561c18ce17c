//! The page and endpoint for recording a new expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    category::{Category, get_available_categories},
    endpoints,
    expense::{
        create_expense,
        form::{
            ExpenseForm, ExpenseFormDefaults, ExpenseFormErrors, ExpenseFormRejection,
            expense_form_fields, validate_expense_form,
        },
    },
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, dollar_input_styles},
    navigation::NavBar,
    timezone::local_today,
};

/// The state needed for the new expense page and endpoint.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the page for recording a new expense, with today's date filled in.
pub async fn get_new_expense_page(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_available_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let defaults = ExpenseFormDefaults {
        amount: None,
        date: today,
        description: "",
        category_id: None,
    };

    Ok(new_expense_view(&defaults, &categories).into_response())
}

/// Validates the form and creates the expense.
///
/// Invalid forms are rendered again with a message under each invalid field.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let new_expense = match validate_expense_form(&form, user_id, &connection) {
        Ok(new_expense) => new_expense,
        Err(ExpenseFormRejection::Invalid(errors)) => {
            return match get_available_categories(user_id, &connection) {
                Ok(categories) => {
                    new_expense_form(&ExpenseFormDefaults::from(&form), &categories, &errors)
                        .into_response()
                }
                Err(error) => {
                    tracing::error!("Failed to retrieve categories: {error}");
                    error.into_alert_response()
                }
            };
        }
        Err(ExpenseFormRejection::Internal(error)) => {
            tracing::error!("Could not validate the expense form: {error}");
            return error.into_alert_response();
        }
    };

    match create_expense(new_expense, &connection) {
        Ok(expense) => {
            tracing::debug!("User {user_id} created expense {}", expense.id);

            (
                HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not create expense: {error}");
            error.into_alert_response()
        }
    }
}

fn new_expense_view(defaults: &ExpenseFormDefaults<'_>, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_EXPENSE_VIEW).into_html();
    let form = new_expense_form(defaults, categories, &ExpenseFormErrors::default());

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Add Expense" }
            (form)
        }
    };

    base("Add Expense", &[dollar_input_styles()], &content)
}

fn new_expense_form(
    defaults: &ExpenseFormDefaults<'_>,
    categories: &[Category],
    errors: &ExpenseFormErrors,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::EXPENSES_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (expense_form_fields(defaults, categories, errors))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Expense" }
        }
    }
}

#[cfg(test)]
mod new_expense_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};

    use crate::{
        category::{CategoryName, create_custom_category},
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_select,
            assert_form_submit_button, assert_hx_endpoint, assert_valid_html, create_test_user,
            get_test_connection, must_get_form, parse_html_document,
        },
    };

    use super::{CreateExpenseState, get_new_expense_page};

    #[tokio::test]
    async fn render_page_with_available_categories() {
        let connection = get_test_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
                .unwrap();
        let golf = create_custom_category(CategoryName::new_unchecked("Golf"), bob.id, &connection)
            .unwrap();
        let state = CreateExpenseState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_new_expense_page(State(state), Extension(alice.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::EXPENSES_API, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "date", "date");
        assert_form_submit_button(&form);
        let options = assert_form_select(&form, "category_id", None);
        assert!(options.contains(&coffee.id.to_string()));
        assert!(!options.contains(&golf.id.to_string()));
    }

    #[tokio::test]
    async fn invalid_timezone_is_an_error() {
        let connection = get_test_connection();
        let alice = create_test_user(&connection, "alice");
        let state = CreateExpenseState {
            local_timezone: "Not/A_Timezone".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let result = get_new_expense_page(State(state), Extension(alice.id)).await;

        assert!(result.is_err());
    }
}
