//! The page and endpoint for editing an existing expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
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
    endpoints::{self, format_endpoint},
    expense::{
        Expense, ExpenseId,
        form::{
            ExpenseForm, ExpenseFormDefaults, ExpenseFormErrors, ExpenseFormRejection,
            expense_form_fields, validate_expense_form,
        },
        get_expense, update_expense,
    },
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, LINK_STYLE, base, dollar_input_styles},
    navigation::NavBar,
};

/// The state needed to edit an expense.
#[derive(Debug, Clone)]
pub struct EditExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the edit form filled in with the expense's current details.
///
/// Expenses that belong to another user are reported as not found.
pub async fn get_edit_expense_page(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<EditExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let expense = get_expense(expense_id, user_id, &connection).inspect_err(|error| {
        if *error != Error::NotFound {
            tracing::error!("Failed to retrieve expense {expense_id}: {error}");
        }
    })?;

    let categories = get_available_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    Ok(edit_expense_view(&expense, &categories).into_response())
}

/// Validates the form and replaces the expense's details.
pub async fn edit_expense_endpoint(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<EditExpenseState>,
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

    let changes = match validate_expense_form(&form, user_id, &connection) {
        Ok(changes) => changes,
        Err(ExpenseFormRejection::Invalid(errors)) => {
            return match get_available_categories(user_id, &connection) {
                Ok(categories) => edit_expense_form(
                    expense_id,
                    &ExpenseFormDefaults::from(&form),
                    &categories,
                    &errors,
                )
                .into_response(),
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

    match update_expense(expense_id, &changes, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::UpdateMissingExpense) => {
            tracing::warn!("User {user_id} tried to update missing expense {expense_id}");
            Error::UpdateMissingExpense.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not update expense {expense_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn edit_expense_view(expense: &Expense, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::EDIT_EXPENSE_VIEW).into_html();
    let amount = expense.amount.to_string();
    let defaults = ExpenseFormDefaults {
        amount: Some(&amount),
        date: expense.date,
        description: &expense.description,
        category_id: expense.category_id,
    };
    let form = edit_expense_form(
        expense.id,
        &defaults,
        categories,
        &ExpenseFormErrors::default(),
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Expense" }
            (form)

            a href=(endpoints::EXPENSES_VIEW) class={"mt-4 " (LINK_STYLE)} { "Cancel" }
        }
    };

    base("Edit Expense", &[dollar_input_styles()], &content)
}

fn edit_expense_form(
    expense_id: ExpenseId,
    defaults: &ExpenseFormDefaults<'_>,
    categories: &[Category],
    errors: &ExpenseFormErrors,
) -> Markup {
    html! {
        form
            hx-put=(format_endpoint(endpoints::EXPENSE, expense_id))
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (expense_form_fields(defaults, categories, errors))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Expense" }
        }
    }
}
