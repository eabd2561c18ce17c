//! The expense form fields and their validation, shared by the create and edit pages.

use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    Amount, Error, UserID,
    category::{Category, CategoryId, is_category_available},
    expense::{DESCRIPTION_MAX_LENGTH, NewExpense},
    html::{FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
};

/// The expense form as submitted by the client.
///
/// The amount is kept as text so that it can be validated as a two decimal
/// place number and shown back to the user unchanged if it is invalid.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseForm {
    pub amount: String,
    pub date: Date,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<CategoryId>,
}

/// Validation messages to show under each form field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExpenseFormErrors {
    pub amount: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl ExpenseFormErrors {
    fn is_empty(&self) -> bool {
        self.amount.is_none() && self.description.is_none() && self.category.is_none()
    }
}

/// The values to fill the form fields in with.
pub struct ExpenseFormDefaults<'a> {
    pub amount: Option<&'a str>,
    pub date: Date,
    pub description: &'a str,
    pub category_id: Option<CategoryId>,
}

impl<'a> From<&'a ExpenseForm> for ExpenseFormDefaults<'a> {
    fn from(form: &'a ExpenseForm) -> Self {
        Self {
            amount: Some(&form.amount),
            date: form.date,
            description: &form.description,
            category_id: form.category_id,
        }
    }
}

/// The reason an expense form could not be turned into a [NewExpense].
#[derive(Debug, PartialEq)]
pub enum ExpenseFormRejection {
    /// One or more fields are invalid and the form should be shown again.
    Invalid(ExpenseFormErrors),
    /// Something went wrong on the server while checking the form.
    Internal(Error),
}

/// Check the submitted form and build the expense for `user_id`.
///
/// # Errors
/// Returns [ExpenseFormRejection::Invalid] with every field error if:
/// - the amount is not a number with at most two decimal places, or is not greater than zero,
/// - the description is longer than [DESCRIPTION_MAX_LENGTH] characters,
/// - or the category is not one the user may use.
pub fn validate_expense_form(
    form: &ExpenseForm,
    user_id: UserID,
    connection: &Connection,
) -> Result<NewExpense, ExpenseFormRejection> {
    let mut errors = ExpenseFormErrors::default();

    let amount = match form.amount.parse::<Amount>() {
        Ok(amount) if amount.is_positive() => Some(amount),
        Ok(_) => {
            errors.amount = Some("Amount must be greater than zero.".to_owned());
            None
        }
        Err(error) => {
            errors.amount = Some(error.to_string());
            None
        }
    };

    let description = form.description.trim();
    if description.chars().count() > DESCRIPTION_MAX_LENGTH {
        errors.description = Some(Error::DescriptionTooLong(DESCRIPTION_MAX_LENGTH).to_string());
    }

    if let Some(category_id) = form.category_id {
        match is_category_available(category_id, user_id, connection) {
            Ok(true) => {}
            Ok(false) => errors.category = Some("Select a valid category.".to_owned()),
            Err(error) => return Err(ExpenseFormRejection::Internal(error)),
        }
    }

    match amount {
        Some(amount) if errors.is_empty() => Ok(NewExpense {
            user_id,
            amount,
            category_id: form.category_id,
            description: description.to_owned(),
            date: form.date,
        }),
        _ => Err(ExpenseFormRejection::Invalid(errors)),
    }
}

/// Render the amount, date, description and category inputs.
pub fn expense_form_fields(
    defaults: &ExpenseFormDefaults<'_>,
    categories: &[Category],
    errors: &ExpenseFormErrors,
) -> Markup {
    html! {
        div
        {
            label
                for="amount"
                class=(FORM_LABEL_STYLE)
            {
                "Amount"
            }

            div class="input-wrapper w-full"
            {
                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    placeholder="0.00"
                    min="0.01"
                    required
                    autofocus
                    value=[defaults.amount]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (field_error(errors.amount.as_deref()))
        }

        div
        {
            label
                for="date"
                class=(FORM_LABEL_STYLE)
            {
                "Date"
            }

            input
                name="date"
                id="date"
                type="date"
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="description"
                class=(FORM_LABEL_STYLE)
            {
                "Description"
            }

            input
                name="description"
                id="description"
                type="text"
                placeholder="What was it for?"
                maxlength=(DESCRIPTION_MAX_LENGTH)
                value=(defaults.description)
                class=(FORM_TEXT_INPUT_STYLE);

            (field_error(errors.description.as_deref()))
        }

        div
        {
            label
                for="category_id"
                class=(FORM_LABEL_STYLE)
            {
                "Category"
            }

            select
                name="category_id"
                id="category_id"
                class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" { "Select a category" }

                @for category in categories {
                    @if Some(category.id) == defaults.category_id {
                        option value=(category.id) selected { (category.name) }
                    } @else {
                        option value=(category.id) { (category.name) }
                    }
                }
            }

            (field_error(errors.category.as_deref()))
        }
    }
}

fn field_error(message: Option<&str>) -> Markup {
    html! {
        @if let Some(message) = message {
            p class={"mt-1 text-sm " (FORM_ERROR_STYLE)} { (message) }
        }
    }
}
