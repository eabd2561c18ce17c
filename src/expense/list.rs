//! The page that lists a user's expenses with category and month filters.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Month;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    Amount, AppState, Error, UserID,
    category::{Category, CategoryId, get_available_categories},
    endpoints::{self, format_endpoint},
    expense::{ExpenseFilter, ExpenseRow, query_expenses},
    html::{
        BUTTON_SECONDARY_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        TABLE_STYLE, base, edit_delete_action_links, format_currency,
    },
    navigation::NavBar,
    timezone::local_today,
};

/// The max number of graphemes to display in the expense table rows before
/// truncating and displaying ellipses.
const MAX_DESCRIPTION_GRAPHEMES: usize = 32;

/// How many years back the year filter goes.
const YEARS_SHOWN: i32 = 5;

/// The state needed for the expenses page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw filter query parameters.
///
/// These are parsed leniently so that a bad value drops that filter instead
/// of rejecting the whole request.
#[derive(Debug, Default, Deserialize)]
pub struct ExpensesQuery {
    pub category: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
}

impl ExpensesQuery {
    fn to_filter(&self) -> ExpenseFilter {
        let category_id = parse_param::<CategoryId>("category", self.category.as_deref());
        let month = parse_param::<u8>("month", self.month.as_deref())
            .and_then(|month| Month::try_from(month).ok());
        let year = parse_param::<i32>("year", self.year.as_deref());

        ExpenseFilter {
            category_id,
            month,
            year,
        }
    }
}

fn parse_param<T: std::str::FromStr>(name: &str, value: Option<&str>) -> Option<T> {
    let value = value.map(str::trim).filter(|value| !value.is_empty())?;

    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid {name} query parameter \"{value}\"");
            None
        }
    }
}

/// Renders the user's expenses, most recent first, with the total of the listed expenses.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ExpensesQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let filter = query.to_filter();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let expenses = query_expenses(user_id, &filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve expenses: {error}"))?;
    let categories = get_available_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let total: Amount = expenses.iter().map(|expense| expense.amount).sum();
    let years = (today.year() - YEARS_SHOWN..=today.year()).rev().collect::<Vec<_>>();

    Ok(expenses_view(&expenses, total, &categories, &filter, &years).into_response())
}

fn expenses_view(
    expenses: &[ExpenseRow],
    total: Amount,
    categories: &[Category],
    filter: &ExpenseFilter,
    years: &[i32],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Expenses" }

                    a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE)
                    {
                        "Add Expense"
                    }
                }

                (filter_form(categories, filter, years))

                p id="expenses-total" class="text-lg font-semibold"
                {
                    "Total: " (format_currency(total))
                }

                @if expenses.is_empty() {
                    p class="text-gray-500 dark:text-gray-400" { "No expenses found." }
                } @else {
                    (expenses_table(expenses))
                }
            }
        }
    };

    base("Expenses", &[], &content)
}

fn filter_form(categories: &[Category], filter: &ExpenseFilter, years: &[i32]) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::EXPENSES_VIEW)
            class="flex flex-wrap gap-4 items-end"
        {
            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "All categories" }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[filter.category_id == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Month" }

                select name="month" id="month" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "Any month" }

                    @for month_number in 1..=12_u8 {
                        @if let Ok(month) = Month::try_from(month_number) {
                            option value=(month_number) selected[filter.month == Some(month)]
                            {
                                (month)
                            }
                        }
                    }
                }
            }

            div
            {
                label for="year" class=(FORM_LABEL_STYLE) { "Year" }

                select name="year" id="year" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "Any year" }

                    @for year in years {
                        option value=(year) selected[filter.year == Some(*year)] { (year) }
                    }
                }
            }

            div
            {
                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Filter" }
            }
        }
    }
}

fn expenses_table(expenses: &[ExpenseRow]) -> Markup {
    let table_row = |expense: &ExpenseRow| {
        let (description, full_description) = format_description(&expense.description);
        let edit_url = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
        let delete_url = format_endpoint(endpoints::EXPENSE, expense.id);
        let confirm_message = format!(
            "Are you sure you want to delete the expense '{}'? This cannot be undone.",
            expense.description
        );

        html! {
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (expense.date) }

                td class=(TABLE_CELL_STYLE)
                {
                    span class=(CATEGORY_BADGE_STYLE) { (expense.category_label) }
                }

                td class=(TABLE_CELL_STYLE) title=[full_description] { (description) }

                td class={(TABLE_CELL_STYLE) " text-right"} { (format_currency(expense.amount)) }

                td class=(TABLE_CELL_STYLE)
                {
                    (edit_delete_action_links(
                        Some(&edit_url),
                        &delete_url,
                        &confirm_message,
                        "closest tr",
                        "delete",
                    ))
                }
            }
        }
    };

    html! {
        table class=(TABLE_STYLE)
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                    th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                }
            }

            tbody
            {
                @for expense in expenses {
                    (table_row(expense))
                }
            }
        }
    }
}

fn format_description(description: &str) -> (String, Option<&str>) {
    let description_length = description.graphemes(true).count();

    if description_length <= MAX_DESCRIPTION_GRAPHEMES {
        (description.to_owned(), None)
    } else {
        let truncated: String = description
            .graphemes(true)
            .take(MAX_DESCRIPTION_GRAPHEMES - 3)
            .collect();
        (truncated + "...", Some(description))
    }
}


#[cfg(test)]
mod expenses_query_tests {
    use time::Month;

    use crate::expense::ExpenseFilter;

    use super::ExpensesQuery;

    #[test]
    fn parses_valid_parameters() {
        let query = ExpensesQuery {
            category: Some("3".to_owned()),
            month: Some("2".to_owned()),
            year: Some("2024".to_owned()),
        };

        assert_eq!(
            query.to_filter(),
            ExpenseFilter {
                category_id: Some(3),
                month: Some(Month::February),
                year: Some(2024),
            }
        );
    }

    #[test]
    fn drops_invalid_and_empty_parameters() {
        let query = ExpensesQuery {
            category: Some(String::new()),
            month: Some("13".to_owned()),
            year: Some("twenty".to_owned()),
        };

        assert_eq!(query.to_filter(), ExpenseFilter::default());
    }
}

#[cfg(test)]
mod expenses_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        Amount, User,
        category::{CategoryName, create_custom_category},
        expense::{NewExpense, create_expense},
        test_utils::{
            assert_valid_html, create_test_user, element_text, get_test_connection,
            parse_html_document,
        },
    };

    use super::{ExpensesPageState, ExpensesQuery, get_expenses_page};

    fn setup() -> (ExpensesPageState, User) {
        let connection = get_test_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
                .unwrap();

        for (user_id, cents, category_id, date) in [
            (alice.id, 450, Some(coffee.id), date!(2024 - 01 - 10)),
            (alice.id, 2000, None, date!(2024 - 01 - 20)),
            (alice.id, 500, Some(coffee.id), date!(2024 - 02 - 01)),
            (bob.id, 9900, None, date!(2024 - 01 - 15)),
        ] {
            create_expense(
                NewExpense {
                    user_id,
                    amount: Amount::from_cents(cents),
                    category_id,
                    description: format!("Expense of {cents} cents"),
                    date,
                },
                &connection,
            )
            .unwrap();
        }

        (
            ExpensesPageState {
                local_timezone: "Etc/UTC".to_owned(),
                db_connection: Arc::new(Mutex::new(connection)),
            },
            alice,
        )
    }

    fn count_rows(html: &scraper::Html) -> usize {
        html.select(&Selector::parse("tbody tr").unwrap()).count()
    }

    fn total_text(html: &scraper::Html) -> String {
        element_text(html, "#expenses-total")
    }

    #[tokio::test]
    async fn lists_only_the_users_expenses() {
        let (state, alice) = setup();

        let response = get_expenses_page(
            State(state),
            Extension(alice.id),
            Query(ExpensesQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(count_rows(&html), 3);
        assert!(total_text(&html).contains("$29.50"));
    }

    #[tokio::test]
    async fn filters_by_month_and_year() {
        let (state, alice) = setup();

        let response = get_expenses_page(
            State(state),
            Extension(alice.id),
            Query(ExpensesQuery {
                category: None,
                month: Some("1".to_owned()),
                year: Some("2024".to_owned()),
            }),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        assert_eq!(count_rows(&html), 2);
        assert!(total_text(&html).contains("$24.50"));
    }

    #[tokio::test]
    async fn uncategorized_expenses_are_labelled() {
        let (state, alice) = setup();

        let response = get_expenses_page(
            State(state),
            Extension(alice.id),
            Query(ExpensesQuery::default()),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        let page_text = html.root_element().text().collect::<String>();
        assert!(page_text.contains("Uncategorized"));
    }
}
