//! Categories listing page.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    category::{Category, CategoryId, get_custom_categories, get_predefined_categories},
    endpoints,
    html::{
        CATEGORY_BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, edit_delete_action_links,
    },
    navigation::NavBar,
};

/// The state needed for the categories listing page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A category with how many of the user's expenses are filed under it.
#[derive(Debug, Clone)]
struct CategoryWithCount {
    category: Category,
    expense_count: u32,
}

/// Render the categories page with predefined and custom categories listed separately.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let predefined = get_predefined_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve predefined categories: {error}"))?;
    let custom = get_custom_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve custom categories: {error}"))?;

    let expenses_per_category = count_expenses_per_category(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not count expenses per category: {error}"))?;

    let with_counts = |categories: Vec<Category>| {
        categories
            .into_iter()
            .map(|category| CategoryWithCount {
                expense_count: *expenses_per_category.get(&category.id).unwrap_or(&0),
                category,
            })
            .collect::<Vec<_>>()
    };

    Ok(categories_view(&with_counts(predefined), &with_counts(custom)).into_response())
}

fn count_expenses_per_category(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashMap<CategoryId, u32>, Error> {
    let result: Result<HashMap<CategoryId, u32>, rusqlite::Error> = connection
        .prepare(
            "SELECT category_id, COUNT(1) FROM expense
            WHERE user_id = ?1 AND category_id IS NOT NULL
            GROUP BY category_id",
        )?
        .query_map([user_id.as_i64()], |row| {
            let category_id = row.get(0)?;
            let count = row.get(1)?;

            Ok((category_id, count))
        })?
        .collect();

    result.map_err(Error::from)
}

fn categories_view(predefined: &[CategoryWithCount], custom: &[CategoryWithCount]) -> Markup {
    let new_category_route = endpoints::NEW_CATEGORY_VIEW;
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-8 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Categories" }

                    a href=(new_category_route) class=(LINK_STYLE)
                    {
                        "Add Custom Category"
                    }
                }

                section id="predefined-categories" class="space-y-2"
                {
                    h2 class="text-lg font-semibold" { "Predefined Categories" }

                    (categories_table(predefined, false))
                }

                section id="custom-categories" class="space-y-2"
                {
                    h2 class="text-lg font-semibold" { "Your Categories" }

                    @if custom.is_empty() {
                        p class="text-gray-500 dark:text-gray-400"
                        {
                            "No custom categories yet. "
                            a href=(new_category_route) class=(LINK_STYLE)
                            {
                                "Create your first category"
                            }
                        }
                    } @else {
                        (categories_table(custom, true))
                    }
                }
            }
        }
    );

    base("Categories", &[], &content)
}

fn categories_table(categories: &[CategoryWithCount], deletable: bool) -> Markup {
    let table_row = |item: &CategoryWithCount| {
        let delete_url = endpoints::format_endpoint(endpoints::CATEGORY, item.category.id);
        let confirm_message = format!(
            "Are you sure you want to delete '{}'? {} expense(s) will become uncategorized.",
            item.category.name, item.expense_count
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    span class=(CATEGORY_BADGE_STYLE) { (item.category.name) }
                }

                td class=(TABLE_CELL_STYLE) { (item.expense_count) }

                @if deletable {
                    td class=(TABLE_CELL_STYLE)
                    {
                        (edit_delete_action_links(
                            None,
                            &delete_url,
                            &confirm_message,
                            "closest tr",
                            "delete",
                        ))
                    }
                }
            }
        )
    };

    html!(
        table class=(TABLE_STYLE)
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Expenses" }

                    @if deletable {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }
            }

            tbody
            {
                @for item in categories {
                    (table_row(item))
                }
            }
        }
    )
}

#[cfg(test)]
mod categories_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        Amount, PREDEFINED_CATEGORIES,
        category::{
            CategoryName, create_custom_category, get_categories_page, seed_predefined_categories,
        },
        endpoints,
        expense::{NewExpense, create_expense},
        test_utils::{
            assert_valid_html, create_test_user, get_test_connection, parse_html_document,
        },
    };

    use super::{CategoriesPageState, count_expenses_per_category};

    #[tokio::test]
    async fn lists_predefined_and_custom_categories_separately() {
        let connection = get_test_connection();
        seed_predefined_categories(&connection).unwrap();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
                .unwrap();
        create_custom_category(CategoryName::new_unchecked("Bikes"), bob.id, &connection).unwrap();
        let state = CategoriesPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_categories_page(State(state), Extension(alice.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let predefined_rows =
            Selector::parse("#predefined-categories tbody tr").unwrap();
        assert_eq!(
            html.select(&predefined_rows).count(),
            PREDEFINED_CATEGORIES.len()
        );

        let custom_rows = Selector::parse("#custom-categories tbody tr").unwrap();
        let rows = html.select(&custom_rows).collect::<Vec<_>>();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].text().collect::<String>().contains("Coffee"));

        let delete_button = Selector::parse("button[hx-delete]").unwrap();
        let buttons = html.select(&delete_button).collect::<Vec<_>>();
        assert_eq!(buttons.len(), 1, "only custom categories can be deleted");
        assert_eq!(
            buttons[0].value().attr("hx-delete"),
            Some(endpoints::format_endpoint(endpoints::CATEGORY, coffee.id).as_str())
        );
    }

    #[test]
    fn counts_only_the_users_expenses() {
        let connection = get_test_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
                .unwrap();
        for (user_id, category_id) in [
            (alice.id, Some(coffee.id)),
            (alice.id, Some(coffee.id)),
            (alice.id, None),
            (bob.id, None),
        ] {
            create_expense(
                NewExpense {
                    user_id,
                    amount: Amount::from_cents(300),
                    category_id,
                    description: String::new(),
                    date: date!(2024 - 02 - 29),
                },
                &connection,
            )
            .unwrap();
        }

        let counts = count_expenses_per_category(alice.id, &connection).unwrap();

        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&coffee.id], 2);
    }
}
