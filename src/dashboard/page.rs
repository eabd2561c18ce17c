//! The dashboard page: this month's and all-time totals, recent expenses and charts.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    Amount, AppState, Error, UserID, Username,
    auth::get_user_by_id,
    dashboard::charts::{DashboardChart, DashboardChartData, charts_script, charts_view},
    date_range::month_range,
    endpoints::{self, format_endpoint},
    expense::{ExpenseRow, get_recent_expenses},
    html::{
        CARD_STYLE, CATEGORY_BADGE_STYLE, HeadElement, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base,
        format_currency,
    },
    navigation::NavBar,
    report::aggregation::{total_all_time, total_for_period},
    timezone::local_today,
};

/// How many of the latest expenses are listed on the dashboard.
const RECENT_EXPENSES_LIMIT: u32 = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The month `today` falls in.
pub(super) fn current_month(today: Date) -> Result<RangeInclusive<Date>, Error> {
    month_range(today.year(), today.month()).ok_or_else(|| {
        tracing::error!("Could not get the month containing {today}");
        Error::NotFound
    })
}

/// Display a page with an overview of the user's spending.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let month = current_month(today)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not get user {user_id}: {error}"))?;
    let monthly_total = total_for_period(user_id, &month, &connection)
        .inspect_err(|error| tracing::error!("Could not get this month's total: {error}"))?;
    let all_time_total = total_all_time(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not get the all-time total: {error}"))?;
    let recent_expenses = get_recent_expenses(user_id, RECENT_EXPENSES_LIMIT, &connection)
        .inspect_err(|error| tracing::error!("Could not get recent expenses: {error}"))?;
    let chart_data = DashboardChartData::build(user_id, &month, today, &connection)
        .inspect_err(|error| tracing::error!("Could not build dashboard charts: {error}"))?;

    Ok(dashboard_view(
        &user.username,
        monthly_total,
        all_time_total,
        &recent_expenses,
        &chart_data.charts(),
    )
    .into_response())
}

fn dashboard_view(
    username: &Username,
    monthly_total: Amount,
    all_time_total: Amount,
    recent_expenses: &[ExpenseRow],
    charts: &[DashboardChart],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                div
                {
                    h1 class="text-xl font-bold" { "Dashboard" }
                    p id="greeting" class="text-gray-500 dark:text-gray-400"
                    {
                        "Welcome back, " (username)
                    }
                }

                div class="grid grid-cols-1 sm:grid-cols-2 gap-4"
                {
                    div id="monthly-total" class=(CARD_STYLE)
                    {
                        span class="text-sm text-gray-500 dark:text-gray-400" { "This Month" }
                        span class="text-2xl font-bold" { (format_currency(monthly_total)) }
                    }

                    div id="all-time-total" class=(CARD_STYLE)
                    {
                        span class="text-sm text-gray-500 dark:text-gray-400" { "All Time" }
                        span class="text-2xl font-bold" { (format_currency(all_time_total)) }
                    }
                }

                (charts_view(charts))

                (recent_expenses_view(recent_expenses))
            }
        }
    };

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(charts),
    ];

    base("Dashboard", &scripts, &content)
}

fn recent_expenses_view(expenses: &[ExpenseRow]) -> Markup {
    html! {
        section id="recent-expenses" class="space-y-2"
        {
            div class="flex justify-between items-baseline"
            {
                h2 class="text-lg font-semibold" { "Recent Expenses" }

                a href=(endpoints::EXPENSES_VIEW) class=(LINK_STYLE) { "View all" }
            }

            @if expenses.is_empty() {
                p class="text-gray-500 dark:text-gray-400"
                {
                    "No expenses yet. "
                    a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE)
                    {
                        "Add your first expense"
                    }
                }
            } @else {
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
                        }
                    }

                    tbody
                    {
                        @for expense in expenses {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (expense.date) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    span class=(CATEGORY_BADGE_STYLE) { (expense.category_label) }
                                }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    a
                                        href=(format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id))
                                        class=(LINK_STYLE)
                                    {
                                        (expense.description)
                                    }
                                }
                                td class={(TABLE_CELL_STYLE) " text-right"}
                                {
                                    (format_currency(expense.amount))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
