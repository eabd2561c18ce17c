//! The monthly report page and its CSV export.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Month};

use crate::{
    Amount, AppState, Error, UserID,
    date_range::month_range,
    endpoints,
    expense::{ExpenseFilter, ExpenseRow, query_expenses},
    html::{
        BUTTON_SECONDARY_STYLE, CARD_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, format_currency,
    },
    navigation::NavBar,
    report::{
        aggregation::{
            CategoryTotalWithCount, average_expense, group_by_category_with_count,
            total_for_period,
        },
        format::to_csv,
    },
    timezone::local_today,
};

/// How many years before the current year can be picked.
const YEARS_SHOWN: i32 = 5;

/// The state needed for the monthly report.
#[derive(Debug, Clone)]
pub struct MonthlyReportState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for MonthlyReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw query parameters for the monthly report.
#[derive(Debug, Default, Deserialize)]
pub struct MonthlyReportQuery {
    pub month: Option<String>,
    pub year: Option<String>,
    /// Set to "csv" to download the report.
    pub export: Option<String>,
}

impl MonthlyReportQuery {
    /// The selected month and year, falling back to those of `today` when
    /// missing or invalid.
    fn month_and_year(&self, today: Date) -> (Month, i32) {
        let month = match self.month.as_deref().map(str::trim) {
            None | Some("") => today.month(),
            Some(raw) => match raw.parse::<u8>().ok().and_then(|m| Month::try_from(m).ok()) {
                Some(month) => month,
                None => {
                    tracing::warn!("Invalid month \"{raw}\", using the current month");
                    today.month()
                }
            },
        };

        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => today.year(),
            Some(raw) => match raw.parse::<i32>() {
                Ok(year) if month_range(year, month).is_some() => year,
                _ => {
                    tracing::warn!("Invalid year \"{raw}\", using the current year");
                    today.year()
                }
            },
        };

        (month, year)
    }

    fn wants_csv(&self) -> bool {
        self.export.as_deref() == Some("csv")
    }
}

struct MonthlyReport {
    month: Month,
    year: i32,
    expenses: Vec<ExpenseRow>,
    total: Amount,
    average: Amount,
    breakdown: Vec<CategoryTotalWithCount>,
}

/// Renders a summary of one month's expenses, or downloads them as CSV when
/// `export=csv` is given.
pub async fn get_monthly_report(
    State(state): State<MonthlyReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthlyReportQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let (month, year) = query.month_and_year(today);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let report = build_report(user_id, month, year, &connection)
        .inspect_err(|error| tracing::error!("Could not build report for {month} {year}: {error}"))?;

    if query.wants_csv() {
        let body = to_csv(&report.expenses, report.total)
            .inspect_err(|error| tracing::error!("Could not write CSV report: {error}"))?;
        let filename = format!(
            "attachment; filename=\"expenses_{}_{}.csv\"",
            report.year, report.month as u8
        );

        return Ok((
            StatusCode::OK,
            [(CONTENT_TYPE, "text/csv".to_owned()), (CONTENT_DISPOSITION, filename)],
            body,
        )
            .into_response());
    }

    let years = (today.year() - YEARS_SHOWN..=today.year()).collect::<Vec<_>>();

    Ok(monthly_report_view(&report, &years).into_response())
}

fn build_report(
    user_id: UserID,
    month: Month,
    year: i32,
    connection: &Connection,
) -> Result<MonthlyReport, Error> {
    let window = month_range(year, month).ok_or(Error::NotFound)?;
    let filter = ExpenseFilter {
        category_id: None,
        month: Some(month),
        year: Some(year),
    };

    let expenses = query_expenses(user_id, &filter, connection)?;
    let total = total_for_period(user_id, &window, connection)?;
    let breakdown = group_by_category_with_count(user_id, &window, connection)?;
    let count = u32::try_from(expenses.len()).unwrap_or(u32::MAX);

    Ok(MonthlyReport {
        month,
        year,
        average: average_expense(total, count),
        expenses,
        total,
        breakdown,
    })
}

fn monthly_report_view(report: &MonthlyReport, years: &[i32]) -> Markup {
    let nav_bar = NavBar::new(endpoints::MONTHLY_REPORT_VIEW).into_html();
    let export_url = format!(
        "{}?month={}&year={}&export=csv",
        endpoints::MONTHLY_REPORT_VIEW,
        report.month as u8,
        report.year
    );

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Report for " (report.month) " " (report.year) }

                    a href=(export_url) class=(LINK_STYLE) { "Export CSV" }
                }

                (month_picker(report.month, report.year, years))

                div class="grid grid-cols-1 sm:grid-cols-3 gap-4"
                {
                    (summary_card("Total", &format_currency(report.total)))
                    (summary_card("Expenses", &report.expenses.len().to_string()))
                    (summary_card("Average", &format_currency(report.average)))
                }

                section id="category-breakdown" class="space-y-2"
                {
                    h2 class="text-lg font-semibold" { "By Category" }

                    @if report.breakdown.is_empty() {
                        p class="text-gray-500 dark:text-gray-400" { "No expenses this month." }
                    } @else {
                        (breakdown_table(&report.breakdown))
                    }
                }

                @if !report.expenses.is_empty() {
                    section id="monthly-expenses" class="space-y-2"
                    {
                        h2 class="text-lg font-semibold" { "Expenses" }

                        (expenses_table(&report.expenses))
                    }
                }
            }
        }
    };

    base("Monthly Report", &[], &content)
}

fn month_picker(selected_month: Month, selected_year: i32, years: &[i32]) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::MONTHLY_REPORT_VIEW)
            class="flex flex-wrap gap-4 items-end"
        {
            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Month" }

                select name="month" id="month" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for month_number in 1..=12_u8 {
                        @if let Ok(month) = Month::try_from(month_number) {
                            option value=(month_number) selected[month == selected_month]
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
                    @for year in years {
                        option value=(year) selected[*year == selected_year] { (year) }
                    }
                }
            }

            div
            {
                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "View" }
            }
        }
    }
}

fn summary_card(title: &str, value: &str) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            span class="text-sm text-gray-500 dark:text-gray-400" { (title) }
            span class="text-2xl font-bold" { (value) }
        }
    }
}

fn breakdown_table(breakdown: &[CategoryTotalWithCount]) -> Markup {
    html! {
        table class=(TABLE_STYLE)
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Count" }
                    th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Total" }
                    th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Average" }
                }
            }

            tbody
            {
                @for group in breakdown {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE)
                        {
                            span class=(CATEGORY_BADGE_STYLE) { (group.label) }
                        }
                        td class=(TABLE_CELL_STYLE) { (group.count) }
                        td class={(TABLE_CELL_STYLE) " text-right"} { (format_currency(group.total)) }
                        td class={(TABLE_CELL_STYLE) " text-right"} { (format_currency(group.average())) }
                    }
                }
            }
        }
    }
}

fn expenses_table(expenses: &[ExpenseRow]) -> Markup {
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
                }
            }

            tbody
            {
                @for expense in expenses {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE) { (expense.date) }
                        td class=(TABLE_CELL_STYLE) { (expense.category_label) }
                        td class=(TABLE_CELL_STYLE) { (expense.description) }
                        td class={(TABLE_CELL_STYLE) " text-right"} { (format_currency(expense.amount)) }
                    }
                }
            }
        }
    }
}
