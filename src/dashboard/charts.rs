//! The dashboard's category breakdown and last seven days charts.
//!
//! Charts are built as ECharts options with charming and initialised by a
//! small script in the page head. The same series are served as JSON by
//! [get_dashboard_charts] for clients that draw their own charts.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::{Bar, Pie},
};
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    AppState, Error, UserID,
    date_range::trailing_days,
    html::HeadElement,
    report::{
        aggregation::{group_by_category, group_by_day},
        format::{ChartSeries, to_chart_series},
    },
    timezone::local_today,
};

/// How many days, including today, the daily chart covers.
pub(super) const DAILY_CHART_DAYS: u16 = 7;

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// The series behind both dashboard charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardChartData {
    /// This month's spending per category, largest first.
    pub category: ChartSeries,
    /// Spending on each of the last seven days, oldest first.
    pub daily: ChartSeries,
}

impl DashboardChartData {
    /// Gather the chart series for `user_id`.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if a query fails.
    pub(super) fn build(
        user_id: UserID,
        month: &RangeInclusive<Date>,
        today: Date,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let categories = group_by_category(user_id, month, connection)?;
        let days = group_by_day(user_id, &trailing_days(today, DAILY_CHART_DAYS), connection)?;

        Ok(Self {
            category: to_chart_series(&categories),
            daily: to_chart_series(&days),
        })
    }

    pub(super) fn charts(&self) -> [DashboardChart; 2] {
        [
            DashboardChart {
                id: "category-chart",
                options: escape_for_script(category_chart(&self.category).to_string()),
            },
            DashboardChart {
                id: "daily-chart",
                options: escape_for_script(daily_chart(&self.daily).to_string()),
            },
        ]
    }
}

/// Make chart options safe to embed in an inline `<script>`.
///
/// Category names are user input, so a name containing `</script>` would
/// otherwise end the script element. `<` only appears inside string literals
/// in the options, where `\u003c` is the same character.
fn escape_for_script(options: String) -> String {
    options.replace('<', "\\u003c")
}

/// The state needed for the chart data endpoint.
#[derive(Debug, Clone)]
pub struct DashboardChartsState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardChartsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Responds with the dashboard chart series as JSON.
pub async fn get_dashboard_charts(
    State(state): State<DashboardChartsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let month = super::page::current_month(today)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let data = DashboardChartData::build(user_id, &month, today, &connection)
        .inspect_err(|error| tracing::error!("Could not build dashboard charts: {error}"))?;

    Ok(Json(data).into_response())
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates the script that initialises each chart once the page has loaded.
///
/// Charts follow the browser's dark mode setting and resize with the window.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chart = echarts.init(document.getElementById("{}"));
                    chart.setOption({});

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    HeadElement::ScriptSource(PreEscaped(format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    )))
}

fn category_chart(series: &ChartSeries) -> Chart {
    let data = series
        .values
        .iter()
        .zip(&series.labels)
        .map(|(value, label)| (*value, label.as_str()))
        .collect::<Vec<_>>();

    Chart::new()
        .title(Title::new().text("Spending by Category").subtext("This month"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("2%"))
        .series(
            Pie::new()
                .name("Category")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

fn daily_chart(series: &ChartSeries) -> Chart {
    Chart::new()
        .title(Title::new().text("Daily Spending").subtext("Last 7 days"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter())
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(series.labels.clone()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Spent").data(series.values.clone()))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}
