//! Turns aggregation results into chart series and CSV exports.

use serde::Serialize;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Amount, Error,
    expense::ExpenseRow,
    report::aggregation::{CategoryTotal, CategoryTotalWithCount, DayTotal},
};

/// Labels and values split into parallel arrays for the charting library.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// A single labelled value in a chart.
pub trait ChartPoint {
    /// The text shown on the chart's axis or legend.
    fn label(&self) -> String;

    /// The amount to plot.
    fn value(&self) -> Amount;
}

const DAY_LABEL_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[month repr:short] [day padding:zero]");

impl ChartPoint for CategoryTotal {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn value(&self) -> Amount {
        self.total
    }
}

impl ChartPoint for CategoryTotalWithCount {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn value(&self) -> Amount {
        self.total
    }
}

impl ChartPoint for DayTotal {
    /// E.g. "Jan 05".
    fn label(&self) -> String {
        self.date
            .format(DAY_LABEL_FORMAT)
            .unwrap_or_else(|_| self.date.to_string())
    }

    fn value(&self) -> Amount {
        self.total
    }
}

/// Split `points` into labels and values, keeping their order.
pub fn to_chart_series<P: ChartPoint>(points: &[P]) -> ChartSeries {
    let (labels, values) = points
        .iter()
        .map(|point| (point.label(), point.value().to_f64()))
        .unzip();

    ChartSeries { labels, values }
}

/// Write `rows` as a CSV file followed by a blank line and the total.
///
/// ```text
/// Date,Category,Description,Amount
/// 2024-01-03,Food,Groceries,20.00
///
/// Total,,,20.00
/// ```
///
/// Records end with CRLF and fields are only quoted when they need to be.
/// `total` is written as given, except that zero is written as `0`.
///
/// # Errors
/// Returns [Error::CsvError] if a record could not be written.
pub fn to_csv(rows: &[ExpenseRow], total: Amount) -> Result<Vec<u8>, Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(["Date", "Category", "Description", "Amount"])?;

    for row in rows {
        writer.write_record([
            row.date.to_string(),
            row.category_label.clone(),
            row.description.clone(),
            row.amount.to_string(),
        ])?;
    }

    let total = if total == Amount::zero() {
        "0".to_owned()
    } else {
        total.to_string()
    };

    // A blank line is not a record the csv writer can produce.
    let mut bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;
    bytes.extend_from_slice(b"\r\n");

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(bytes);
    writer.write_record(["Total", "", "", total.as_str()])?;

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

#[cfg(test)]
mod chart_series_tests {
    use time::macros::date;

    use crate::{
        Amount,
        report::aggregation::{CategoryTotal, DayTotal},
    };

    use super::{ChartSeries, to_chart_series};

    #[test]
    fn keeps_category_order() {
        let groups = vec![
            CategoryTotal {
                label: "Food".to_owned(),
                total: Amount::from_cents(3000),
            },
            CategoryTotal {
                label: "Transport".to_owned(),
                total: Amount::from_cents(550),
            },
        ];

        assert_eq!(
            to_chart_series(&groups),
            ChartSeries {
                labels: vec!["Food".to_owned(), "Transport".to_owned()],
                values: vec![30.0, 5.5],
            }
        );
    }

    #[test]
    fn labels_days_with_short_month_and_day() {
        let days = vec![
            DayTotal {
                date: date!(2024 - 01 - 05),
                total: Amount::zero(),
            },
            DayTotal {
                date: date!(2024 - 12 - 25),
                total: Amount::from_cents(1999),
            },
        ];

        let series = to_chart_series(&days);

        assert_eq!(series.labels, vec!["Jan 05", "Dec 25"]);
        assert_eq!(series.values, vec![0.0, 19.99]);
    }

    #[test]
    fn empty_input_gives_empty_series() {
        assert_eq!(
            to_chart_series::<DayTotal>(&[]),
            ChartSeries::default()
        );
    }
}
