//! Aggregated views of a user's expenses: totals, category and daily
//! breakdowns, chart series and the monthly report with its CSV export.

pub mod aggregation;
pub mod format;
mod monthly;

pub use monthly::get_monthly_report;
