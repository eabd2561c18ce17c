//! The landing page for logged in users.
//!
//! Summarises the user's spending for the current month and all time, lists
//! their latest expenses and charts this month's categories and the last week.

mod charts;
mod page;

pub use charts::get_dashboard_charts;
pub use page::get_dashboard_page;
