//! Predefined and user-defined categories for grouping expenses.

mod create;
mod db;
mod delete;
mod domain;
mod list;

pub use create::{create_category_endpoint, get_new_category_page};
pub use db::{
    create_category_table, create_custom_category, delete_custom_category,
    get_available_categories, get_category, get_custom_categories, get_predefined_categories,
    is_category_available, seed_predefined_categories,
};
pub use delete::delete_category_endpoint;
pub use domain::{
    Category, CategoryId, CategoryName, PREDEFINED_CATEGORIES, UNCATEGORIZED_LABEL,
};
pub use list::get_categories_page;
