//! Recording, editing, listing and deleting a user's expenses.

mod core;
mod create;
mod delete;
mod edit;
mod form;
mod list;

pub use core::{
    DESCRIPTION_MAX_LENGTH, Expense, ExpenseFilter, ExpenseId, ExpenseRow, NewExpense,
    create_expense, create_expense_table, delete_expense, get_expense, get_recent_expenses,
    query_expenses, update_expense,
};
pub use create::{create_expense_endpoint, get_new_expense_page};
pub use delete::delete_expense_endpoint;
pub use edit::{edit_expense_endpoint, get_edit_expense_page};
pub use list::get_expenses_page;
