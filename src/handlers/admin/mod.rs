// handlers/admin/mod.rs - Handlers behind the session and admin-role middleware
//
// Every handler here receives `SessionContext` and `ValidatedUser`.

pub mod categories;
pub mod expenses;

pub use categories::{categories_get, categories_post};
pub use expenses::{
    chart_data_get, expense_delete, expense_get, expense_put, expenses_get, expenses_post, project_expenses_get,
};
