pub mod category;
pub mod expense;
pub mod photo;
pub mod project;
pub mod user;

pub use category::Category;
pub use expense::{Expense, ExpenseCategory, ExpenseChanges, ExpenseOrder, ExpenseRecord, NewExpense};
pub use photo::{NewPhoto, Photo};
pub use project::{NewProject, Project, ProjectChanges, ProjectFilter, ProjectStats, ProjectStatus, ProjectSummary};
pub use user::{NewUser, Role, User};
