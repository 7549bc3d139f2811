pub mod access_code;
pub mod categories;
pub mod expense_summary;
pub mod storage;

pub use storage::{ObjectStorage, StorageError, SupabaseStorage};
