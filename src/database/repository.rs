use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Category, ExpenseChanges, ExpenseOrder, ExpenseRecord, NewExpense, NewPhoto, NewProject, NewUser, Photo,
    Project, ProjectChanges, ProjectFilter, User,
};

/// Every relational read and write the handlers perform.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Users
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    // Projects
    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, DatabaseError>;
    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;
    async fn find_project_by_access_code(&self, access_code: &str) -> Result<Option<Project>, DatabaseError>;
    /// Whether another project (other than `excluding`) already uses `access_code`.
    async fn access_code_taken(&self, access_code: &str, excluding: Option<Uuid>) -> Result<bool, DatabaseError>;
    async fn insert_project(&self, project: NewProject) -> Result<Project, DatabaseError>;
    async fn update_project(&self, id: Uuid, changes: ProjectChanges) -> Result<Option<Project>, DatabaseError>;
    async fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Expenses
    async fn list_expenses(
        &self,
        project_id: Option<Uuid>,
        order: ExpenseOrder,
    ) -> Result<Vec<ExpenseRecord>, DatabaseError>;
    async fn find_expense(&self, id: Uuid) -> Result<Option<ExpenseRecord>, DatabaseError>;
    async fn insert_expense(&self, expense: NewExpense) -> Result<ExpenseRecord, DatabaseError>;
    async fn update_expense(&self, id: Uuid, changes: ExpenseChanges) -> Result<Option<ExpenseRecord>, DatabaseError>;
    async fn delete_expense(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Photos
    async fn list_photos(&self, project_id: Uuid) -> Result<Vec<Photo>, DatabaseError>;
    async fn insert_photo(&self, photo: NewPhoto) -> Result<Photo, DatabaseError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError>;
    async fn insert_category(&self, name: &str) -> Result<Category, DatabaseError>;
}

/// Columns joined onto every expense row.
const EXPENSE_PROJECT_COLUMNS: &str =
    "p.id AS project_ref_id, p.name AS project_name, p.access_code AS project_access_code";

/// `Repository` over the managed PostgreSQL store.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_project_changes<'a>(qb: &mut QueryBuilder<'a, Postgres>, changes: ProjectChanges) {
        let mut set = qb.separated(", ");
        if let Some(name) = changes.name {
            set.push("name = ").push_bind_unseparated(name);
        }
        if let Some(description) = changes.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(access_code) = changes.access_code {
            set.push("access_code = ").push_bind_unseparated(access_code);
        }
        if let Some(bucket_name) = changes.bucket_name {
            set.push("bucket_name = ").push_bind_unseparated(bucket_name);
        }
        if let Some(status) = changes.status {
            set.push("status = ")
                .push_bind_unseparated(status.map(|s| s.as_str().to_string()));
        }
        if let Some(progress) = changes.progress_percentage {
            set.push("progress_percentage = ").push_bind_unseparated(progress);
        }
        if let Some(start_date) = changes.start_date {
            set.push("start_date = ").push_bind_unseparated(start_date);
        }
        if let Some(estimated_end_date) = changes.estimated_end_date {
            set.push("estimated_end_date = ").push_bind_unseparated(estimated_end_date);
        }
        if let Some(actual_end_date) = changes.actual_end_date {
            set.push("actual_end_date = ").push_bind_unseparated(actual_end_date);
        }
        if let Some(budget) = changes.budget {
            set.push("budget = ").push_bind_unseparated(budget);
        }
        set.push("updated_at = now()");
    }

    fn push_expense_changes<'a>(qb: &mut QueryBuilder<'a, Postgres>, changes: ExpenseChanges) {
        let mut set = qb.separated(", ");
        if let Some(amount) = changes.amount {
            set.push("amount = ").push_bind_unseparated(amount);
        }
        if let Some(description) = changes.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(detail) = changes.detail {
            set.push("detail = ").push_bind_unseparated(detail);
        }
        if let Some(expense_date) = changes.expense_date {
            set.push("expense_date = ").push_bind_unseparated(expense_date);
        }
        if let Some(category) = changes.category {
            set.push("category = ")
                .push_bind_unseparated(category.map(|c| c.as_str().to_string()));
        }
        if let Some(vendor) = changes.vendor {
            set.push("vendor = ").push_bind_unseparated(vendor);
        }
        set.push("updated_at = now()");
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, full_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, role = EXCLUDED.role, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM projects WHERE TRUE");
        if let Some(term) = filter.search.as_deref() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR access_code ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb.build_query_as::<Project>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let row = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_project_by_access_code(&self, access_code: &str) -> Result<Option<Project>, DatabaseError> {
        let row = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE access_code = $1")
            .bind(access_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn access_code_taken(&self, access_code: &str, excluding: Option<Uuid>) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM projects WHERE access_code = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(access_code)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    async fn insert_project(&self, project: NewProject) -> Result<Project, DatabaseError> {
        // bucket_name falls back to the generated id inside the same statement.
        let row = sqlx::query_as::<_, Project>(
            r#"
            WITH new_id AS (SELECT gen_random_uuid() AS id)
            INSERT INTO projects (
                id, name, description, access_code, status, progress_percentage,
                start_date, estimated_end_date, actual_end_date, budget, bucket_name, created_by
            )
            SELECT new_id.id, $1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, new_id.id::text), $11
            FROM new_id
            RETURNING *
            "#,
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.access_code)
        .bind(project.status.map(|s| s.as_str()))
        .bind(project.progress_percentage)
        .bind(project.start_date)
        .bind(project.estimated_end_date)
        .bind(project.actual_end_date)
        .bind(project.budget)
        .bind(&project.bucket_name)
        .bind(project.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_project(&self, id: Uuid, changes: ProjectChanges) -> Result<Option<Project>, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE projects SET ");
        Self::push_project_changes(&mut qb, changes);
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let row = qb.build_query_as::<Project>().fetch_optional(&self.pool).await?;
        Ok(row)
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_expenses(
        &self,
        project_id: Option<Uuid>,
        order: ExpenseOrder,
    ) -> Result<Vec<ExpenseRecord>, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT e.*, {} FROM expenses e JOIN projects p ON p.id = e.project_id",
            EXPENSE_PROJECT_COLUMNS
        ));
        if let Some(project_id) = project_id {
            qb.push(" WHERE e.project_id = ").push_bind(project_id);
        }
        qb.push(" ORDER BY ").push(order.sql());

        let rows = qb.build_query_as::<ExpenseRecord>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn find_expense(&self, id: Uuid) -> Result<Option<ExpenseRecord>, DatabaseError> {
        let sql = format!(
            "SELECT e.*, {} FROM expenses e JOIN projects p ON p.id = e.project_id WHERE e.id = $1",
            EXPENSE_PROJECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_expense(&self, expense: NewExpense) -> Result<ExpenseRecord, DatabaseError> {
        let sql = format!(
            r#"
            WITH e AS (
                INSERT INTO expenses (project_id, amount, description, detail, expense_date, category, vendor, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT e.*, {} FROM e JOIN projects p ON p.id = e.project_id
            "#,
            EXPENSE_PROJECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(expense.project_id)
            .bind(expense.amount)
            .bind(&expense.description)
            .bind(&expense.detail)
            .bind(expense.expense_date)
            .bind(expense.category.map(|c| c.as_str()))
            .bind(&expense.vendor)
            .bind(expense.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    DatabaseError::NotFound("Project not found".into())
                }
                e => e.into(),
            })?;
        Ok(row)
    }

    async fn update_expense(&self, id: Uuid, changes: ExpenseChanges) -> Result<Option<ExpenseRecord>, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("WITH e AS (UPDATE expenses SET ");
        Self::push_expense_changes(&mut qb, changes);
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *) SELECT e.*, ")
            .push(EXPENSE_PROJECT_COLUMNS)
            .push(" FROM e JOIN projects p ON p.id = e.project_id");

        let row = qb.build_query_as::<ExpenseRecord>().fetch_optional(&self.pool).await?;
        Ok(row)
    }

    async fn delete_expense(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_photos(&self, project_id: Uuid) -> Result<Vec<Photo>, DatabaseError> {
        let rows = sqlx::query_as::<_, Photo>(
            "SELECT * FROM photos WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_photo(&self, photo: NewPhoto) -> Result<Photo, DatabaseError> {
        let row = sqlx::query_as::<_, Photo>(
            r#"
            INSERT INTO photos (project_id, file_name, file_path, file_size, uploaded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(photo.project_id)
        .bind(&photo.file_name)
        .bind(&photo.file_path)
        .bind(photo.file_size)
        .bind(photo.uploaded_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let rows = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_category(&self, name: &str) -> Result<Category, DatabaseError> {
        let row = sqlx::query_as::<_, Category>("INSERT INTO categories (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

/// Escape LIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
