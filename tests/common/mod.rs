#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use interior_tracker::auth::{AuthError, AuthProvider, AuthSession, AuthUser, CookieSettings, SignUpOutcome, StoredSession};
use interior_tracker::database::models::{
    Category, Expense, ExpenseChanges, ExpenseOrder, ExpenseRecord, NewExpense, NewPhoto, NewProject, NewUser, Photo,
    Project, ProjectChanges, ProjectFilter, ProjectStatus, Role, User,
};
use interior_tracker::database::{DatabaseError, Repository};
use interior_tracker::services::{ObjectStorage, StorageError};
use interior_tracker::{app, AppState, UploadPolicy};

pub const COOKIE_NAME: &str = "sb-test-auth-token";

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn db_failure() -> DatabaseError {
    DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
}

fn duplicate(constraint: &str) -> DatabaseError {
    DatabaseError::Duplicate(constraint.to_string())
}

/// Same predicate as the ILIKE search and status filter in `PgRepository`.
fn filter_matches(filter: &ProjectFilter, project: &Project) -> bool {
    let matches_search = match filter.search.as_deref() {
        Some(term) => {
            let term = term.to_lowercase();
            project.name.to_lowercase().contains(&term) || project.access_code.to_lowercase().contains(&term)
        }
        None => true,
    };
    let matches_status = match filter.status {
        Some(status) => project.status.as_deref() == Some(status.as_str()),
        None => true,
    };
    matches_search && matches_status
}

// ---------------------------------------------------------------------------
// In-memory repository
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    expenses: Vec<Expense>,
    photos: Vec<Photo>,
    categories: Vec<Category>,
}

impl Tables {
    fn record(&self, expense: &Expense) -> Option<ExpenseRecord> {
        let project = self.projects.iter().find(|p| p.id == expense.project_id)?;
        Some(ExpenseRecord {
            expense: expense.clone(),
            projects: project.summary(),
        })
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    pub fail_user_inserts: AtomicBool,
    pub fail_photo_inserts: AtomicBool,
    /// `access_code_taken` answers false, as when a concurrent write lands
    /// after the check.
    pub stale_code_checks: AtomicBool,
}

impl MemoryRepository {
    pub fn users(&self) -> Vec<User> {
        lock(&self.tables).users.clone()
    }

    pub fn photos(&self) -> Vec<Photo> {
        lock(&self.tables).photos.clone()
    }

    pub fn project(&self, id: Uuid) -> Option<Project> {
        lock(&self.tables).projects.iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(lock(&self.tables).users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        if self.fail_user_inserts.load(Ordering::SeqCst) {
            return Err(db_failure());
        }
        let now = Utc::now();
        let row = User {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        let mut tables = lock(&self.tables);
        tables.users.retain(|u| u.id != row.id);
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, DatabaseError> {
        let tables = lock(&self.tables);
        let mut rows: Vec<Project> = tables.projects.iter().rev().filter(|p| filter_matches(filter, p)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        Ok(self.project(id))
    }

    async fn find_project_by_access_code(&self, access_code: &str) -> Result<Option<Project>, DatabaseError> {
        Ok(lock(&self.tables)
            .projects
            .iter()
            .find(|p| p.access_code == access_code)
            .cloned())
    }

    async fn access_code_taken(&self, access_code: &str, excluding: Option<Uuid>) -> Result<bool, DatabaseError> {
        if self.stale_code_checks.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(lock(&self.tables)
            .projects
            .iter()
            .any(|p| p.access_code == access_code && Some(p.id) != excluding))
    }

    async fn insert_project(&self, project: NewProject) -> Result<Project, DatabaseError> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let row = Project {
            id,
            name: project.name,
            description: project.description,
            access_code: project.access_code,
            status: project.status.map(|s| s.as_str().to_string()),
            progress_percentage: project.progress_percentage,
            start_date: project.start_date,
            estimated_end_date: project.estimated_end_date,
            actual_end_date: project.actual_end_date,
            budget: project.budget,
            bucket_name: project.bucket_name.or_else(|| Some(id.to_string())),
            created_by: Some(project.created_by),
            created_at: now,
            updated_at: now,
        };
        let mut tables = lock(&self.tables);
        if tables.projects.iter().any(|p| p.access_code == row.access_code) {
            return Err(duplicate("projects_access_code_key"));
        }
        tables.projects.push(row.clone());
        Ok(row)
    }

    async fn update_project(&self, id: Uuid, changes: ProjectChanges) -> Result<Option<Project>, DatabaseError> {
        let mut tables = lock(&self.tables);
        if let Some(code) = &changes.access_code {
            if tables.projects.iter().any(|p| &p.access_code == code && p.id != id) {
                return Err(duplicate("projects_access_code_key"));
            }
        }
        let Some(p) = tables.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.name {
            p.name = v;
        }
        if let Some(v) = changes.description {
            p.description = v;
        }
        if let Some(v) = changes.access_code {
            p.access_code = v;
        }
        if let Some(v) = changes.bucket_name {
            p.bucket_name = v;
        }
        if let Some(v) = changes.status {
            p.status = v.map(|s: ProjectStatus| s.as_str().to_string());
        }
        if let Some(v) = changes.progress_percentage {
            p.progress_percentage = v;
        }
        if let Some(v) = changes.start_date {
            p.start_date = v;
        }
        if let Some(v) = changes.estimated_end_date {
            p.estimated_end_date = v;
        }
        if let Some(v) = changes.actual_end_date {
            p.actual_end_date = v;
        }
        if let Some(v) = changes.budget {
            p.budget = v;
        }
        p.updated_at = Utc::now();
        Ok(Some(p.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = lock(&self.tables);
        let before = tables.projects.len();
        tables.projects.retain(|p| p.id != id);
        tables.expenses.retain(|e| e.project_id != id);
        tables.photos.retain(|p| p.project_id != id);
        Ok(tables.projects.len() < before)
    }

    async fn list_expenses(
        &self,
        project_id: Option<Uuid>,
        order: ExpenseOrder,
    ) -> Result<Vec<ExpenseRecord>, DatabaseError> {
        let tables = lock(&self.tables);
        let mut rows: Vec<&Expense> = tables
            .expenses
            .iter()
            .filter(|e| project_id.map_or(true, |id| e.project_id == id))
            .collect();
        match order {
            ExpenseOrder::NewestFirst => {
                rows.reverse();
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            ExpenseOrder::ExpenseDateAsc => rows.sort_by_key(|e| (e.expense_date, e.created_at)),
            ExpenseOrder::ExpenseDateDesc => {
                rows.reverse();
                rows.sort_by(|a, b| (b.expense_date, b.created_at).cmp(&(a.expense_date, a.created_at)));
            }
        }
        Ok(rows.into_iter().filter_map(|e| tables.record(e)).collect())
    }

    async fn find_expense(&self, id: Uuid) -> Result<Option<ExpenseRecord>, DatabaseError> {
        let tables = lock(&self.tables);
        Ok(tables.expenses.iter().find(|e| e.id == id).and_then(|e| tables.record(e)))
    }

    async fn insert_expense(&self, expense: NewExpense) -> Result<ExpenseRecord, DatabaseError> {
        let now = Utc::now();
        let row = Expense {
            id: Uuid::new_v4(),
            project_id: expense.project_id,
            amount: expense.amount,
            description: expense.description,
            detail: expense.detail,
            expense_date: expense.expense_date,
            category: expense.category.map(|c| c.as_str().to_string()),
            vendor: expense.vendor,
            created_by: Some(expense.created_by),
            created_at: now,
            updated_at: now,
        };
        let mut tables = lock(&self.tables);
        let record = tables
            .record(&row)
            .ok_or_else(|| DatabaseError::NotFound("Project not found".into()))?;
        tables.expenses.push(row);
        Ok(record)
    }

    async fn update_expense(&self, id: Uuid, changes: ExpenseChanges) -> Result<Option<ExpenseRecord>, DatabaseError> {
        let mut tables = lock(&self.tables);
        let Some(e) = tables.expenses.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.amount {
            e.amount = v;
        }
        if let Some(v) = changes.description {
            e.description = v;
        }
        if let Some(v) = changes.detail {
            e.detail = v;
        }
        if let Some(v) = changes.expense_date {
            e.expense_date = v;
        }
        if let Some(v) = changes.category {
            e.category = v.map(|c| c.as_str().to_string());
        }
        if let Some(v) = changes.vendor {
            e.vendor = v;
        }
        e.updated_at = Utc::now();
        let updated = e.clone();
        Ok(tables.record(&updated))
    }

    async fn delete_expense(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = lock(&self.tables);
        let before = tables.expenses.len();
        tables.expenses.retain(|e| e.id != id);
        Ok(tables.expenses.len() < before)
    }

    async fn list_photos(&self, project_id: Uuid) -> Result<Vec<Photo>, DatabaseError> {
        let tables = lock(&self.tables);
        let mut rows: Vec<Photo> = tables.photos.iter().rev().filter(|p| p.project_id == project_id).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_photo(&self, photo: NewPhoto) -> Result<Photo, DatabaseError> {
        if self.fail_photo_inserts.load(Ordering::SeqCst) {
            return Err(db_failure());
        }
        let row = Photo {
            id: Uuid::new_v4(),
            project_id: photo.project_id,
            file_name: photo.file_name,
            file_path: photo.file_path,
            file_size: photo.file_size,
            uploaded_by: Some(photo.uploaded_by),
            created_at: Utc::now(),
        };
        lock(&self.tables).photos.push(row.clone());
        Ok(row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        Ok(lock(&self.tables).categories.clone())
    }

    async fn insert_category(&self, name: &str) -> Result<Category, DatabaseError> {
        let mut tables = lock(&self.tables);
        if tables.categories.iter().any(|c| c.name == name) {
            return Err(duplicate("categories_name_key"));
        }
        let row = Category {
            id: tables.categories.len() as i32 + 1,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.categories.push(row.clone());
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Auth provider fake
//
// Access tokens are `access-<uuid>`, refresh tokens `refresh-<uuid>`.
// ---------------------------------------------------------------------------

struct Account {
    id: Uuid,
    email: String,
    password: String,
}

pub struct FakeAuth {
    accounts: Mutex<Vec<Account>>,
    pub signed_out: Mutex<Vec<String>>,
    pub auto_confirm: AtomicBool,
}

impl Default for FakeAuth {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            signed_out: Mutex::new(Vec::new()),
            auto_confirm: AtomicBool::new(true),
        }
    }
}

impl FakeAuth {
    pub fn add_account(&self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.accounts).push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    pub fn account_id(&self, email: &str) -> Option<Uuid> {
        lock(&self.accounts).iter().find(|a| a.email == email).map(|a| a.id)
    }

    fn user(&self, id: Uuid) -> Option<AuthUser> {
        lock(&self.accounts).iter().find(|a| a.id == id).map(|a| AuthUser {
            id: a.id,
            email: Some(a.email.clone()),
            created_at: None,
            updated_at: None,
        })
    }

    pub fn session(user: AuthUser) -> AuthSession {
        AuthSession {
            access_token: format!("access-{}", user.id),
            refresh_token: format!("refresh-{}", user.id),
            token_type: "bearer".into(),
            expires_in: Some(3600),
            expires_at: Some(Utc::now().timestamp() + 3600),
            user,
        }
    }

    fn token_user(&self, token: &str, prefix: &str) -> Option<AuthUser> {
        let id = Uuid::parse_str(token.strip_prefix(prefix)?).ok()?;
        self.user(id)
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let id = lock(&self.accounts)
            .iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| a.id)
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid login credentials".into()))?;
        let user = self.user(id).ok_or(AuthError::InvalidSession)?;
        Ok(Self::session(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        if self.account_id(email).is_some() {
            return Err(AuthError::InvalidCredentials("User already registered".into()));
        }
        if password.len() < 6 {
            return Err(AuthError::InvalidCredentials("Password should be at least 6 characters".into()));
        }
        let id = self.add_account(email, password);
        let user = self.user(id).ok_or(AuthError::InvalidSession)?;
        let session = self
            .auto_confirm
            .load(Ordering::SeqCst)
            .then(|| Self::session(user.clone()));
        Ok(SignUpOutcome { user, session })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        lock(&self.signed_out).push(access_token.to_string());
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.token_user(access_token, "access-").ok_or(AuthError::InvalidSession)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.token_user(refresh_token, "refresh-")
            .map(Self::session)
            .ok_or(AuthError::InvalidSession)
    }
}

// ---------------------------------------------------------------------------
// Object storage fake
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStorage {
    pub uploaded: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, path: &str, _bytes: Bytes, _content_type: &str, _access_token: &str) -> Result<(), StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upstream {
                status: 500,
                message: "storage down".into(),
            });
        }
        lock(&self.uploaded).push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/{}", path)
    }

    async fn remove(&self, paths: &[String], _access_token: &str) -> Result<(), StorageError> {
        lock(&self.removed).extend(paths.iter().cloned());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub auth: Arc<FakeAuth>,
    pub storage: Arc<FakeStorage>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_upload_limit(10 * 1024 * 1024)
    }

    pub fn with_upload_limit(max_file_bytes: usize) -> Self {
        let repo = Arc::new(MemoryRepository::default());
        let auth = Arc::new(FakeAuth::default());
        let storage = Arc::new(FakeStorage::default());

        let state = AppState {
            repo: repo.clone(),
            auth: auth.clone(),
            storage: storage.clone(),
            cookies: CookieSettings {
                name: COOKIE_NAME.to_string(),
                secure: false,
                remember_max_age: 7 * 24 * 60 * 60,
            },
            uploads: UploadPolicy {
                max_file_bytes,
                max_request_bytes: 50 * 1024 * 1024,
            },
        };

        Self {
            router: app(state, &["*".to_string()]),
            repo,
            auth,
            storage,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, cookie, None)).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, uri, cookie, None)).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, cookie, Some(body))).await
    }

    pub async fn put(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::PUT, uri, cookie, Some(body))).await
    }

    /// `Cookie` header value carrying a live session for `user_id`.
    pub fn cookie_for(&self, user_id: Uuid) -> String {
        let user = self.auth.user(user_id).expect("unknown test account");
        let stored = StoredSession::from_session(&FakeAuth::session(user));
        format!("{}={}", COOKIE_NAME, stored.encode())
    }

    /// Account with an admin `users` row; returns its id and session cookie.
    pub async fn admin(&self) -> (Uuid, String) {
        let email = format!("admin-{}@example.com", Uuid::new_v4().simple());
        let id = self.auth.add_account(&email, "secret123");
        self.repo
            .insert_user(NewUser {
                id,
                email,
                full_name: String::new(),
                role: Role::Admin,
            })
            .await
            .unwrap();
        (id, self.cookie_for(id))
    }

    /// Account with no `users` row, which makes it a guest.
    pub fn guest(&self) -> (Uuid, String) {
        let email = format!("guest-{}@example.com", Uuid::new_v4().simple());
        let id = self.auth.add_account(&email, "secret123");
        (id, self.cookie_for(id))
    }

    pub async fn seed_project(&self, owner: Uuid, name: &str, access_code: &str) -> Project {
        self.repo
            .insert_project(NewProject {
                name: name.to_string(),
                description: None,
                access_code: access_code.to_string(),
                status: Some(ProjectStatus::Active),
                progress_percentage: None,
                start_date: None,
                estimated_end_date: None,
                actual_end_date: None,
                budget: None,
                bucket_name: None,
                created_by: owner,
            })
            .await
            .unwrap()
    }
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// One multipart file part.
pub struct Part<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_request(uri: &str, cookie: &str, parts: &[Part<'_>]) -> Request<Body> {
    const BOUNDARY: &str = "----interior-tracker-test-boundary";
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, part.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
