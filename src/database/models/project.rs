use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub access_code: String,
    pub status: Option<String>,
    pub progress_percentage: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub estimated_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
    pub bucket_name: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            access_code: self.access_code.clone(),
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == Some(user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [ProjectStatus::Active, ProjectStatus::Completed, ProjectStatus::Cancelled];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

/// Project columns embedded in expense responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub access_code: String,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub access_code: String,
    pub status: Option<ProjectStatus>,
    pub progress_percentage: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub estimated_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
    pub bucket_name: Option<String>,
    pub created_by: Uuid,
}

/// Partial update. The outer `Option` is "field present in the request",
/// the inner one is the nullable column value.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub access_code: Option<String>,
    pub bucket_name: Option<Option<String>>,
    pub status: Option<Option<ProjectStatus>>,
    pub progress_percentage: Option<Option<i32>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub estimated_end_date: Option<Option<NaiveDate>>,
    pub actual_end_date: Option<Option<NaiveDate>>,
    pub budget: Option<Option<Decimal>>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.access_code.is_none()
            && self.bucket_name.is_none()
            && self.status.is_none()
            && self.progress_percentage.is_none()
            && self.start_date.is_none()
            && self.estimated_end_date.is_none()
            && self.actual_end_date.is_none()
            && self.budget.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-insensitive substring of name or access code.
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// Dashboard counters over the project list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub total_budget: Decimal,
}

impl ProjectStats {
    pub fn from_projects(projects: &[Project]) -> Self {
        let count = |status: ProjectStatus| {
            projects
                .iter()
                .filter(|p| p.status.as_deref() == Some(status.as_str()))
                .count()
        };

        Self {
            total: projects.len(),
            active: count(ProjectStatus::Active),
            completed: count(ProjectStatus::Completed),
            cancelled: count(ProjectStatus::Cancelled),
            total_budget: projects.iter().filter_map(|p| p.budget).sum(),
        }
    }
}
