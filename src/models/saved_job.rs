use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// A job the user saved or applied to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedJob {
    pub id: String,
    pub url: String,
    pub user_id: Uuid,
    pub image: String,
    pub title: String,
    pub location: String,
    pub company_logo: String,
    pub company_name: String,
    pub job_website: String,
    pub job_post_date: String,
    pub applied_state: Option<AppliedState>,
    pub applied_date: Option<DateTime<Utc>>,
    pub saved_state: Option<SavedState>,
    pub saved_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedJob {
    /// A job with neither an active saved nor applied state is no longer tracked
    pub fn is_inactive(&self) -> bool {
        !self.saved_state.is_some_and(|s| s.is_active())
            && !self.applied_state.is_some_and(|s| s.is_active())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavedState {
    #[serde(rename = "Saved")]
    Saved,
    #[serde(rename = "Not Saved")]
    NotSaved,
}

impl SavedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavedState::Saved => "Saved",
            SavedState::NotSaved => "Not Saved",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SavedState::Saved)
    }
}

impl FromStr for SavedState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Saved" => Ok(SavedState::Saved),
            "Not Saved" => Ok(SavedState::NotSaved),
            _ => Err(format!("Invalid saved state: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppliedState {
    #[serde(rename = "Applied")]
    Applied,
    #[serde(rename = "Not Applied")]
    NotApplied,
}

impl AppliedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppliedState::Applied => "Applied",
            AppliedState::NotApplied => "Not Applied",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AppliedState::Applied)
    }
}

impl FromStr for AppliedState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Applied" => Ok(AppliedState::Applied),
            "Not Applied" => Ok(AppliedState::NotApplied),
            _ => Err(format!("Invalid applied state: {}", s)),
        }
    }
}

/// State transitions accepted by `PATCH /api/jobs/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobAction {
    Save,
    Unsave,
    Apply,
    Unapply,
}

impl FromStr for JobAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" => Ok(JobAction::Save),
            "unsave" => Ok(JobAction::Unsave),
            "apply" => Ok(JobAction::Apply),
            "unapply" => Ok(JobAction::Unapply),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}

/// Outcome of applying a [`JobAction`]
#[derive(Debug, Clone)]
pub enum JobActionOutcome {
    Updated(SavedJob),
    Deleted,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedJobCreateRequest {
    pub url: Option<String>,
    pub image: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub company_logo: Option<String>,
    pub company_name: Option<String>,
    pub job_website: Option<String>,
    pub job_post_date: Option<String>,
    pub applied_state: Option<AppliedState>,
    pub applied_date: Option<DateTime<Utc>>,
    pub saved_state: Option<SavedState>,
    pub saved_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Validated form of [`SavedJobCreateRequest`]
#[derive(Debug, Clone)]
pub struct NewSavedJob {
    pub url: String,
    pub image: String,
    pub title: String,
    pub location: String,
    pub company_logo: String,
    pub company_name: String,
    pub job_website: String,
    pub job_post_date: String,
    pub applied_state: Option<AppliedState>,
    pub applied_date: Option<DateTime<Utc>>,
    pub saved_state: Option<SavedState>,
    pub saved_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SavedJobCreateRequest {
    /// Returns `None` when `url`, `title` or `location` is missing
    pub fn validate(self) -> Option<NewSavedJob> {
        Some(NewSavedJob {
            url: required(self.url)?,
            title: required(self.title)?,
            location: required(self.location)?,
            image: self.image.unwrap_or_default(),
            company_logo: self.company_logo.unwrap_or_default(),
            company_name: self.company_name.unwrap_or_default(),
            job_website: self.job_website.unwrap_or_default(),
            job_post_date: self.job_post_date.unwrap_or_default(),
            applied_state: self.applied_state,
            applied_date: self.applied_date,
            saved_state: self.saved_state,
            saved_date: self.saved_date,
            notes: self.notes.filter(|n| !n.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobActionRequest {
    #[serde(default)]
    pub action: serde_json::Value,
}

/// `notes` is kept loose so that non-string payloads can be rejected explicitly
#[derive(Debug, Clone, Deserialize)]
pub struct NotesUpdateRequest {
    #[serde(default)]
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotesResponse {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            notes: None,
        }
    }
}
