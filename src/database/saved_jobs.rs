use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_optional_datetime};
use crate::errors::{AppResult, RepositoryError};
use crate::models::{
    AppliedState, JobAction, JobActionOutcome, NewSavedJob, SavedJob, SavedState,
};

const SAVED_JOB_COLUMNS: &str = "user_id, id, url, image, title, location, company_logo, company_name,
     job_website, job_post_date, applied_state, applied_date, saved_state, saved_date, notes,
     created_at, updated_at";

fn parse_state<T: FromStr<Err = String>>(field: &str, value: Option<String>) -> AppResult<Option<T>> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| T::from_str(&v).map_err(|e| RepositoryError::invalid_value(field, e).into()))
        .transpose()
}

fn saved_job_from_row(row: &SqliteRow) -> AppResult<SavedJob> {
    let user_id: String = row.get("user_id");
    Ok(SavedJob {
        id: row.get("id"),
        url: row.get("url"),
        user_id: Uuid::parse_str(&user_id)
            .map_err(|e| RepositoryError::invalid_value("saved_jobs.user_id", e.to_string()))?,
        image: row.get("image"),
        title: row.get("title"),
        location: row.get("location"),
        company_logo: row.get("company_logo"),
        company_name: row.get::<Option<String>, _>("company_name").unwrap_or_default(),
        job_website: row.get::<Option<String>, _>("job_website").unwrap_or_default(),
        job_post_date: row.get::<Option<String>, _>("job_post_date").unwrap_or_default(),
        applied_state: parse_state("saved_jobs.applied_state", row.get("applied_state"))?,
        applied_date: parse_optional_datetime("saved_jobs.applied_date", row.get("applied_date"))?,
        saved_state: parse_state("saved_jobs.saved_state", row.get("saved_state"))?,
        saved_date: parse_optional_datetime("saved_jobs.saved_date", row.get("saved_date"))?,
        notes: row.get("notes"),
        created_at: parse_datetime("saved_jobs.created_at", &row.get::<String, _>("created_at"))?,
        updated_at: parse_datetime("saved_jobs.updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

impl crate::database::Database {
    pub async fn list_saved_jobs(&self, user_id: Uuid) -> AppResult<Vec<SavedJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM saved_jobs WHERE user_id = ? ORDER BY created_at DESC",
            SAVED_JOB_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(saved_job_from_row).collect()
    }

    pub async fn get_saved_job(&self, user_id: Uuid, id: &str) -> AppResult<Option<SavedJob>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM saved_jobs WHERE user_id = ? AND id = ?",
            SAVED_JOB_COLUMNS
        ))
        .bind(user_id.to_string())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(saved_job_from_row).transpose()
    }

    /// Save a job for the user, keyed by its URL
    pub async fn create_saved_job(&self, user_id: Uuid, job: NewSavedJob) -> AppResult<SavedJob> {
        let now = Utc::now();
        let saved = SavedJob {
            id: job.url.clone(),
            url: job.url,
            user_id,
            image: job.image,
            title: job.title,
            location: job.location,
            company_logo: job.company_logo,
            company_name: job.company_name,
            job_website: job.job_website,
            job_post_date: job.job_post_date,
            applied_state: job.applied_state,
            applied_date: job.applied_date,
            saved_state: job.saved_state,
            saved_date: job.saved_date,
            notes: job.notes,
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(&format!(
            "INSERT INTO saved_jobs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id, id) DO NOTHING",
            SAVED_JOB_COLUMNS
        ))
        .bind(saved.user_id.to_string())
        .bind(&saved.id)
        .bind(&saved.url)
        .bind(&saved.image)
        .bind(&saved.title)
        .bind(&saved.location)
        .bind(&saved.company_logo)
        .bind(&saved.company_name)
        .bind(&saved.job_website)
        .bind(&saved.job_post_date)
        .bind(saved.applied_state.map(|s| s.as_str()))
        .bind(saved.applied_date.as_ref().map(format_datetime))
        .bind(saved.saved_state.map(|s| s.as_str()))
        .bind(saved.saved_date.as_ref().map(format_datetime))
        .bind(&saved.notes)
        .bind(format_datetime(&saved.created_at))
        .bind(format_datetime(&saved.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::constraint_violation("saved_jobs_pkey", "Job already exists").into());
        }

        info!("User {} saved job {}", user_id, saved.id);
        Ok(saved)
    }

    /// Apply a state transition; a job left with no active state is removed
    ///
    /// Returns `None` when the job does not belong to the user.
    pub async fn apply_job_action(
        &self,
        user_id: Uuid,
        id: &str,
        action: JobAction,
    ) -> AppResult<Option<JobActionOutcome>> {
        let now = Utc::now();
        let now_str = format_datetime(&now);

        let (sql, state, date) = match action {
            JobAction::Save => (
                "UPDATE saved_jobs SET saved_state = ?, saved_date = ?, updated_at = ? WHERE user_id = ? AND id = ?",
                SavedState::Saved.as_str(),
                Some(now_str.clone()),
            ),
            JobAction::Unsave => (
                "UPDATE saved_jobs SET saved_state = ?, saved_date = ?, updated_at = ? WHERE user_id = ? AND id = ?",
                SavedState::NotSaved.as_str(),
                None,
            ),
            JobAction::Apply => (
                "UPDATE saved_jobs SET applied_state = ?, applied_date = ?, updated_at = ? WHERE user_id = ? AND id = ?",
                AppliedState::Applied.as_str(),
                Some(now_str.clone()),
            ),
            JobAction::Unapply => (
                "UPDATE saved_jobs SET applied_state = ?, applied_date = ?, updated_at = ? WHERE user_id = ? AND id = ?",
                AppliedState::NotApplied.as_str(),
                None,
            ),
        };

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(sql)
            .bind(state)
            .bind(date)
            .bind(&now_str)
            .bind(user_id.to_string())
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM saved_jobs WHERE user_id = ? AND id = ?",
            SAVED_JOB_COLUMNS
        ))
        .bind(user_id.to_string())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let job = saved_job_from_row(&row)?;

        if job.is_inactive() {
            sqlx::query("DELETE FROM saved_jobs WHERE user_id = ? AND id = ?")
                .bind(user_id.to_string())
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Job {} no longer tracked by user {}, deleted", id, user_id);
            return Ok(Some(JobActionOutcome::Deleted));
        }

        tx.commit().await?;
        Ok(Some(JobActionOutcome::Updated(job)))
    }

    pub async fn delete_saved_job(&self, user_id: Uuid, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM saved_jobs WHERE user_id = ? AND id = ?")
            .bind(user_id.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Notes of the job, `None` when the job does not belong to the user
    pub async fn get_notes(&self, user_id: Uuid, id: &str) -> AppResult<Option<Option<String>>> {
        let notes = sqlx::query_scalar::<_, Option<String>>(
            "SELECT notes FROM saved_jobs WHERE user_id = ? AND id = ?",
        )
        .bind(user_id.to_string())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notes)
    }

    pub async fn set_notes(&self, user_id: Uuid, id: &str, notes: Option<&str>) -> AppResult<bool> {
        let result = sqlx::query("UPDATE saved_jobs SET notes = ?, updated_at = ? WHERE user_id = ? AND id = ?")
            .bind(notes)
            .bind(format_datetime(&Utc::now()))
            .bind(user_id.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_notes(&self, user_id: Uuid, id: &str) -> AppResult<bool> {
        self.set_notes(user_id, id, None).await
    }

    /// The user's saved jobs indexed by listing URL
    pub async fn saved_states_by_url(&self, user_id: Uuid) -> AppResult<HashMap<String, SavedJob>> {
        Ok(self
            .list_saved_jobs(user_id)
            .await?
            .into_iter()
            .map(|job| (job.url.clone(), job))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::database::testing::memory_database;
    use crate::database::Database;
    use crate::errors::{AppError, RepositoryError};
    use crate::models::*;
    use uuid::Uuid;

    fn new_job(url: &str) -> NewSavedJob {
        SavedJobCreateRequest {
            url: Some(url.to_string()),
            title: Some("Rust developer".to_string()),
            location: Some("Bordeaux".to_string()),
            company_name: Some("Acme".to_string()),
            saved_state: Some(SavedState::Saved),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    async fn setup() -> (Database, Uuid, Uuid) {
        let db = memory_database().await;
        let alice = db.create_user("alice@example.com", None).await.unwrap();
        let bob = db.create_user("bob@example.com", None).await.unwrap();
        (db, alice.id, bob.id)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (db, alice, bob) = setup().await;

        let job = db.create_saved_job(alice, new_job("https://jobs.example/1")).await.unwrap();
        assert_eq!(job.id, "https://jobs.example/1");
        assert_eq!(job.saved_state, Some(SavedState::Saved));

        let duplicate = db.create_saved_job(alice, new_job("https://jobs.example/1")).await;
        assert!(matches!(
            duplicate,
            Err(AppError::Repository(RepositoryError::ConstraintViolation { .. }))
        ));

        // the same URL may be saved by another user
        db.create_saved_job(bob, new_job("https://jobs.example/1")).await.unwrap();

        let listed = db.list_saved_jobs(alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].company_name, "Acme");
        assert!(db.get_saved_job(alice, "https://jobs.example/2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_actions_and_auto_delete() {
        let (db, alice, bob) = setup().await;
        let id = "https://jobs.example/1";
        db.create_saved_job(alice, new_job(id)).await.unwrap();

        let applied = db.apply_job_action(alice, id, JobAction::Apply).await.unwrap();
        let Some(JobActionOutcome::Updated(job)) = applied else {
            panic!("expected an updated job");
        };
        assert_eq!(job.applied_state, Some(AppliedState::Applied));
        assert!(job.applied_date.is_some());

        assert!(db.apply_job_action(bob, id, JobAction::Unsave).await.unwrap().is_none());

        let unsaved = db.apply_job_action(alice, id, JobAction::Unsave).await.unwrap();
        let Some(JobActionOutcome::Updated(job)) = unsaved else {
            panic!("expected an updated job");
        };
        assert_eq!(job.saved_state, Some(SavedState::NotSaved));
        assert!(job.saved_date.is_none());

        let unapplied = db.apply_job_action(alice, id, JobAction::Unapply).await.unwrap();
        assert!(matches!(unapplied, Some(JobActionOutcome::Deleted)));
        assert!(db.get_saved_job(alice, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_sets_state_and_date() {
        let (db, alice, _) = setup().await;
        let id = "https://jobs.example/1";
        let mut job = new_job(id);
        job.saved_state = None;
        job.applied_state = Some(AppliedState::Applied);
        db.create_saved_job(alice, job).await.unwrap();

        let saved = db.apply_job_action(alice, id, JobAction::Save).await.unwrap();
        let Some(JobActionOutcome::Updated(job)) = saved else {
            panic!("expected an updated job");
        };
        assert_eq!(job.saved_state, Some(SavedState::Saved));
        assert!(job.saved_date.is_some());
        assert_eq!(job.applied_state, Some(AppliedState::Applied));

        let stored = db.get_saved_job(alice, id).await.unwrap().unwrap();
        assert_eq!(stored.saved_state, Some(SavedState::Saved));
        assert_eq!(stored.saved_date, job.saved_date);
    }

    #[tokio::test]
    async fn test_notes_and_delete() {
        let (db, alice, bob) = setup().await;
        let id = "https://jobs.example/1";
        db.create_saved_job(alice, new_job(id)).await.unwrap();

        assert_eq!(db.get_notes(alice, id).await.unwrap(), Some(None));
        assert!(db.set_notes(alice, id, Some("call back monday")).await.unwrap());
        assert_eq!(
            db.get_notes(alice, id).await.unwrap(),
            Some(Some("call back monday".to_string()))
        );
        assert_eq!(db.get_notes(bob, id).await.unwrap(), None);
        assert!(!db.set_notes(bob, id, Some("x")).await.unwrap());

        assert!(db.clear_notes(alice, id).await.unwrap());
        assert_eq!(db.get_notes(alice, id).await.unwrap(), Some(None));

        let by_url = db.saved_states_by_url(alice).await.unwrap();
        assert!(by_url.contains_key(id));

        assert!(!db.delete_saved_job(bob, id).await.unwrap());
        assert!(db.delete_saved_job(alice, id).await.unwrap());
        assert!(db.list_saved_jobs(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_saves() {
        let (db, alice, _) = setup().await;
        let url = "https://jobs.example/race";

        let (first, second) = tokio::join!(
            db.create_saved_job(alice, new_job(url)),
            db.create_saved_job(alice, new_job(url))
        );
        let results = [first, second];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(AppError::Repository(RepositoryError::ConstraintViolation { message, .. })) if message == "Job already exists"
        )));
        assert_eq!(db.list_saved_jobs(alice).await.unwrap().len(), 1);
    }
}
