use async_trait::async_trait;
use log::info;
use macrocoach_model::{
    assessment::{Assessment, AssessmentStatus},
    profile::{ActivityLevel, Goal},
};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::{connection::Connection, row, Result, StoreError};

#[mockall::automock]
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn submit(&self, assessment: &Assessment) -> Result<()>;
    async fn get_assessment(&self, id: Uuid) -> Result<Option<Assessment>>;
    /// Newest first, optionally restricted to one status.
    async fn list(&self, status: Option<AssessmentStatus>, limit: Option<u32>) -> Result<Vec<Assessment>>;
    async fn set_status(&self, id: Uuid, status: AssessmentStatus) -> Result<Assessment>;
    async fn count_by_status(&self, status: AssessmentStatus) -> Result<u32>;
}

#[derive(Clone)]
pub struct AssessmentStoreImpl {
    connection: Connection,
}

impl AssessmentStoreImpl {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

fn assessment_from_row(row: &SqliteRow) -> Result<Assessment> {
    Ok(Assessment {
        id: row::uuid(row, "id")?,
        user_id: row::uuid(row, "user_id")?,
        goal: row::parsed::<Goal>(row, "goal")?,
        activity_level: row::parsed::<ActivityLevel>(row, "activity_level")?,
        dietary_notes: row.try_get("dietary_notes")?,
        status: row::parsed::<AssessmentStatus>(row, "status")?,
        created_at: row::timestamp(row, "created_at")?,
    })
}

const SELECT_ASSESSMENTS: &str = "SELECT id, user_id, goal, activity_level, dietary_notes, status, created_at
    FROM assessments";

#[async_trait]
impl AssessmentStore for AssessmentStoreImpl {
    async fn submit(&self, assessment: &Assessment) -> Result<()> {
        info!(
            "Storing assessment {} for user {}",
            assessment.id, assessment.user_id
        );
        let mut conn = self.connection.lock().await;
        sqlx::query(
            "INSERT INTO assessments
            (id, user_id, goal, activity_level, dietary_notes, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(assessment.id.to_string())
        .bind(assessment.user_id.to_string())
        .bind(assessment.goal.to_string())
        .bind(assessment.activity_level.to_string())
        .bind(&assessment.dietary_notes)
        .bind(assessment.status.to_string())
        .bind(assessment.created_at.timestamp_millis())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn get_assessment(&self, id: Uuid) -> Result<Option<Assessment>> {
        let mut conn = self.connection.lock().await;
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ASSESSMENTS))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|row| assessment_from_row(&row)).transpose()
    }

    async fn list(
        &self,
        status: Option<AssessmentStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<Assessment>> {
        let mut conn = self.connection.lock().await;
        // A negative LIMIT means no limit in SQLite
        let rows = sqlx::query(&format!(
            "{} WHERE ?1 IS NULL OR status = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            SELECT_ASSESSMENTS
        ))
        .bind(status.map(|s| s.to_string()))
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&mut *conn)
        .await?;
        rows.iter().map(assessment_from_row).collect()
    }

    async fn set_status(&self, id: Uuid, status: AssessmentStatus) -> Result<Assessment> {
        // The check and the update share one guard
        let mut conn = self.connection.lock().await;
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ASSESSMENTS))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        let mut assessment = row
            .map(|row| assessment_from_row(&row))
            .transpose()?
            .ok_or(StoreError::NotFound("assessment"))?;
        if !assessment.status.can_become(status) {
            return Err(StoreError::InvalidTransition {
                from: assessment.status,
                to: status,
            });
        }

        info!(
            "Assessment {} moves from {} to {}",
            id, assessment.status, status
        );
        let result = sqlx::query("UPDATE assessments SET status = ? WHERE id = ? AND status = ?")
            .bind(status.to_string())
            .bind(id.to_string())
            .bind(assessment.status.to_string())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidTransition {
                from: assessment.status,
                to: status,
            });
        }
        assessment.status = status;
        Ok(assessment)
    }

    async fn count_by_status(&self, status: AssessmentStatus) -> Result<u32> {
        let mut conn = self.connection.lock().await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE status = ?")
            .bind(status.to_string())
            .fetch_one(&mut *conn)
            .await?;
        Ok(count as u32)
    }
}

#[cfg(test)]
mod tests {
    use macrocoach_model::assessment::NewAssessment;

    use super::*;

    fn new_assessment(user_id: Uuid) -> Assessment {
        NewAssessment {
            goal: Goal::LoseWeight,
            activity_level: ActivityLevel::LightlyActive,
            dietary_notes: "no dairy".to_owned(),
        }
        .into_assessment(user_id)
    }

    #[tokio::test]
    async fn submitted_assessment_round_trips() {
        let store = AssessmentStoreImpl::new(Connection::in_memory().await.unwrap());
        let assessment = new_assessment(Uuid::new_v4());
        store.submit(&assessment).await.unwrap();

        let fetched = store.get_assessment(assessment.id).await.unwrap().unwrap();
        assert_eq!(fetched.goal, Goal::LoseWeight);
        assert_eq!(fetched.activity_level, ActivityLevel::LightlyActive);
        assert_eq!(fetched.status, AssessmentStatus::Pending);
        assert_eq!(fetched.dietary_notes, "no dairy");
    }

    #[tokio::test]
    async fn status_moves_forward_only() {
        let store = AssessmentStoreImpl::new(Connection::in_memory().await.unwrap());
        let assessment = new_assessment(Uuid::new_v4());
        store.submit(&assessment).await.unwrap();

        let updated = store
            .set_status(assessment.id, AssessmentStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(updated.status, AssessmentStatus::InProgress);

        assert!(matches!(
            store
                .set_status(assessment.id, AssessmentStatus::Pending)
                .await,
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store
                .set_status(Uuid::new_v4(), AssessmentStatus::Completed)
                .await,
            Err(StoreError::NotFound("assessment"))
        ));
    }

    #[tokio::test]
    async fn concurrent_updates_never_move_backwards() {
        let store = AssessmentStoreImpl::new(Connection::in_memory().await.unwrap());
        let assessment = new_assessment(Uuid::new_v4());
        store.submit(&assessment).await.unwrap();

        let (completed, in_progress) = tokio::join!(
            store.set_status(assessment.id, AssessmentStatus::Completed),
            store.set_status(assessment.id, AssessmentStatus::InProgress),
        );
        assert!(completed.is_ok());
        if let Err(e) = in_progress {
            assert!(matches!(e, StoreError::InvalidTransition { .. }));
        }

        let stored = store.get_assessment(assessment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssessmentStatus::Completed);
    }

    #[tokio::test]
    async fn list_filters_and_counts() {
        let store = AssessmentStoreImpl::new(Connection::in_memory().await.unwrap());
        let first = new_assessment(Uuid::new_v4());
        let second = new_assessment(Uuid::new_v4());
        let third = new_assessment(Uuid::new_v4());
        for assessment in [&first, &second, &third] {
            store.submit(assessment).await.unwrap();
        }
        store
            .set_status(second.id, AssessmentStatus::Completed)
            .await
            .unwrap();

        assert_eq!(store.list(None, None).await.unwrap().len(), 3);
        assert_eq!(store.list(None, Some(2)).await.unwrap().len(), 2);
        let pending = store
            .list(Some(AssessmentStatus::Pending), None)
            .await
            .unwrap();
        assert_eq!(
            pending.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![third.id, first.id]
        );
        assert_eq!(
            store
                .count_by_status(AssessmentStatus::Completed)
                .await
                .unwrap(),
            1
        );
    }
}
