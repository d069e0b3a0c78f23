use async_trait::async_trait;
use log::info;
use macrocoach_model::{
    calculator::MacroResult,
    plan::{NutritionPlan, PlanStatus},
};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::{connection::Connection, row, Result, StoreError};

#[mockall::automock]
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Fails with `Duplicate` when the assessment already has a plan.
    async fn create_plan(&self, plan: &NutritionPlan) -> Result<()>;
    async fn get_plan(&self, id: Uuid) -> Result<Option<NutritionPlan>>;
    async fn plan_for_assessment(&self, assessment_id: Uuid) -> Result<Option<NutritionPlan>>;
    /// Newest first, optionally restricted to one status.
    async fn list_plans(&self, status: Option<PlanStatus>) -> Result<Vec<NutritionPlan>>;
    async fn activate(&self, id: Uuid) -> Result<NutritionPlan>;
    async fn count_by_status(&self, status: PlanStatus) -> Result<u32>;
}

#[derive(Clone)]
pub struct PlanStoreImpl {
    connection: Connection,
}

impl PlanStoreImpl {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

fn plan_from_row(row: &SqliteRow) -> Result<NutritionPlan> {
    let calories: Option<i64> = row.try_get("calories")?;
    let targets = match calories {
        Some(calories) => {
            let protein: i64 = row.try_get("protein")?;
            let carbs: i64 = row.try_get("carbs")?;
            let fat: i64 = row.try_get("fat")?;
            Some(MacroResult {
                calories: calories as u32,
                protein: protein as u32,
                carbs: carbs as u32,
                fat: fat as u32,
            })
        }
        None => None,
    };

    Ok(NutritionPlan {
        id: row::uuid(row, "id")?,
        assessment_id: row::uuid(row, "assessment_id")?,
        user_id: row::uuid(row, "user_id")?,
        content: row.try_get("content")?,
        targets,
        status: row::parsed::<PlanStatus>(row, "status")?,
        created_at: row::timestamp(row, "created_at")?,
    })
}

const SELECT_PLANS: &str = "SELECT id, assessment_id, user_id, content, calories, protein, carbs, fat,
    status, created_at FROM nutrition_plans";

#[async_trait]
impl PlanStore for PlanStoreImpl {
    async fn create_plan(&self, plan: &NutritionPlan) -> Result<()> {
        let mut conn = self.connection.lock().await;
        let result = sqlx::query(
            "INSERT INTO nutrition_plans
            (id, assessment_id, user_id, content, calories, protein, carbs, fat, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (assessment_id) DO NOTHING",
        )
        .bind(plan.id.to_string())
        .bind(plan.assessment_id.to_string())
        .bind(plan.user_id.to_string())
        .bind(&plan.content)
        .bind(plan.targets.map(|t| i64::from(t.calories)))
        .bind(plan.targets.map(|t| i64::from(t.protein)))
        .bind(plan.targets.map(|t| i64::from(t.carbs)))
        .bind(plan.targets.map(|t| i64::from(t.fat)))
        .bind(plan.status.to_string())
        .bind(plan.created_at.timestamp_millis())
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate("plan"));
        }

        info!(
            "Stored plan {} for assessment {}",
            plan.id, plan.assessment_id
        );
        Ok(())
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<NutritionPlan>> {
        let mut conn = self.connection.lock().await;
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PLANS))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|row| plan_from_row(&row)).transpose()
    }

    async fn plan_for_assessment(&self, assessment_id: Uuid) -> Result<Option<NutritionPlan>> {
        let mut conn = self.connection.lock().await;
        let row = sqlx::query(&format!("{} WHERE assessment_id = ?", SELECT_PLANS))
            .bind(assessment_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|row| plan_from_row(&row)).transpose()
    }

    async fn list_plans(&self, status: Option<PlanStatus>) -> Result<Vec<NutritionPlan>> {
        let mut conn = self.connection.lock().await;
        let rows = sqlx::query(&format!(
            "{} WHERE ?1 IS NULL OR status = ?1 ORDER BY created_at DESC, rowid DESC",
            SELECT_PLANS
        ))
        .bind(status.map(|s| s.to_string()))
        .fetch_all(&mut *conn)
        .await?;
        rows.iter().map(plan_from_row).collect()
    }

    async fn activate(&self, id: Uuid) -> Result<NutritionPlan> {
        let mut conn = self.connection.lock().await;
        let result = sqlx::query("UPDATE nutrition_plans SET status = ? WHERE id = ?")
            .bind(PlanStatus::Active.to_string())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("plan"));
        }

        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PLANS))
            .bind(id.to_string())
            .fetch_one(&mut *conn)
            .await?;
        info!("Plan {} is now active", id);
        plan_from_row(&row)
    }

    async fn count_by_status(&self, status: PlanStatus) -> Result<u32> {
        let mut conn = self.connection.lock().await;
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM nutrition_plans WHERE status = ?")
                .bind(status.to_string())
                .fetch_one(&mut *conn)
                .await?;
        Ok(count as u32)
    }
}
