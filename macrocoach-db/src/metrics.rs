use async_trait::async_trait;
use itertools::Itertools;
use log::debug;
use macrocoach_model::metrics::{Metric, MetricValue};
use sqlx::{Connection as SqlxConnection, Row};
use uuid::Uuid;

use crate::{connection::Connection, row, Result, StoreError};

#[mockall::automock]
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn add_metric(&self, metric: &Metric) -> Result<()>;
    /// All entries of a user, oldest first.
    async fn history(&self, user_id: Uuid) -> Result<Vec<Metric>>;
}

#[derive(Clone)]
pub struct MetricsStoreImpl {
    connection: Connection,
}

impl MetricsStoreImpl {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl MetricsStore for MetricsStoreImpl {
    async fn add_metric(&self, metric: &Metric) -> Result<()> {
        let mut conn = self.connection.lock().await;
        let mut tx = conn.begin().await?;

        debug!("Storing metric {}", metric.id);
        sqlx::query("INSERT INTO metrics (id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(metric.id.to_string())
            .bind(metric.user_id.to_string())
            .bind(metric.created_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;

        debug!("Storing {} values", metric.values.len());
        for value in metric.values.iter() {
            let (value_type, value): (i64, f64) = (*value).into();
            sqlx::query(
                "REPLACE INTO metric_values (metric_id, value_type, value) VALUES (?, ?, ?)",
            )
            .bind(metric.id.to_string())
            .bind(value_type)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, user_id: Uuid) -> Result<Vec<Metric>> {
        let mut conn = self.connection.lock().await;
        let rows = sqlx::query(
            "SELECT m.id, m.user_id, m.created_at, v.value_type, v.value
            FROM metrics m JOIN metric_values v ON v.metric_id = m.id
            WHERE m.user_id = ?
            ORDER BY m.created_at, m.rowid, v.value_type",
        )
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

        let grouped = rows
            .iter()
            .group_by(|row| row.try_get::<String, _>("id").unwrap_or_default());
        let mut metrics = Vec::new();
        for (_, group) in &grouped {
            let group = group.collect::<Vec<_>>();
            let Some(first) = group.first() else {
                continue;
            };
            let mut metric = Metric {
                id: row::uuid(first, "id")?,
                user_id: row::uuid(first, "user_id")?,
                created_at: row::timestamp(first, "created_at")?,
                values: Vec::new(),
            };
            for row in group.iter() {
                let code: i64 = row.try_get("value_type")?;
                let value: f64 = row.try_get("value")?;
                metric.add_value(
                    MetricValue::try_from((code, value))
                        .map_err(|e| StoreError::Corrupt(e.to_owned()))?,
                );
            }
            metrics.push(metric);
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use macrocoach_model::metrics::{MetricKind, NewMetric};

    use super::*;

    #[tokio::test]
    async fn history_is_grouped_and_ordered() {
        let store = MetricsStoreImpl::new(Connection::in_memory().await.unwrap());
        let user_id = Uuid::new_v4();

        let mut first = Metric::new(
            user_id,
            NewMetric {
                weight: Some(82.0),
                body_fat: Some(21.5),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        );
        first.created_at = first.created_at - chrono::Duration::days(7);
        let second = Metric::new(
            user_id,
            NewMetric {
                weight: Some(80.5),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        );
        let someone_else = Metric::new(
            Uuid::new_v4(),
            NewMetric {
                hips: Some(100.0),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        );

        store.add_metric(&second).await.unwrap();
        store.add_metric(&first).await.unwrap();
        store.add_metric(&someone_else).await.unwrap();

        let history = store.history(user_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert_eq!(history[0].get(MetricKind::Weight), Some(82.0));
        assert_eq!(history[0].get(MetricKind::BodyFat), Some(21.5));
        assert_eq!(history[1].id, second.id);
        assert_eq!(history[1].values.len(), 1);
    }

    #[tokio::test]
    async fn same_timestamp_keeps_insertion_order() {
        let store = MetricsStoreImpl::new(Connection::in_memory().await.unwrap());
        let user_id = Uuid::new_v4();
        let entry = |weight| {
            NewMetric {
                weight: Some(weight),
                ..Default::default()
            }
            .validate()
            .unwrap()
        };

        let mut earlier = Metric::new(user_id, entry(81.0));
        let mut later = Metric::new(user_id, entry(80.0));
        // ids sort against insertion order
        earlier.id = Uuid::from_u128(2);
        later.id = Uuid::from_u128(1);
        later.created_at = earlier.created_at;

        store.add_metric(&earlier).await.unwrap();
        store.add_metric(&later).await.unwrap();

        let history = store.history(user_id).await.unwrap();
        assert_eq!(
            history.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![earlier.id, later.id]
        );
    }

    #[tokio::test]
    async fn empty_history() {
        let store = MetricsStoreImpl::new(Connection::in_memory().await.unwrap());
        assert!(store.history(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
