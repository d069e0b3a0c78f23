use async_trait::async_trait;
use log::debug;
use macrocoach_model::user::User;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::{connection::Connection, row, Result};

#[mockall::automock]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    /// The coach every client chats with.
    async fn find_admin(&self) -> Result<Option<User>>;
    async fn list_users_except(&self, id: Uuid) -> Result<Vec<User>>;
    async fn count_users(&self) -> Result<u32>;
}

#[derive(Clone)]
pub struct UserStoreImpl {
    connection: Connection,
}

impl UserStoreImpl {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row::uuid(row, "id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        is_admin: row.try_get("is_admin")?,
        is_premium: row.try_get("is_premium")?,
        created_at: row::timestamp(row, "created_at")?,
    })
}

const SELECT_USERS: &str =
    "SELECT id, email, full_name, is_admin, is_premium, created_at FROM users";

#[async_trait]
impl UserStore for UserStoreImpl {
    async fn create_user(&self, user: &User) -> Result<()> {
        debug!("Storing user {}", user.id);
        let mut conn = self.connection.lock().await;
        sqlx::query(
            "INSERT INTO users (id, email, full_name, is_admin, is_premium, created_at)
            VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.is_admin)
        .bind(user.is_premium)
        .bind(user.created_at.timestamp_millis())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let mut conn = self.connection.lock().await;
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USERS))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|row| user_from_row(&row)).transpose()
    }

    async fn find_admin(&self) -> Result<Option<User>> {
        let mut conn = self.connection.lock().await;
        let row = sqlx::query(&format!(
            "{} WHERE is_admin = TRUE ORDER BY created_at LIMIT 1",
            SELECT_USERS
        ))
        .fetch_optional(&mut *conn)
        .await?;
        row.map(|row| user_from_row(&row)).transpose()
    }

    async fn list_users_except(&self, id: Uuid) -> Result<Vec<User>> {
        let mut conn = self.connection.lock().await;
        let rows = sqlx::query(&format!("{} WHERE id != ? ORDER BY created_at", SELECT_USERS))
            .bind(id.to_string())
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn count_users(&self) -> Result<u32> {
        let mut conn = self.connection.lock().await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count as u32)
    }
}
