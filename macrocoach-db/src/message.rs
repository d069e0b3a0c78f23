use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use macrocoach_model::message::{Message, NewMessage};
use rustc_hash::FxHashMap;
use sqlx::{sqlite::SqliteRow, Row};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{connection::Connection, row, Result, StoreError};

const FEED_CAPACITY: usize = 256;

#[mockall::automock]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn send(&self, message: NewMessage) -> Result<Message>;
    /// Messages exchanged between `a` and `b` in either direction, oldest first.
    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>>;
    async fn last_message_between(&self, a: Uuid, b: Uuid) -> Result<Option<Message>>;
    /// Marks everything `sender` sent to `reader` as read, returning how many changed.
    async fn mark_conversation_read(&self, reader: Uuid, sender: Uuid) -> Result<u64>;
    async fn mark_read(&self, id: Uuid) -> Result<()>;
    async fn unread_count(&self, reader: Uuid) -> Result<u32>;
    async fn unread_by_sender(&self, reader: Uuid) -> Result<FxHashMap<Uuid, u32>>;
    /// Messages sent between `a` and `b` from now on.
    fn subscribe_conversation(&self, a: Uuid, b: Uuid) -> ConversationFeed;
}

#[derive(Clone)]
pub struct MessageStoreImpl {
    connection: Connection,
    feed: broadcast::Sender<Message>,
}

impl MessageStoreImpl {
    pub fn new(connection: Connection) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self { connection, feed }
    }

    /// Every message sent through this store from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.feed.subscribe()
    }
}

/// New messages of a single conversation.
pub struct ConversationFeed {
    receiver: broadcast::Receiver<Message>,
    a: Uuid,
    b: Uuid,
}

impl ConversationFeed {
    pub fn new(receiver: broadcast::Receiver<Message>, a: Uuid, b: Uuid) -> Self {
        Self { receiver, a, b }
    }

    /// Waits for the next message between the two participants. Returns
    /// `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if message.is_between(self.a, self.b) => return Some(message),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Conversation feed lagged, skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

fn message_from_row(row: &SqliteRow) -> Result<Message> {
    Ok(Message {
        id: row::uuid(row, "id")?,
        sender_id: row::uuid(row, "sender_id")?,
        receiver_id: row::uuid(row, "receiver_id")?,
        content: row.try_get("content")?,
        created_at: row::timestamp(row, "created_at")?,
        read_at: row::optional_timestamp(row, "read_at")?,
    })
}

const CONVERSATION_QUERY: &str =
    "SELECT id, sender_id, receiver_id, content, created_at, read_at FROM messages
    WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)";

#[async_trait]
impl MessageStore for MessageStoreImpl {
    async fn send(&self, message: NewMessage) -> Result<Message> {
        let message = message.into_message();
        {
            let mut conn = self.connection.lock().await;
            sqlx::query(
                "INSERT INTO messages (id, sender_id, receiver_id, content, created_at)
                VALUES (?, ?, ?, ?, ?)",
            )
            .bind(message.id.to_string())
            .bind(message.sender_id.to_string())
            .bind(message.receiver_id.to_string())
            .bind(&message.content)
            .bind(message.created_at.timestamp_millis())
            .execute(&mut *conn)
            .await?;
        }

        // No subscribers is not an error
        if self.feed.send(message.clone()).is_err() {
            debug!("Message {} stored, nobody listening", message.id);
        }
        Ok(message)
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
        let mut conn = self.connection.lock().await;
        let rows = sqlx::query(&format!("{} ORDER BY created_at, rowid", CONVERSATION_QUERY))
            .bind(a.to_string())
            .bind(b.to_string())
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn last_message_between(&self, a: Uuid, b: Uuid) -> Result<Option<Message>> {
        let mut conn = self.connection.lock().await;
        let row = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, rowid DESC LIMIT 1",
            CONVERSATION_QUERY
        ))
        .bind(a.to_string())
        .bind(b.to_string())
        .fetch_optional(&mut *conn)
        .await?;
        row.map(|row| message_from_row(&row)).transpose()
    }

    async fn mark_conversation_read(&self, reader: Uuid, sender: Uuid) -> Result<u64> {
        let mut conn = self.connection.lock().await;
        let result = sqlx::query(
            "UPDATE messages SET read_at = ?
            WHERE receiver_id = ? AND sender_id = ? AND read_at IS NULL",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(reader.to_string())
        .bind(sender.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_read(&self, id: Uuid) -> Result<()> {
        let mut conn = self.connection.lock().await;
        let result = sqlx::query("UPDATE messages SET read_at = COALESCE(read_at, ?) WHERE id = ?")
            .bind(Utc::now().timestamp_millis())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("message"));
        }
        Ok(())
    }

    async fn unread_count(&self, reader: Uuid) -> Result<u32> {
        let mut conn = self.connection.lock().await;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND read_at IS NULL",
        )
        .bind(reader.to_string())
        .fetch_one(&mut *conn)
        .await?;
        Ok(count as u32)
    }

    async fn unread_by_sender(&self, reader: Uuid) -> Result<FxHashMap<Uuid, u32>> {
        let mut conn = self.connection.lock().await;
        let rows = sqlx::query(
            "SELECT sender_id, COUNT(*) AS unread FROM messages
            WHERE receiver_id = ? AND read_at IS NULL GROUP BY sender_id",
        )
        .bind(reader.to_string())
        .fetch_all(&mut *conn)
        .await?;

        let mut counts = FxHashMap::default();
        for row in rows.iter() {
            let unread: i64 = row.try_get("unread")?;
            counts.insert(row::uuid(row, "sender_id")?, unread as u32);
        }
        Ok(counts)
    }

    fn subscribe_conversation(&self, a: Uuid, b: Uuid) -> ConversationFeed {
        ConversationFeed::new(self.subscribe(), a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> MessageStoreImpl {
        MessageStoreImpl::new(Connection::in_memory().await.unwrap())
    }

    fn new_message(from: Uuid, to: Uuid, content: &str) -> NewMessage {
        NewMessage::new(from, to, content).unwrap()
    }

    #[tokio::test]
    async fn conversation_contains_both_directions_only() {
        let store = store().await;
        let (client, coach, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.send(new_message(client, coach, "hello")).await.unwrap();
        store.send(new_message(coach, client, "hi there")).await.unwrap();
        store.send(new_message(other, coach, "unrelated")).await.unwrap();

        let conversation = store.conversation(client, coach).await.unwrap();
        assert_eq!(
            conversation
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>(),
            vec!["hello", "hi there"]
        );
        assert_eq!(
            store
                .last_message_between(coach, client)
                .await
                .unwrap()
                .unwrap()
                .content,
            "hi there"
        );
        assert_eq!(store.last_message_between(client, other).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reading_a_conversation_clears_unread() {
        let store = store().await;
        let (client, coach, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.send(new_message(client, coach, "one")).await.unwrap();
        store.send(new_message(client, coach, "two")).await.unwrap();
        store.send(new_message(other, coach, "three")).await.unwrap();
        store.send(new_message(coach, client, "reply")).await.unwrap();

        assert_eq!(store.unread_count(coach).await.unwrap(), 3);
        let by_sender = store.unread_by_sender(coach).await.unwrap();
        assert_eq!(by_sender.get(&client), Some(&2));
        assert_eq!(by_sender.get(&other), Some(&1));

        assert_eq!(store.mark_conversation_read(coach, client).await.unwrap(), 2);
        assert_eq!(store.unread_count(coach).await.unwrap(), 1);
        assert_eq!(store.unread_count(client).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_single_message_read() {
        let store = store().await;
        let (client, coach) = (Uuid::new_v4(), Uuid::new_v4());
        let message = store.send(new_message(client, coach, "ping")).await.unwrap();

        store.mark_read(message.id).await.unwrap();
        assert_eq!(store.unread_count(coach).await.unwrap(), 0);
        assert!(store.conversation(client, coach).await.unwrap()[0]
            .read_at
            .is_some());
        assert!(matches!(
            store.mark_read(Uuid::new_v4()).await,
            Err(StoreError::NotFound("message"))
        ));
    }

    #[tokio::test]
    async fn feed_delivers_conversation_messages() {
        let store = store().await;
        let (client, coach, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut feed = store.subscribe_conversation(client, coach);

        store.send(new_message(other, coach, "not for you")).await.unwrap();
        store.send(new_message(coach, client, "for you")).await.unwrap();

        assert_eq!(feed.next().await.unwrap().content, "for you");
    }
}
