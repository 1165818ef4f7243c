use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, postgres::PgPoolOptions};

use crate::domain::{
    models::{Message, NewMessage},
    repositories::MessageRepository,
};

pub type PgPool = Pool<Postgres>;

/// Opens a pool and applies the bundled migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn fetch_unsent(&self, limit: u32) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, content, recipient, is_sent, sent_at, delivery_id, created_at
            FROM messages
            WHERE is_sent = false
            ORDER BY id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn mark_sent(
        &self,
        id: i64,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_sent = true,
                delivery_id = $2,
                sent_at = $3
            WHERE id = $1
              AND is_sent = false
            "#,
        )
        .bind(id)
        .bind(delivery_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("message {id} not found or already marked as sent");
        }
        Ok(())
    }

    async fn list_sent(&self, page: u32, limit: u32) -> anyhow::Result<(Vec<Message>, u64)> {
        let limit = i64::from(limit);
        let offset = i64::from(page.saturating_sub(1)) * limit;

        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM messages WHERE is_sent = true"#)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, content, recipient, is_sent, sent_at, delivery_id, created_at
            FROM messages
            WHERE is_sent = true
            ORDER BY sent_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((
            rows.into_iter().map(Message::from).collect(),
            total.max(0) as u64,
        ))
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, content, recipient, is_sent, sent_at, delivery_id, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(Message::from))
    }

    async fn insert(&self, message: NewMessage) -> anyhow::Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO messages (content, recipient)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&message.content)
        .bind(&message.recipient)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: i64,
    content: String,
    recipient: String,
    is_sent: bool,
    sent_at: Option<DateTime<Utc>>,
    delivery_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MessageRecord> for Message {
    fn from(value: MessageRecord) -> Self {
        Self {
            id: value.id,
            content: value.content,
            recipient: value.recipient,
            sent: value.is_sent,
            sent_at: value.sent_at,
            delivery_id: value.delivery_id,
            created_at: value.created_at,
        }
    }
}
