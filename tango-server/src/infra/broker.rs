//! Redis-backed job broker
//!
//! Queues are list-typed keys: LPUSH to enqueue, blocking BRPOP to consume.
//! One `ConnectionManager` is shared process-wide; it reconnects on its own
//! and clones cheaply per call.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct Broker {
    conn: ConnectionManager,
}

impl Broker {
    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Atomic push to the head of a queue
    pub async fn push(&self, queue: &str, payload: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(queue, payload).await
    }

    /// Blocking pop from the tail with a timeout in seconds.
    /// Returns `(queue, payload)` or `None` on timeout.
    pub async fn pop(
        &self,
        queue: &str,
        timeout_secs: f64,
    ) -> redis::RedisResult<Option<(String, String)>> {
        let mut conn = self.conn.clone();
        conn.brpop(queue, timeout_secs).await
    }

    /// Queue depth, used for DLQ monitoring
    pub async fn len(&self, queue: &str) -> redis::RedisResult<i64> {
        let mut conn = self.conn.clone();
        conn.llen(queue).await
    }

    /// Health probe
    pub async fn ping(&self) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await
    }
}
