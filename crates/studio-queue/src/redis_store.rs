//! Durable queue store on Redis.
//!
//! Key layout (all keys share the configured prefix):
//! - `{prefix}:job:{id}` JSON-encoded [`QueuedJob`]
//! - `{prefix}:{queue}:wait` list, new jobs pushed left, claimed from the right
//! - `{prefix}:{queue}:active` list of claimed jobs
//! - `{prefix}:{queue}:delayed` sorted set scored by `process_at` (ms)
//! - `{prefix}:{queue}:completed` / `:failed` bounded lists, newest first

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use studio_models::JobId;

use crate::error::QueueResult;
use crate::job::{JobState, QueuedJob};
use crate::store::{QueueCounts, QueueStore};

/// Queue store backed by Redis lists and sorted sets.
pub struct RedisQueueStore {
    client: redis::Client,
    prefix: String,
}

impl RedisQueueStore {
    /// Create a new store. No connection is made until the first call.
    pub fn new(redis_url: &str, prefix: impl Into<String>) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    async fn conn(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn job_key(&self, id: &str) -> String {
        format!("{}:job:{}", self.prefix, id)
    }

    fn list_key(&self, queue: &str, list: &str) -> String {
        format!("{}:{}:{}", self.prefix, queue, list)
    }

    fn finished_key(&self, queue: &str, state: JobState) -> String {
        self.list_key(queue, state.as_str())
    }

    async fn save(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job: &QueuedJob,
    ) -> QueueResult<()> {
        let payload = serde_json::to_string(job)?;
        conn.set::<_, _, ()>(self.job_key(job.id.as_str()), payload).await?;
        Ok(())
    }

    async fn load(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        id: &str,
    ) -> QueueResult<Option<QueuedJob>> {
        let payload: Option<String> = conn.get(self.job_key(id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn promote_delayed(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        queue: &str,
        now: DateTime<Utc>,
    ) -> QueueResult<()> {
        let delayed_key = self.list_key(queue, "delayed");
        let wait_key = self.list_key(queue, "wait");

        let due: Vec<String> = conn
            .zrangebyscore(&delayed_key, "-inf", now.timestamp_millis())
            .await?;

        for id in due {
            // Only the worker that removes the entry promotes it.
            let removed: i64 = conn.zrem(&delayed_key, &id).await?;
            if removed == 1 {
                conn.lpush::<_, _, ()>(&wait_key, &id).await?;
                debug!("Promoted delayed job {} on {}", id, queue);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn insert(&self, job: &QueuedJob) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        self.save(&mut conn, job).await?;

        if job.state == JobState::Delayed {
            conn.zadd::<_, _, _, ()>(
                self.list_key(&job.queue, "delayed"),
                job.id.as_str(),
                job.process_at.timestamp_millis(),
            )
            .await?;
        } else {
            conn.lpush::<_, _, ()>(self.list_key(&job.queue, "wait"), job.id.as_str())
                .await?;
        }
        Ok(())
    }

    async fn claim_next(&self, queue: &str, now: DateTime<Utc>) -> QueueResult<Option<QueuedJob>> {
        let mut conn = self.conn().await?;
        self.promote_delayed(&mut conn, queue, now).await?;

        let wait_key = self.list_key(queue, "wait");
        let active_key = self.list_key(queue, "active");

        loop {
            // Atomic hand-over so a crash between pop and processing
            // leaves the id in the active list for recovery.
            let id: Option<String> = redis::cmd("LMOVE")
                .arg(&wait_key)
                .arg(&active_key)
                .arg("RIGHT")
                .arg("LEFT")
                .query_async(&mut conn)
                .await?;

            let Some(id) = id else {
                return Ok(None);
            };

            match self.load(&mut conn, &id).await? {
                Some(mut job) => {
                    job.state = JobState::Active;
                    job.attempts_made += 1;
                    self.save(&mut conn, &job).await?;
                    return Ok(Some(job));
                }
                None => {
                    warn!("Dropping queue entry {} without job data", id);
                    conn.lrem::<_, _, ()>(&active_key, 1, &id).await?;
                }
            }
        }
    }

    async fn reschedule(&self, job: &QueuedJob) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        self.save(&mut conn, job).await?;
        conn.lrem::<_, _, ()>(self.list_key(&job.queue, "active"), 1, job.id.as_str())
            .await?;
        conn.zadd::<_, _, _, ()>(
            self.list_key(&job.queue, "delayed"),
            job.id.as_str(),
            job.process_at.timestamp_millis(),
        )
        .await?;
        Ok(())
    }

    async fn finish(&self, job: &QueuedJob, keep: usize) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let finished_key = self.finished_key(&job.queue, job.state);

        self.save(&mut conn, job).await?;
        conn.lrem::<_, _, ()>(self.list_key(&job.queue, "active"), 1, job.id.as_str())
            .await?;
        conn.lpush::<_, _, ()>(&finished_key, job.id.as_str()).await?;

        let evicted: Vec<String> = conn.lrange(&finished_key, keep as isize, -1).await?;
        if !evicted.is_empty() {
            let keys: Vec<String> = evicted.iter().map(|id| self.job_key(id)).collect();
            conn.del::<_, ()>(keys).await?;
            if keep == 0 {
                conn.del::<_, ()>(&finished_key).await?;
            } else {
                conn.ltrim::<_, ()>(&finished_key, 0, keep as isize - 1).await?;
            }
            debug!("Evicted {} finished jobs from {}", evicted.len(), finished_key);
        }
        Ok(())
    }

    async fn get(&self, id: &JobId) -> QueueResult<Option<QueuedJob>> {
        let mut conn = self.conn().await?;
        self.load(&mut conn, id.as_str()).await
    }

    async fn counts(&self, queue: &str) -> QueueResult<QueueCounts> {
        let mut conn = self.conn().await?;
        Ok(QueueCounts {
            waiting: conn.llen::<_, u64>(self.list_key(queue, "wait")).await?,
            delayed: conn.zcard::<_, u64>(self.list_key(queue, "delayed")).await?,
            active: conn.llen::<_, u64>(self.list_key(queue, "active")).await?,
            completed: conn
                .llen::<_, u64>(self.finished_key(queue, JobState::Completed))
                .await?,
            failed: conn
                .llen::<_, u64>(self.finished_key(queue, JobState::Failed))
                .await?,
        })
    }

    async fn finished(&self, queue: &str, state: JobState) -> QueueResult<Vec<QueuedJob>> {
        if !state.is_finished() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.lrange(self.finished_key(queue, state), 0, -1).await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.load(&mut conn, &id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn requeue_active(&self, queue: &str) -> QueueResult<usize> {
        let mut conn = self.conn().await?;
        let wait_key = self.list_key(queue, "wait");
        let active_key = self.list_key(queue, "active");

        let mut moved = 0;
        loop {
            // Newest claim first, so the oldest ends up at the consuming end.
            let id: Option<String> = redis::cmd("LMOVE")
                .arg(&active_key)
                .arg(&wait_key)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;
            let Some(id) = id else { break };

            if let Some(mut job) = self.load(&mut conn, &id).await? {
                job.state = JobState::Waiting;
                self.save(&mut conn, &job).await?;
            }
            moved += 1;
        }

        if moved > 0 {
            info!("Requeued {} stalled jobs on {}", moved, queue);
        }
        Ok(moved)
    }
}
