//! In-memory queue store.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use studio_models::JobId;

use crate::error::{QueueError, QueueResult};
use crate::job::{JobState, QueuedJob};
use crate::store::{QueueCounts, QueueStore};

#[derive(Debug, Default)]
struct QueueLists {
    waiting: VecDeque<JobId>,
    delayed: Vec<JobId>,
    active: Vec<JobId>,
    completed: VecDeque<JobId>,
    failed: VecDeque<JobId>,
}

impl QueueLists {
    fn finished_mut(&mut self, state: JobState) -> Option<&mut VecDeque<JobId>> {
        match state {
            JobState::Completed => Some(&mut self.completed),
            JobState::Failed => Some(&mut self.failed),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, QueuedJob>,
    queues: HashMap<String, QueueLists>,
}

/// Queue store kept in process memory.
///
/// Jobs do not survive a restart; use [`crate::RedisQueueStore`] for
/// durability.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    inner: Mutex<Inner>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn insert(&self, job: &QueuedJob) -> QueueResult<()> {
        let mut inner = self.inner.lock().await;
        let lists = inner.queues.entry(job.queue.clone()).or_default();
        match job.state {
            JobState::Waiting => lists.waiting.push_back(job.id.clone()),
            JobState::Delayed => lists.delayed.push(job.id.clone()),
            other => {
                return Err(QueueError::invalid_state(format!(
                    "cannot insert job {} in state {}",
                    job.id,
                    other.as_str()
                )))
            }
        }
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn claim_next(&self, queue: &str, now: DateTime<Utc>) -> QueueResult<Option<QueuedJob>> {
        let mut guard = self.inner.lock().await;
        let Inner { jobs, queues } = &mut *guard;
        let Some(lists) = queues.get_mut(queue) else {
            return Ok(None);
        };

        // Promote due delayed jobs in process_at order.
        let mut due: Vec<(DateTime<Utc>, JobId)> = Vec::new();
        lists.delayed.retain(|id| match jobs.get(id) {
            Some(job) if job.process_at <= now => {
                due.push((job.process_at, id.clone()));
                false
            }
            Some(_) => true,
            None => false,
        });
        due.sort();
        for (_, id) in due {
            if let Some(job) = jobs.get_mut(&id) {
                job.state = JobState::Waiting;
            }
            lists.waiting.push_back(id);
        }

        while let Some(id) = lists.waiting.pop_front() {
            if let Some(job) = jobs.get_mut(&id) {
                job.state = JobState::Active;
                job.attempts_made += 1;
                lists.active.push(id);
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    async fn reschedule(&self, job: &QueuedJob) -> QueueResult<()> {
        let mut inner = self.inner.lock().await;
        let lists = inner.queues.entry(job.queue.clone()).or_default();
        lists.active.retain(|id| id != &job.id);
        lists.delayed.push(job.id.clone());
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn finish(&self, job: &QueuedJob, keep: usize) -> QueueResult<()> {
        let mut guard = self.inner.lock().await;
        let Inner { jobs, queues } = &mut *guard;
        let lists = queues.entry(job.queue.clone()).or_default();
        lists.active.retain(|id| id != &job.id);

        let Some(finished) = lists.finished_mut(job.state) else {
            return Err(QueueError::invalid_state(format!(
                "job {} is not finished ({})",
                job.id,
                job.state.as_str()
            )));
        };

        finished.push_front(job.id.clone());
        jobs.insert(job.id.clone(), job.clone());

        while finished.len() > keep {
            if let Some(evicted) = finished.pop_back() {
                jobs.remove(&evicted);
            }
        }
        Ok(())
    }

    async fn get(&self, id: &JobId) -> QueueResult<Option<QueuedJob>> {
        Ok(self.inner.lock().await.jobs.get(id).cloned())
    }

    async fn counts(&self, queue: &str) -> QueueResult<QueueCounts> {
        let inner = self.inner.lock().await;
        Ok(inner
            .queues
            .get(queue)
            .map(|lists| QueueCounts {
                waiting: lists.waiting.len() as u64,
                delayed: lists.delayed.len() as u64,
                active: lists.active.len() as u64,
                completed: lists.completed.len() as u64,
                failed: lists.failed.len() as u64,
            })
            .unwrap_or_default())
    }

    async fn finished(&self, queue: &str, state: JobState) -> QueueResult<Vec<QueuedJob>> {
        let mut guard = self.inner.lock().await;
        let Inner { jobs, queues } = &mut *guard;
        let Some(ids) = queues.get_mut(queue).and_then(|l| l.finished_mut(state)) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| jobs.get(id).cloned()).collect())
    }

    async fn requeue_active(&self, queue: &str) -> QueueResult<usize> {
        let mut guard = self.inner.lock().await;
        let Inner { jobs, queues } = &mut *guard;
        let Some(lists) = queues.get_mut(queue) else {
            return Ok(0);
        };

        let stalled: Vec<JobId> = lists.active.drain(..).collect();
        for id in stalled.iter().rev() {
            if let Some(job) = jobs.get_mut(id) {
                job.state = JobState::Waiting;
            }
            lists.waiting.push_front(id.clone());
        }
        Ok(stalled.len())
    }
}
