//! Repairing search results where the tracker left `owners` unexpanded.
//!
//! The search endpoint sometimes returns `owner_ids` without the matching
//! `owners` objects. Rather than re-running the search, each affected story
//! gets one follow-up owners fetch.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::thread;
use tracing::debug;

use crate::tracker::{Person, Story, TrackerClient};

/// How owner fetches are issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackfillMode {
    #[default]
    Sequential,
    Concurrent,
}

/// Strategy for filling in missing owner expansions
pub trait OwnerBackfill: Send + Sync {
    /// Fill owners in place and return how many stories were repaired.
    /// Story order is never changed.
    fn backfill(&self, client: &TrackerClient, project_id: u64, stories: &mut [Story])
        -> Result<usize>;
}

/// Build the strategy selected in configuration
pub fn backfill_strategy(mode: BackfillMode, max_workers: usize) -> Box<dyn OwnerBackfill> {
    match mode {
        BackfillMode::Sequential => Box::new(SequentialBackfill),
        BackfillMode::Concurrent => Box::new(ConcurrentBackfill::new(max_workers)),
    }
}

/// Owners listed by id but not expanded
pub fn needs_owner_backfill(story: &Story) -> bool {
    !story.owner_ids.is_empty() && story.owners.is_empty()
}

/// One owners fetch at a time, in story order
pub struct SequentialBackfill;

impl OwnerBackfill for SequentialBackfill {
    fn backfill(
        &self,
        client: &TrackerClient,
        project_id: u64,
        stories: &mut [Story],
    ) -> Result<usize> {
        let mut repaired = 0;

        for story in stories.iter_mut().filter(|s| needs_owner_backfill(s)) {
            debug!("Backfilling owners for story #{}", story.id);
            story.owners = client.story_owners(project_id, story.id)?;
            repaired += 1;
        }

        Ok(repaired)
    }
}

/// Owners fetched on scoped threads, at most `max_workers` in flight
pub struct ConcurrentBackfill {
    max_workers: usize,
}

impl ConcurrentBackfill {
    pub fn new(max_workers: usize) -> Self {
        ConcurrentBackfill {
            max_workers: max_workers.max(1),
        }
    }
}

impl OwnerBackfill for ConcurrentBackfill {
    fn backfill(
        &self,
        client: &TrackerClient,
        project_id: u64,
        stories: &mut [Story],
    ) -> Result<usize> {
        let pending: Vec<u64> = stories
            .iter()
            .filter(|s| needs_owner_backfill(s))
            .map(|s| s.id)
            .collect();

        let mut fetched: HashMap<u64, Vec<Person>> = HashMap::with_capacity(pending.len());

        for batch in pending.chunks(self.max_workers) {
            debug!("Backfilling owners for {} stories concurrently", batch.len());

            let results: Vec<(u64, Result<Vec<Person>>)> = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|&story_id| {
                        let handle =
                            scope.spawn(move || client.story_owners(project_id, story_id));
                        (story_id, handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(story_id, handle)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            Err(anyhow!("owner fetch for story #{} panicked", story_id))
                        });
                        (story_id, result)
                    })
                    .collect()
            });

            // Any failure aborts the whole query; the earliest story's error wins
            for (story_id, result) in results {
                fetched.insert(story_id, result?);
            }
        }

        let mut repaired = 0;
        for story in stories.iter_mut() {
            if let Some(owners) = fetched.remove(&story.id) {
                story.owners = owners;
                repaired += 1;
            }
        }

        Ok(repaired)
    }
}
