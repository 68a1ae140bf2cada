//! Batch replay with entity-based partitioning
//!
//! The `BatchProcessor` splits a batch of journal records into groups that
//! share no entity, replays the groups concurrently on tokio tasks, and keeps
//! the original order inside each group.
//!
//! # Partitioning
//!
//! Two records land in the same group when they touch a common account or
//! reference, directly or through a chain of other records in the batch.
//! Accounts already bound to a reference (room participants, withdrawal
//! owners) count as touched, so a settlement is never reordered against
//! another record of the account it credits.
//!
//! ```text
//! batch:  deposit(2)  create(2, r1)  deposit(5)  join(3, r1)  withdraw(5)
//! groups: [deposit(2), create(2, r1), join(3, r1)]   [deposit(5), withdraw(5)]
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::error;

use super::Replayer;
use crate::types::{EntityKey, JournalRecord, Outcome, WagerError};

/// Result of replaying a single record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The record that was replayed
    pub record: JournalRecord,

    /// What the engine reported for it
    pub result: Result<Outcome, WagerError>,
}

/// Batch processor with entity-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    replayer: Replayer,
}

impl BatchProcessor {
    pub fn new(replayer: Replayer) -> Self {
        Self { replayer }
    }

    pub fn replayer(&self) -> &Replayer {
        &self.replayer
    }

    /// Partition a batch into groups of records that share no entity
    ///
    /// # Guarantees
    ///
    /// - Each record appears in exactly one group
    /// - Records keep their original relative order within a group
    /// - Groups are ordered by their first record
    pub fn partition(&self, batch: Vec<JournalRecord>) -> Vec<Vec<JournalRecord>> {
        let mut groups = DisjointSet::new(batch.len());
        let mut first_seen: HashMap<EntityKey, usize> = HashMap::new();

        for (index, record) in batch.iter().enumerate() {
            for key in self.replayer.keys(record) {
                match first_seen.entry(key) {
                    Entry::Occupied(owner) => groups.union(*owner.get(), index),
                    Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                }
            }
        }

        let mut partitions: Vec<Vec<JournalRecord>> = Vec::new();
        let mut position_of_root: HashMap<usize, usize> = HashMap::new();
        for (index, record) in batch.into_iter().enumerate() {
            let root = groups.find(index);
            let position = *position_of_root.entry(root).or_insert_with(|| {
                partitions.push(Vec::new());
                partitions.len() - 1
            });
            partitions[position].push(record);
        }

        partitions
    }

    /// Replay one group sequentially
    ///
    /// Every record is replayed even if earlier ones fail; failures are
    /// captured in the results, which keep the input order.
    pub async fn process_group(&self, records: Vec<JournalRecord>) -> Vec<ProcessingResult> {
        records
            .into_iter()
            .map(|record| {
                let result = self.replayer.apply(&record);
                ProcessingResult { record, result }
            })
            .collect()
    }

    /// Replay a batch with independent groups running concurrently
    ///
    /// Results of one group stay in order; results of different groups are
    /// concatenated in group order.
    ///
    /// # Errors
    ///
    /// Returns an error if a group task panicked or was cancelled. Records it
    /// replayed before failing may already have changed the engine, so the
    /// replay cannot be trusted and must stop.
    pub async fn process_batch(
        &self,
        batch: Vec<JournalRecord>,
    ) -> Result<Vec<ProcessingResult>, String> {
        let groups = self.partition(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for records in groups {
            let processor = self.clone();
            tasks.push(tokio::spawn(
                async move { processor.process_group(records).await },
            ));
        }

        join_groups(tasks).await
    }
}

/// Await every group task, failing on the first one that did not finish
async fn join_groups(
    tasks: Vec<JoinHandle<Vec<ProcessingResult>>>,
) -> Result<Vec<ProcessingResult>, String> {
    let mut results = Vec::new();
    let mut failure = None;
    for task in tasks {
        match task.await {
            Ok(group_results) => results.extend(group_results),
            Err(e) => {
                error!(error = %e, "replay task failed");
                if failure.is_none() {
                    failure = Some(format!("Replay task failed: {}", e));
                }
            }
        }
    }

    match failure {
        Some(message) => Err(message),
        None => Ok(results),
    }
}

/// Union-find over record positions
#[derive(Debug)]
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        let mut root = index;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        while self.parent[index] != root {
            let next = self.parent[index];
            self.parent[index] = root;
            index = next;
        }
        root
    }

    /// Merge two sets; the smaller root wins so groups stay keyed by their
    /// earliest record
    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            let (keep, merge) = if a < b { (a, b) } else { (b, a) };
            self.parent[merge] = keep;
        }
    }
}
