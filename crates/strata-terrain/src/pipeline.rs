//! Background chunk generation across a worker pool.
//!
//! Wraps an [`Engine`] behind bounded channels: callers submit chunk
//! coordinates, worker threads run the full chunk-stage pipeline, and the
//! caller drains finished snapshots at its own pace. Tasks can be cancelled
//! while queued (and between queue and delivery); generation itself is not
//! interrupted mid-chunk.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::error;

use strata_voxel::{ChunkSnapshot, pack_chunk_key};

use crate::engine::{Engine, EngineError};

/// A request to generate one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationTask {
    pub chunk_x: i32,
    pub chunk_z: i32,
}

/// A completed generation attempt.
#[derive(Debug)]
pub struct GeneratedChunk {
    pub chunk_x: i32,
    pub chunk_z: i32,
    /// The finished snapshot, or the error that aborted the chunk.
    pub result: Result<ChunkSnapshot, EngineError>,
    /// Generation time in microseconds (for profiling).
    pub generation_time_us: u64,
}

struct QueuedTask {
    task: GenerationTask,
    cancelled: Arc<AtomicBool>,
}

/// Runs chunk generation on background threads.
pub struct GenerationPipeline {
    task_sender: Sender<QueuedTask>,
    result_receiver: Receiver<GeneratedChunk>,
    /// Cancellation flag per pending chunk, keyed by packed chunk key.
    active_tasks: Arc<DashMap<i64, Arc<AtomicBool>>>,
    in_flight: Arc<AtomicU64>,
}

impl GenerationPipeline {
    /// Creates a pipeline with the given worker count and queue capacities.
    ///
    /// # Arguments
    /// - `engine`: the configured engine workers generate with.
    /// - `thread_count`: number of worker threads.
    /// - `max_concurrent`: maximum in-flight tasks; excess submissions are
    ///   rejected.
    /// - `result_capacity`: bounded capacity of the completed-chunk channel.
    pub fn new(
        engine: Arc<Engine>,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> Self {
        let (task_sender, task_receiver) = bounded::<QueuedTask>(max_concurrent * 2);
        let (result_sender, result_receiver) = bounded::<GeneratedChunk>(result_capacity);
        let in_flight = Arc::new(AtomicU64::new(0));

        for _ in 0..thread_count {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let engine = Arc::clone(&engine);

            let spawned = std::thread::Builder::new()
                .name("chunk-gen-worker".into())
                .spawn(move || {
                    while let Ok(queued) = receiver.recv() {
                        if queued.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let task = queued.task;
                        let start = std::time::Instant::now();
                        let mut snapshot = engine.new_snapshot(task.chunk_x, task.chunk_z);
                        let result = engine
                            .apply_chunk_stages(&mut snapshot)
                            .map(|()| snapshot);
                        let elapsed = start.elapsed().as_micros() as u64;

                        if !queued.cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(GeneratedChunk {
                                chunk_x: task.chunk_x,
                                chunk_z: task.chunk_z,
                                result,
                                generation_time_us: elapsed,
                            });
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                });
            if let Err(err) = spawned {
                error!(%err, "failed to spawn chunk generation worker");
            }
        }

        Self {
            task_sender,
            result_receiver,
            active_tasks: Arc::new(DashMap::new()),
            in_flight,
        }
    }

    /// Creates a pipeline with a worker count derived from the CPU count,
    /// leaving headroom for the caller's own threads.
    pub fn with_defaults(engine: Arc<Engine>) -> Self {
        let cpus = num_cpus::get().max(2);
        let threads = (cpus - 2).max(1);
        Self::new(engine, threads, 64, 128)
    }

    /// Submits a chunk for background generation.
    ///
    /// Returns `Err(task)` if the queue is full, or if a task for the same
    /// chunk is still pending (queued, executing, or finished but not yet
    /// drained). Rejecting the duplicate keeps the pending task's
    /// cancellation flag reachable through [`Self::cancel`].
    pub fn submit(&self, task: GenerationTask) -> Result<(), GenerationTask> {
        let key = pack_chunk_key(task.chunk_x, task.chunk_z);
        let cancelled = Arc::new(AtomicBool::new(false));
        match self.active_tasks.entry(key) {
            Entry::Occupied(_) => return Err(task),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&cancelled));
            }
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        self.task_sender
            .try_send(QueuedTask { task, cancelled })
            .map_err(|_| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                self.active_tasks.remove(&key);
                task
            })
    }

    /// Cancels a pending generation task. A no-op if the chunk has already
    /// been delivered.
    pub fn cancel(&self, chunk_x: i32, chunk_z: i32) {
        if let Some((_, cancelled)) = self
            .active_tasks
            .remove(&pack_chunk_key(chunk_x, chunk_z))
        {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Drains all completed chunks without blocking.
    pub fn drain_results(&self) -> Vec<GeneratedChunk> {
        let mut results = Vec::new();
        while let Ok(chunk) = self.result_receiver.try_recv() {
            self.active_tasks
                .remove(&pack_chunk_key(chunk.chunk_x, chunk.chunk_z));
            results.push(chunk);
        }
        results
    }

    /// Number of tasks currently queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if a task for the chunk is pending.
    pub fn is_pending(&self, chunk_x: i32, chunk_z: i32) -> bool {
        self.active_tasks
            .contains_key(&pack_chunk_key(chunk_x, chunk_z))
    }
}
