//! Scoped worker pool for field evaluation
use crossbeam_channel::{Receiver, Sender};
use nalgebra::Point3;
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    thread::Scope,
};

use super::ThreadCount;
use crate::{Error, field::Field};

/// Number of points evaluated by a worker in one go
pub const BATCH_SIZE: usize = 100;

/// Number of batches which may be waiting for a worker
pub const QUEUE_DEPTH: usize = 100;

/// Request for a worker to evaluate a batch of points
struct Job {
    /// Position of the batch within the caller's output slice
    offset: usize,
    points: Vec<Point3<f64>>,
}

/// Values for a completed [`Job`], or the message of a worker panic
struct Batch {
    offset: usize,
    values: Result<Vec<f64>, String>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Evaluates a field over point sets, using a set of scoped workers
///
/// The pool lives for a single sampling session: it must be built within a
/// [`std::thread::scope`], and dropping it disconnects the job queue so that
/// the workers exit and the scope can join them.
pub struct EvalPool<'a, F: ?Sized> {
    field: &'a F,
    /// Job queue, or `None` when evaluating in the calling thread
    queue: Option<Sender<Job>>,
    done: Receiver<Batch>,
}

impl<'a, F: Field + ?Sized> EvalPool<'a, F> {
    /// Spawns workers into the given scope
    ///
    /// With [`ThreadCount::One`], no workers are spawned and every evaluation
    /// happens in the calling thread.
    pub fn new<'env: 'a>(
        scope: &'a Scope<'a, 'env>,
        field: &'env F,
        threads: ThreadCount,
    ) -> Self {
        let (done_tx, done) = crossbeam_channel::unbounded();
        let queue = threads.get().map(|n| {
            let (tx, rx) = crossbeam_channel::bounded::<Job>(QUEUE_DEPTH);
            for _ in 0..n {
                let rx = rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for Job { offset, points } in rx.iter() {
                        let values = catch_unwind(AssertUnwindSafe(|| {
                            points
                                .iter()
                                .map(|p| field.evaluate(*p))
                                .collect::<Vec<_>>()
                        }))
                        .map_err(|e| panic_message(e.as_ref()));
                        if done_tx.send(Batch { offset, values }).is_err() {
                            break;
                        }
                    }
                });
            }
            tx
        });
        log::debug!("started evaluation pool with {threads} worker(s)");
        Self { field, queue, done }
    }

    /// Evaluates every point, writing results into `out`
    ///
    /// Points are split into batches of [`BATCH_SIZE`]; this function blocks
    /// until every batch has come back, and each batch lands in its own
    /// sub-range of `out`.
    ///
    /// A panic inside a worker is caught and returned as
    /// [`Error::WorkerPanicked`], after the remaining batches have drained.
    /// Without workers, a panicking field unwinds through the caller.
    ///
    /// # Panics
    /// If `points` and `out` have different lengths
    pub fn eval(
        &self,
        points: &[Point3<f64>],
        out: &mut [f64],
    ) -> Result<(), Error> {
        assert_eq!(points.len(), out.len());
        let Some(queue) = &self.queue else {
            for (p, o) in points.iter().zip(out.iter_mut()) {
                *o = self.field.evaluate(*p);
            }
            return Ok(());
        };

        let mut pending = 0;
        for (i, chunk) in points.chunks(BATCH_SIZE).enumerate() {
            let job = Job {
                offset: i * BATCH_SIZE,
                points: chunk.to_vec(),
            };
            queue.send(job).map_err(|_| Error::PoolDisconnected)?;
            pending += 1;
        }
        let mut panicked = None;
        for _ in 0..pending {
            let Batch { offset, values } =
                self.done.recv().map_err(|_| Error::PoolDisconnected)?;
            match values {
                Ok(values) => {
                    out[offset..offset + values.len()].copy_from_slice(&values)
                }
                Err(msg) => {
                    log::error!("evaluation worker panicked: {msg}");
                    panicked.get_or_insert(msg);
                }
            }
        }
        match panicked {
            Some(msg) => Err(Error::WorkerPanicked(msg)),
            None => Ok(()),
        }
    }
}
