use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

thread_local! {
    /// Set on pool workers, whose panics are caught and reported as outcomes
    static CATCHING_PANICS: Cell<bool> = const { Cell::new(false) };
}

static QUIET_PANIC_HOOK: Once = Once::new();

/// How a single work item ended
#[derive(Debug)]
pub enum Outcome<R> {
    /// The processor returned normally
    Completed(R),
    /// The processor panicked; the payload message is preserved
    Panicked { message: String, elapsed: Duration },
    /// The processor was still running when its deadline passed
    TimedOut { elapsed: Duration },
}

/// Events sent from workers to the collector
enum Event<R> {
    Started { index: usize, at: Instant },
    Finished { index: usize, result: R },
    Panicked { index: usize, message: String, elapsed: Duration },
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<T, R, F> {
    worker_id: usize,
    work_rx: Receiver<(usize, T)>,
    event_tx: Sender<Event<R>>,
    processor: Arc<F>,
}

/// Bounded worker pool for independent, possibly blocking work items.
///
/// Workers pull items from a shared channel, so at most `max_workers` items
/// run at any moment. With a task timeout configured, an item that overruns
/// its deadline is reported as [`Outcome::TimedOut`], its worker is abandoned
/// and a replacement worker is spawned so the queue keeps draining.
pub struct WorkerPool {
    max_workers: usize,
    task_timeout: Option<Duration>,
    thread_name: String,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            task_timeout: None,
            thread_name: "blogcheck-worker".to_string(),
        }
    }

    /// Deadline per item; zero means none
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Execute every work item and return outcomes in input order.
    ///
    /// `on_finish` is called on the calling thread in completion order, once
    /// per item, as soon as its outcome is known.
    pub fn execute<T, R, F, P>(
        &self,
        work_items: Vec<T>,
        processor: F,
        mut on_finish: P,
    ) -> Result<Vec<Outcome<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
        P: FnMut(usize, &Outcome<R>),
    {
        let total_items = work_items.len();
        if total_items == 0 {
            return Ok(Vec::new());
        }

        install_quiet_panic_hook();

        let actual_workers = self.max_workers.min(total_items);
        let (work_tx, work_rx) = unbounded::<(usize, T)>();
        let (event_tx, event_rx) = unbounded::<Event<R>>();
        let processor = Arc::new(processor);
        let next_worker_id = AtomicUsize::new(0);

        for item in work_items.into_iter().enumerate() {
            // The receiver is still alive here, so send cannot fail
            let _ = work_tx.send(item);
        }
        drop(work_tx);

        let spawn = |work_rx: &Receiver<(usize, T)>, event_tx: &Sender<Event<R>>| -> Result<()> {
            let ctx = WorkerContext {
                worker_id: next_worker_id.fetch_add(1, Ordering::Relaxed),
                work_rx: work_rx.clone(),
                event_tx: event_tx.clone(),
                processor: processor.clone(),
            };
            let name = format!("{}-{}", self.thread_name, ctx.worker_id);
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_thread(ctx))
                .with_context(|| format!("Failed to spawn worker thread {name}"))?;
            Ok(())
        };

        for _ in 0..actual_workers {
            spawn(&work_rx, &event_tx)?;
        }

        // Only keep our own sender when replacements may be needed; otherwise
        // dropping it lets the channel disconnect once every worker exits.
        let replacement_tx = self.task_timeout.map(|_| event_tx.clone());
        drop(event_tx);

        let mut outcomes: Vec<Option<Outcome<R>>> = (0..total_items).map(|_| None).collect();
        let mut in_flight: HashMap<usize, Instant> = HashMap::new();
        let mut remaining = total_items;

        while remaining > 0 {
            let deadline = self
                .task_timeout
                .and_then(|limit| in_flight.values().min().map(|started| *started + limit));

            let event = match deadline {
                Some(deadline) => match event_rx.recv_deadline(deadline) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => {
                        let expired = self.expire(&mut in_flight);
                        for (index, elapsed) in expired {
                            let outcome = Outcome::TimedOut { elapsed };
                            on_finish(index, &outcome);
                            outcomes[index] = Some(outcome);
                            remaining -= 1;

                            // Queued work still needs a live worker
                            if remaining > in_flight.len()
                                && let Some(tx) = &replacement_tx
                            {
                                spawn(&work_rx, tx)?;
                            }
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match event_rx.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            match event {
                Event::Started { index, at } => {
                    if outcomes[index].is_none() {
                        in_flight.insert(index, at);
                    }
                }
                Event::Finished { index, result } => {
                    if in_flight.remove(&index).is_none() && outcomes[index].is_some() {
                        tracing::debug!("Discarding late result for item {}", index);
                        continue;
                    }
                    let outcome = Outcome::Completed(result);
                    on_finish(index, &outcome);
                    outcomes[index] = Some(outcome);
                    remaining -= 1;
                }
                Event::Panicked {
                    index,
                    message,
                    elapsed,
                } => {
                    if in_flight.remove(&index).is_none() && outcomes[index].is_some() {
                        continue;
                    }
                    let outcome = Outcome::Panicked { message, elapsed };
                    on_finish(index, &outcome);
                    outcomes[index] = Some(outcome);
                    remaining -= 1;
                }
            }
        }

        if remaining > 0 {
            anyhow::bail!(
                "Worker threads exited with {remaining} of {total_items} items unfinished"
            );
        }

        Ok(outcomes.into_iter().flatten().collect())
    }

    /// Remove and return every in-flight item whose deadline has passed
    fn expire(&self, in_flight: &mut HashMap<usize, Instant>) -> Vec<(usize, Duration)> {
        let Some(limit) = self.task_timeout else {
            return Vec::new();
        };
        let now = Instant::now();
        let mut expired: Vec<(usize, Duration)> = in_flight
            .iter()
            .filter(|(_, started)| now.saturating_duration_since(**started) >= limit)
            .map(|(index, started)| (*index, now.saturating_duration_since(*started)))
            .collect();
        expired.sort_by_key(|(index, _)| *index);

        for (index, elapsed) in &expired {
            in_flight.remove(index);
            tracing::warn!(
                "Item {} exceeded its {:?} timeout after {:?}; abandoning its worker",
                index,
                limit,
                elapsed
            );
        }
        expired
    }
}

fn worker_thread<T, R, F>(ctx: WorkerContext<T, R, F>)
where
    F: Fn(T) -> R,
{
    CATCHING_PANICS.with(|catching| catching.set(true));
    tracing::trace!("Worker {} started", ctx.worker_id);

    while let Ok((index, work_item)) = ctx.work_rx.recv() {
        let at = Instant::now();
        if ctx.event_tx.send(Event::Started { index, at }).is_err() {
            break; // Collector dropped
        }

        let event = match panic::catch_unwind(AssertUnwindSafe(|| (ctx.processor)(work_item))) {
            Ok(result) => Event::Finished { index, result },
            Err(payload) => Event::Panicked {
                index,
                message: panic_message(payload.as_ref()),
                elapsed: at.elapsed(),
            },
        };

        if ctx.event_tx.send(event).is_err() {
            break;
        }
    }

    tracing::trace!("Worker {} finished", ctx.worker_id);
}

/// True on a pool worker thread, where a panic becomes an [`Outcome::Panicked`]
pub fn catching_panics() -> bool {
    CATCHING_PANICS.with(Cell::get)
}

/// Keep the default "thread panicked at" report off stderr for panics the
/// pool catches; every other panic still reaches the previous hook.
fn install_quiet_panic_hook() {
    QUIET_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if catching_panics() {
                tracing::debug!("Worker {}", info);
            } else {
                previous(info);
            }
        }));
    });
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Default worker count for I/O-bound validators: the CPU count clamped to 4..=6
pub fn default_workers() -> usize {
    num_cpus::get().clamp(4, 6)
}
