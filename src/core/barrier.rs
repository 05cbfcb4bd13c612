//! One-shot join over an unknown number of jobs.
//!
//! A [`CompletionBarrier`] wraps a final callback. Callers register jobs with
//! [`CompletionBarrier::register_job`] while they are still setting up work,
//! and every job reports back through its [`JobHandle`]. The callback fires
//! exactly once: on the first reported error, or once the barrier is sealed
//! and no registered job is still pending.
//!
//! Until [`CompletionBarrier::seal`] is called a pending count of zero is not
//! treated as completion, so jobs that finish while their creator is still
//! registering more work never complete the barrier early, on any runtime
//! flavor. Jobs may keep registering nested jobs after the seal as long as
//! they do so before reporting themselves.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::{Result, SchemaError};

type Completion = Box<dyn FnOnce(Option<SchemaError>) + Send + 'static>;

struct BarrierState {
    ready: bool,
    finished: bool,
    pending: usize,
    first_error: Option<SchemaError>,
    on_complete: Option<Completion>,
}

impl BarrierState {
    fn finish(&mut self, error: Option<SchemaError>) -> Option<(Completion, Option<SchemaError>)> {
        self.finished = true;
        if error.is_some() {
            self.first_error = error.clone();
        }
        self.on_complete.take().map(|callback| (callback, error))
    }
}

fn lock(state: &Mutex<BarrierState>) -> MutexGuard<'_, BarrierState> {
    // A panicking callback never runs under the lock, so a poisoned state is still consistent.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn fire(completion: Option<(Completion, Option<SchemaError>)>) {
    if let Some((callback, error)) = completion {
        callback(error);
    }
}

#[derive(Clone)]
pub struct CompletionBarrier {
    state: Arc<Mutex<BarrierState>>,
}

impl CompletionBarrier {
    /// Create an unsealed barrier around `on_complete`.
    pub fn new<F>(on_complete: F) -> Self
    where
        F: FnOnce(Option<SchemaError>) + Send + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(BarrierState {
                ready: false,
                finished: false,
                pending: 0,
                first_error: None,
                on_complete: Some(Box::new(on_complete)),
            })),
        }
    }

    /// Barrier whose outcome is delivered through a oneshot channel.
    pub fn channel() -> (Self, oneshot::Receiver<Result<()>>) {
        let (tx, rx) = oneshot::channel();
        let barrier = Self::new(move |error| {
            let outcome = match error {
                Some(error) => Err(error),
                None => Ok(()),
            };
            // The receiver may have given up waiting; nothing left to notify.
            let _ = tx.send(outcome);
        });
        (barrier, rx)
    }

    /// Register one more pending job.
    pub fn register_job(&self) -> Result<JobHandle> {
        let mut state = lock(&self.state);
        if state.finished {
            return Err(SchemaError::illegal_state(
                "cannot register a job on a completed barrier",
            ));
        }
        state.pending += 1;
        tracing::trace!(pending = state.pending, "barrier job registered");

        Ok(JobHandle {
            state: Some(Arc::clone(&self.state)),
        })
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.state).finished
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.state).ready
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).pending
    }

    /// Error the barrier completed with, if it failed.
    pub fn error(&self) -> Option<SchemaError> {
        lock(&self.state).first_error.clone()
    }

    /// End the setup phase. From here on the barrier completes as soon as
    /// no registered job is pending. Sealing twice is a no-op.
    pub fn seal(&self) {
        let completion = {
            let mut state = lock(&self.state);
            if state.ready {
                return;
            }
            state.ready = true;
            tracing::trace!(pending = state.pending, "barrier sealed");
            if !state.finished && state.pending == 0 {
                state.finish(None)
            } else {
                None
            }
        };
        fire(completion);
    }
}

impl std::fmt::Debug for CompletionBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("CompletionBarrier")
            .field("ready", &state.ready)
            .field("finished", &state.finished)
            .field("pending", &state.pending)
            .field("first_error", &state.first_error)
            .finish_non_exhaustive()
    }
}

/// Reporter for one registered job.
///
/// Dropping a handle without reporting counts as a failed job.
pub struct JobHandle {
    state: Option<Arc<Mutex<BarrierState>>>,
}

impl JobHandle {
    pub fn report(mut self, error: Option<SchemaError>) {
        if let Some(state) = self.state.take() {
            complete_job(&state, error);
        }
    }

    pub fn succeed(self) {
        self.report(None);
    }

    pub fn fail(self, error: SchemaError) {
        self.report(Some(error));
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            complete_job(
                &state,
                Some(SchemaError::illegal_state("job abandoned without reporting")),
            );
        }
    }
}

fn complete_job(state: &Mutex<BarrierState>, error: Option<SchemaError>) {
    let completion = {
        let mut state = lock(state);
        state.pending = state.pending.saturating_sub(1);

        if state.finished {
            return;
        }

        match error {
            Some(error) => {
                tracing::trace!(%error, "barrier failed");
                state.finish(Some(error))
            }
            None if state.ready && state.pending == 0 => state.finish(None),
            None => None,
        }
    };
    fire(completion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Outcomes = Arc<Mutex<Vec<Option<SchemaError>>>>;

    fn recording_barrier() -> (CompletionBarrier, Arc<AtomicUsize>, Outcomes) {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcomes: Outcomes = Arc::new(Mutex::new(Vec::new()));
        let barrier = {
            let calls = Arc::clone(&calls);
            let outcomes = Arc::clone(&outcomes);
            CompletionBarrier::new(move |error| {
                calls.fetch_add(1, Ordering::SeqCst);
                outcomes.lock().unwrap().push(error);
            })
        };
        (barrier, calls, outcomes)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_zero_jobs_completes_on_seal() {
        let (barrier, calls, outcomes) = recording_barrier();
        settle().await;
        assert!(!barrier.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        barrier.seal();

        assert!(barrier.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.lock().unwrap().as_slice(), &[None]);

        barrier.seal();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waits_for_all_jobs() {
        let (barrier, calls, outcomes) = recording_barrier();
        let first = barrier.register_job().unwrap();
        let second = barrier.register_job().unwrap();
        assert_eq!(barrier.pending(), 2);

        barrier.seal();
        assert!(barrier.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        first.succeed();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        second.succeed();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.lock().unwrap().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_successes_before_seal_wait_for_it() {
        let (barrier, calls, _) = recording_barrier();
        barrier.register_job().unwrap().succeed();
        settle().await;
        assert!(!barrier.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        barrier.seal();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_error_wins_and_fires_once() {
        let (barrier, calls, outcomes) = recording_barrier();
        let first = barrier.register_job().unwrap();
        let second = barrier.register_job().unwrap();
        let third = barrier.register_job().unwrap();

        second.fail(SchemaError::fetch("http://h/a", "boom"));
        assert!(barrier.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        first.succeed();
        third.fail(SchemaError::fetch("http://h/b", "later"));
        barrier.seal();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcomes.lock().unwrap().as_slice(),
            &[Some(SchemaError::fetch("http://h/a", "boom"))]
        );
        assert_eq!(barrier.error(), Some(SchemaError::fetch("http://h/a", "boom")));
    }

    #[tokio::test]
    async fn test_jobs_registered_from_inside_a_job() {
        let (barrier, calls, _) = recording_barrier();
        let outer = barrier.register_job().unwrap();
        barrier.seal();

        let nested_barrier = barrier.clone();
        let task = tokio::spawn(async move {
            let inner = nested_barrier.register_job().unwrap();
            outer.succeed();
            tokio::task::yield_now().await;
            inner
        });
        let inner = task.await.unwrap();

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        inner.succeed();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_setup_on_multi_thread_runtime() {
        for _ in 0..50 {
            let (barrier, rx) = CompletionBarrier::channel();
            let early = barrier.register_job().unwrap();
            tokio::spawn(async move { early.succeed() });

            // Synchronous setup that outlasts any scheduler tick.
            std::thread::sleep(std::time::Duration::from_millis(2));
            let late = barrier.register_job().unwrap();
            barrier.seal();

            assert!(!barrier.is_finished());
            tokio::spawn(async move { late.succeed() });
            assert_eq!(rx.await.unwrap(), Ok(()));
        }
    }

    #[tokio::test]
    async fn test_register_after_finish_is_illegal() {
        let (barrier, _, _) = recording_barrier();
        barrier.seal();
        assert!(barrier.is_finished());

        let err = barrier.register_job().err().unwrap();
        assert!(matches!(err, SchemaError::IllegalState { .. }));
    }

    #[tokio::test]
    async fn test_dropped_handle_fails_the_barrier() {
        let (barrier, rx) = CompletionBarrier::channel();
        let job = barrier.register_job().unwrap();
        drop(job);

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(SchemaError::IllegalState { .. })));
    }

    #[tokio::test]
    async fn test_channel_reports_success() {
        let (barrier, rx) = CompletionBarrier::channel();
        let job = barrier.register_job().unwrap();
        barrier.seal();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            job.succeed();
        });

        assert_eq!(rx.await.unwrap(), Ok(()));
    }

    #[test]
    fn test_works_without_runtime() {
        let (barrier, calls, _) = recording_barrier();
        let job = barrier.register_job().unwrap();
        barrier.seal();
        assert!(!barrier.is_finished());

        job.succeed();
        assert!(barrier.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
