//! Per-output-directory serialization of generator runs
//!
//! Two coordinators pointed at the same output directory share one guard, so
//! their generator processes never write into it concurrently.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard as StdMutexGuard};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, TryLockError, watch};

/// The last generator run that finished on a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    /// Sequence number handed out by [`GenerationGuard::begin_run`]; 0 before any run
    pub seq: u64,
    /// Rendered error when the run failed
    pub error: Option<String>,
}

#[derive(Debug)]
struct FollowUp {
    pending: bool,
    next_run: u64,
}

/// Mutual-exclusion token plus a "run again when done" flag
#[derive(Debug)]
pub struct GenerationGuard {
    lock: AsyncMutex<()>,
    follow_up: Mutex<FollowUp>,
    finished: watch::Sender<RunRecord>,
}

impl Default for GenerationGuard {
    fn default() -> Self {
        Self {
            lock: AsyncMutex::new(()),
            follow_up: Mutex::new(FollowUp {
                pending: false,
                next_run: 1,
            }),
            finished: watch::Sender::new(RunRecord {
                seq: 0,
                error: None,
            }),
        }
    }
}

impl GenerationGuard {
    /// Guard shared by everyone generating into `output_dir`
    pub fn for_output_dir(output_dir: &Path) -> Arc<Self> {
        static GUARDS: Lazy<Mutex<HashMap<PathBuf, Arc<GenerationGuard>>>> =
            Lazy::new(|| Mutex::new(HashMap::new()));

        let mut guards = GUARDS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guards
            .entry(output_dir.to_path_buf())
            .or_insert_with(|| Arc::new(GenerationGuard::default()))
            .clone()
    }

    fn state(&self) -> StdMutexGuard<'_, FollowUp> {
        self.follow_up
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits until no other run holds the directory
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Takes the directory only if it is idle
    pub fn try_acquire(&self) -> Result<MutexGuard<'_, ()>, TryLockError> {
        self.lock.try_lock()
    }

    /// Records that another run is wanted once the current one finishes.
    ///
    /// Returns a ticket: the first run numbered at or above it starts after
    /// this request and therefore covers it.
    pub fn request_follow_up(&self) -> u64 {
        let mut state = self.state();
        state.pending = true;
        state.next_run
    }

    pub fn has_follow_up(&self) -> bool {
        self.state().pending
    }

    /// Called by the permit holder right before spawning the generator.
    /// Clears the follow-up flag and numbers the run.
    pub fn begin_run(&self) -> u64 {
        let mut state = self.state();
        state.pending = false;
        let seq = state.next_run;
        state.next_run += 1;
        seq
    }

    /// Publishes the result of run `seq` to everyone waiting on a ticket
    pub fn finish_run(&self, seq: u64, error: Option<String>) {
        self.finished.send_replace(RunRecord { seq, error });
    }

    /// Waits until a run covering `ticket` has finished and returns its record
    pub async fn wait_for_run(&self, ticket: u64) -> RunRecord {
        let mut finished = self.finished.subscribe();
        // the sender lives in `self`, so the channel cannot close while we wait
        match finished.wait_for(|record| record.seq >= ticket).await {
            Ok(record) => record.clone(),
            Err(_) => self.finished.borrow().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_same_directory_shares_guard() {
        let a = GenerationGuard::for_output_dir(Path::new("/tmp/guard-test/shared"));
        let b = GenerationGuard::for_output_dir(Path::new("/tmp/guard-test/shared"));
        let c = GenerationGuard::for_output_dir(Path::new("/tmp/guard-test/other"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_try_acquire_fails_while_held() {
        let guard = GenerationGuard::default();
        let held = guard.acquire().await;
        assert!(guard.try_acquire().is_err());
        drop(held);
        assert!(guard.try_acquire().is_ok());
    }

    #[test]
    fn test_follow_up_flag_and_tickets() {
        let guard = GenerationGuard::default();
        assert!(!guard.has_follow_up());

        let first = guard.request_follow_up();
        let second = guard.request_follow_up();
        assert_eq!(first, second);
        assert!(guard.has_follow_up());

        assert_eq!(guard.begin_run(), first);
        assert!(!guard.has_follow_up());
        assert_eq!(guard.request_follow_up(), first + 1);
    }

    #[tokio::test]
    async fn test_waiter_sees_the_covering_run() {
        let guard = Arc::new(GenerationGuard::default());
        let earlier = guard.begin_run();
        let ticket = guard.request_follow_up();

        let waiter = tokio::spawn({
            let guard = guard.clone();
            async move { guard.wait_for_run(ticket).await }
        });

        // a run that started before the request does not satisfy it
        guard.finish_run(earlier, None);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let covering = guard.begin_run();
        guard.finish_run(covering, Some("exit code 1".to_string()));

        let record = waiter.await.unwrap();
        assert_eq!(record.seq, covering);
        assert_eq!(record.error.as_deref(), Some("exit code 1"));
    }
}
