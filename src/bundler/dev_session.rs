//! Dev-server integration: watches tx3 sources and reloads clients after regeneration

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bundler::{DevServer, DevServerError, HmrMessage, WatchEvent};
use crate::generation::{GenerationCoordinator, InputMatcher};

/// What a single watch event led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Ignored,
    Regenerated,
    Coalesced,
    Failed,
}

/// Routes watcher events for one plugin instance
pub struct WatchDispatcher {
    coordinator: Arc<GenerationCoordinator>,
    matcher: InputMatcher,
    server: Arc<dyn DevServer>,
}

impl WatchDispatcher {
    pub fn new(
        coordinator: Arc<GenerationCoordinator>,
        matcher: InputMatcher,
        server: Arc<dyn DevServer>,
    ) -> Self {
        Self {
            coordinator,
            matcher,
            server,
        }
    }

    /// Regenerates and reloads when a watched input changed.
    ///
    /// Additions and removals are ignored, as are changes to files outside
    /// the plugin's inputs. A change folded into a run already in flight
    /// reloads once that run finishes. Generation failures are reported to
    /// clients and never stop the session.
    pub async fn dispatch(&self, event: WatchEvent) -> Dispatch {
        let WatchEvent::Changed(path) = event else {
            debug!(path = %event.path().display(), "Ignoring non-change watch event");
            return Dispatch::Ignored;
        };

        let path = self.coordinator.config().project_root.join(path);
        if !self.matcher.matches(&path) {
            return Dispatch::Ignored;
        }

        info!(path = %path.display(), "tx3 file changed, regenerating bindings");

        // `Coalesced` only returns once the run covering this change finished
        match self.coordinator.regenerate().await {
            Ok(outcome) => {
                self.server.invalidate_all().await;
                self.server.send(HmrMessage::FullReload).await;
                if outcome.ran() {
                    Dispatch::Regenerated
                } else {
                    Dispatch::Coalesced
                }
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to regenerate tx3 bindings");
                self.server
                    .send(HmrMessage::Error {
                        message: e.to_string(),
                    })
                    .await;
                Dispatch::Failed
            }
        }
    }
}

/// A running watch subscription; dropping it also ends the dispatch loop
pub struct DevSession {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    watched: Vec<PathBuf>,
}

impl DevSession {
    /// Registers `files` with the server and starts dispatching its events
    pub async fn start(
        coordinator: Arc<GenerationCoordinator>,
        server: Arc<dyn DevServer>,
        files: Vec<PathBuf>,
    ) -> Result<Self, DevServerError> {
        let matcher = InputMatcher::new(&coordinator.config().absolute_patterns, &files)?;

        // subscribe first so nothing emitted during registration is lost
        let events = server.subscribe();
        server.watch(&files).await?;

        info!(files = files.len(), "Watching tx3 sources");

        let dispatcher = WatchDispatcher::new(coordinator, matcher, server);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_dispatch_loop(dispatcher, events, shutdown_rx));

        Ok(Self {
            shutdown,
            task,
            watched: files,
        })
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the loop, letting an in-flight dispatch finish first
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "tx3 dev session task ended abnormally");
        }
    }
}

async fn run_dispatch_loop(
    dispatcher: WatchDispatcher,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(event) => {
                    dispatcher.dispatch(event).await;
                }
                None => break,
            },
        }
    }
    debug!("tx3 dev session stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::{Notify, Semaphore};

    use crate::config::{PluginOptions, sanitize_options};
    use crate::generation::{
        GenerationError, GenerationGuard, GenerationOutcome, GenerationRequest, OutputService,
        TargetLanguage,
    };
    use crate::infrastructure::shell::{CommandExecutor, CommandStatus};

    struct CountingExecutor {
        calls: AtomicUsize,
        exit_code: i32,
        args: Mutex<Vec<Vec<String>>>,
        started: Notify,
        gate: Option<Semaphore>,
    }

    impl CountingExecutor {
        fn new(exit_code: i32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                exit_code,
                args: Mutex::new(Vec::new()),
                started: Notify::new(),
                gate: None,
            })
        }

        fn gated() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                exit_code: 0,
                args: Mutex::new(Vec::new()),
                started: Notify::new(),
                gate: Some(Semaphore::new(0)),
            })
        }

        fn release(&self, runs: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(runs);
            }
        }
    }

    #[async_trait]
    impl CommandExecutor for CountingExecutor {
        async fn execute(
            &self,
            request: &GenerationRequest,
            _working_dir: &Path,
        ) -> Result<CommandStatus, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.args.lock().unwrap().push(
                request
                    .args()
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
            );
            self.started.notify_one();
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            Ok(CommandStatus::failure(self.exit_code))
        }
    }

    struct NoopOutput;

    #[async_trait]
    impl OutputService for NoopOutput {
        async fn ensure_directory(&self, _path: &Path) -> Result<(), GenerationError> {
            Ok(())
        }

        async fn list_artifacts(
            &self,
            _dir: &Path,
            _target: TargetLanguage,
        ) -> Result<Vec<PathBuf>, GenerationError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MockDevServer {
        watched: Mutex<Vec<PathBuf>>,
        subscribers: Mutex<Vec<mpsc::UnboundedSender<WatchEvent>>>,
        invalidations: AtomicUsize,
        messages: Mutex<Vec<HmrMessage>>,
    }

    impl MockDevServer {
        fn emit(&self, event: WatchEvent) {
            for tx in self.subscribers.lock().unwrap().iter() {
                let _ = tx.send(event.clone());
            }
        }

        fn messages(&self) -> Vec<HmrMessage> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DevServer for MockDevServer {
        async fn watch(&self, paths: &[PathBuf]) -> Result<(), DevServerError> {
            self.watched.lock().unwrap().extend_from_slice(paths);
            Ok(())
        }

        fn subscribe(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.subscribers.lock().unwrap().push(tx);
            rx
        }

        async fn invalidate_all(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }

        async fn send(&self, message: HmrMessage) {
            self.messages.lock().unwrap().push(message);
        }
    }

    fn project() -> TempDir {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("contracts")).unwrap();
        std::fs::write(root.path().join("contracts/main.tx3"), "party Buyer;").unwrap();
        root
    }

    fn coordinator_for(
        root: &TempDir,
        executor: &Arc<CountingExecutor>,
    ) -> Arc<GenerationCoordinator> {
        let options = PluginOptions::new(["contracts/*.tx3"]);
        let config = sanitize_options(options, root.path()).unwrap();
        Arc::new(GenerationCoordinator::new(
            config,
            executor.clone(),
            Arc::new(NoopOutput),
        ))
    }

    fn setup(exit_code: i32) -> (TempDir, Arc<CountingExecutor>, Arc<GenerationCoordinator>) {
        let root = project();
        let executor = CountingExecutor::new(exit_code);
        let coordinator = coordinator_for(&root, &executor);
        (root, executor, coordinator)
    }

    fn dispatcher(
        coordinator: &Arc<GenerationCoordinator>,
        server: &Arc<MockDevServer>,
    ) -> WatchDispatcher {
        let config = coordinator.config();
        let matcher = InputMatcher::new(&config.absolute_patterns, &config.input_files).unwrap();
        WatchDispatcher::new(coordinator.clone(), matcher, server.clone())
    }

    #[tokio::test]
    async fn test_change_to_input_regenerates_and_reloads() {
        let (root, executor, coordinator) = setup(0);
        let server = Arc::new(MockDevServer::default());
        let dispatcher = dispatcher(&coordinator, &server);

        let outcome = dispatcher
            .dispatch(WatchEvent::Changed(root.path().join("contracts/main.tx3")))
            .await;

        assert_eq!(outcome, Dispatch::Regenerated);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(server.invalidations.load(Ordering::SeqCst), 1);
        assert_eq!(server.messages(), vec![HmrMessage::FullReload]);
    }

    #[tokio::test]
    async fn test_relative_change_path_is_resolved_against_root() {
        let (_root, executor, coordinator) = setup(0);
        let server = Arc::new(MockDevServer::default());
        let dispatcher = dispatcher(&coordinator, &server);

        let outcome = dispatcher
            .dispatch(WatchEvent::Changed(PathBuf::from("contracts/main.tx3")))
            .await;

        assert_eq!(outcome, Dispatch::Regenerated);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrelated_and_non_change_events_are_ignored() {
        let (root, executor, coordinator) = setup(0);
        let server = Arc::new(MockDevServer::default());
        let dispatcher = dispatcher(&coordinator, &server);

        let events = [
            WatchEvent::Changed(root.path().join("src/app.ts")),
            WatchEvent::Added(root.path().join("contracts/main.tx3")),
            WatchEvent::Removed(root.path().join("contracts/main.tx3")),
        ];
        for event in events {
            assert_eq!(dispatcher.dispatch(event).await, Dispatch::Ignored);
        }

        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(server.invalidations.load(Ordering::SeqCst), 0);
        assert!(server.messages().is_empty());
    }

    #[tokio::test]
    async fn test_new_file_matching_pattern_is_passed_to_generator() {
        let (root, executor, coordinator) = setup(0);
        let server = Arc::new(MockDevServer::default());
        let dispatcher = dispatcher(&coordinator, &server);

        let escrow = root.path().join("contracts/escrow.tx3");
        std::fs::write(&escrow, "party Seller;").unwrap();

        let outcome = dispatcher.dispatch(WatchEvent::Changed(escrow.clone())).await;

        assert_eq!(outcome, Dispatch::Regenerated);
        let args = executor.args.lock().unwrap();
        assert_eq!(args.len(), 1);
        assert!(args[0].contains(&escrow.display().to_string()));
    }

    #[tokio::test]
    async fn test_change_coalesced_into_another_coordinators_run_still_reloads() {
        let root = project();
        let executor = CountingExecutor::gated();
        // both coordinators write to the same output directory
        let builder = coordinator_for(&root, &executor);
        let watcher = coordinator_for(&root, &executor);
        let server = Arc::new(MockDevServer::default());
        let dispatcher = dispatcher(&watcher, &server);

        let build = tokio::spawn({
            let builder = builder.clone();
            async move { builder.ensure_generated().await }
        });
        executor.started.notified().await;

        let changed = root.path().join("contracts/main.tx3");
        let dispatch =
            tokio::spawn(async move { dispatcher.dispatch(WatchEvent::Changed(changed)).await });

        let guard = GenerationGuard::for_output_dir(&watcher.config().output_dir);
        while !guard.has_follow_up() {
            tokio::task::yield_now().await;
        }
        assert!(server.messages().is_empty());

        executor.release(2);

        assert_eq!(dispatch.await.unwrap(), Dispatch::Coalesced);
        assert_eq!(
            build.await.unwrap().unwrap(),
            GenerationOutcome::Generated { runs: 2 }
        );
        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(server.invalidations.load(Ordering::SeqCst), 1);
        assert_eq!(server.messages(), vec![HmrMessage::FullReload]);
    }

    #[tokio::test]
    async fn test_failed_regeneration_reports_error_without_reload() {
        let (root, executor, coordinator) = setup(2);
        let server = Arc::new(MockDevServer::default());
        let dispatcher = dispatcher(&coordinator, &server);

        let outcome = dispatcher
            .dispatch(WatchEvent::Changed(root.path().join("contracts/main.tx3")))
            .await;

        assert_eq!(outcome, Dispatch::Failed);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(server.invalidations.load(Ordering::SeqCst), 0);

        let messages = server.messages();
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], HmrMessage::Error { message } if message.contains("exit code 2")));
    }

    #[tokio::test]
    async fn test_session_watches_inputs_and_survives_failures() {
        let (root, executor, coordinator) = setup(1);
        let server = Arc::new(MockDevServer::default());
        let files = coordinator.config().input_files.clone();

        let session = DevSession::start(coordinator.clone(), server.clone(), files.clone())
            .await
            .unwrap();
        assert_eq!(*server.watched.lock().unwrap(), files);
        assert_eq!(session.watched(), files.as_slice());

        let changed = root.path().join("contracts/main.tx3");
        server.emit(WatchEvent::Changed(changed.clone()));
        server.emit(WatchEvent::Changed(changed));

        tokio::time::timeout(Duration::from_secs(5), async {
            while executor.calls.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("both change events dispatched");

        assert!(session.is_running());
        session.shutdown().await;
        assert_eq!(server.messages().len(), 2);
    }
}
