use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::TitleFailurePolicy;
use crate::correlate::correlate;
use crate::domain::{CorrelatedResult, Query, SessionState};
use crate::error::SearchError;
use crate::fetch::{AbortHandle, FetchError, IdentifierFetcher, TitleFetcher};
use crate::parser::ParsedRecord;
use crate::request::RequestTemplates;
use crate::transport::Transport;

#[derive(Debug)]
pub enum SearchOutcome {
    Completed(Vec<CorrelatedResult>),
    Failed(SearchError),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEvent {
    pub from: SessionState,
    pub to: SessionState,
    pub elapsed: Duration,
}

/// Observer for session state changes. Called in transition order while the
/// session is locked, so implementations must not call back into the session.
pub trait StateSink: Send + Sync {
    fn transition(&self, event: StateEvent);
}

#[derive(Clone, Default)]
pub struct SessionOptions {
    pub title_failure: TitleFailurePolicy,
    pub sink: Option<Arc<dyn StateSink>>,
}

impl SessionOptions {
    pub fn with_title_failure(mut self, policy: TitleFailurePolicy) -> Self {
        self.title_failure = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn StateSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

pub struct SearchTicket {
    rx: Receiver<SearchOutcome>,
}

impl SearchTicket {
    /// `None` once the outcome has already been taken.
    pub fn wait(&self) -> Option<SearchOutcome> {
        self.rx.recv().ok()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<SearchOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn try_outcome(&self) -> Option<SearchOutcome> {
        self.rx.try_recv().ok()
    }
}

struct Core {
    state: SessionState,
    started: Instant,
    live: Option<AbortHandle>,
    outcome: Option<Sender<SearchOutcome>>,
    sink: Option<Arc<dyn StateSink>>,
}

impl Core {
    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        debug_assert!(from.can_transition_to(to), "{from} -> {to}");
        self.state = to;
        if to.is_terminal() {
            self.live = None;
        }
        let elapsed = self.started.elapsed();
        info!(%from, %to, elapsed_ms = elapsed.as_millis() as u64, "search session");
        if let Some(sink) = &self.sink {
            sink.transition(StateEvent { from, to, elapsed });
        }
    }

    fn deliver(&mut self, outcome: SearchOutcome) {
        if let Some(tx) = self.outcome.take() {
            // The caller may have dropped its ticket; nothing to report to then.
            let _ = tx.send(outcome);
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    title_failure: TitleFailurePolicy,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self, expected: SessionState, handle: AbortHandle) -> bool {
        let mut core = self.lock();
        if core.state != expected {
            return false;
        }
        core.live = Some(handle);
        true
    }

    fn advance(&self, expected: SessionState, to: SessionState) -> bool {
        let mut core = self.lock();
        if core.state != expected {
            debug!(state = %core.state, ignored = %to, "late fetch event ignored");
            return false;
        }
        core.transition(to);
        true
    }

    fn finish(&self, expected: SessionState, to: SessionState, outcome: SearchOutcome) {
        let mut core = self.lock();
        if core.state != expected {
            debug!(state = %core.state, ignored = %to, "late fetch event ignored");
            return;
        }
        core.transition(to);
        core.deliver(outcome);
    }

    fn complete(&self, expected: SessionState, results: Vec<CorrelatedResult>) {
        self.finish(expected, SessionState::Completed, SearchOutcome::Completed(results));
    }

    fn fail(&self, expected: SessionState, error: SearchError) {
        self.finish(expected, SessionState::Failed, SearchOutcome::Failed(error));
    }

    fn cancel(&self) {
        let mut core = self.lock();
        match core.state {
            SessionState::Idle => core.transition(SessionState::Cancelled),
            state if state.is_active() => {
                if let Some(live) = core.live.take() {
                    live.abort();
                }
                core.transition(SessionState::Cancelled);
                core.deliver(SearchOutcome::Cancelled);
            }
            _ => {}
        }
    }

    fn abandon(&self) {
        let mut core = self.lock();
        if core.state.is_active() {
            warn!(state = %core.state, "search worker exited early");
            core.transition(SessionState::Failed);
            core.deliver(SearchOutcome::Failed(SearchError::WorkerLost));
        }
    }
}

struct WorkerGuard(Arc<Shared>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.abandon();
    }
}

pub struct SearchSession {
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    templates: RequestTemplates,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SearchSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        templates: RequestTemplates,
        options: SessionOptions,
    ) -> Self {
        let core = Core {
            state: SessionState::Idle,
            started: Instant::now(),
            live: None,
            outcome: None,
            sink: options.sink,
        };
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                title_failure: options.title_failure,
            }),
            transport,
            templates,
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// A session runs a single query; starting it again, or after it was
    /// cancelled, is refused.
    pub fn start(&self, query: Query) -> Result<SearchTicket, SearchError> {
        let (tx, rx) = mpsc::channel();
        {
            let mut core = self.shared.lock();
            if core.state != SessionState::Idle {
                return Err(SearchError::SessionInUse(core.state));
            }
            core.started = Instant::now();
            core.outcome = Some(tx);
            core.transition(SessionState::FetchingIdentifiers);
        }

        let shared = self.shared.clone();
        let transport = self.transport.clone();
        let templates = self.templates.clone();
        let spawned = thread::Builder::new()
            .name("molsearch-session".to_string())
            .spawn(move || run(shared, transport, templates, query));
        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
            }
            Err(err) => self.shared.fail(
                SessionState::FetchingIdentifiers,
                SearchError::Worker(err.to_string()),
            ),
        }
        Ok(SearchTicket { rx })
    }

    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn join(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn run(
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    templates: RequestTemplates,
    query: Query,
) {
    let _guard = WorkerGuard(shared.clone());

    let fetcher = IdentifierFetcher::new(transport.clone(), templates.search_schema());
    if !shared.arm(SessionState::FetchingIdentifiers, fetcher.abort_handle()) {
        return;
    }
    let identifiers = match fetcher.fetch(&templates.search_request(&query)) {
        Ok(identifiers) => identifiers,
        Err(FetchError::Aborted) => return,
        Err(FetchError::Failed { error, partial }) => {
            debug!(partial = partial.len(), "identifier fetch failed");
            shared.fail(SessionState::FetchingIdentifiers, error);
            return;
        }
    };

    if identifiers.is_empty() {
        shared.complete(SessionState::FetchingIdentifiers, Vec::new());
        return;
    }
    if !shared.advance(SessionState::FetchingIdentifiers, SessionState::FetchingTitles) {
        return;
    }

    let fetcher = TitleFetcher::new(transport, templates.title_schema());
    if !shared.arm(SessionState::FetchingTitles, fetcher.abort_handle()) {
        return;
    }
    let titles = match fetcher.fetch(&templates.title_requests(&identifiers)) {
        Ok(titles) => titles,
        Err(FetchError::Aborted) => return,
        Err(FetchError::Failed { error, partial }) => match shared.title_failure {
            TitleFailurePolicy::Strict => {
                shared.fail(SessionState::FetchingTitles, error);
                return;
            }
            TitleFailurePolicy::Degrade => {
                warn!(%error, resolved = partial.len(), "title lookup failed, keeping untitled results");
                partial.into_iter().map(ParsedRecord::into_title).collect()
            }
        },
    };

    shared.complete(SessionState::FetchingTitles, correlate(&identifiers, &titles));
}
