//! Session state and the portal coordinator
//!
//! The pipeline itself is stateless. What the front end needs to remember,
//! the selected query and the result on screen, lives in a [`Session`].
//! Every selection or execution bumps a generation counter; a response is
//! only stored if its ticket still carries the current generation, so a slow
//! request can never overwrite the result of a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::client::SparqlClient;
use crate::config::{PortalConfig, QuerySpec};
use crate::endpoint::{ClientConfig, EndpointClient};
use crate::error::{PortalError, PortalResult};
use crate::export::{ExportArtifact, Exporter};
use crate::render::{render, DisplayTree};
use crate::result::{QueryOutcome, ResultStats};

/// Proof that an execution was started for a given generation
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    generation: u64,
    query: QuerySpec,
}

impl Ticket {
    /// Generation the execution was started in
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Query being executed
    pub fn query(&self) -> &QuerySpec {
        &self.query
    }
}

/// Selected query and displayed result
#[derive(Debug, Default)]
pub struct Session {
    active: Option<QuerySpec>,
    generation: u64,
    current: Option<Arc<QueryOutcome>>,
}

impl Session {
    /// Empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a query, discarding the held result and any pending execution
    pub fn select(&mut self, query: QuerySpec) -> u64 {
        self.active = Some(query);
        self.invalidate()
    }

    /// Drop the selection and the held result
    pub fn clear(&mut self) -> u64 {
        self.active = None;
        self.invalidate()
    }

    /// Start executing the selected query, discarding the held result
    pub fn begin(&mut self) -> Option<Ticket> {
        let query = self.active.clone()?;
        let generation = self.invalidate();
        Some(Ticket { generation, query })
    }

    /// Whether a ticket still belongs to the current generation
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    /// Store the outcome of an execution. Returns `false`, storing nothing,
    /// when the ticket is stale.
    pub fn complete(&mut self, ticket: &Ticket, outcome: Arc<QueryOutcome>) -> bool {
        if !self.is_current(ticket) {
            debug!(
                "Discarding result of '{}' from generation {} (current {})",
                ticket.query.id, ticket.generation, self.generation
            );
            return false;
        }
        self.current = Some(outcome);
        true
    }

    /// Selected query
    pub fn active(&self) -> Option<&QuerySpec> {
        self.active.as_ref()
    }

    /// Held result
    pub fn current(&self) -> Option<&Arc<QueryOutcome>> {
        self.current.as_ref()
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn invalidate(&mut self) -> u64 {
        self.current = None;
        self.generation += 1;
        self.generation
    }
}

/// Busy indicator driven by the portal
pub trait LoadingIndicator: Send + Sync {
    fn set_loading(&self, loading: bool);
}

/// Indicator that shows nothing
#[derive(Debug, Default)]
pub struct NoIndicator;

impl LoadingIndicator for NoIndicator {
    fn set_loading(&self, _loading: bool) {}
}

/// Busy state shared by every in-flight operation of a portal.
///
/// The indicator is switched on by the first operation and off by the last,
/// so overlapping executions never clear it early.
pub struct LoadingState {
    indicator: Arc<dyn LoadingIndicator>,
    active: Mutex<usize>,
}

impl LoadingState {
    pub fn new(indicator: Arc<dyn LoadingIndicator>) -> Self {
        Self {
            indicator,
            active: Mutex::new(0),
        }
    }

    /// Whether any operation is in flight
    pub fn is_loading(&self) -> bool {
        *self.count() > 0
    }

    fn count(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoadingState {
    fn default() -> Self {
        Self::new(Arc::new(NoIndicator))
    }
}

/// Marks one operation as in flight until dropped, on every exit path
pub struct LoadingGuard<'a> {
    state: &'a LoadingState,
}

impl<'a> LoadingGuard<'a> {
    pub fn acquire(state: &'a LoadingState) -> Self {
        let mut active = state.count();
        *active += 1;
        if *active == 1 {
            state.indicator.set_loading(true);
        }
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.state.count();
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.state.indicator.set_loading(false);
        }
    }
}

/// What an execution produced for the front end
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub query_id: String,
    pub outcome: Arc<QueryOutcome>,
    pub display: DisplayTree,
    pub stats: ResultStats,
    pub elapsed: Duration,
}

/// Result of `Portal::execute`
#[derive(Debug, Clone)]
pub enum Execution {
    /// The result is now the displayed one
    Completed(ExecutionReport),
    /// A newer selection or execution started while this one was in flight
    Superseded,
}

/// Coordinates configuration, client, exporter and session for a front end
pub struct Portal {
    config: PortalConfig,
    client: Arc<dyn SparqlClient>,
    exporter: Exporter,
    session: RwLock<Session>,
    loading: LoadingState,
}

impl Portal {
    /// Create a portal over an existing client
    pub fn new(config: PortalConfig, client: Arc<dyn SparqlClient>) -> Self {
        let exporter = Exporter::new(config.export_formats.clone());
        Self {
            config,
            client,
            exporter,
            session: RwLock::new(Session::new()),
            loading: LoadingState::default(),
        }
    }

    /// Create a portal talking HTTP to the configured endpoint
    pub fn from_config(config: PortalConfig, client_config: ClientConfig) -> PortalResult<Self> {
        let client = EndpointClient::with_config(config.endpoint(), client_config)?;
        info!("Portal using SPARQL endpoint {}", client.endpoint());
        Ok(Self::new(config, Arc::new(client)))
    }

    /// Builder: busy indicator
    pub fn with_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.loading = LoadingState::new(indicator);
        self
    }

    /// Configuration
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Query catalogue
    pub fn queries(&self) -> &[QuerySpec] {
        &self.config.queries
    }

    /// Exporter over the configured formats
    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Client in use
    pub fn client(&self) -> &Arc<dyn SparqlClient> {
        &self.client
    }

    /// Select a query by id, discarding the displayed result
    pub async fn select_query(&self, id: &str) -> PortalResult<QuerySpec> {
        let query = self
            .config
            .query(id)
            .cloned()
            .ok_or_else(|| PortalError::UnknownQuery(id.to_string()))?;
        self.session.write().await.select(query.clone());
        debug!("Selected query '{}'", id);
        Ok(query)
    }

    /// Clear the selection and the displayed result
    pub async fn clear_selection(&self) {
        self.session.write().await.clear();
    }

    /// Whether an execution or export is in flight
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Selected query
    pub async fn active_query(&self) -> Option<QuerySpec> {
        self.session.read().await.active().cloned()
    }

    /// Held result
    pub async fn current_outcome(&self) -> Option<Arc<QueryOutcome>> {
        self.session.read().await.current().cloned()
    }

    /// Rendering of the held result
    pub async fn current_display(&self) -> Option<DisplayTree> {
        self.current_outcome().await.map(|outcome| render(&outcome.result))
    }

    /// Execute the selected query and make its result the displayed one.
    ///
    /// The session lock is not held while the request is in flight.
    pub async fn execute(&self) -> PortalResult<Execution> {
        let _loading = LoadingGuard::acquire(&self.loading);

        let ticket = self
            .session
            .write()
            .await
            .begin()
            .ok_or(PortalError::NoActiveQuery)?;
        let query = ticket.query();
        info!("Executing query '{}'", query.id);

        let started = Instant::now();
        let fetched = self
            .client
            .execute(&query.sparql, query.expected_shape.accept())
            .await;
        let elapsed = started.elapsed();

        let payload = match fetched {
            Ok(payload) => payload,
            Err(e) => {
                if self.session.read().await.is_current(&ticket) {
                    error!("Query '{}' failed: {}", query.id, e);
                    return Err(e);
                }
                debug!("Ignoring failure of superseded query '{}': {}", query.id, e);
                return Ok(Execution::Superseded);
            }
        };

        let outcome = Arc::new(QueryOutcome::from_payload(payload));
        if !self.session.write().await.complete(&ticket, Arc::clone(&outcome)) {
            return Ok(Execution::Superseded);
        }

        let stats = outcome.stats();
        info!(
            "Query '{}' returned {} rows in {}ms",
            query.id,
            stats.rows,
            elapsed.as_millis()
        );

        Ok(Execution::Completed(ExecutionReport {
            query_id: query.id.clone(),
            display: render(&outcome.result),
            outcome,
            stats,
            elapsed,
        }))
    }

    /// Export the displayed result of the selected query
    pub async fn export(&self, format_id: &str) -> PortalResult<ExportArtifact> {
        let _loading = LoadingGuard::acquire(&self.loading);

        let (query, held) = {
            let session = self.session.read().await;
            (session.active().cloned(), session.current().cloned())
        };
        let held = held.ok_or(PortalError::NoActiveResult)?;
        let query = query.ok_or(PortalError::NoActiveQuery)?;

        self.exporter
            .export_as(self.client.as_ref(), format_id, &query, Some(held.as_ref()))
            .await
    }
}
