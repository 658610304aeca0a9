//! Conversion orchestrator implementation.
//!
//! Owns the engine handle, the discovered formats and the single job slot.
//! Every change to the job goes through [`ConversionState::transition`] under
//! one lock, and each change is published as a [`StatusSnapshot`].

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::capabilities::{FormatCatalog, FORMAT_LISTING_ARGS};
use crate::engine::{Engine, EngineError, EngineEvent};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION, DROPS_REJECTED, FORMATS_DISCOVERED};
use crate::progress::ProgressTracker;

use super::config::OrchestratorConfig;
use super::state::{ConversionState, Transition};
use super::types::{
    AcceptedJob, ConversionError, ConversionJob, ConversionOutcome, ConversionOutput,
    DropRejection, DroppedFile, OrchestratorError, StatusSnapshot,
};

/// Virtual file the dropped bytes are written to.
pub const INPUT_FILE_NAME: &str = "input";

/// Mutable orchestrator data, guarded by one lock.
struct Inner {
    state: ConversionState,
    progress: ProgressTracker,
    /// Message of the last refused drop; cleared by the next accepted one.
    validation_error: Option<String>,
    load_error: Option<String>,
}

/// Where engine events go while an execution is observed.
enum EventSink<'a> {
    /// Collect log lines (capability listing).
    Listing(&'a mut Vec<String>),
    /// Feed progress into the tracker of the running job.
    Progress,
}

/// Drives drops through the engine, one job at a time.
///
/// Cloning is cheap and every clone shares the same engine and state.
#[derive(Clone)]
pub struct ConversionOrchestrator {
    config: OrchestratorConfig,
    engine: Arc<dyn Engine>,
    formats: Arc<OnceLock<FormatCatalog>>,
    inner: Arc<RwLock<Inner>>,
    status_tx: Arc<watch::Sender<StatusSnapshot>>,
}

impl ConversionOrchestrator {
    /// Create a new orchestrator in the `Loading` state.
    pub fn new(config: OrchestratorConfig, engine: Arc<dyn Engine>) -> Self {
        let (status_tx, _) = watch::channel(StatusSnapshot::default());

        Self {
            config,
            engine,
            formats: Arc::new(OnceLock::new()),
            inner: Arc::new(RwLock::new(Inner {
                state: ConversionState::Loading,
                progress: ProgressTracker::new(),
                validation_error: None,
                load_error: None,
            })),
            status_tx: Arc::new(status_tx),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Load the engine and discover its formats, moving to `Loaded`.
    ///
    /// Returns the number of formats found. A load failure leaves the
    /// orchestrator in `Loading` with the failure recorded in the snapshot.
    pub async fn start(
        &self,
        core_location: &str,
        wasm_location: &str,
    ) -> Result<usize, OrchestratorError> {
        {
            let inner = self.inner.read().await;
            if !matches!(inner.state, ConversionState::Loading) {
                return Err(OrchestratorError::InvalidTransition {
                    from: inner.state.status().to_string(),
                    event: "engine_ready".to_string(),
                });
            }
        }

        info!("Loading engine '{}' from {}", self.engine.name(), core_location);
        if let Err(e) = self.engine.load(core_location, wasm_location).await {
            return Err(self.fail_load(e).await);
        }

        let catalog = match self.discover_formats().await {
            Ok(catalog) => catalog,
            Err(e) => return Err(self.fail_load(e).await),
        };

        let count = catalog.len();
        if count == 0 {
            warn!("Engine reported no formats, every drop will be rejected");
        }
        FORMATS_DISCOVERED.set(count as i64);
        let readable = catalog.demuxers().count();
        let writable = catalog.muxers().count();

        let mut inner = self.inner.write().await;
        let next = inner.state.transition(Transition::EngineReady)?;
        if self.formats.set(catalog).is_err() {
            warn!("Format catalog already populated, keeping the first one");
        }
        inner.state = next;
        inner.load_error = None;
        self.publish(&inner);

        info!(
            "Engine ready: {} formats ({} readable, {} writable)",
            count, readable, writable
        );
        Ok(count)
    }

    /// The discovered formats, once the engine has loaded.
    pub fn formats(&self) -> Option<&FormatCatalog> {
        self.formats.get()
    }

    /// Current state of the machine.
    pub async fn state(&self) -> ConversionState {
        self.inner.read().await.state.clone()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.status_tx.borrow().clone()
    }

    /// Receive every snapshot change.
    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_tx.subscribe()
    }

    /// The produced file, while the machine is `Done`.
    pub async fn output(&self) -> Option<ConversionOutput> {
        match &self.inner.read().await.state {
            ConversionState::Done { output, .. } => Some(output.clone()),
            _ => None,
        }
    }

    /// Validate a drop and, when valid, move to `Converting`.
    ///
    /// The returned job must be passed to [`run`](Self::run). A refused drop
    /// leaves the state untouched and records its message, except for an
    /// empty drop which is ignored silently.
    pub async fn accept_drop(
        &self,
        files: Vec<DroppedFile>,
        output_format: Option<&str>,
    ) -> Result<AcceptedJob, DropRejection> {
        let mut inner = self.inner.write().await;

        let accepted = match self.validate_drop(&inner.state, files, output_format) {
            Ok(accepted) => accepted,
            Err(rejection) => {
                DROPS_REJECTED.with_label_values(&[rejection.reason()]).inc();
                if !rejection.is_silent() {
                    warn!("Rejected drop: {}", rejection);
                    inner.validation_error = Some(rejection.to_string());
                    self.publish(&inner);
                }
                return Err(rejection);
            }
        };

        let next = inner
            .state
            .transition(Transition::Start(accepted.job.clone()))
            .map_err(|e| {
                error!("Validated drop refused by state machine: {}", e);
                DropRejection::Busy
            })?;
        inner.state = next;
        inner.validation_error = None;
        inner.progress.reset();
        self.publish(&inner);

        info!(
            "Accepted '{}' ({} bytes) for conversion to {} [job {}]",
            accepted.job.input_name,
            accepted.job.input_size_bytes,
            accepted.job.output_format,
            accepted.job.id
        );
        Ok(accepted)
    }

    /// Run an accepted job to `Done` or `Failed`.
    pub async fn run(&self, accepted: AcceptedJob) -> ConversionOutcome {
        let started = Instant::now();
        let AcceptedJob { job, input } = accepted;

        let result = self.convert(&job, &input.bytes).await;
        if self.config.cleanup_files {
            self.cleanup(&job).await;
        }

        let (transition, outcome, label) = match result {
            Ok(output) => {
                info!(
                    "Job {} done: {} ({} bytes) in {:.1}s",
                    job.id,
                    output.file_name,
                    output.size_bytes(),
                    started.elapsed().as_secs_f64()
                );
                (
                    Transition::Finish {
                        job_id: job.id.clone(),
                        output: output.clone(),
                    },
                    ConversionOutcome::Done(output),
                    "done",
                )
            }
            Err(err) => {
                warn!("Job {} failed: {}", job.id, err);
                let label = if err.is_execution_failure() {
                    "execution_failure"
                } else {
                    "io_failure"
                };
                let message = err.to_string();
                (
                    Transition::Fail {
                        job_id: job.id.clone(),
                        error: message.clone(),
                    },
                    ConversionOutcome::Failed(message),
                    label,
                )
            }
        };

        CONVERSIONS_TOTAL.with_label_values(&[label]).inc();
        CONVERSION_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        let mut inner = self.inner.write().await;
        match inner.state.transition(transition) {
            Ok(next) => {
                if outcome.is_done() {
                    inner.progress.complete();
                }
                // Rejections seen while converting must not mask the outcome
                inner.validation_error = None;
                inner.state = next;
                self.publish(&inner);
            }
            Err(e) => warn!("Discarding outcome of job {}: {}", job.id, e),
        }

        outcome
    }

    /// Accept a drop and run it to completion.
    pub async fn handle_drop(
        &self,
        files: Vec<DroppedFile>,
        output_format: Option<&str>,
    ) -> Result<ConversionOutcome, DropRejection> {
        let accepted = self.accept_drop(files, output_format).await?;
        Ok(self.run(accepted).await)
    }

    fn validate_drop(
        &self,
        state: &ConversionState,
        files: Vec<DroppedFile>,
        output_format: Option<&str>,
    ) -> Result<AcceptedJob, DropRejection> {
        if files.len() > 1 {
            return Err(DropRejection::TooManyFiles { count: files.len() });
        }
        let Some(file) = files.into_iter().next() else {
            return Err(DropRejection::NoFile);
        };

        if !state.accepts_drop() {
            return Err(match state {
                ConversionState::Loading => DropRejection::EngineLoading,
                _ => DropRejection::Busy,
            });
        }
        let catalog = self.formats.get().ok_or(DropRejection::EngineLoading)?;

        let extension = file
            .extension()
            .ok_or_else(|| DropRejection::MissingExtension {
                file_name: file.name.clone(),
            })?;
        if catalog.find_demuxer(&extension).is_none() {
            return Err(DropRejection::UnsupportedInput { extension });
        }

        let output_format = output_format
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(self.config.default_output_format.as_str())
            .to_ascii_lowercase();
        // The format becomes part of a virtual file name
        let plain = output_format.chars().all(|c| c.is_ascii_alphanumeric());
        if !plain || catalog.find_muxer(&output_format).is_none() {
            return Err(DropRejection::UnsupportedOutput {
                format: output_format,
            });
        }

        let job = ConversionJob::new(file.name.clone(), file.bytes.len() as u64, &output_format);
        Ok(AcceptedJob { job, input: file })
    }

    async fn convert(
        &self,
        job: &ConversionJob,
        input: &[u8],
    ) -> Result<ConversionOutput, ConversionError> {
        self.engine
            .write_file(INPUT_FILE_NAME, input)
            .await
            .map_err(ConversionError::Write)?;

        // Read back below under the same name
        let argv = vec![
            "-i".to_string(),
            INPUT_FILE_NAME.to_string(),
            job.output_name.clone(),
        ];
        let code = self
            .execute_observed(&argv, EventSink::Progress)
            .await
            .map_err(ConversionError::Execute)?;
        if code != 0 {
            return Err(ConversionError::ExitCode(code));
        }

        let bytes = self
            .engine
            .read_file(&job.output_name)
            .await
            .map_err(ConversionError::Read)?;
        if bytes.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }

        Ok(ConversionOutput::new(
            job.output_name.clone(),
            &job.output_format,
            bytes,
        ))
    }

    async fn cleanup(&self, job: &ConversionJob) {
        for name in [INPUT_FILE_NAME, job.output_name.as_str()] {
            match self.engine.delete_file(name).await {
                Ok(()) | Err(EngineError::FileNotFound { .. }) => {}
                Err(e) => warn!("Failed to remove virtual file {}: {}", name, e),
            }
        }
    }

    async fn discover_formats(&self) -> Result<FormatCatalog, EngineError> {
        let argv: Vec<String> = FORMAT_LISTING_ARGS.iter().map(|a| a.to_string()).collect();
        let mut lines = Vec::new();

        let code = self
            .execute_observed(&argv, EventSink::Listing(&mut lines))
            .await?;
        if code != 0 {
            warn!("Format listing exited with code {}, parsing what was printed", code);
        }

        let catalog = FormatCatalog::from_listing(&lines);
        debug!(
            "Parsed {} formats from {} listing lines",
            catalog.len(),
            lines.len()
        );
        Ok(catalog)
    }

    /// Execute `argv` while routing engine events into `sink`.
    ///
    /// The subscription is opened before execution starts and dropped when it
    /// ends, so events of other executions are never seen.
    async fn execute_observed(
        &self,
        argv: &[String],
        mut sink: EventSink<'_>,
    ) -> Result<i32, EngineError> {
        let mut subscription = self.engine.subscribe();
        let mut execution = self.engine.execute(argv);
        let mut events_open = true;

        let result = loop {
            tokio::select! {
                biased;
                result = &mut execution => break result,
                event = subscription.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event, &mut sink).await,
                    None => events_open = false,
                },
            }
        };

        // Events emitted right before the execution returned
        while let Some(event) = subscription.try_recv() {
            self.handle_event(event, &mut sink).await;
        }

        result
    }

    async fn handle_event(&self, event: EngineEvent, sink: &mut EventSink<'_>) {
        match (event, sink) {
            (EngineEvent::Log { line }, EventSink::Listing(lines)) => lines.push(line),
            (EngineEvent::Log { line }, EventSink::Progress) => debug!("engine: {}", line),
            (EngineEvent::Progress { fraction }, EventSink::Progress) => {
                self.record_progress(fraction).await
            }
            (EngineEvent::Progress { .. }, EventSink::Listing(_)) => {}
        }
    }

    async fn record_progress(&self, fraction: f64) {
        let mut inner = self.inner.write().await;
        if !matches!(inner.state, ConversionState::Converting { .. }) {
            return;
        }

        let before = inner.progress.percent();
        let percent = inner.progress.record(fraction);
        if percent != before {
            debug!("Progress {:.1}%", percent);
            self.publish(&inner);
        }
    }

    async fn fail_load(&self, err: EngineError) -> OrchestratorError {
        error!("Engine failed to load: {}", err);
        let mut inner = self.inner.write().await;
        inner.load_error = Some(err.to_string());
        self.publish(&inner);
        OrchestratorError::Load(err)
    }

    fn publish(&self, inner: &Inner) {
        let error = inner.validation_error.clone().or_else(|| match &inner.state {
            ConversionState::Failed { error, .. } => Some(error.clone()),
            ConversionState::Loading => inner.load_error.clone(),
            _ => None,
        });
        let output = match &inner.state {
            ConversionState::Done { output, .. } => Some(output.summary()),
            _ => None,
        };

        self.status_tx.send_replace(StatusSnapshot {
            status: inner.state.status(),
            progress_percent: inner.progress.percent(),
            error,
            job: inner.state.job().cloned(),
            output,
            format_count: self.formats.get().map_or(0, FormatCatalog::len),
        });
    }
}
