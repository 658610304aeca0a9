//! Mock engine for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::engine::{check_file_name, Engine, EngineError, EngineEvents, EngineSubscription};

use super::fixtures;

/// Mock implementation of the Engine trait.
///
/// Provides controllable behavior for testing:
/// - In-memory virtual filesystem
/// - Configurable format listing, exit code and output bytes
/// - Progress samples emitted during conversions
/// - Simulated load, write and read failures
/// - Recorded argument vectors for assertions
///
/// A conversion is any execution that is not the format listing. It reads
/// the file after `-i`, emits the configured progress samples, and on exit
/// code 0 writes the configured output bytes to the last argument.
///
/// # Example
///
/// ```rust,ignore
/// use dropconvert_core::testing::MockEngine;
///
/// let engine = MockEngine::new();
/// engine.set_progress_samples(vec![0.25, 0.5, 1.0]).await;
/// engine.set_output_bytes(b"converted".to_vec()).await;
///
/// let orchestrator = ConversionOrchestrator::new(config, Arc::new(engine.clone()));
/// orchestrator.start("ffmpeg", "").await?;
///
/// assert_eq!(engine.executions().await.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockEngine {
    events: EngineEvents,
    loaded: Arc<RwLock<bool>>,
    /// Virtual filesystem.
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Recorded argument vectors.
    executions: Arc<RwLock<Vec<Vec<String>>>>,
    /// Lines printed for the format listing.
    listing: Arc<RwLock<Vec<String>>>,
    /// Exit code of conversions.
    exit_code: Arc<RwLock<i32>>,
    /// Bytes written to the output file of a successful conversion.
    output_bytes: Arc<RwLock<Vec<u8>>>,
    /// Progress fractions emitted during a conversion.
    progress_samples: Arc<RwLock<Vec<f64>>>,
    /// If set, `load` fails with this reason.
    load_error: Arc<RwLock<Option<String>>>,
    fail_writes: Arc<RwLock<bool>>,
    fail_reads: Arc<RwLock<bool>>,
    /// Simulated conversion duration in milliseconds.
    execution_delay_ms: Arc<RwLock<u64>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine listing the fixture formats.
    pub fn new() -> Self {
        Self {
            events: EngineEvents::default(),
            loaded: Arc::new(RwLock::new(false)),
            files: Arc::new(RwLock::new(HashMap::new())),
            executions: Arc::new(RwLock::new(Vec::new())),
            listing: Arc::new(RwLock::new(fixtures::format_listing())),
            exit_code: Arc::new(RwLock::new(0)),
            output_bytes: Arc::new(RwLock::new(fixtures::output_bytes())),
            progress_samples: Arc::new(RwLock::new(Vec::new())),
            load_error: Arc::new(RwLock::new(None)),
            fail_writes: Arc::new(RwLock::new(false)),
            fail_reads: Arc::new(RwLock::new(false)),
            execution_delay_ms: Arc::new(RwLock::new(0)),
        }
    }

    /// Replace the format listing.
    pub async fn set_listing(&self, lines: Vec<String>) {
        *self.listing.write().await = lines;
    }

    /// Set the exit code of conversions.
    pub async fn set_exit_code(&self, code: i32) {
        *self.exit_code.write().await = code;
    }

    /// Set the bytes a successful conversion produces.
    pub async fn set_output_bytes(&self, bytes: Vec<u8>) {
        *self.output_bytes.write().await = bytes;
    }

    /// Set the progress fractions emitted during a conversion.
    pub async fn set_progress_samples(&self, samples: Vec<f64>) {
        *self.progress_samples.write().await = samples;
    }

    /// Make `load` fail with the given reason.
    pub async fn set_load_error(&self, reason: impl Into<String>) {
        *self.load_error.write().await = Some(reason.into());
    }

    /// Make `write_file` fail.
    pub async fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    /// Make `read_file` fail.
    pub async fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.write().await = fail;
    }

    /// Set the simulated conversion duration.
    pub async fn set_execution_delay(&self, delay: Duration) {
        *self.execution_delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Get all recorded argument vectors.
    pub async fn executions(&self) -> Vec<Vec<String>> {
        self.executions.read().await.clone()
    }

    /// Get the contents of a virtual file.
    pub async fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(name).cloned()
    }

    /// Names of all virtual files, sorted.
    pub async fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of open event subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    /// Emit an event outside of any execution.
    pub fn emit_progress(&self, fraction: f64) {
        self.events.progress(fraction);
    }

    async fn ensure_loaded(&self) -> Result<(), EngineError> {
        if *self.loaded.read().await {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }

    async fn run_listing(&self) -> i32 {
        for line in self.listing.read().await.iter() {
            self.events.log(line.clone());
        }
        0
    }

    async fn run_conversion(&self, argv: &[String]) -> i32 {
        let input = argv
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| argv.get(i + 1));
        let Some(input) = input else {
            self.events.log("No input specified");
            return 1;
        };
        if !self.files.read().await.contains_key(input) {
            self.events.log(format!("{}: No such file or directory", input));
            return 1;
        }
        self.events.log(format!("Input #0, from '{}'", input));

        let samples = self.progress_samples.read().await.clone();
        let delay = Duration::from_millis(*self.execution_delay_ms.read().await);
        let step = delay / (samples.len() as u32 + 1);

        for fraction in samples {
            if !step.is_zero() {
                tokio::time::sleep(step).await;
            }
            self.events.progress(fraction);
        }
        if !step.is_zero() {
            tokio::time::sleep(step).await;
        }

        let code = *self.exit_code.read().await;
        if code == 0 {
            if let Some(output) = argv.last() {
                let bytes = self.output_bytes.read().await.clone();
                self.files.write().await.insert(output.clone(), bytes);
            }
        } else {
            self.events
                .log("Conversion failed!".to_string());
        }
        code
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self, core_location: &str, _wasm_location: &str) -> Result<(), EngineError> {
        if let Some(reason) = self.load_error.read().await.clone() {
            return Err(EngineError::load(reason));
        }
        if core_location.is_empty() {
            return Err(EngineError::load("core location is empty"));
        }
        *self.loaded.write().await = true;
        Ok(())
    }

    async fn is_loaded(&self) -> bool {
        *self.loaded.read().await
    }

    async fn execute(&self, argv: &[String]) -> Result<i32, EngineError> {
        self.ensure_loaded().await?;
        self.executions.write().await.push(argv.to_vec());

        if argv.iter().any(|a| a == "-formats") {
            Ok(self.run_listing().await)
        } else {
            Ok(self.run_conversion(argv).await)
        }
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.ensure_loaded().await?;
        check_file_name(name)?;
        if *self.fail_writes.read().await {
            return Err(EngineError::Io(std::io::Error::other("simulated write failure")));
        }
        self.files
            .write()
            .await
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.ensure_loaded().await?;
        check_file_name(name)?;
        if *self.fail_reads.read().await {
            return Err(EngineError::Io(std::io::Error::other("simulated read failure")));
        }
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound {
                name: name.to_string(),
            })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_loaded().await?;
        check_file_name(name)?;
        self.files
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::FileNotFound {
                name: name.to_string(),
            })
    }

    fn subscribe(&self) -> EngineSubscription {
        self.events.subscribe()
    }
}
