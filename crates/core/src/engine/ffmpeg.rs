//! Native engine backed by an ffmpeg executable.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::config::EngineConfig;
use super::error::{check_file_name, EngineError};
use super::events::{EngineEvents, EngineSubscription};
use super::traits::Engine;

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").unwrap());

// out_time_ms is reported in microseconds, same as out_time_us
static OUT_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^out_time_(?:us|ms)=(\d+)$").unwrap());

static PROGRESS_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]+=\S*$").unwrap());

/// Reads one line, replacing invalid UTF-8. Returns `None` at end of stream.
///
/// The pipe must be drained to the end, otherwise the engine blocks on a full
/// pipe and never exits.
async fn next_lossy_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
    }
}

/// Loaded engine resources.
struct Runtime {
    program: PathBuf,
    /// Backs the virtual filesystem; removed when the engine is dropped.
    scratch: TempDir,
}

/// Engine implementation that runs ffmpeg as a child process.
///
/// The virtual filesystem is a private scratch directory and every execution
/// runs with that directory as its working directory, so relative names in the
/// argument vector resolve to virtual files.
pub struct FfmpegEngine {
    config: EngineConfig,
    events: EngineEvents,
    runtime: RwLock<Option<Runtime>>,
}

impl FfmpegEngine {
    /// Creates a new, not yet loaded, ffmpeg engine.
    pub fn new(config: EngineConfig) -> Self {
        let events = EngineEvents::new(config.event_capacity);
        Self {
            config,
            events,
            runtime: RwLock::new(None),
        }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Builds the full argument list for one execution.
    fn build_args(&self, argv: &[String]) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            // Machine-readable progress on stderr, one key=value per line
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.extend(argv.iter().cloned());
        args
    }

    /// Returns the executable and virtual filesystem root, or `NotLoaded`.
    async fn runtime_paths(&self) -> Result<(PathBuf, PathBuf), EngineError> {
        let runtime = self.runtime.read().await;
        runtime
            .as_ref()
            .map(|r| (r.program.clone(), r.scratch.path().to_path_buf()))
            .ok_or(EngineError::NotLoaded)
    }

    /// Resolves a virtual file name to its backing path.
    async fn virtual_path(&self, name: &str) -> Result<PathBuf, EngineError> {
        check_file_name(name)?;
        let (_, root) = self.runtime_paths().await?;
        Ok(root.join(name))
    }

    async fn create_scratch(wasm_location: &str) -> Result<TempDir, EngineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dropconvert-");

        let scratch = if wasm_location.is_empty() {
            builder.tempdir()
        } else {
            tokio::fs::create_dir_all(wasm_location).await.map_err(|e| {
                EngineError::load(format!("cannot create {}: {}", wasm_location, e))
            })?;
            builder.tempdir_in(wasm_location)
        };

        scratch.map_err(|e| EngineError::load(format!("cannot create virtual filesystem: {}", e)))
    }
}

/// Turns ffmpeg's stderr into progress fractions.
///
/// The input duration comes from the `Duration:` header line and the
/// position from `-progress` `out_time_us=` lines.
#[derive(Debug, Default)]
pub(crate) struct ProgressParser {
    duration_secs: Option<f64>,
}

impl ProgressParser {
    /// Feeds one line; returns a fraction when the line reports a position.
    pub(crate) fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();

        if let Some(caps) = DURATION_RE.captures(line) {
            let hours = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let minutes = caps.get(2)?.as_str().parse::<f64>().ok()?;
            let seconds = caps.get(3)?.as_str().parse::<f64>().ok()?;
            let total = hours * 3600.0 + minutes * 60.0 + seconds;
            // Only the first input counts
            if total > 0.0 && self.duration_secs.is_none() {
                self.duration_secs = Some(total);
            }
            return None;
        }

        if line == "progress=end" {
            return Some(1.0);
        }

        let caps = OUT_TIME_RE.captures(line)?;
        let micros = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let duration = self.duration_secs?;
        Some((micros / 1_000_000.0 / duration).clamp(0.0, 1.0))
    }

    /// Whether the line belongs to the `-progress` key=value block.
    pub(crate) fn is_progress_line(line: &str) -> bool {
        PROGRESS_KEY_RE.is_match(line.trim())
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self, core_location: &str, wasm_location: &str) -> Result<(), EngineError> {
        let mut runtime = self.runtime.write().await;
        if runtime.is_some() {
            debug!("ffmpeg engine already loaded");
            return Ok(());
        }

        if core_location.trim().is_empty() {
            return Err(EngineError::load("core location is empty"));
        }

        let program = PathBuf::from(core_location);
        let output = Command::new(&program)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::load(format!("ffmpeg not found at path: {}", program.display()))
                } else {
                    EngineError::load(format!("cannot run {}: {}", program.display(), e))
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::load(format!(
                "{} -version exited with code {:?}",
                program.display(),
                output.status.code()
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("unknown version")
            .to_string();

        let scratch = Self::create_scratch(wasm_location).await?;
        info!(
            "Loaded engine {} ({}), virtual filesystem at {:?}",
            program.display(),
            version,
            scratch.path()
        );

        *runtime = Some(Runtime { program, scratch });
        Ok(())
    }

    async fn is_loaded(&self) -> bool {
        self.runtime.read().await.is_some()
    }

    async fn execute(&self, argv: &[String]) -> Result<i32, EngineError> {
        let (program, root) = self.runtime_paths().await?;
        let args = self.build_args(argv);
        debug!("Executing {} {:?}", program.display(), args);

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(&root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::execution(format!("cannot spawn {}: {}", program.display(), e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::execution("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::execution("stderr was not captured"))?;

        // Capability listings are printed on stdout
        let stdout_events = self.events.clone();
        let stdout_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            while let Some(line) = next_lossy_line(&mut reader).await {
                stdout_events.log(line);
            }
        });

        let mut parser = ProgressParser::default();
        let mut reader = BufReader::new(stderr);
        while let Some(line) = next_lossy_line(&mut reader).await {
            if let Some(fraction) = parser.feed(&line) {
                self.events.progress(fraction);
            }
            if !ProgressParser::is_progress_line(&line) {
                self.events.log(line);
            }
        }

        let _ = stdout_task.await;
        let status = child.wait().await?;
        let code = status.code().unwrap_or(-1);
        debug!("Engine exited with code {}", code);
        Ok(code)
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        let path = self.virtual_path(name).await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.virtual_path(name).await?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound {
                    name: name.to_string(),
                }
            } else {
                EngineError::Io(e)
            }
        })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.virtual_path(name).await?;
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound {
                    name: name.to_string(),
                }
            } else {
                EngineError::Io(e)
            }
        })
    }

    fn subscribe(&self) -> EngineSubscription {
        self.events.subscribe()
    }
}
