//! Engine module: the boundary to the external media engine.
//!
//! This module provides the `Engine` trait and the native ffmpeg
//! implementation. The engine is a black box exposing:
//!
//! - Asynchronous load of its resources
//! - A virtual filesystem keyed by plain file names
//! - Execution of a command-line style argument vector
//! - Progress and log events through explicit subscriptions
//!
//! # Example
//!
//! ```ignore
//! use dropconvert_core::engine::{Engine, EngineEvent, FfmpegEngine};
//!
//! let engine = FfmpegEngine::with_defaults();
//! engine.load("ffmpeg", "").await?;
//!
//! let mut events = engine.subscribe();
//! engine.write_file("input", &bytes).await?;
//! let code = engine.execute(&["-i".into(), "input".into(), "output.webm".into()]).await?;
//!
//! while let Some(EngineEvent::Progress { fraction }) = events.try_recv() {
//!     println!("{:.0}%", fraction * 100.0);
//! }
//! ```

mod config;
mod error;
mod events;
mod ffmpeg;
mod traits;

pub use config::EngineConfig;
pub(crate) use error::check_file_name;
pub use error::EngineError;
pub use events::{EngineEvent, EngineEvents, EngineSubscription};
pub use ffmpeg::FfmpegEngine;
pub use traits::Engine;
