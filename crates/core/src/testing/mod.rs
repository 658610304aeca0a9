//! Testing utilities and mock implementations.
//!
//! This module provides a mock implementation of the engine trait, allowing
//! the orchestrator and the server to be tested without an ffmpeg binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use dropconvert_core::testing::{fixtures, MockEngine};
//!
//! let engine = MockEngine::new();
//! engine.set_progress_samples(vec![0.1, 0.5, 1.0]).await;
//!
//! let orchestrator = ConversionOrchestrator::new(config, Arc::new(engine.clone()));
//! orchestrator.start("ffmpeg", "").await?;
//! orchestrator.handle_drop(vec![fixtures::dropped_file("clip.avi")], None).await?;
//! ```

mod mock_engine;

pub use mock_engine::MockEngine;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::orchestrator::DroppedFile;

    /// A format listing as the engine prints it, headers included.
    ///
    /// Readable: mov/mp4/m4a/3gp/3g2/mj2, matroska/webm, wav, mp3, avi, flac.
    /// Writable: mp4, matroska, wav, mp3, avi, webm, gif.
    pub fn format_listing() -> Vec<String> {
        [
            "File formats:",
            " D. = Demuxing supported",
            " .E = Muxing supported",
            " --",
            "  E gif             CompuServe Graphics Interchange Format (GIF)",
            " D  flac            raw FLAC",
            " D  mov,mp4,m4a,3gp,3g2,mj2 QuickTime / MOV",
            "  E mp4             MP4 (MPEG-4 Part 14)",
            " DE matroska,webm   Matroska / WebM",
            " DE wav             WAV / WAVE (Waveform Audio)",
            " DE mp3             MP3 (MPEG audio layer 3)",
            " DE avi             AVI (Audio Video Interleaved)",
            "  E webm            WebM",
        ]
        .iter()
        .map(|line| line.to_string())
        .collect()
    }

    /// Bytes the mock engine writes as a conversion result.
    pub fn output_bytes() -> Vec<u8> {
        b"\x00\x00\x00\x18ftypmp42converted".to_vec()
    }

    /// A dropped file with some placeholder content.
    pub fn dropped_file(name: &str) -> DroppedFile {
        DroppedFile::new(name, format!("contents of {}", name).into_bytes())
    }
}
