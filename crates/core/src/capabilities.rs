//! Capability discovery: the engine's format listing as structured data.
//!
//! This is the only place that knows the textual layout of the listing. The
//! engine prints a table like:
//!
//! ```text
//! File formats:
//!  D. = Demuxing supported
//!  .E = Muxing supported
//!  --
//!  D  asf             ASF (Advanced / Active Streaming Format)
//!  DE matroska,webm   Matroska / WebM
//!  E  mp4             MP4 (MPEG-4 Part 14)
//! ```

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static FORMAT_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(DE|D|E)\s+(\S+)\s+(.*\S)\s*$").unwrap());

/// Arguments that make the engine print its format listing.
pub const FORMAT_LISTING_ARGS: &[&str] = &["-formats"];

/// One container format the engine knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Short name, possibly several comma-separated aliases (`mov,mp4,m4a`).
    pub abbreviation: String,
    /// Human readable name.
    pub name: String,
    /// The engine can read this format.
    pub demuxing_supported: bool,
    /// The engine can write this format.
    pub muxing_supported: bool,
}

impl FormatDescriptor {
    /// Whether a file extension (without dot, any case) names this format.
    pub fn matches_extension(&self, extension: &str) -> bool {
        self.abbreviation
            .split(',')
            .any(|alias| alias.eq_ignore_ascii_case(extension))
    }
}

/// Parses the engine's format listing.
///
/// Lines that do not look like `<flags> <abbreviation> <name>` with flags
/// `D`, `DE` or `E` are skipped. Never fails; order is preserved.
pub fn parse_format_listing<I, S>(lines: I) -> Vec<FormatDescriptor>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_format_line(line.as_ref()))
        .collect()
}

fn parse_format_line(line: &str) -> Option<FormatDescriptor> {
    let caps = FORMAT_LINE_RE.captures(line)?;
    let flags = caps.get(1)?.as_str();

    Some(FormatDescriptor {
        abbreviation: caps.get(2)?.as_str().to_string(),
        name: caps.get(3)?.as_str().to_string(),
        demuxing_supported: flags.contains('D'),
        muxing_supported: flags.contains('E'),
    })
}

/// The discovered formats, in listing order.
///
/// Built once after the engine loads and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatCatalog {
    formats: Vec<FormatDescriptor>,
}

impl FormatCatalog {
    pub fn new(formats: Vec<FormatDescriptor>) -> Self {
        Self { formats }
    }

    /// Parses a raw listing into a catalog.
    pub fn from_listing<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(parse_format_listing(lines))
    }

    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// First format matching `extension` that can be read.
    pub fn find_demuxer(&self, extension: &str) -> Option<&FormatDescriptor> {
        self.formats
            .iter()
            .filter(|f| f.matches_extension(extension))
            .find(|f| f.demuxing_supported)
    }

    /// First format matching `extension` that can be written.
    pub fn find_muxer(&self, extension: &str) -> Option<&FormatDescriptor> {
        self.formats
            .iter()
            .filter(|f| f.matches_extension(extension))
            .find(|f| f.muxing_supported)
    }

    /// Formats that can be read.
    pub fn demuxers(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.formats.iter().filter(|f| f.demuxing_supported)
    }

    /// Formats that can be written.
    pub fn muxers(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.formats.iter().filter(|f| f.muxing_supported)
    }
}
