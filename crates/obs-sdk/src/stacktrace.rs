//! Stack trace normalization
//!
//! Two input shapes are supported:
//!
//! - textual traces, one frame per line, matched against an ordered list of
//!   line grammars (first match wins, unmatched lines are dropped)
//! - structured frames collected from a [`Backtrace`], prefixed with a synthetic
//!   `(throw)` frame pointing at the raise site

use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::Location;

use obs_core::Frame;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

struct LineGrammar {
    name: &'static str,
    pattern: Regex,
}

impl LineGrammar {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
        }
    }

    fn parse(&self, line: &str) -> Option<Frame> {
        let caps = self.pattern.captures(line)?;
        let frame = frame_from_captures(&caps)?;
        tracing::trace!("Matched stack line with {} grammar", self.name);
        Some(frame)
    }
}

fn frame_from_captures(caps: &Captures<'_>) -> Option<Frame> {
    let function = caps
        .name("function")
        .map(|m| m.as_str().trim())
        .filter(|f| !f.is_empty())
        .unwrap_or(Frame::ANONYMOUS);

    Some(Frame {
        filename: caps.name("file")?.as_str().to_string(),
        function: function.to_string(),
        lineno: caps.name("line")?.as_str().parse().ok()?,
        colno: Some(caps.name("col")?.as_str().parse().ok()?),
    })
}

/// Ordered line grammars, tried first to last
static LINE_GRAMMARS: Lazy<Vec<LineGrammar>> = Lazy::new(|| {
    vec![
        // `  at FUNC (FILE:LINE:COL)` or `  at FILE:LINE:COL`
        LineGrammar::new(
            "at",
            r"^\s*at\s+(?:(?P<function>.+?)\s+\()?(?P<file>.+?):(?P<line>\d+):(?P<col>\d+)\)?$",
        ),
        // `FUNC@FILE:LINE:COL`
        LineGrammar::new(
            "at-sign",
            r"^(?P<function>.+?)@(?P<file>.+?):(?P<line>\d+):(?P<col>\d+)$",
        ),
    ]
});

/// Parse a textual stack trace into frames, preserving line order.
///
/// Absent text yields no frames.
pub fn parse_stack(text: Option<&str>) -> Vec<Frame> {
    let Some(text) = text else {
        return Vec::new();
    };

    text.lines()
        .filter_map(|line| LINE_GRAMMARS.iter().find_map(|grammar| grammar.parse(line)))
        .collect()
}

/// A frame as reported by a structured trace, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub file: Option<String>,
    pub function: Option<String>,
    /// Type the function is defined on, joined to the function name with `::`
    pub owner: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl RawFrame {
    fn into_frame(self) -> Frame {
        let function = match (self.owner, self.function) {
            (Some(owner), Some(function)) => format!("{}::{}", owner, function),
            (None, Some(function)) => function,
            (Some(owner), None) => format!("{}::{}", owner, Frame::ANONYMOUS),
            (None, None) => Frame::ANONYMOUS.to_string(),
        };

        Frame {
            filename: self.file.unwrap_or_else(|| "?".to_string()),
            function,
            lineno: self.line.unwrap_or(0),
            colno: self.column,
        }
    }
}

/// Build the frame list of an error raised at `throw_site`.
///
/// The first frame is always the synthetic `(throw)` frame, the remaining
/// frames follow in the order given.
pub fn normalize_frames<I>(throw_site: &Location<'_>, frames: I) -> Vec<Frame>
where
    I: IntoIterator<Item = RawFrame>,
{
    let throw = Frame {
        filename: throw_site.file().to_string(),
        function: Frame::THROW.to_string(),
        lineno: throw_site.line(),
        colno: Some(throw_site.column()),
    };

    std::iter::once(throw)
        .chain(frames.into_iter().map(RawFrame::into_frame))
        .collect()
}

static SYMBOL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+:\s+(?P<function>.+?)\s*$").unwrap());

static LOCATION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*at\s+(?P<file>.+?):(?P<line>\d+)(?::(?P<col>\d+))?\s*$").unwrap()
});

/// Leading frames of the capture machinery, never useful in an event
const SKIPPED_PREFIXES: &[&str] = &[
    "std::backtrace",
    "<std::backtrace",
    "obs_sdk::",
    "<alloc::boxed::Box<",
    "std::panicking",
    "std::sys::backtrace",
    "std::sys_common::backtrace",
    "core::panicking",
    "rust_begin_unwind",
    "__rustc::",
];

/// Frames that enter the panic runtime; everything up to the last one belongs
/// to panic dispatch
const PANIC_ENTRY_PREFIXES: &[&str] = &[
    "core::panicking::",
    "rust_begin_unwind",
    "__rustc::rust_begin_unwind",
    "std::panicking::begin_panic",
];

fn has_prefix(frame: &RawFrame, prefixes: &[&str]) -> bool {
    frame
        .function
        .as_deref()
        .is_some_and(|function| prefixes.iter().any(|prefix| function.starts_with(prefix)))
}

/// Extract raw frames from a captured backtrace.
///
/// Returns nothing when capturing is disabled (see `RUST_BACKTRACE`).
pub fn frames_from_backtrace(backtrace: &Backtrace) -> Vec<RawFrame> {
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    parse_backtrace_text(&backtrace.to_string())
}

fn parse_backtrace_text(text: &str) -> Vec<RawFrame> {
    let mut frames: Vec<RawFrame> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = SYMBOL_LINE.captures(line) {
            frames.push(RawFrame {
                function: Some(caps["function"].to_string()),
                ..Default::default()
            });
        } else if let Some(caps) = LOCATION_LINE.captures(line) {
            if let Some(frame) = frames.last_mut().filter(|f| f.file.is_none()) {
                frame.file = Some(caps["file"].to_string());
                frame.line = caps["line"].parse().ok();
                frame.column = caps.name("col").and_then(|m| m.as_str().parse().ok());
            }
        }
    }

    let panic_entry = frames
        .iter()
        .rposition(|frame| has_prefix(frame, PANIC_ENTRY_PREFIXES))
        .map_or(0, |index| index + 1);

    frames
        .into_iter()
        .skip(panic_entry)
        .skip_while(|frame| has_prefix(frame, SKIPPED_PREFIXES))
        .collect()
}
