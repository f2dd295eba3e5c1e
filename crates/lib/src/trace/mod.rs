//! In-memory trace span collection and rendering.
//!
//! A [`TraceSink`] records timed spans from anywhere in a build and later
//! renders them as an indented table. Spans form a forest keyed by parent
//! id; because recording order is not guaranteed across concurrent callers,
//! the renderer groups children by parent id at render time instead of
//! relying on arrival order. One mutex guards both recording and rendering.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};

const TIME_FORMAT: &str = "%H:%M:%S";

const START_WIDTH: usize = 14;
const END_WIDTH: usize = 14;
const ELAPSED_WIDTH: usize = 14;

/// Nesting depth beyond which subtrees render as a `...` placeholder.
const MAX_RENDER_DEPTH: usize = 3;

/// A completed timed unit of work.
#[derive(Debug, Clone)]
pub struct Span {
  pub id: u64,
  /// Absent for roots.
  pub parent: Option<u64>,
  pub name: String,
  pub start: DateTime<Local>,
  pub end: DateTime<Local>,
}

/// A span that has started but not yet finished.
///
/// Finish it with [`TraceSink::finish`]; dropping it without finishing
/// simply loses the span.
#[derive(Debug)]
pub struct OpenSpan {
  id: u64,
  parent: Option<u64>,
  name: String,
  start: DateTime<Local>,
}

impl OpenSpan {
  pub fn id(&self) -> u64 {
    self.id
  }
}

#[derive(Default)]
struct SinkInner {
  roots: Vec<Span>,
  children: HashMap<u64, Vec<Span>>,
}

/// Thread-safe collector of execution spans.
#[derive(Default)]
pub struct TraceSink {
  inner: Mutex<SinkInner>,
  next_id: AtomicU64,
}

impl TraceSink {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start a span now. `parent` of `None` makes it a root.
  pub fn open(&self, parent: Option<u64>, name: impl Into<String>) -> OpenSpan {
    OpenSpan {
      id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
      parent,
      name: name.into(),
      start: Local::now(),
    }
  }

  /// End an open span and record it.
  pub fn finish(&self, open: OpenSpan) {
    self.record(Span {
      id: open.id,
      parent: open.parent,
      name: open.name,
      start: open.start,
      end: Local::now(),
    });
  }

  /// Record a completed span. Safe to call from concurrent contexts.
  pub fn record(&self, span: Span) {
    let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    match span.parent {
      None => inner.roots.push(span),
      Some(parent) => inner.children.entry(parent).or_default().push(span),
    }
  }

  /// Render the recorded spans as a hierarchical table.
  pub fn render(&self) -> String {
    let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    let mut out = String::new();
    let _ = writeln!(
      out,
      "{:<START_WIDTH$} {:<END_WIDTH$} {:<ELAPSED_WIDTH$}",
      "Start", "End", "Elapsed",
    );
    render_level(&inner, &mut out, &inner.roots, 0);
    out
  }
}

fn render_level(inner: &SinkInner, out: &mut String, list: &[Span], depth: usize) {
  const INDENT: &str = "  ";

  if depth >= MAX_RENDER_DEPTH {
    if !list.is_empty() {
      let pad = START_WIDTH + END_WIDTH + ELAPSED_WIDTH + 3;
      let _ = writeln!(out, "{:pad$}{}...", "", INDENT.repeat(depth));
    }
    return;
  }

  for span in list {
    let elapsed = (span.end - span.start).num_milliseconds() as f64 / 1000.0;
    let _ = writeln!(
      out,
      "{:<START_WIDTH$} {:<END_WIDTH$} {:>width$.3}s {}{}",
      span.start.format(TIME_FORMAT).to_string(),
      span.end.format(TIME_FORMAT).to_string(),
      elapsed,
      INDENT.repeat(depth),
      span.name,
      width = ELAPSED_WIDTH - 1,
    );
    if let Some(children) = inner.children.get(&span.id) {
      render_level(inner, out, children, depth + 1);
    }
  }
}
