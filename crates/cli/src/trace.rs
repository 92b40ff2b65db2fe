//! Text trace format and replay.
//!
//! A trace is one host notification per line:
//!
//! ```text
//! # comment
//! A <pc> <addr> [hit] [useful]     demand access
//! F <addr> <prefetch> [evicted]    cache fill
//! ```
//!
//! Numbers are decimal or `0x`-prefixed hex; flags are `0` or `1`. Omitted
//! flags are `0` and an omitted or zero `evicted` means nothing was displaced.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use ghbsim_core::common::{Addr, ConfigError, InFlightTag, Pc};
use ghbsim_core::prefetch::{AccessInfo, FillInfo, PrefetchRequest};
use ghbsim_core::{GhbPrefetcher, PrefetchConfig, Prefetcher};
use thiserror::Error;

/// Errors raised while loading or replaying a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A trace or configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Writing the replay report failed.
    #[error("cannot write report: {0}")]
    Output(#[from] io::Error),

    /// A trace line could not be parsed.
    #[error("line {line}: {reason}")]
    Syntax {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The configuration file is not valid JSON for a `PrefetchConfig`.
    #[error("bad configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration was rejected by the engine.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// One parsed trace record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    /// Demand access.
    Access {
        /// Instruction address.
        pc: u64,
        /// Data address.
        addr: u64,
        /// Cache hit.
        hit: bool,
        /// Hit on a line this engine prefetched.
        useful: bool,
    },
    /// Cache fill.
    Fill {
        /// Filled line address.
        addr: u64,
        /// Fill completes a prefetch.
        prefetch: bool,
        /// Displaced line, if any.
        evicted: Option<u64>,
    },
}

fn syntax(line: usize, reason: impl Into<String>) -> TraceError {
    TraceError::Syntax {
        line,
        reason: reason.into(),
    }
}

fn number(field: Option<&str>, what: &str, line: usize) -> Result<u64, TraceError> {
    let text = field.ok_or_else(|| syntax(line, format!("missing {what}")))?;
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| syntax(line, format!("bad {what} `{text}`")))
}

fn flag(field: Option<&str>, what: &str, line: usize) -> Result<bool, TraceError> {
    match field {
        None | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(syntax(line, format!("{what} must be 0 or 1, got `{other}`"))),
    }
}

/// Parses one line; blank lines and comments yield `None`.
///
/// # Errors
///
/// Returns [`TraceError::Syntax`] for an unknown record kind, a malformed
/// field or trailing fields.
pub fn parse_line(text: &str, line: usize) -> Result<Option<TraceEvent>, TraceError> {
    let text = text.split('#').next().unwrap_or_default().trim();
    let mut fields = text.split_whitespace();
    let Some(kind) = fields.next() else {
        return Ok(None);
    };

    let event = match kind {
        "A" | "a" => TraceEvent::Access {
            pc: number(fields.next(), "pc", line)?,
            addr: number(fields.next(), "address", line)?,
            hit: flag(fields.next(), "hit", line)?,
            useful: flag(fields.next(), "useful", line)?,
        },
        "F" | "f" => TraceEvent::Fill {
            addr: number(fields.next(), "address", line)?,
            prefetch: flag(fields.next(), "prefetch", line)?,
            evicted: match fields.next() {
                None => None,
                some => Some(number(some, "evicted address", line)?).filter(|&a| a != 0),
            },
        },
        other => return Err(syntax(line, format!("unknown record `{other}`"))),
    };

    if let Some(extra) = fields.next() {
        return Err(syntax(line, format!("unexpected field `{extra}`")));
    }
    Ok(Some(event))
}

/// Parses a whole trace.
///
/// # Errors
///
/// Returns the first line that fails [`parse_line`].
pub fn parse(text: &str) -> Result<Vec<TraceEvent>, TraceError> {
    let mut events = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        if let Some(event) = parse_line(raw, i + 1)? {
            events.push(event);
        }
    }
    Ok(events)
}

/// Drives an engine with trace events, acting as its host.
///
/// Keeps one in-flight tag per cache line, the way a cache would store the
/// prefetcher's metadata with each block and MSHR entry.
#[derive(Debug)]
pub struct Replay {
    engine: GhbPrefetcher,
    line_mask: u64,
    tags: HashMap<u64, InFlightTag>,
    issued: Vec<PrefetchRequest>,
}

impl Replay {
    /// Builds an engine from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Config`] if the engine rejects the configuration.
    pub fn new(config: &PrefetchConfig) -> Result<Self, TraceError> {
        Ok(Self {
            engine: GhbPrefetcher::new(config)?,
            line_mask: !config.block_bytes.wrapping_sub(1),
            tags: HashMap::new(),
            issued: Vec::new(),
        })
    }

    /// The engine being driven.
    pub const fn engine(&self) -> &GhbPrefetcher {
        &self.engine
    }

    fn tag_of(&self, addr: u64) -> InFlightTag {
        self.tags
            .get(&(addr & self.line_mask))
            .copied()
            .unwrap_or_default()
    }

    fn set_tag(&mut self, addr: u64, tag: InFlightTag) {
        let line = addr & self.line_mask;
        if tag.is_outstanding() {
            let _ = self.tags.insert(line, tag);
        } else {
            let _ = self.tags.remove(&line);
        }
    }

    /// Applies one event and returns the prefetches it issued.
    pub fn step(&mut self, event: TraceEvent) -> &[PrefetchRequest] {
        self.issued.clear();
        match event {
            TraceEvent::Access {
                pc,
                addr,
                hit,
                useful,
            } => {
                let access = AccessInfo::new(Addr::new(addr), Pc::new(pc))
                    .with_hit(hit)
                    .with_useful(useful)
                    .with_tag(self.tag_of(addr));
                let mut issued = std::mem::take(&mut self.issued);
                let kept = self.engine.on_access(access, &mut issued);
                self.set_tag(addr, kept);
                for req in &issued {
                    self.set_tag(req.addr.val(), req.tag);
                }
                self.issued = issued;
            }
            TraceEvent::Fill {
                addr,
                prefetch,
                evicted,
            } => {
                let fill = FillInfo {
                    addr: Addr::new(addr),
                    was_prefetch: prefetch,
                    evicted: evicted.map(Addr::new),
                    tag: self.tag_of(addr),
                };
                let kept = self.engine.on_fill(fill);
                self.set_tag(addr, kept);
                if let Some(victim) = evicted {
                    let _ = self.tags.remove(&(victim & self.line_mask));
                }
            }
        }
        &self.issued
    }

    /// Replays `events`, writing one report line per issued prefetch.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Output`] if writing to `out` fails.
    pub fn run<W: Write>(&mut self, events: &[TraceEvent], out: &mut W) -> Result<(), TraceError> {
        for (n, &event) in events.iter().enumerate() {
            let trigger = match event {
                TraceEvent::Access { pc, .. } => Some(pc),
                TraceEvent::Fill { .. } => None,
            };
            for req in self.step(event) {
                writeln!(
                    out,
                    "{n:>8}  pc={:#x}  prefetch {}  fill_this_level={}",
                    trigger.unwrap_or_default(),
                    req.addr,
                    req.fill_this_level
                )?;
            }
        }
        Ok(())
    }
}
