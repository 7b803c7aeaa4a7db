// Conversion engine: walks an input buffer through a finalized patch table.
//
// The walk starts at offset 0, locates the entry owning the current offset
// by binary search (never looking behind the last completed entry), applies
// it and streams the emitted bytes into a sink. A partially consumed entry
// is re-entered at the offset it reported.

use std::io::{self, Write};
use std::path::PathBuf;

use log::{debug, error, trace};

use crate::converter::ConversionState;
use crate::format::ConvertFormat;
use crate::patch::{Completion, PatchError, PatchTable};

// ---------------------------------------------------------------------------
// Walk report
// ---------------------------------------------------------------------------

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every input byte was consumed.
    Finished,
    /// No entry owned `offset`. Only reachable with a table that was not
    /// finalized against this input.
    Stalled { offset: usize },
}

/// Counters from a single walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkReport {
    /// Input bytes consumed.
    pub consumed: usize,
    /// Bytes written to the sink.
    pub emitted: usize,
    /// Entries that ran to completion.
    pub entries_applied: usize,
    pub outcome: WalkOutcome,
}

impl WalkReport {
    pub fn is_finished(&self) -> bool {
        self.outcome == WalkOutcome::Finished
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Convert `input` with `table`, writing the output to `sink`.
///
/// A write that accepts fewer bytes than offered aborts the walk with
/// `ConvertError::ShortWrite`. A stall is reported in the returned
/// `WalkReport`, not as an error.
pub fn walk<W: Write + ?Sized>(
    input: &[u8],
    table: &PatchTable,
    format: ConvertFormat,
    sink: &mut W,
) -> Result<WalkReport, ConvertError> {
    let entries = table.entries();
    let mut offset = 0usize;
    let mut search_start = 0usize;
    let mut emitted = 0usize;
    let mut entries_applied = 0usize;

    while offset < input.len() {
        let Some(index) = table.find(offset, search_start) else {
            return Ok(stalled(offset, input.len(), emitted, entries_applied));
        };

        let entry = &entries[index];
        let step = entry.apply(input, offset, format);
        emit(sink, &step.data, offset)?;
        emitted += step.data.len();

        match step.completion {
            Completion::Skip => {
                return Ok(stalled(offset, input.len(), emitted, entries_applied));
            }
            Completion::Partial => {
                trace!("{} partial at {:#x}", entry, step.new_offset);
                offset = step.new_offset;
            }
            Completion::Complete => {
                offset = step.new_offset;
                search_start = index + 1;
                entries_applied += 1;
            }
        }
    }

    // Insertions anchored at the very end of the input never own an offset
    // inside the loop.
    for entry in entries.iter().skip(search_start) {
        if entry.range.start > input.len() {
            break;
        }
        if !entry.range.is_empty() || entry.range.start != input.len() {
            continue;
        }
        let step = entry.apply(input, input.len(), format);
        emit(sink, &step.data, input.len())?;
        emitted += step.data.len();
        entries_applied += 1;
    }

    debug!(
        "walk finished: {} bytes in, {emitted} bytes out, {entries_applied} entries",
        input.len()
    );
    Ok(WalkReport {
        consumed: input.len(),
        emitted,
        entries_applied,
        outcome: WalkOutcome::Finished,
    })
}

/// Walk into a fresh buffer. A stall becomes `ConvertError::Stalled`.
pub fn convert_to_vec(
    input: &[u8],
    table: &PatchTable,
    format: ConvertFormat,
) -> Result<(Vec<u8>, WalkReport), ConvertError> {
    let capacity = input.len().saturating_add_signed(table.net_delta());
    let mut out = Vec::with_capacity(capacity);
    let report = walk(input, table, format, &mut out)?;
    match report.outcome {
        WalkOutcome::Finished => Ok((out, report)),
        WalkOutcome::Stalled { offset } => Err(ConvertError::Stalled {
            offset,
            input_len: input.len(),
        }),
    }
}

fn emit<W: Write + ?Sized>(sink: &mut W, data: &[u8], offset: usize) -> Result<(), ConvertError> {
    if data.is_empty() {
        return Ok(());
    }
    let written = sink.write(data)?;
    if written != data.len() {
        error!(
            "short write at input offset {offset:#x}: {written} of {} bytes accepted",
            data.len()
        );
        return Err(ConvertError::ShortWrite {
            offset,
            expected: data.len(),
            written,
        });
    }
    Ok(())
}

fn stalled(offset: usize, input_len: usize, emitted: usize, entries_applied: usize) -> WalkReport {
    error!(
        "no patch entry owns input offset {offset:#x} of {input_len:#x}; \
         stopping after {emitted} output bytes"
    );
    WalkReport {
        consumed: offset,
        emitted,
        entries_applied,
        outcome: WalkOutcome::Stalled { offset },
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a conversion phase.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("short write at input offset {offset:#x}: {written} of {expected} bytes written")]
    ShortWrite {
        offset: usize,
        expected: usize,
        written: usize,
    },

    #[error("conversion stalled at input offset {offset:#x} of {input_len:#x}")]
    Stalled { offset: usize, input_len: usize },

    #[error("cannot run {phase} while the conversion is {state}")]
    InvalidState {
        phase: &'static str,
        state: ConversionState,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("save is {len} bytes, at least {min} are needed for {what}")]
    TooShort {
        len: usize,
        min: usize,
        what: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
