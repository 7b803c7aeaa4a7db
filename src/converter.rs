// Conversion orchestration.
//
// A conversion runs three phases in order:
//
//   pre-convert   read the input file, decompress it if it is packed
//   convert       build the game's patch table and walk the input through it
//   post-convert  game fixups (checksum), then an atomic write of the output
//
// `Pipeline` tracks which phase ran last. The first failing phase moves it
// to `Failed` and nothing runs after that. The destination file is only
// touched by the final persist, so a failure never leaves partial output.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::engine::{self, ConvertError, WalkReport};
use crate::format::ConvertFormat;
use crate::games::{GameId, SaveGame};
use crate::io;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub format: ConvertFormat,
    /// Vesperia only: zero the DLC item bitfield the PC build checks.
    pub patch_dlc_item_checks: bool,
}

impl ConvertOptions {
    pub fn new(format: ConvertFormat) -> Self {
        Self {
            format,
            patch_dlc_item_checks: true,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    NotStarted,
    PreConverted,
    Converted,
    Done,
    Failed,
}

impl ConversionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::PreConverted => "pre-converted",
            Self::Converted => "converted",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// What a finished conversion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertStats {
    pub game: GameId,
    pub format: ConvertFormat,
    /// Bytes read from disk.
    pub input_size: usize,
    /// Bytes after decompression (equal to `input_size` for raw saves).
    pub decompressed_size: usize,
    pub output_size: usize,
    pub table_entries: usize,
    pub entries_applied: usize,
    pub input_sha256: Option<[u8; 32]>,
    pub output_sha256: Option<[u8; 32]>,
}

impl ConvertStats {
    fn new(game: GameId, format: ConvertFormat) -> Self {
        Self {
            game,
            format,
            input_size: 0,
            decompressed_size: 0,
            output_size: 0,
            table_entries: 0,
            entries_applied: 0,
            input_sha256: None,
            output_sha256: None,
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory conversion
// ---------------------------------------------------------------------------

/// Convert a save held in memory: decompress, walk, post-process.
pub fn convert_bytes(
    game: &dyn SaveGame,
    data: Vec<u8>,
    options: &ConvertOptions,
) -> Result<Vec<u8>, ConvertError> {
    let input = game.preprocess(data);
    let (output, _) = convert_decompressed(game, &input, options)?;
    game.postprocess(output)
}

struct WalkSummary {
    report: WalkReport,
    table_entries: usize,
}

fn convert_decompressed(
    game: &dyn SaveGame,
    input: &[u8],
    options: &ConvertOptions,
) -> Result<(Vec<u8>, WalkSummary), ConvertError> {
    let format = options.format;
    if let Some(expected) = game.expected_input_size(format)
        && expected != input.len()
    {
        warn!(
            "{} {format}: input is {} bytes, an unmodified save is {expected} bytes",
            game.id(),
            input.len()
        );
    }

    let table = game.patch_table(options, input.len())?;
    debug!("{} {format}: finalized table has {} entries", game.id(), table.len());

    let (output, report) = engine::convert_to_vec(input, &table, format)?;
    Ok((
        output,
        WalkSummary {
            report,
            table_entries: table.len(),
        },
    ))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One file-to-file conversion.
pub struct Pipeline {
    game: &'static dyn SaveGame,
    options: ConvertOptions,
    input_path: PathBuf,
    output_path: PathBuf,
    overwrite: bool,
    state: ConversionState,
    buffer: Vec<u8>,
    stats: ConvertStats,
}

impl Pipeline {
    /// Without an explicit output path the output lands next to the input
    /// as `<input-file-name>.<target>`.
    pub fn new(
        game: &'static dyn SaveGame,
        options: ConvertOptions,
        input_path: impl Into<PathBuf>,
        output_path: Option<PathBuf>,
    ) -> Self {
        let input_path = input_path.into();
        let output_path = output_path.unwrap_or_else(|| {
            let path = io::default_output_path(&input_path, options.format.target);
            info!("no output path given, writing to {}", path.display());
            path
        });
        Self {
            game,
            options,
            input_path,
            output_path,
            overwrite: false,
            state: ConversionState::NotStarted,
            buffer: Vec::new(),
            stats: ConvertStats::new(game.id(), options.format),
        }
    }

    /// Replace an existing output file.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn stats(&self) -> &ConvertStats {
        &self.stats
    }

    pub fn pre_convert(&mut self) -> Result<(), ConvertError> {
        self.phase(
            "pre-convert",
            ConversionState::NotStarted,
            ConversionState::PreConverted,
            |p| {
                let raw = io::read_input(&p.input_path)?;
                p.stats.input_size = raw.len();
                p.stats.input_sha256 = io::sha256(&raw);
                p.buffer = p.game.preprocess(raw);
                p.stats.decompressed_size = p.buffer.len();
                Ok(())
            },
        )
    }

    pub fn convert(&mut self) -> Result<(), ConvertError> {
        self.phase(
            "convert",
            ConversionState::PreConverted,
            ConversionState::Converted,
            |p| {
                let input = std::mem::take(&mut p.buffer);
                let (output, summary) = convert_decompressed(p.game, &input, &p.options)?;
                p.stats.table_entries = summary.table_entries;
                p.stats.entries_applied = summary.report.entries_applied;
                p.buffer = output;
                Ok(())
            },
        )
    }

    pub fn post_convert(&mut self) -> Result<(), ConvertError> {
        self.phase(
            "post-convert",
            ConversionState::Converted,
            ConversionState::Done,
            |p| {
                let output = p.game.postprocess(std::mem::take(&mut p.buffer))?;
                io::write_atomic(&p.output_path, &output, p.overwrite)?;
                p.stats.output_size = output.len();
                p.stats.output_sha256 = io::sha256(&output);
                Ok(())
            },
        )
    }

    /// Drive the remaining phases, stopping at the first failure. Phases
    /// already run by hand are not repeated.
    pub fn run(&mut self) -> Result<ConvertStats, ConvertError> {
        while !self.state.is_terminal() {
            match self.state {
                ConversionState::NotStarted => self.pre_convert()?,
                ConversionState::PreConverted => self.convert()?,
                _ => self.post_convert()?,
            }
        }
        if self.state == ConversionState::Failed {
            return Err(ConvertError::InvalidState {
                phase: "run",
                state: self.state,
            });
        }
        info!(
            "{} {}: {} -> {} ({} bytes)",
            self.game.id(),
            self.options.format,
            self.input_path.display(),
            self.output_path.display(),
            self.stats.output_size
        );
        Ok(self.stats.clone())
    }

    fn phase<F>(
        &mut self,
        name: &'static str,
        from: ConversionState,
        to: ConversionState,
        body: F,
    ) -> Result<(), ConvertError>
    where
        F: FnOnce(&mut Self) -> Result<(), ConvertError>,
    {
        if self.state != from {
            return Err(ConvertError::InvalidState {
                phase: name,
                state: self.state,
            });
        }
        match body(self) {
            Ok(()) => {
                debug!("{}: {name} complete", self.game.id());
                self.state = to;
                Ok(())
            }
            Err(e) => {
                error!("{}: {name} failed: {e}", self.game.id());
                self.buffer = Vec::new();
                self.state = ConversionState::Failed;
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{COLD_STEEL_2, lookup};

    fn cold_steel_2_save() -> Vec<u8> {
        let mut save = vec![0x11u8; 496_880];
        save[..16].fill(0);
        save
    }

    #[test]
    fn phases_must_run_in_order() {
        let mut pipeline = Pipeline::new(
            &COLD_STEEL_2,
            ConvertOptions::new(ConvertFormat::PS4_TO_PC),
            "in.dat",
            None,
        );
        assert_eq!(pipeline.output_path(), Path::new("in.dat.pc"));
        let err = pipeline.convert().unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InvalidState {
                phase: "convert",
                state: ConversionState::NotStarted
            }
        ));
        assert_eq!(pipeline.state(), ConversionState::NotStarted);
    }

    #[test]
    fn run_writes_output_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data0000.dat");
        std::fs::write(&input, cold_steel_2_save()).unwrap();

        let mut pipeline = Pipeline::new(
            lookup(GameId::ColdSteel2),
            ConvertOptions::new(ConvertFormat::PS4_TO_PC),
            &input,
            None,
        );
        let stats = pipeline.run().unwrap();
        assert_eq!(pipeline.state(), ConversionState::Done);

        let output = std::fs::read(dir.path().join("data0000.dat.pc")).unwrap();
        assert_eq!(output.len(), 493_976);
        assert_eq!(output[..4], [0x98, 0x89, 0x07, 0x00]);
        assert_eq!(stats.input_size, 496_880);
        assert_eq!(stats.decompressed_size, 496_880);
        assert_eq!(stats.output_size, 493_976);
        assert!(stats.entries_applied > 0);
        assert_eq!(stats.input_sha256.is_some(), cfg!(feature = "file-io"));
    }

    #[test]
    fn failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(
            &COLD_STEEL_2,
            ConvertOptions::new(ConvertFormat::PS4_TO_PC),
            dir.path().join("missing.dat"),
            None,
        );
        assert!(matches!(pipeline.run(), Err(ConvertError::Io(_))));
        assert_eq!(pipeline.state(), ConversionState::Failed);
        assert!(pipeline.state().is_terminal());
        assert!(matches!(
            pipeline.pre_convert(),
            Err(ConvertError::InvalidState {
                state: ConversionState::Failed,
                ..
            })
        ));
        assert!(matches!(
            pipeline.run(),
            Err(ConvertError::InvalidState {
                phase: "run",
                state: ConversionState::Failed
            })
        ));
    }

    #[test]
    fn run_finishes_a_partly_driven_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data0000.dat");
        std::fs::write(&input, cold_steel_2_save()).unwrap();

        let mut pipeline = Pipeline::new(
            &COLD_STEEL_2,
            ConvertOptions::new(ConvertFormat::PS4_TO_PC),
            &input,
            None,
        );
        pipeline.pre_convert().unwrap();
        assert!(!pipeline.state().is_terminal());

        let stats = pipeline.run().unwrap();
        assert_eq!(pipeline.state(), ConversionState::Done);
        assert_eq!(stats.input_size, 496_880);
        assert_eq!(stats.output_size, 493_976);
    }

    #[test]
    fn existing_output_is_kept_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.dat");
        let output = dir.path().join("out.pc");
        std::fs::write(&input, cold_steel_2_save()).unwrap();
        std::fs::write(&output, b"keep").unwrap();

        let options = ConvertOptions::new(ConvertFormat::PS4_TO_PC);
        let mut pipeline = Pipeline::new(&COLD_STEEL_2, options, &input, Some(output.clone()));
        assert!(matches!(pipeline.run(), Err(ConvertError::Persist { .. })));
        assert_eq!(pipeline.state(), ConversionState::Failed);
        assert_eq!(std::fs::read(&output).unwrap(), b"keep");

        let mut pipeline =
            Pipeline::new(&COLD_STEEL_2, options, &input, Some(output.clone())).overwrite(true);
        pipeline.run().unwrap();
        assert_eq!(std::fs::read(&output).unwrap().len(), 493_976);
    }

    #[test]
    fn unsupported_direction_fails_in_convert() {
        let result = convert_bytes(
            &COLD_STEEL_2,
            cold_steel_2_save(),
            &ConvertOptions::new(ConvertFormat::PS3_TO_PC),
        );
        assert!(matches!(
            result,
            Err(ConvertError::Patch(crate::patch::PatchError::UnsupportedFormat { .. }))
        ));
    }
}
