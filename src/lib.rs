//! Savepatch: convert game saves between console and PC layouts.
//!
//! A conversion is described by a patch table: ordered, non-overlapping
//! byte ranges of the input, each bound to an operation (copy, literal
//! replacement or endian swap). The engine walks the input once, emitting
//! each range through its operation.
//!
//! The crate provides:
//! - Patch tables and operations (`patch`)
//! - The table walk (`engine`)
//! - Per-game tables for Tales of Vesperia and Trails of Cold Steel I-III (`games`)
//! - The three-phase file conversion pipeline (`converter`)
//! - Save decompression (`compress`) and the Cold Steel III checksum (`checksum`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use savepatch::converter::{ConvertOptions, Pipeline};
//! use savepatch::format::ConvertFormat;
//! use savepatch::games::{self, GameId};
//!
//! let game = games::lookup(GameId::ColdSteel3);
//! let options = ConvertOptions::new(ConvertFormat::PS4_TO_PC);
//! let mut pipeline = Pipeline::new(game, options, "data0001.dat", None);
//! let stats = pipeline.run().unwrap();
//! println!("wrote {} bytes", stats.output_size);
//! ```

pub mod checksum;
pub mod compress;
pub mod converter;
pub mod engine;
pub mod format;
pub mod games;
pub mod io;
pub mod patch;

#[cfg(feature = "cli")]
pub mod cli;

pub use converter::{ConversionState, ConvertOptions, ConvertStats, Pipeline, convert_bytes};
pub use engine::{ConvertError, WalkOutcome, WalkReport, convert_to_vec, walk};
pub use format::{ConvertFormat, SaveFormat};
pub use games::{GameId, SaveGame};
pub use patch::{PatchEntry, PatchError, PatchOp, PatchTable, Range, WordSize};
