// Per-game save layouts.
//
// Each supported game implements `SaveGame`: which directions it converts,
// the patch table for a direction, and optional pre/post processing around
// the engine walk. Profiles are stateless statics looked up by `GameId`.
//
// - `vesperia`:   Tales of Vesperia, PS3 <-> PC
// - `cold_steel`: Trails of Cold Steel I, II and III, PS4 <-> PC

pub mod cold_steel;
pub mod vesperia;

use std::fmt;
use std::str::FromStr;

use crate::converter::ConvertOptions;
use crate::engine::ConvertError;
use crate::format::ConvertFormat;
use crate::patch::{PatchError, PatchTable};

pub use cold_steel::{COLD_STEEL_1, COLD_STEEL_2, COLD_STEEL_3, ColdSteel};
pub use vesperia::{VESPERIA, Vesperia};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameId {
    Vesperia,
    ColdSteel1,
    ColdSteel2,
    ColdSteel3,
}

impl GameId {
    pub const ALL: [GameId; 4] = [
        Self::Vesperia,
        Self::ColdSteel1,
        Self::ColdSteel2,
        Self::ColdSteel3,
    ];

    /// Command-line name.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Vesperia => "vesperia",
            Self::ColdSteel1 => "cold-steel-1",
            Self::ColdSteel2 => "cold-steel-2",
            Self::ColdSteel3 => "cold-steel-3",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Vesperia => "Tales of Vesperia",
            Self::ColdSteel1 => "Trails of Cold Steel",
            Self::ColdSteel2 => "Trails of Cold Steel II",
            Self::ColdSteel3 => "Trails of Cold Steel III",
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for GameId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.slug() == s)
            .ok_or_else(|| format!("unknown game '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Profile trait
// ---------------------------------------------------------------------------

/// Everything the converter needs to know about one game.
pub trait SaveGame: Send + Sync {
    fn id(&self) -> GameId;

    /// Directions this game can be converted in.
    fn supported_formats(&self) -> &'static [ConvertFormat];

    /// Size of an unmodified (decompressed) save in the source layout.
    fn expected_input_size(&self, format: ConvertFormat) -> Option<usize>;

    /// The finalized patch table for `options.format`, covering an input of
    /// `input_len` bytes.
    fn patch_table(&self, options: &ConvertOptions, input_len: usize)
    -> Result<PatchTable, PatchError>;

    /// Runs on the raw input before the table is built.
    fn preprocess(&self, data: Vec<u8>) -> Vec<u8> {
        data
    }

    /// Runs on the engine output before it is written.
    fn postprocess(&self, data: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
        Ok(data)
    }

    fn supports(&self, format: ConvertFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    fn check_format(&self, format: ConvertFormat) -> Result<(), PatchError> {
        if self.supports(format) {
            Ok(())
        } else {
            Err(PatchError::UnsupportedFormat {
                game: self.id().title(),
                format,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub fn lookup(id: GameId) -> &'static dyn SaveGame {
    match id {
        GameId::Vesperia => &VESPERIA,
        GameId::ColdSteel1 => &COLD_STEEL_1,
        GameId::ColdSteel2 => &COLD_STEEL_2,
        GameId::ColdSteel3 => &COLD_STEEL_3,
    }
}

pub fn all() -> impl Iterator<Item = &'static dyn SaveGame> {
    GameId::ALL.into_iter().map(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_keyed_by_id() {
        for id in GameId::ALL {
            assert_eq!(lookup(id).id(), id);
            assert_eq!(id.slug().parse::<GameId>().unwrap(), id);
        }
        assert_eq!(all().count(), 4);
        assert!("cold-steel-4".parse::<GameId>().is_err());
    }

    #[test]
    fn unsupported_direction_is_rejected() {
        let game = lookup(GameId::Vesperia);
        assert!(game.check_format(ConvertFormat::PS3_TO_PC).is_ok());
        let err = game.check_format(ConvertFormat::PS4_TO_PC).unwrap_err();
        assert_eq!(err.to_string(), "Tales of Vesperia does not support ps4-to-pc conversion");

        let options = ConvertOptions::new(ConvertFormat::PC_TO_PS3);
        assert!(matches!(
            lookup(GameId::ColdSteel2).patch_table(&options, 1024),
            Err(PatchError::UnsupportedFormat { .. })
        ));
    }
}
