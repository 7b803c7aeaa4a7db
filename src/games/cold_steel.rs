// Trails of Cold Steel I, II and III: PS4 <-> PC.
//
// The PS4 -> PC layout is documented as a sequence of in-place edits on a
// file being rewritten: insert N bytes at layout offset X, delete N bytes
// at layout offset Y. The engine reads the *original* input, so every layout
// offset is shifted by the running total of bytes deleted minus bytes
// inserted so far. `InPlaceBuilder` keeps that running adjustment.
//
// PC -> PS4 is the reverse of the forward table. Everything not named by an
// edit is copied, and both layouts share byte order.

use log::debug;

use crate::checksum;
use crate::compress;
use crate::converter::ConvertOptions;
use crate::engine::ConvertError;
use crate::format::ConvertFormat;
use crate::patch::{PatchEntry, PatchError, PatchOp, PatchTable};

use super::{GameId, SaveGame};

const FORMATS: &[ConvertFormat] = &[ConvertFormat::PS4_TO_PC, ConvertFormat::PC_TO_PS4];

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

pub struct ColdSteel {
    id: GameId,
    /// Decompressed PS4 save size.
    ps4_size: usize,
    /// Bytes the PC save is smaller than the PS4 save.
    reduction: usize,
    /// Rewrite the size/CRC header after conversion.
    checksum: bool,
    layout: fn(&mut InPlaceBuilder, usize),
}

pub static COLD_STEEL_1: ColdSteel = ColdSteel {
    id: GameId::ColdSteel1,
    ps4_size: 519_392,
    reduction: 58_400,
    checksum: false,
    layout: cold_steel_1,
};

pub static COLD_STEEL_2: ColdSteel = ColdSteel {
    id: GameId::ColdSteel2,
    ps4_size: 496_880,
    reduction: 2904,
    checksum: false,
    layout: cold_steel_2,
};

pub static COLD_STEEL_3: ColdSteel = ColdSteel {
    id: GameId::ColdSteel3,
    ps4_size: 1_313_744,
    reduction: 2320,
    checksum: true,
    layout: cold_steel_3,
};

impl ColdSteel {
    pub fn pc_size(&self) -> usize {
        self.ps4_size - self.reduction
    }

    /// PS4 -> PC entries, before gap fill.
    pub fn forward_table(&self) -> Result<PatchTable, PatchError> {
        let mut builder = InPlaceBuilder::default();
        (self.layout)(&mut builder, self.pc_size());
        let table = builder.finish();
        table.expect_delta(self.id.title(), ConvertFormat::PS4_TO_PC, -(self.reduction as isize))?;
        Ok(table)
    }
}

impl SaveGame for ColdSteel {
    fn id(&self) -> GameId {
        self.id
    }

    fn supported_formats(&self) -> &'static [ConvertFormat] {
        FORMATS
    }

    fn expected_input_size(&self, format: ConvertFormat) -> Option<usize> {
        match format {
            ConvertFormat::PS4_TO_PC => Some(self.ps4_size),
            ConvertFormat::PC_TO_PS4 => Some(self.pc_size()),
            _ => None,
        }
    }

    fn patch_table(
        &self,
        options: &ConvertOptions,
        input_len: usize,
    ) -> Result<PatchTable, PatchError> {
        self.check_format(options.format)?;
        let forward = self.forward_table()?;
        let table = if options.format == ConvertFormat::PS4_TO_PC {
            forward
        } else {
            forward.reverse()
        };
        debug!("{} {}: {} explicit entries", self.id, options.format, table.len());
        table.finalize(&PatchOp::Copy, input_len, input_len)
    }

    fn preprocess(&self, data: Vec<u8>) -> Vec<u8> {
        compress::decompress_savedata(data)
    }

    fn postprocess(&self, data: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
        if self.checksum {
            checksum::fix_checksum(data)
        } else {
            Ok(data)
        }
    }
}

// ---------------------------------------------------------------------------
// In-place edit builder
// ---------------------------------------------------------------------------

/// Turns in-place layout edits into entries over the original input.
#[derive(Debug, Default)]
pub struct InPlaceBuilder {
    entries: Vec<PatchEntry>,
    /// Input offset minus layout offset at the current edit point.
    adjustment: isize,
}

impl InPlaceBuilder {
    fn input_offset(&self, layout_offset: usize) -> usize {
        layout_offset.saturating_add_signed(self.adjustment)
    }

    pub fn delete_at(&mut self, layout_offset: usize, len: usize) {
        let start = self.input_offset(layout_offset);
        self.entries.push(PatchEntry::delete(start, len));
        self.adjustment += len as isize;
    }

    pub fn insert_at(&mut self, layout_offset: usize, bytes: &[u8]) {
        let start = self.input_offset(layout_offset);
        self.entries.push(PatchEntry::insert(start, bytes));
        self.adjustment -= bytes.len() as isize;
    }

    /// Net bytes removed so far.
    pub fn adjustment(&self) -> isize {
        self.adjustment
    }

    pub fn finish(self) -> PatchTable {
        PatchTable::from_entries(self.entries)
    }
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// Per-model location and animation blocks shared by the first model and
/// the strided copies after it.
const CS1_MODEL_EDITS: [(usize, usize); 12] = [
    (0x2E94, 8),
    (0x2EA8, 12),
    (0x2FC8, 20),
    (0x302C, 8),
    (0x3030, 4),
    (0x30F0, 80),
    (0x315C, 12),
    (0x3214, 80),
    (0x3274, 8),
    (0x3278, 4),
    (0x3338, 80),
    (0x33A4, 12),
];

fn cold_steel_1(b: &mut InPlaceBuilder, pc_size: usize) {
    const MODEL_STRIDE: usize = 1760;
    const MODELS: usize = 10;

    // PC saves open with their own size.
    b.insert_at(0x0, &[0xC0, 0x08, 0x07, 0x00]);

    // Character data alignment.
    b.delete_at(0x20, 20);

    // Model 1.
    b.delete_at(0x2E24, 12);
    for &(offset, len) in &CS1_MODEL_EDITS {
        b.delete_at(offset, len);
    }

    // Models 2..=10 carry one larger block at the start of the stride.
    for i in 1..MODELS {
        let base = MODEL_STRIDE * i;
        b.delete_at(0x2D78 + base, 72);
        for &(offset, len) in &CS1_MODEL_EDITS {
            b.delete_at(offset + base, len);
        }
    }

    // Inventory and game data.
    b.delete_at(0x40C24, 53_672);
    b.delete_at(0x6B204, 764);

    // Trailing padding.
    b.delete_at(pc_size, 8);
}

fn cold_steel_2(b: &mut InPlaceBuilder, pc_size: usize) {
    const MODEL_STRIDE: usize = 1148;
    const MODELS: usize = 28;

    b.insert_at(0x0, &[0x98, 0x89, 0x07, 0x00]);

    // Model 1 location and animation state.
    b.delete_at(0xCF2C, 8);
    b.delete_at(0xCFAC, 20);

    for i in 1..MODELS {
        let base = MODEL_STRIDE * i;
        b.delete_at(0xCFAC + base, 8);
        b.delete_at(0xCFC0 + base, 12);
    }

    // Inventory and game data.
    b.delete_at(0x354EC, 2320);
    // Playtime.
    b.delete_at(0x70BDC, 12);

    b.delete_at(pc_size, 8);
}

fn cold_steel_3(b: &mut InPlaceBuilder, pc_size: usize) {
    const MODEL_STRIDE: usize = 1152;
    const MODELS: usize = 10;
    const GAMEPLAY_PAD: [u8; 16] = [0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

    for i in 0..MODELS {
        b.delete_at(0xDE2C + MODEL_STRIDE * i, 16);
    }

    // Inventory.
    b.delete_at(0x36580, 2176);

    // Gameplay data, then sepith and mira. Both land on the same input
    // offset; their order is kept by the stable sort.
    b.insert_at(0x66980, &GAMEPLAY_PAD);
    b.insert_at(0x66990, &GAMEPLAY_PAD);

    // Coordinates, then playtime.
    b.delete_at(0x7840C, 4);
    b.delete_at(0x78440, 4);

    b.delete_at(pc_size, 8);
}
