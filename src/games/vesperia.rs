// Tales of Vesperia: PS3 <-> PC.
//
// PS3 saves are big-endian, PC saves little-endian. Everything not listed
// here is swapped as 32-bit words by the gap fill. Explicit entries cover:
//
// - header and section size fields, rewritten for the target layout
// - the 64-bit save date
// - string and packed regions that must not be swapped
// - the 16 bytes CUSTOM_DATA grows by on PC, which pushes every later
//   section down by 0x10
// - optionally the DLC item bitfield, zeroed so the PC build loads the save
//
// Section offsets below are PS3 file offsets; regions after CUSTOM_DATA are
// shifted by 0x10 when the source is a PC save.

use crate::converter::ConvertOptions;
use crate::format::{ConvertFormat, SaveFormat};
use crate::patch::{PatchEntry, PatchError, PatchOp, PatchTable, Range, WordSize};

use super::{GameId, SaveGame};

/// 552-byte header plus the 838304-byte save block.
pub const PS3_SAVE_SIZE: usize = 552 + 838_304;
/// The PC CUSTOM_DATA section is padded out by this many bytes.
pub const CUSTOM_DATA_GROWTH: usize = 0x10;
pub const PC_SAVE_SIZE: usize = PS3_SAVE_SIZE + CUSTOM_DATA_GROWTH;

/// End of CUSTOM_DATA on PS3, where the PC padding goes.
const CUSTOM_DATA_END: usize = 0x38A8;

const FORMATS: &[ConvertFormat] = &[ConvertFormat::PS3_TO_PC, ConvertFormat::PC_TO_PS3];

/// `(offset, PS3 value)` of every 32-bit size or section-offset field. The
/// PC value is `PS3 value + 0x10`.
const SIZE_FIELDS: [(usize, u32); 18] = [
    (0x0C, 0x000C_CAA0),  // save block size
    (0x230, 0x000C_CAA0), // save block size, data header copy
    (0x254, 0x000C_C990), // reference strings
    (0x44C, 0x0000_3280), // SoundTheater
    (0x46C, 0x0000_34A0), // SavePoint
    (0x48C, 0x0000_38A0), // MG2Poker
    (0x4AC, 0x0000_3920), // SnowBoard
    (0x4CC, 0x000A_3920), // PARTY_DATA
    (0x4EC, 0x000A_8300), // PC_STATUS1
    (0x50C, 0x000A_C310),
    (0x52C, 0x000B_0320),
    (0x54C, 0x000B_4330),
    (0x56C, 0x000B_8340),
    (0x58C, 0x000B_C350),
    (0x5AC, 0x000C_0360),
    (0x5CC, 0x000C_4370),
    (0x5EC, 0x000C_8380), // PC_STATUS9
    (0x60C, 0x000C_C390), // FieldGadget
];

/// Regions before CUSTOM_DATA copied without swapping.
const HEADER_COPIES: [(usize, usize); 6] = [
    (0x228, 0x230),   // "TO8SAVE" magic
    (0x668, 0x670),   // map location
    (0x688, 0x690),   // weather
    (0xC30, 0xC38),   // "default"
    (0x1728, 0x1828), // packed bytes
    (0x1A90, 0x1F00), // field camera and area names
];

const DATE_FIELD: (usize, usize) = (0x18, 0x20);

const SAVE_POINT: (usize, usize) = (0x3AC8, 0x3AC8 + 1024);
const STRATEGY_NAMES: (usize, usize) = (0xA7160, 0xA7160 + 0x40 * 8);
const SECTION_NAMES: (usize, usize) = (0xCCBB8, 0xCCCC8);

const FIRST_CHARACTER: usize = 0xA8928;
const CHARACTER_BLOCK_SIZE: usize = 16_400;
const CHARACTERS: usize = 9;
const CHARACTER_NAME_OFFSET: usize = 0x4;
const CHARACTER_NAME_LEN: usize = 64;

/// Bitfield the PC build checks for obtained DLC items.
const DLC_ITEM_CHECK: usize = 0xA7E00;
const DLC_ITEM_CHECK_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

pub struct Vesperia;

pub static VESPERIA: Vesperia = Vesperia;

impl Vesperia {
    /// Explicit entries for `options.format`, before gap fill.
    pub fn explicit_table(&self, options: &ConvertOptions) -> Result<PatchTable, PatchError> {
        self.check_format(options.format)?;
        let format = options.format;
        let shift = match format.source {
            SaveFormat::Pc => CUSTOM_DATA_GROWTH,
            _ => 0,
        };

        let mut table = PatchTable::new();

        table.extend(SIZE_FIELDS.iter().map(|&(offset, value)| {
            PatchEntry::literal(Range::with_len(offset, 4), size_field(value, format.target))
        }));
        table.push(PatchEntry::new(
            DATE_FIELD.0..DATE_FIELD.1,
            PatchOp::EndianSwap(WordSize::Eight),
        ));
        table.extend(HEADER_COPIES.iter().map(|&(start, end)| PatchEntry::copy(start..end)));

        if format.source == SaveFormat::Ps3 {
            table.push(PatchEntry::insert(CUSTOM_DATA_END, vec![0u8; CUSTOM_DATA_GROWTH]));
        } else {
            table.push(PatchEntry::delete(CUSTOM_DATA_END, CUSTOM_DATA_GROWTH));
        }

        for (start, end) in [SAVE_POINT, STRATEGY_NAMES, SECTION_NAMES] {
            table.push(PatchEntry::copy(start + shift..end + shift));
        }
        table.extend((0..CHARACTERS).map(|i| {
            let start = FIRST_CHARACTER + i * CHARACTER_BLOCK_SIZE + CHARACTER_NAME_OFFSET + shift;
            PatchEntry::copy(Range::with_len(start, CHARACTER_NAME_LEN))
        }));

        if options.patch_dlc_item_checks {
            table.push(PatchEntry::literal(
                Range::with_len(DLC_ITEM_CHECK + shift, DLC_ITEM_CHECK_LEN),
                vec![0u8; DLC_ITEM_CHECK_LEN],
            ));
        }

        let growth = CUSTOM_DATA_GROWTH as isize;
        let expected = if format.target == SaveFormat::Pc { growth } else { -growth };
        table.expect_delta(self.id().title(), format, expected)?;
        Ok(table)
    }
}

fn size_field(ps3_value: u32, target: SaveFormat) -> [u8; 4] {
    if target.is_big_endian() {
        ps3_value.to_be_bytes()
    } else {
        (ps3_value + CUSTOM_DATA_GROWTH as u32).to_le_bytes()
    }
}

impl SaveGame for Vesperia {
    fn id(&self) -> GameId {
        GameId::Vesperia
    }

    fn supported_formats(&self) -> &'static [ConvertFormat] {
        FORMATS
    }

    fn expected_input_size(&self, format: ConvertFormat) -> Option<usize> {
        match format {
            ConvertFormat::PS3_TO_PC => Some(PS3_SAVE_SIZE),
            ConvertFormat::PC_TO_PS3 => Some(PC_SAVE_SIZE),
            _ => None,
        }
    }

    fn patch_table(
        &self,
        options: &ConvertOptions,
        input_len: usize,
    ) -> Result<PatchTable, PatchError> {
        let table = self.explicit_table(options)?;
        let source_size = match options.format.source {
            SaveFormat::Pc => PC_SAVE_SIZE,
            _ => PS3_SAVE_SIZE,
        };
        // Unnamed regions are 32-bit words whenever byte order changes.
        let fill = if options.format.swaps_endianness() {
            PatchOp::EndianSwap(WordSize::Four)
        } else {
            PatchOp::Copy
        };
        table.finalize(&fill, source_size, input_len)
    }
}
