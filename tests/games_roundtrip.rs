use savepatch::checksum;
use savepatch::converter::{ConvertOptions, convert_bytes};
use savepatch::format::ConvertFormat;
use savepatch::games::{self, GameId, SaveGame};

fn pattern(len: usize) -> Vec<u8> {
    let mut save: Vec<u8> = (0..len).map(|i| ((i * 31 + 7) % 251) as u8).collect();
    // Keep the compression detectors from matching a synthetic save.
    save[..16].fill(0);
    save
}

fn convert(game: &dyn SaveGame, data: Vec<u8>, format: ConvertFormat) -> Vec<u8> {
    convert_bytes(game, data, &ConvertOptions::new(format)).unwrap()
}

/// Convert there and back twice. The first trip zeroes whatever the target
/// layout cannot hold; the second must then be exact.
fn assert_roundtrip(id: GameId, forward: ConvertFormat) {
    let game = games::lookup(id);
    let backward = forward.reversed();
    let source_len = game.expected_input_size(forward).unwrap();
    let target_len = game.expected_input_size(backward).unwrap();

    let x0 = pattern(source_len);
    let y0 = convert(game, x0, forward);
    assert_eq!(y0.len(), target_len, "{id} {forward}");

    let x1 = convert(game, y0.clone(), backward);
    assert_eq!(x1.len(), source_len, "{id} {backward}");

    let y1 = convert(game, x1.clone(), forward);
    assert_eq!(y1, y0, "{id} {forward}: second trip differs");
    let x2 = convert(game, y1, backward);
    assert_eq!(x2, x1, "{id} {backward}: second trip differs");
}

#[test]
fn vesperia_roundtrips() {
    assert_roundtrip(GameId::Vesperia, ConvertFormat::PS3_TO_PC);
    assert_roundtrip(GameId::Vesperia, ConvertFormat::PC_TO_PS3);
}

#[test]
fn cold_steel_roundtrips() {
    for id in [GameId::ColdSteel1, GameId::ColdSteel2, GameId::ColdSteel3] {
        assert_roundtrip(id, ConvertFormat::PS4_TO_PC);
        assert_roundtrip(id, ConvertFormat::PC_TO_PS4);
    }
}

/// A PC save holding every byte the PS4 layout drops: the leading size,
/// the Cold Steel III gameplay padding and its header checksum.
fn consistent_pc_save(id: GameId) -> Vec<u8> {
    let game = games::lookup(id);
    let mut save = pattern(game.expected_input_size(ConvertFormat::PC_TO_PS4).unwrap());
    if id == GameId::ColdSteel3 {
        let mut pad = [0u8; 16];
        pad[..4].fill(0xFF);
        save[0x66980..0x66990].copy_from_slice(&pad);
        save[0x66990..0x669A0].copy_from_slice(&pad);
        save = checksum::fix_checksum(save).unwrap();
    } else {
        let size = save.len() as u32;
        save[..4].copy_from_slice(&size.to_le_bytes());
    }
    save
}

#[test]
fn cold_steel_pc_saves_round_trip_exactly() {
    for id in [GameId::ColdSteel1, GameId::ColdSteel2, GameId::ColdSteel3] {
        let game = games::lookup(id);
        let pc = consistent_pc_save(id);
        let ps4 = convert(game, pc.clone(), ConvertFormat::PC_TO_PS4);
        assert_eq!(ps4.len(), game.expected_input_size(ConvertFormat::PS4_TO_PC).unwrap());
        let back = convert(game, ps4, ConvertFormat::PS4_TO_PC);
        assert!(back == pc, "{id}: PC -> PS4 -> PC changed the save");
    }
}

#[test]
fn cold_steel_pc_saves_open_with_their_size() {
    for (id, magic) in [
        (GameId::ColdSteel1, [0xC0, 0x08, 0x07, 0x00]),
        (GameId::ColdSteel2, [0x98, 0x89, 0x07, 0x00]),
    ] {
        let game = games::lookup(id);
        let ps4 = pattern(game.expected_input_size(ConvertFormat::PS4_TO_PC).unwrap());
        let pc = convert(game, ps4.clone(), ConvertFormat::PS4_TO_PC);
        assert_eq!(pc[..4], magic, "{id}");
        assert_eq!(u32::from_le_bytes(magic) as usize, pc.len());
        // Data up to the first deletion follows the magic unchanged.
        assert_eq!(pc[4..0x20], ps4[..0x1C]);
    }
}

#[test]
fn cold_steel_3_output_has_valid_checksum() {
    let game = games::lookup(GameId::ColdSteel3);
    let ps4 = pattern(game.expected_input_size(ConvertFormat::PS4_TO_PC).unwrap());
    let pc = convert(game, ps4, ConvertFormat::PS4_TO_PC);
    assert!(checksum::verify_checksum(&pc));
    let back = convert(game, pc, ConvertFormat::PC_TO_PS4);
    assert!(checksum::verify_checksum(&back));
}

#[test]
fn cold_steel_3_inserts_gameplay_padding() {
    let game = games::lookup(GameId::ColdSteel3);
    let ps4 = pattern(game.expected_input_size(ConvertFormat::PS4_TO_PC).unwrap());
    let pc = convert(game, ps4, ConvertFormat::PS4_TO_PC);
    let mut pad = [0u8; 16];
    pad[..4].fill(0xFF);
    assert_eq!(pc[0x66980..0x66990], pad);
    assert_eq!(pc[0x66990..0x669A0], pad);
}

#[test]
fn type1_packed_save_converts_like_the_raw_one() {
    const MARKER: u8 = 0xFF;
    let game = games::lookup(GameId::ColdSteel2);
    let raw = pattern(game.expected_input_size(ConvertFormat::PS4_TO_PC).unwrap());
    assert!(!raw.contains(&MARKER));

    // Literal-only body: every byte stands for itself.
    let mut packed = Vec::with_capacity(raw.len() + 12);
    packed.extend_from_slice(&(raw.len() as u32).to_le_bytes());
    packed.extend_from_slice(&((raw.len() + 12) as u32).to_le_bytes());
    packed.extend_from_slice(&u32::from(MARKER).to_le_bytes());
    packed.extend_from_slice(&raw);

    let expected = convert(game, raw, ConvertFormat::PS4_TO_PC);
    assert_eq!(convert(game, packed, ConvertFormat::PS4_TO_PC), expected);
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_framed_save_converts_like_the_raw_one() {
    let game = games::lookup(GameId::ColdSteel3);
    let raw = pattern(game.expected_input_size(ConvertFormat::PC_TO_PS4).unwrap());
    let framed = zstd::encode_all(&raw[..], 3).unwrap();

    let expected = convert(game, raw, ConvertFormat::PC_TO_PS4);
    assert_eq!(convert(game, framed, ConvertFormat::PC_TO_PS4), expected);
}

#[test]
fn vesperia_keeps_dlc_bits_when_asked() {
    let game = games::lookup(GameId::Vesperia);
    let ps3 = pattern(game.expected_input_size(ConvertFormat::PS3_TO_PC).unwrap());
    let options = ConvertOptions {
        patch_dlc_item_checks: false,
        ..ConvertOptions::new(ConvertFormat::PS3_TO_PC)
    };
    let kept = convert_bytes(game, ps3.clone(), &options).unwrap();
    let patched = convert(game, ps3, ConvertFormat::PS3_TO_PC);
    assert_eq!(kept.len(), patched.len());
    assert_ne!(kept, patched);
    assert!(patched[0xA7E10..0xA7E50].iter().all(|&b| b == 0));
}
