#![no_main]
use libfuzzer_sys::fuzz_target;
use savepatch::engine::convert_to_vec;
use savepatch::format::ConvertFormat;
use savepatch::patch::{PatchEntry, PatchOp, PatchTable, Range, WordSize};

// Input layout: [entry count][4 bytes per entry: start, len, op, arg]...[save bytes]
fuzz_target!(|data: &[u8]| {
    let Some((&count, rest)) = data.split_first() else {
        return;
    };
    let count = usize::from(count % 16);
    if rest.len() < count * 4 {
        return;
    }
    let (records, input) = rest.split_at(count * 4);

    let entries: Vec<PatchEntry> = records
        .chunks_exact(4)
        .map(|e| {
            let range = Range::with_len(usize::from(e[0]), usize::from(e[1] % 32));
            let op = match e[2] % 5 {
                0 => PatchOp::Copy,
                1 => PatchOp::Literal(vec![e[3]; usize::from(e[3] % 16)]),
                2 => PatchOp::EndianSwap(WordSize::Two),
                3 => PatchOp::EndianSwap(WordSize::Four),
                _ => PatchOp::EndianSwap(WordSize::Eight),
            };
            PatchEntry::new(range, op)
        })
        .collect();

    let forward = PatchTable::from_entries(entries);
    let Ok(table) = forward
        .clone()
        .finalize(&PatchOp::Copy, input.len(), input.len())
    else {
        return;
    };
    let Ok((out, report)) = convert_to_vec(input, &table, ConvertFormat::PS4_TO_PC) else {
        return;
    };
    assert!(report.is_finished());
    if table.iter().all(|e| e.range.end <= input.len()) {
        assert_eq!(out.len() as isize, input.len() as isize + table.net_delta());
    }

    // The reverse of a valid table is walkable over the converted output.
    if let Ok(reverse) = forward.reverse().finalize(&PatchOp::Copy, out.len(), out.len()) {
        let _ = convert_to_vec(&out, &reverse, ConvertFormat::PC_TO_PS4);
    }
});
