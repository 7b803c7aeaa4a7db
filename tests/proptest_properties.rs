use proptest::prelude::*;
use savepatch::engine::convert_to_vec;
use savepatch::format::ConvertFormat;
use savepatch::patch::{PatchEntry, PatchOp, PatchTable, Range, WordSize};

const FMT: ConvertFormat = ConvertFormat::PS3_TO_PC;

/// Split `[0, len)` at the given cut points into adjacent, non-empty ranges.
fn split(len: usize, cuts: &[usize]) -> Vec<Range> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (len + 1)).collect();
    points.push(0);
    points.push(len);
    points.sort_unstable();
    points.dedup();
    points.windows(2).map(|w| Range::new(w[0], w[1])).collect()
}

fn op_for(choice: u8, range: Range) -> PatchOp {
    match choice % 5 {
        0 => PatchOp::Copy,
        1 => PatchOp::EndianSwap(WordSize::Two),
        2 => PatchOp::EndianSwap(WordSize::Four),
        // Delete.
        3 => PatchOp::Literal(Vec::new()),
        // Replace with a literal of a different length.
        _ => PatchOp::Literal(vec![0xEE; range.len() % 7 + 1]),
    }
}

proptest! {
    #[test]
    fn prop_gap_fill_is_a_valid_cover(
        len in 1usize..2048,
        cuts in proptest::collection::vec(any::<usize>(), 0..24),
        choices in proptest::collection::vec(any::<u8>(), 24),
        keep in proptest::collection::vec(any::<bool>(), 24),
    ) {
        // Keep a random subset of the ranges; the rest become gaps.
        let entries: Vec<PatchEntry> = split(len, &cuts)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep[i % keep.len()])
            .map(|(i, r)| PatchEntry::new(r, op_for(choices[i % choices.len()], r)))
            .collect();
        let delta: isize = entries.iter().map(PatchEntry::size_delta).sum();

        let filled = PatchTable::from_entries(entries)
            .fill_gaps(&PatchOp::EndianSwap(WordSize::Four), len)
            .unwrap();
        prop_assert!(filled.validate_coverage(len).is_ok());
        prop_assert_eq!(filled.net_delta(), delta);

        let input = vec![0x5Au8; len];
        let (out, report) = convert_to_vec(&input, &filled, FMT).unwrap();
        prop_assert!(report.is_finished());
        prop_assert_eq!(out.len() as isize, len as isize + delta);
    }

    #[test]
    fn prop_copy_tables_are_identity(
        input in proptest::collection::vec(any::<u8>(), 0..4096),
        cuts in proptest::collection::vec(any::<usize>(), 0..32),
    ) {
        let entries: Vec<PatchEntry> = split(input.len(), &cuts)
            .into_iter()
            .map(PatchEntry::copy)
            .collect();
        let table = PatchTable::from_entries(entries)
            .finalize(&PatchOp::Copy, input.len(), input.len())
            .unwrap();
        let (out, _) = convert_to_vec(&input, &table, FMT).unwrap();
        prop_assert_eq!(out, input);
    }

    #[test]
    fn prop_swap_twice_is_identity(
        input in proptest::collection::vec(any::<u8>(), 0..1024),
        word in prop_oneof![Just(WordSize::Two), Just(WordSize::Four), Just(WordSize::Eight)],
    ) {
        let table = PatchTable::new()
            .finalize(&PatchOp::EndianSwap(word), input.len(), input.len())
            .unwrap();
        let (once, _) = convert_to_vec(&input, &table, FMT).unwrap();
        let (twice, _) = convert_to_vec(&once, &table, FMT.reversed()).unwrap();
        prop_assert_eq!(twice, input);
    }

    #[test]
    fn prop_reverse_then_forward_is_stable(
        input in proptest::collection::vec(any::<u8>(), 1..2048),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
        choices in proptest::collection::vec(any::<u8>(), 16),
    ) {
        let forward = PatchTable::from_entries(
            split(input.len(), &cuts)
                .into_iter()
                .enumerate()
                .map(|(i, r)| PatchEntry::new(r, op_for(choices[i % choices.len()], r)))
                .collect(),
        )
        .finalize(&PatchOp::Copy, input.len(), input.len())
        .unwrap();
        let (converted, _) = convert_to_vec(&input, &forward, FMT).unwrap();

        let reverse = forward
            .reverse()
            .finalize(&PatchOp::Copy, converted.len(), converted.len())
            .unwrap();
        prop_assert_eq!(reverse.net_delta(), -forward.net_delta());
        let (restored, report) = convert_to_vec(&converted, &reverse, FMT.reversed()).unwrap();
        prop_assert!(report.is_finished());
        prop_assert_eq!(restored.len(), input.len());

        // Bytes the forward table dropped are zero now; converting again
        // must reproduce the same output.
        let (again, _) = convert_to_vec(&restored, &forward, FMT).unwrap();
        prop_assert_eq!(again, converted);
    }
}
