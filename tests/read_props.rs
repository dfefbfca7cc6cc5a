use proptest::prelude::*;
use junction_assembler::assembly::bases_match;
use junction_assembler::{parse_cigar, CigarOp, Read};

fn base() -> impl Strategy<Value = u8> {
    prop_oneof![Just(b'A'), Just(b'C'), Just(b'G'), Just(b'T')]
}

fn cigar_string(
    left_clip: u32,
    first: u32,
    deletion: Option<(u32, u32)>,
    right_clip: u32,
) -> String {
    let mut cigar = String::new();
    if left_clip > 0 {
        cigar.push_str(&format!("{}S", left_clip));
    }
    cigar.push_str(&format!("{}M", first));
    if let Some((del, second)) = deletion {
        cigar.push_str(&format!("{}D{}M", del, second));
    }
    if right_clip > 0 {
        cigar.push_str(&format!("{}S", right_clip));
    }
    cigar
}

fn build_read(cigar: &str) -> Read {
    let ops = parse_cigar(cigar).expect("generated cigar parses");
    let len: usize = ops.iter().map(CigarOp::read_len).sum();
    let bases: Vec<u8> = (0..len).map(|i| b"ACGT"[i % 4]).collect();
    let quals: Vec<u8> = (0..len).map(|i| 10 + (i % 30) as u8).collect();
    Read::new("prop", "chr1", 1_000, ops, bases, quals).expect("generated read is valid")
}

fn assert_geometry(read: &Read) -> Result<(), TestCaseError> {
    prop_assert!(read.unclipped_start() <= read.alignment_start());
    prop_assert!(read.alignment_start() <= read.alignment_end());
    prop_assert!(read.alignment_end() <= read.unclipped_end());
    prop_assert_eq!(read.bases().len(), read.base_quals().len());
    let cigar_len: usize = read.cigar().iter().map(CigarOp::read_len).sum();
    prop_assert_eq!(cigar_len, read.bases_len());
    Ok(())
}

proptest! {
    #[test]
    fn base_comparison_is_symmetric(
        first in base(),
        second in base(),
        first_qual in 0u8..45,
        second_qual in 0u8..45,
        threshold in 0u8..45,
    ) {
        prop_assert_eq!(
            bases_match(first, second, first_qual, second_qual, threshold),
            bases_match(second, first, second_qual, first_qual, threshold)
        );
    }

    #[test]
    fn low_quality_base_matches_anything(
        first in base(),
        second in base(),
        low_qual in 0u8..26,
        other_qual in 0u8..45,
    ) {
        prop_assert!(bases_match(first, second, low_qual, other_qual, 26));
        prop_assert!(bases_match(first, first, 40, 40, 26));
    }

    #[test]
    fn trimming_preserves_geometry(
        left_clip in 0u32..6,
        first in 1u32..30,
        deletion in proptest::option::of((1u32..4, 1u32..10)),
        right_clip in 0u32..6,
        count in 0usize..50,
        from_start in any::<bool>(),
    ) {
        let mut read = build_read(&cigar_string(left_clip, first, deletion, right_clip));
        let original_len = read.bases_len();
        let original_end = read.alignment_end();
        let original_start = read.alignment_start();

        read.trim_bases(count, from_start);

        assert_geometry(&read)?;
        prop_assert!(read.bases_len() >= 1);
        prop_assert!(read.bases_len() <= original_len);
        if from_start {
            prop_assert_eq!(read.alignment_end(), original_end);
            prop_assert!(read.alignment_start() >= original_start);
        } else {
            prop_assert_eq!(read.alignment_start(), original_start);
            prop_assert!(read.alignment_end() <= original_end);
        }
    }

    #[test]
    fn extrapolated_index_stays_within_read(
        left_clip in 0u32..6,
        first in 1u32..30,
        right_clip in 0u32..6,
        offset in -10i32..40,
    ) {
        let read = build_read(&cigar_string(left_clip, first, None, right_clip));
        let position = read.alignment_start() + offset;
        if let Some(index) = read.index_at_reference_position(position, true) {
            prop_assert!(index < read.bases_len());
        }
    }
}
