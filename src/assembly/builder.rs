use std::sync::Arc;

use tracing::{debug, trace};

use super::{AssemblyError, Junction, JunctionAssembly};
use crate::config::AssemblyConfig;
use crate::read::Read;

/// Build a junction assembly from reads soft-clipped at the junction.
///
/// The read with the highest base-quality total from the junction outwards
/// seeds the consensus; every other read is then merged in input order.
pub fn build_from_junction_reads(
    junction: Junction,
    reads: &[Arc<Read>],
    check_mismatches: bool,
    config: AssemblyConfig,
) -> Result<JunctionAssembly, AssemblyError> {
    let (mut assembly, seed_index) = build_from_junction(junction, reads, config)?;

    for (i, read) in reads.iter().enumerate() {
        if i == seed_index {
            continue;
        }
        assembly.add_junction_read(Arc::clone(read), check_mismatches);
    }

    trace!(assembly = %assembly, "built junction assembly");
    Ok(assembly)
}

fn build_from_junction(
    junction: Junction,
    reads: &[Arc<Read>],
    config: AssemblyConfig,
) -> Result<(JunctionAssembly, usize), AssemblyError> {
    // the longest extension out from the junction into the soft-clipped bases
    let mut min_aligned_position = junction.position;
    let mut max_aligned_position = junction.position;
    let mut max_distance_from_junction = 0;
    let mut seed: Option<(usize, u32)> = None;

    for (i, read) in reads.iter().enumerate() {
        let read_junction_index = read
            .index_at_reference_position(junction.position, true)
            .ok_or_else(|| AssemblyError::NoJunctionIndex {
                read: read.name().to_string(),
                junction: junction.to_string(),
            })?;

        // forward: read length 10, junction index 6 extends over indices 7-9
        // reverse: junction index 4 extends over indices 0-3
        let extension_distance = if junction.is_forward() {
            read.bases_len() - read_junction_index - 1
        } else {
            read_junction_index
        };

        max_distance_from_junction = max_distance_from_junction.max(extension_distance);

        if junction.is_forward() {
            max_aligned_position = max_aligned_position.max(read.unclipped_end());
        } else {
            min_aligned_position = min_aligned_position.min(read.unclipped_start());
        }

        let qual_total = junction_qual_total(read, &junction, read_junction_index);
        if seed.map_or(true, |(_, best)| qual_total > best) {
            seed = Some((i, qual_total));
        }
    }

    let (seed_index, _) = seed.ok_or(AssemblyError::NoReads)?;

    let assembly = JunctionAssembly::new(
        junction,
        Arc::clone(&reads[seed_index]),
        max_distance_from_junction,
        min_aligned_position,
        max_aligned_position,
        config,
    );

    Ok((assembly, seed_index))
}

/// Sum of base qualities from the junction to the read's far end.
pub fn read_qual_from_junction(read: &Read, junction: &Junction) -> u32 {
    read.index_at_reference_position(junction.position, true)
        .map_or(0, |index| junction_qual_total(read, junction, index))
}

fn junction_qual_total(read: &Read, junction: &Junction, read_junction_index: usize) -> u32 {
    let quals = if junction.is_forward() {
        &read.base_quals()[read_junction_index..]
    } else {
        &read.base_quals()[..=read_junction_index]
    };
    quals.iter().map(|&q| q as u32).sum()
}

/// Extend an assembly back into the aligned reference bases of its reads.
///
/// The consensus grows by the longest aligned stretch any supporting read
/// has on the reference side of the junction. Reads are then merged with the
/// lowest-NM read first so reference bases win where possible.
pub fn expand_reference_bases(assembly: &mut JunctionAssembly) {
    let junction_position = assembly.junction().position;
    let is_forward = assembly.junction().is_forward();

    let mut min_aligned_position = assembly.min_aligned_position();
    let mut max_aligned_position = assembly.max_aligned_position();
    let mut max_distance_from_junction = 0;

    // (support index, NM, extension distance)
    let mut min_nm_support: Option<(usize, u32, usize)> = None;

    for support_index in 0..assembly.support_count() {
        let read = Arc::clone(&assembly.support()[support_index].read);
        let Some(read_junction_index) = read.index_at_reference_position(junction_position, true)
        else {
            continue;
        };

        // forward: read length 10, junction index 4 extends over indices 0-3
        // reverse: junction index 6 extends over indices 7-9
        let read_extension_distance = if is_forward {
            min_aligned_position = min_aligned_position.min(read.alignment_start());
            (read_junction_index as i32 - read.left_clip_length()).max(0) as usize
        } else {
            max_aligned_position = max_aligned_position.max(read.alignment_end());
            let beyond_junction = read.bases_len() as i32 - read_junction_index as i32 - 1;
            (beyond_junction - read.right_clip_length()).max(0) as usize
        };

        assembly.check_add_ref_side_soft_clip(support_index);

        max_distance_from_junction = max_distance_from_junction.max(read_extension_distance);

        let num_events = read.num_events();
        let is_lower = min_nm_support.map_or(true, |(_, nm, distance)| {
            num_events < nm || (num_events == nm && read_extension_distance < distance)
        });
        if is_lower {
            min_nm_support = Some((support_index, num_events, read_extension_distance));
        }
    }

    assembly.extend_bases(max_distance_from_junction, min_aligned_position, max_aligned_position);

    let first_index = min_nm_support.map(|(index, _, _)| index);
    if let Some(index) = first_index {
        assembly.extend_junction_read_support(index);
    }

    for support_index in 0..assembly.support_count() {
        if Some(support_index) != first_index {
            assembly.extend_junction_read_support(support_index);
        }
    }

    debug!(
        assembly = %assembly,
        ref_bases = max_distance_from_junction,
        "expanded reference bases"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Orientation;
    use crate::read::parse_cigar;

    fn read(name: &str, start: i32, cigar: &str, bases: &[u8], quals: Vec<u8>) -> Arc<Read> {
        let cigar = parse_cigar(cigar).unwrap();
        Arc::new(Read::new(name, "chr1", start, cigar, bases.to_vec(), quals).unwrap())
    }

    fn build(junction: Junction, reads: &[Arc<Read>]) -> Result<JunctionAssembly, AssemblyError> {
        build_from_junction_reads(junction, reads, false, AssemblyConfig::default())
    }

    #[test]
    fn picks_highest_quality_seed() {
        let junction = Junction::new("chr1", 110, Orientation::Forward);
        let reads = vec![
            read("low", 101, "10M4S", b"AAAAACCCCCGTTG", vec![20; 14]),
            read("high", 101, "10M4S", b"AAAAACCCCCGTTG", vec![37; 14]),
        ];

        let assembly = build(junction, &reads).unwrap();
        assert_eq!(assembly.support()[0].read.name(), "high");
        assert_eq!(assembly.support_count(), 2);
    }

    #[test]
    fn consensus_length_is_max_extension() {
        let junction = Junction::new("chr1", 110, Orientation::Forward);
        let reads = vec![
            read("short", 101, "10M2S", b"AAAAACCCCCGT", vec![37; 12]),
            read("long", 103, "8M7S", b"AAACCCCCGTTGCAA", vec![30; 15]),
        ];

        let assembly = build(junction, &reads).unwrap();
        assert_eq!(assembly.extension_length(), 7);
        assert_eq!(assembly.base_length(), 8);
        assert_eq!(assembly.max_aligned_position(), 117);
        assert_eq!(assembly.bases_string(), "CGTTGCAA");
    }

    #[test]
    fn rejects_empty_and_unplaceable_reads() {
        let junction = Junction::new("chr1", 110, Orientation::Forward);
        assert_eq!(build(junction.clone(), &[]).unwrap_err(), AssemblyError::NoReads);

        let far = read("far", 500, "10M", b"ACGTACGTAC", vec![30; 10]);
        assert!(matches!(build(junction, &[far]), Err(AssemblyError::NoJunctionIndex { .. })));
    }

    #[test]
    fn unmapped_reads_have_no_junction_index() {
        let junction = Junction::new("chr1", 110, Orientation::Forward);
        let placed = read("placed", 101, "10M4S", b"AAAAACCCCCGTTG", vec![30; 14]);

        let empty = Read::new("e", "chr1", 110, vec![], Vec::<u8>::new(), Vec::<u8>::new());
        let empty = Arc::new(empty.unwrap());
        let result = build(junction.clone(), &[placed.clone(), empty]);
        assert!(matches!(
            result,
            Err(AssemblyError::NoJunctionIndex { read: ref name, .. }) if name == "e"
        ));

        let unmapped = read("u", 110, "*", b"TTTTTTTTTTTT", vec![40; 12]);
        assert_eq!(read_qual_from_junction(&unmapped, &junction), 0);
        let result = build(junction, &[placed, unmapped]);
        assert!(matches!(result, Err(AssemblyError::NoJunctionIndex { .. })));
    }

    #[test]
    fn qual_total_is_oriented() {
        let r = read("r", 101, "4S10M", b"TTTTAAAAACCCCC", (1..=14).collect());
        let reverse = Junction::new("chr1", 101, Orientation::Reverse);
        // indices 0..=4
        assert_eq!(read_qual_from_junction(&r, &reverse), 1 + 2 + 3 + 4 + 5);
        let forward = Junction::new("chr1", 110, Orientation::Forward);
        assert_eq!(read_qual_from_junction(&r, &forward), 14);
    }

    #[test]
    fn expands_forward_assembly_into_reference() {
        let junction = Junction::new("chr1", 110, Orientation::Forward);
        let reads = vec![
            read("a", 101, "10M4S", b"AAAAACCCCCGTTG", vec![37; 14]),
            read("b", 96, "15M4S", b"GGGGGAAAAACCCCCGTTG", vec![37; 19]),
            read("c", 101, "2S10M3S", b"TTAAAAACCCCCGTT", vec![37; 15]),
        ];

        let mut assembly = build(junction, &reads).unwrap();
        assert_eq!(assembly.base_length(), 5);

        expand_reference_bases(&mut assembly);

        assert_eq!(assembly.min_aligned_position(), 96);
        assert_eq!(assembly.junction_index(), 14);
        assert_eq!(assembly.base_length(), 19);
        assert_eq!(assembly.bases_string(), "GGGGGAAAAACCCCCGTTG");
        assert_eq!(assembly.ref_side_soft_clips().len(), 1);
        assert_eq!(assembly.ref_side_soft_clips()[0].position, 101);
        assert_eq!(assembly.ref_side_soft_clips()[0].max_length, 2);
        assert!(assembly.support().iter().all(|s| s.reference_mismatches == 0));
    }
}
