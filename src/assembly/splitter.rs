use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use super::base_match::slots_match;
use super::{build_from_junction_reads, JunctionAssembly};
use crate::read::Read;

/// One consensus disagreement carried by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mismatch {
    index: usize,
    base: u8,
}

/// Reads sharing an identical mismatch pattern.
#[derive(Debug)]
struct MismatchGroup {
    support_indices: Vec<usize>,
    mismatches: Vec<Mismatch>,
}

/// Separates an assembly whose reads disagree consistently into one
/// assembly per supported sequence.
#[derive(Debug)]
pub struct AssemblyMismatchSplitter<'a> {
    assembly: &'a JunctionAssembly,
}

impl<'a> AssemblyMismatchSplitter<'a> {
    /// Wrap an assembly for splitting.
    pub fn new(assembly: &'a JunctionAssembly) -> Self {
        Self { assembly }
    }

    /// Emit one assembly for the mismatch-free reads and one per recurring
    /// mismatch pattern, then fold contained assemblies together and offer
    /// the remaining reads to every survivor.
    ///
    /// Mismatched reads spanning fewer than `min_sequence_length` bases never
    /// define a sequence. An empty result means no sequence had enough support.
    pub fn split_on_mismatches(&self, min_sequence_length: usize) -> Vec<JunctionAssembly> {
        let config = *self.assembly.config();
        let junction = self.assembly.junction();
        let support = self.assembly.support();

        let mut clean_reads = Vec::new();
        let mut long_mismatch_reads = BTreeSet::new();

        for (i, s) in support.iter().enumerate() {
            if s.junction_mismatches == 0 {
                clean_reads.push(i);
            } else if s.read_range_length() >= min_sequence_length {
                long_mismatch_reads.insert(i);
            }
        }

        let groups = self.find_other_sequences(&long_mismatch_reads);

        let mut final_assemblies = Vec::new();
        let mut processed: HashSet<usize> = HashSet::new();

        if clean_reads.len() >= config.min_read_support {
            if let Some(assembly) = self.build_sequence(&clean_reads) {
                processed.extend(clean_reads.iter().copied());
                final_assemblies.push(assembly);
            }
        }

        for group in &groups {
            if group.support_indices.len() < config.min_read_support
                || group.mismatches.len() <= config.max_base_mismatches
            {
                continue;
            }

            if let Some(assembly) = self.build_sequence(&group.support_indices) {
                processed.extend(group.support_indices.iter().copied());
                final_assemblies.push(assembly);
            }
        }

        dedup_by_assembly_contains_another(&mut final_assemblies);

        for (i, s) in support.iter().enumerate() {
            if processed.contains(&i) {
                continue;
            }

            for assembly in &mut final_assemblies {
                if assembly.check_read_matches(&s.read, config.max_base_mismatches) {
                    assembly.add_junction_read(Arc::clone(&s.read), false);
                }
            }
        }

        debug!(
            junction = %junction,
            clean = clean_reads.len(),
            long_mismatch = long_mismatch_reads.len(),
            groups = groups.len(),
            assemblies = final_assemblies.len(),
            "split assembly on mismatches"
        );

        final_assemblies
    }

    fn build_sequence(&self, support_indices: &[usize]) -> Option<JunctionAssembly> {
        let reads: Vec<Arc<Read>> = support_indices
            .iter()
            .map(|&i| Arc::clone(&self.assembly.support()[i].read))
            .collect();

        let junction = self.assembly.junction().clone();
        match build_from_junction_reads(junction, &reads, false, *self.assembly.config()) {
            Ok(assembly) => Some(assembly),
            Err(e) => {
                warn!(
                    junction = %self.assembly.junction(),
                    error = %e,
                    "failed to build split sequence"
                );
                None
            }
        }
    }

    fn find_other_sequences(&self, long_mismatch_reads: &BTreeSet<usize>) -> Vec<MismatchGroup> {
        let config = self.assembly.config();

        if long_mismatch_reads.len() <= config.min_read_support {
            return Vec::new();
        }

        // qualifying mismatches per read, in assembly index order
        let mut read_mismatches: BTreeMap<usize, Vec<Mismatch>> = BTreeMap::new();

        for (index, base_mismatches) in self.assembly.mismatches().iter() {
            for base_mismatch in base_mismatches.iter() {
                if base_mismatch.read_count() < config.min_read_support
                    || base_mismatch.qual_total < config.min_mismatch_total_qual
                {
                    continue;
                }

                let mismatch = Mismatch {
                    index,
                    base: base_mismatch.base,
                };

                for support_index in &base_mismatch.support_indices {
                    if long_mismatch_reads.contains(support_index) {
                        read_mismatches.entry(*support_index).or_default().push(mismatch);
                    }
                }
            }
        }

        let mut sorted: Vec<(usize, Vec<Mismatch>)> = read_mismatches.into_iter().collect();
        sorted.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let mut groups: Vec<MismatchGroup> = Vec::new();
        let mut matched = vec![false; sorted.len()];

        for i in 0..sorted.len() {
            if matched[i] {
                continue;
            }
            matched[i] = true;

            let (support_index, mismatches) = &sorted[i];
            let mut group = MismatchGroup {
                support_indices: vec![*support_index],
                mismatches: mismatches.clone(),
            };

            for j in (i + 1)..sorted.len() {
                if !matched[j] && sorted[j].1 == group.mismatches {
                    matched[j] = true;
                    group.support_indices.push(sorted[j].0);
                }
            }

            groups.push(group);
        }

        groups
    }
}

/// Drop every assembly whose junction-side bases are contained in a longer
/// one, moving its reads into the containing assembly.
pub fn dedup_by_assembly_contains_another(assemblies: &mut Vec<JunctionAssembly>) {
    assemblies.sort_by(|a, b| b.base_length().cmp(&a.base_length()));

    let mut i = 0;
    while i < assemblies.len() {
        let mut j = i + 1;
        while j < assemblies.len() {
            if assembly_contains_another(&assemblies[i], &assemblies[j]) {
                let second = assemblies.remove(j);
                assemblies[i].check_add_read_support(&second);
                continue;
            }
            j += 1;
        }
        i += 1;
    }
}

fn assembly_contains_another(first: &JunctionAssembly, second: &JunctionAssembly) -> bool {
    let threshold = first.config().low_base_qual_threshold;

    let range = if first.junction().is_forward() {
        first.junction_index()..first.base_length()
    } else {
        0..first.junction_index() + 1
    };

    let offset = second.junction_index() as isize - first.junction_index() as isize;

    for i in range {
        let second_index = i as isize + offset;
        if second_index < 0 {
            continue;
        }
        let Some(&second_slot) = second.slots().get(second_index as usize) else {
            break;
        };

        if !slots_match(first.slots()[i], second_slot, threshold) {
            return false;
        }
    }

    true
}
