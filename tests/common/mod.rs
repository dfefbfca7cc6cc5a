#![allow(dead_code)]

use std::sync::Arc;

use junction_assembler::{parse_cigar, Junction, Orientation, Read};

/// Reference 101-110 then the soft-clipped junction sequence of the main allele.
pub const CLEAN_BASES: &[u8] = b"AAAAACCCCCGTTGCAAC";
/// Same reference anchor, alternate allele differing at three clipped bases.
pub const ALT_BASES: &[u8] = b"AAAAACCCCCGACGCTAC";

pub fn forward_junction() -> Junction {
    Junction::new("chr1", 110, Orientation::Forward)
}

pub fn read_at(name: &str, start: i32, cigar: &str, bases: &[u8], qual: u8) -> Arc<Read> {
    let read = Read::new(
        name,
        "chr1",
        start,
        parse_cigar(cigar).expect("valid cigar"),
        bases.to_vec(),
        vec![qual; bases.len()],
    )
    .expect("valid read");
    Arc::new(read)
}

pub fn junction_read(name: &str, bases: &[u8], qual: u8) -> Arc<Read> {
    read_at(name, 101, "10M8S", bases, qual)
}

/// Six clean reads and four alternate-allele reads, interleaved.
pub fn two_allele_reads() -> Vec<Arc<Read>> {
    let mut reads = Vec::new();
    for i in 0..6 {
        reads.push(junction_read(&format!("clean{}", i), CLEAN_BASES, 37));
        if i < 4 {
            reads.push(junction_read(&format!("alt{}", i), ALT_BASES, 30));
        }
    }
    reads
}

pub fn support_names(assembly: &junction_assembler::JunctionAssembly) -> Vec<String> {
    assembly.support().iter().map(|s| s.read.name().to_string()).collect()
}
