use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use junction_assembler::{
    build_from_junction_reads, expand_reference_bases, parse_cigar, AssemblyConfig, Junction,
    JunctionAssembly, Orientation, Read, RefBaseAssembly, SupportType,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "junction-assembler",
    about = "Local consensus assembly of reads soft-clipped at a breakpoint"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble the reads supporting one junction.
    Assemble {
        /// Reads file (`<name>\t<chrom>\t<pos>\t<cigar>\t<bases>\t<quals>[\t<nm>]` per line,
        /// qualities as Phred+33).
        reads: PathBuf,
        /// Junction chromosome.
        #[arg(long, default_value = "chr1")]
        chrom: String,
        /// Junction position (1-based, last aligned base).
        #[arg(long)]
        position: i32,
        /// Side of the junction the soft-clipped bases lie on.
        #[arg(long, value_enum, default_value_t = OrientationArg::Forward)]
        orientation: OrientationArg,
        /// Bases below this quality match any base.
        #[arg(long, default_value_t = 26)]
        low_base_qual: u8,
        /// Reads required to emit a split sequence.
        #[arg(long, default_value_t = 2)]
        min_read_support: usize,
        /// Minimum summed quality of a mismatch used for splitting.
        #[arg(long, default_value_t = 60)]
        min_mismatch_qual: u32,
        /// Mismatches a read may carry and still support a sequence.
        #[arg(long, default_value_t = 2)]
        max_mismatches: usize,
        /// Split the assembly on recurring mismatches; mismatched reads
        /// shorter than this never define a sequence.
        #[arg(long)]
        split_min_length: Option<usize>,
        /// Extend each assembly into the reference up to this position.
        #[arg(long)]
        ref_extension: Option<i32>,
        /// Populated bases a read must overlap to join the reference extension.
        #[arg(long, default_value_t = 10)]
        ref_min_overlap: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrientationArg {
    Forward,
    Reverse,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Forward => Orientation::Forward,
            OrientationArg::Reverse => Orientation::Reverse,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Assemble {
            reads,
            chrom,
            position,
            orientation,
            low_base_qual,
            min_read_support,
            min_mismatch_qual,
            max_mismatches,
            split_min_length,
            ref_extension,
            ref_min_overlap,
        } => {
            let config = AssemblyConfig::default()
                .with_low_base_qual_threshold(low_base_qual)
                .with_min_read_support(min_read_support)
                .with_min_mismatch_total_qual(min_mismatch_qual)
                .with_max_base_mismatches(max_mismatches)
                .with_ref_side_min_overlap(ref_min_overlap);
            config.validate().context("invalid thresholds")?;

            let junction = Junction::new(chrom, position, orientation.into());
            run_assemble(&reads, junction, config, split_min_length, ref_extension)?;
        }
    }

    Ok(())
}

fn run_assemble(
    reads_path: &Path,
    junction: Junction,
    config: AssemblyConfig,
    split_min_length: Option<usize>,
    ref_extension: Option<i32>,
) -> Result<()> {
    let reads = read_reads_file(reads_path)
        .with_context(|| format!("failed to read reads from {}", reads_path.display()))?;

    // only reads clipped on the junction side seed the assembly
    let junction_reads: Vec<Arc<Read>> = reads
        .iter()
        .filter(|read| is_junction_read(read, &junction))
        .cloned()
        .collect();

    info!(
        junction = %junction,
        reads = reads.len(),
        junction_reads = junction_reads.len(),
        "assembling"
    );

    // keep mismatched reads when splitting so recurring patterns can be found
    let check_mismatches = split_min_length.is_none();
    let assembly = build_from_junction_reads(junction, &junction_reads, check_mismatches, config)
        .context("junction assembly failed")?;

    let assemblies = match split_min_length {
        Some(min_length) => assembly.split_on_mismatches(min_length),
        None => vec![assembly],
    };

    if assemblies.is_empty() {
        println!("No assembly had sufficient read support.");
        return Ok(());
    }

    for (i, mut sequence) in assemblies.into_iter().enumerate() {
        expand_reference_bases(&mut sequence);
        print_assembly(i + 1, &sequence);

        if let Some(extension) = ref_extension {
            let ref_assembly = extend_into_reference(&sequence, extension, &reads)?;
            println!("  ref\t{}\t{}", String::from_utf8_lossy(&ref_assembly.bases()), ref_assembly);
        }
    }

    Ok(())
}

fn is_junction_read(read: &Read, junction: &Junction) -> bool {
    if junction.is_forward() {
        read.is_right_clipped() && read.alignment_end() == junction.position
    } else {
        read.is_left_clipped() && read.alignment_start() == junction.position
    }
}

fn extend_into_reference(
    assembly: &JunctionAssembly,
    extension: i32,
    reads: &[Arc<Read>],
) -> Result<RefBaseAssembly> {
    let junction = assembly.junction();
    let valid = if junction.is_forward() {
        extension <= junction.position
    } else {
        extension >= junction.position
    };
    if !valid {
        anyhow::bail!(
            "reference extension {} lies on the clipped side of junction {}",
            extension,
            junction
        );
    }

    let config = assembly.config();
    let mut ref_assembly = RefBaseAssembly::new(assembly, extension);

    for read in reads {
        if assembly.has_read_support(read) {
            continue;
        }
        ref_assembly.check_add_read(
            Arc::clone(read),
            SupportType::Reference,
            config.max_base_mismatches,
            config.ref_side_min_overlap,
        );
    }

    Ok(ref_assembly)
}

fn print_assembly(index: usize, assembly: &JunctionAssembly) {
    println!("assembly {}\t{}\t{}", index, assembly.bases_string(), assembly);
    for support in assembly.support() {
        println!(
            "  read\t{}\tmismatches={}\trange={}-{}",
            support.read,
            support.total_mismatches(),
            support.read_index_range.start(),
            support.read_index_range.end()
        );
    }
}

fn read_reads_file(path: &Path) -> Result<Vec<Arc<Read>>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut reads = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 6 {
            anyhow::bail!(
                "expected at least 6 fields on line {}, found {}",
                line_no + 1,
                fields.len()
            );
        }

        let position: i32 = fields[2]
            .parse()
            .with_context(|| format!("invalid position '{}' on line {}", fields[2], line_no + 1))?;
        let cigar = parse_cigar(fields[3]).with_context(|| format!("line {}", line_no + 1))?;
        let bases = fields[4].to_ascii_uppercase().into_bytes();
        let quals = parse_quals(fields[5], bases.len())
            .with_context(|| format!("invalid qualities on line {}", line_no + 1))?;

        let mut read = Read::new(fields[0], fields[1], position, cigar, bases, quals)
            .with_context(|| format!("invalid read on line {}", line_no + 1))?;

        if let Some(nm) = fields.get(6) {
            let nm: u32 = nm
                .parse()
                .with_context(|| format!("invalid NM '{}' on line {}", nm, line_no + 1))?;
            read = read.with_num_events(nm);
        }

        reads.push(Arc::new(read));
    }

    Ok(reads)
}

fn parse_quals(field: &str, len: usize) -> Result<Vec<u8>> {
    if field == "*" {
        return Ok(vec![30; len]);
    }
    field
        .bytes()
        .map(|b| {
            b.checked_sub(33)
                .ok_or_else(|| anyhow::anyhow!("quality character {:?} below '!'", b as char))
        })
        .collect()
}
