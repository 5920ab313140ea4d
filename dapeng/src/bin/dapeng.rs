use clap::{Parser, Subcommand};
use dapeng::args::{BuildArgs, ClassifyArgs, InspectArgs};
use dapeng::build::{lca_map, taxdepth_map};
use dapeng::classify::{process_dataset, Classifier};
use dapeng::options::IndexOptions;
use dapeng::table::KmerTable;
use dapeng::taxonomy::Taxonomy;
use dapeng::utils::{find_library_files, format_bytes, read_id_to_taxon_map};
use std::fs::{create_dir_all, File};
use std::io::{self, BufWriter, Error, ErrorKind, Result, Write};
use std::time::Instant;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Build(BuildArgs),
    Classify(ClassifyArgs),
    Inspect(InspectArgs),
}

fn build(args: BuildArgs) -> Result<()> {
    let id_to_taxon_map = read_id_to_taxon_map(&args.id_to_taxon_map_filename)?;
    let taxonomy = Taxonomy::from_nodes_dmp(&args.nodes_filename)?;
    let files = find_library_files(&args.source);
    if files.is_empty() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("No reference files under {:?}", args.source),
        ));
    }
    eprintln!(
        "Building from {} reference files with {} threads",
        files.len(),
        args.threads
    );

    let encoder = args.as_encoder()?;
    create_dir_all(&args.database)?;
    let table_filename = args.database.join("database.kdb");

    let table_size = if args.tax_depth {
        let table = taxdepth_map(
            &files,
            &taxonomy,
            &id_to_taxon_map,
            &encoder,
            args.threads,
            args.capacity,
        )?;
        table.write_to_disk(&table_filename)?;
        table.size()
    } else {
        let table = lca_map(
            &files,
            &taxonomy,
            &id_to_taxon_map,
            &encoder,
            args.threads,
            args.capacity,
        )?;
        table.write_to_disk(&table_filename)?;
        table.size()
    };

    let options = IndexOptions::from_encoder(&encoder, args.tax_depth);
    options.write_to_file(args.database.join("options.json"))?;
    eprintln!("Stored {} kmers in {:?}", table_size, table_filename);
    Ok(())
}

fn classify(args: ClassifyArgs) -> Result<()> {
    let options = IndexOptions::read_from_file(args.database.join("options.json"))?;
    let encoder = options.as_encoder()?;
    let table_filename = args.database.join("database.kdb");
    let table = if options.tax_depth {
        KmerTable::<u64>::from_file(&table_filename)?.strip_depths()
    } else {
        KmerTable::<u32>::from_file(&table_filename)?
    };
    let taxonomy = Taxonomy::from_nodes_dmp(&args.nodes_filename)?;

    let classifier = Classifier::new(table, taxonomy, encoder, args.output_flags());
    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    process_dataset(
        &classifier,
        &args.input_files,
        output.as_mut(),
        args.threads,
        args.chunk_size,
        args.per_set,
    )?;

    eprintln!(
        "{} sequences classified, {} unclassified",
        classifier.n_classified(),
        classifier.n_unclassified()
    );
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let options = IndexOptions::read_from_file(args.database.join("options.json"))?;
    let table_filename = args.database.join("database.kdb");
    let (capacity, size, load_factor, value_bytes) = if options.tax_depth {
        let table = KmerTable::<u64>::from_file(&table_filename)?;
        (table.capacity(), table.size(), table.load_factor(), 8)
    } else {
        let table = KmerTable::<u32>::from_file(&table_filename)?;
        (table.capacity(), table.size(), table.load_factor(), 4)
    };

    println!("k: {}", options.k);
    println!("window: {}", options.w);
    println!("scheme: {}", options.scheme);
    println!("capacity: {}", capacity);
    println!("size: {}", size);
    println!("occupancy: {:.4}", size as f64 / capacity as f64);
    println!("configured load factor: {}", load_factor);
    println!(
        "table bytes: {}",
        format_bytes((capacity * (8 + value_bytes)) as f64)
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = Instant::now();
    match args.cmd {
        Commands::Build(cmd_args) => build(cmd_args)?,
        Commands::Classify(cmd_args) => classify(cmd_args)?,
        Commands::Inspect(cmd_args) => inspect(cmd_args)?,
    }
    let duration = start.elapsed();
    eprintln!("Time elapsed: {:?}", duration);
    Ok(())
}
