use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use cachescope::advisor::CacheSizeAdvisor;
use cachescope::cache::GenericSimulator;
use cachescope::config::SimConfig;
use cachescope::io::read_bytes;
use cachescope::trace::{self, TraceFormat};
use cachescope::{generators, reuse, validate, working_set};

#[derive(Parser, Debug)]
#[command(about = "Trace-driven cache modelling and sizing toolkit")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a trace through the configured cache and report hit/miss totals
    Simulate(SimulateArgs),
    /// Run the reuse-distance, working-set, and sizing engines over a trace
    Analyze(AnalyzeArgs),
    /// Compare an externally produced results log against a reference run
    Validate(ValidateArgs),
    /// Generate a synthetic trace file
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    config: PathBuf,
    trace: PathBuf,

    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Fail on malformed trace lines instead of skipping them
    #[arg(short, long)]
    strict: bool,

    /// Also print the access-by-access log
    #[arg(short, long)]
    records: bool,
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    trace: PathBuf,

    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    #[arg(short, long)]
    strict: bool,

    #[arg(long, default_value_t = 64)]
    block_size: u64,

    /// Sliding-window length for working-set sizes; omitted = skipped
    #[arg(short, long)]
    window: Option<usize>,

    /// Target hit rate for the size recommendation; omitted = skipped
    #[arg(short, long)]
    target_hit_rate: Option<f64>,

    #[arg(long, default_value_t = 4096)]
    max_size: u64,

    /// Emit the miss-rate curve up to this many blocks
    #[arg(short, long)]
    curve: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct ValidateArgs {
    config: PathBuf,
    trace: PathBuf,
    /// Results log produced by the implementation under test
    actual: PathBuf,

    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    #[arg(short, long)]
    strict: bool,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(value_enum)]
    mode: Mode,
    output: PathBuf,

    #[arg(short, long, value_enum, default_value = "csv")]
    format: Format,

    #[arg(short, long, default_value_t = 1000)]
    count: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 0.7)]
    read_ratio: f64,

    /// Sequential: first address
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Sequential: byte offset between consecutive addresses
    #[arg(long, default_value_t = 64)]
    stride: u64,

    /// Uniform and locality: upper bound of the address range
    #[arg(long, default_value_t = 1 << 20)]
    span: u64,

    /// Locality: size of the hot region at the bottom of the range
    #[arg(long, default_value_t = 1 << 12)]
    hot_span: u64,

    /// Locality: probability of an access landing in the hot region
    #[arg(long, default_value_t = 0.8)]
    hot_ratio: f64,

    /// Zipf: number of distinct blocks
    #[arg(long, default_value_t = 1024)]
    blocks: u64,

    /// Zipf: skew exponent
    #[arg(long, default_value_t = 1.2)]
    exponent: f64,

    #[arg(long, default_value_t = 64)]
    block_size: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Csv,
    Binary,
}

impl From<Format> for TraceFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Text => TraceFormat::Text,
            Format::Csv => TraceFormat::Csv,
            Format::Binary => TraceFormat::Binary,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    Sequential,
    Uniform,
    Locality,
    Zipf,
}

#[derive(Serialize)]
struct AnalyzeReport {
    accesses: usize,
    distinct_blocks: usize,
    first_references: u64,
    working_set: Option<Vec<usize>>,
    recommended_blocks: Option<u64>,
    miss_rate_curve: Option<Vec<(u64, f64)>>,
}

fn load_config(path: &PathBuf) -> Result<SimConfig, String> {
    let file = File::open(path)
        .map_err(|e| format!("Couldn't open the config file at path {}: {e}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("Couldn't parse the config file: {e}"))
}

fn build_simulator(config: &SimConfig) -> Result<GenericSimulator, String> {
    let geometry = config.geometry().map_err(|e| e.to_string())?;
    GenericSimulator::build(geometry, config.policy, config.random_seed).map_err(|e| e.to_string())
}

fn load_addresses(path: &PathBuf, format: Format, strict: bool) -> Result<Vec<u64>, String> {
    let bytes = read_bytes(path)
        .map_err(|e| format!("Couldn't read the trace file at path {}: {e}", path.display()))?;
    let entries = trace::read_entries(&bytes, format.into(), strict)
        .map_err(|e| format!("Couldn't parse the trace file: {e}"))?;
    Ok(trace::addresses(&entries))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Couldn't serialise the output: {e}"))
}

fn simulate(args: &SimulateArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let mut simulator = build_simulator(&config)?;
    let addresses = load_addresses(&args.trace, args.format, args.strict)?;
    if args.records {
        let log = validate::capture(&mut simulator, &addresses);
        print!("{}", validate::render_results_log(&log));
    } else {
        for &address in &addresses {
            simulator.access(address);
        }
    }
    println!("{}", to_json(&simulator.result())?);
    Ok(())
}

fn analyze(args: &AnalyzeArgs) -> Result<(), String> {
    let addresses = load_addresses(&args.trace, args.format, args.strict)?;
    let distances = reuse::compute(&addresses, args.block_size).map_err(|e| e.to_string())?;
    let working_set_sizes = args
        .window
        .map(|w| working_set::sliding_distinct_counts(&addresses, w, args.block_size))
        .transpose()
        .map_err(|e| e.to_string())?;
    let recommended_blocks = args.target_hit_rate.map(|target| {
        CacheSizeAdvisor::from_distances(distances.clone())
            .minimal_size_for_hit_rate(target, args.max_size)
    });
    let report = AnalyzeReport {
        accesses: addresses.len(),
        distinct_blocks: working_set::distinct_blocks(&addresses, args.block_size)
            .map_err(|e| e.to_string())?,
        first_references: distances.iter().filter(|d| d.is_first_reference()).count() as u64,
        working_set: working_set_sizes,
        recommended_blocks,
        miss_rate_curve: args
            .curve
            .map(|max| reuse::predict_miss_rate_curve(&distances, max)),
    };
    println!("{}", to_json(&report)?);
    Ok(())
}

fn run_validation(args: &ValidateArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let mut simulator = build_simulator(&config)?;
    let addresses = load_addresses(&args.trace, args.format, args.strict)?;
    let expected = validate::capture(&mut simulator, &addresses);

    let log = std::fs::read_to_string(&args.actual).map_err(|e| {
        format!(
            "Couldn't read the results log at path {}: {e}",
            args.actual.display()
        )
    })?;
    let parsed = validate::parse_results_log(&log);

    let report = validate::compare(&expected, &parsed.records);
    print!("{}", validate::render_report(&expected, &parsed.records, &report));
    if report.passed {
        Ok(())
    } else {
        Err(format!(
            "validation failed with {} mismatches",
            report.mismatches.len()
        ))
    }
}

fn generate(args: &GenerateArgs) -> Result<(), String> {
    let entries = match args.mode {
        Mode::Sequential => {
            generators::sequential(args.start, args.stride, args.count, args.read_ratio, args.seed)
        }
        Mode::Uniform => generators::uniform(args.span, args.count, args.read_ratio, args.seed),
        Mode::Locality => generators::locality(
            args.hot_span,
            args.span,
            args.hot_ratio,
            args.count,
            args.read_ratio,
            args.seed,
        ),
        Mode::Zipf => generators::zipf(
            args.blocks,
            args.exponent,
            args.block_size,
            args.count,
            args.read_ratio,
            args.seed,
        ),
    }
    .map_err(|e| e.to_string())?;

    let file = File::create(&args.output).map_err(|e| {
        format!(
            "Couldn't create the output file at path {}: {e}",
            args.output.display()
        )
    })?;
    let mut writer = BufWriter::new(file);
    trace::write_entries(&mut writer, &entries, args.format.into())
        .map_err(|e| format!("Couldn't write the trace: {e}"))?;
    println!("Wrote {} accesses to {}", entries.len(), args.output.display());
    Ok(())
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    match &args.command {
        Command::Simulate(args) => simulate(args),
        Command::Analyze(args) => analyze(args),
        Command::Validate(args) => run_validation(args),
        Command::Generate(args) => generate(args),
    }
}
