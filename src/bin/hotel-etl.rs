//! Command line entry point of the hotel reviews ETL job.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::Serialized;
use hotel_reviews_etl::config::{EtlConfig, load_config};
use hotel_reviews_etl::etl::{read_source, run_job};
use hotel_reviews_etl::records::TABLES;
use hotel_reviews_etl::telemetry;
use hotel_reviews_etl::warehouse::{Recovery, Warehouse, recover};
use std::path::PathBuf;

/// Load a hotel reviews CSV into a star schema warehouse
#[derive(Parser, Debug)]
#[command(name = "hotel-etl", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./hotel-etl.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors and skip the printed report
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build all four tables and replace them in the warehouse
    Run(RunArgs),
    /// Print the inferred source schema and the target table layouts
    Schema {
        /// Source CSV path
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Repair a warehouse left behind by an interrupted run
    Recover(WarehouseArgs),
}

#[derive(Args, Debug, Default)]
struct WarehouseArgs {
    /// Warehouse root directory
    #[arg(long)]
    warehouse: Option<PathBuf>,

    /// Warehouse schema (database) name
    #[arg(long)]
    schema: Option<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Source CSV path
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[command(flatten)]
    target: WarehouseArgs,

    /// Table file format
    #[arg(long, value_parser = ["parquet", "csv", "jsonl"])]
    format: Option<String>,

    /// Execution mode
    #[arg(long, value_parser = ["sequential", "parallel"])]
    mode: Option<String>,

    /// Worker threads in parallel mode
    #[arg(long)]
    threads: Option<usize>,

    /// Surrogate key strategy
    #[arg(long, value_parser = ["sequence", "content-hash"])]
    keys: Option<String>,

    /// Save the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Create the warehouse schema if it does not exist
    #[arg(long)]
    create_schema: bool,
}

fn warehouse_overrides(mut f: Figment, args: &WarehouseArgs) -> Figment {
    if let Some(root) = &args.warehouse {
        f = f.merge(Serialized::default("warehouse.root", root));
    }
    if let Some(schema) = &args.schema {
        f = f.merge(Serialized::default("warehouse.schema", schema));
    }
    f
}

fn run_overrides(args: &RunArgs) -> Figment {
    let mut f = warehouse_overrides(Figment::new(), &args.target);
    if let Some(input) = &args.input {
        f = f.merge(Serialized::default("source.path", input));
    }
    if let Some(format) = &args.format {
        f = f.merge(Serialized::default("warehouse.format", format));
    }
    if let Some(mode) = &args.mode {
        f = f.merge(Serialized::default("execution.mode", mode));
    }
    if let Some(threads) = args.threads {
        f = f.merge(Serialized::default("execution.threads", threads));
    }
    if let Some(keys) = &args.keys {
        f = f.merge(Serialized::default("keys.strategy", keys));
    }
    if let Some(report) = &args.report {
        f = f.merge(Serialized::default("report_path", report));
    }
    if args.create_schema {
        f = f.merge(Serialized::default("warehouse.create_schema", true));
    }
    f
}

fn load(cli: &Cli, overrides: Figment) -> Result<EtlConfig> {
    load_config(cli.config.as_deref(), Some(overrides)).map_err(|e| anyhow::anyhow!("{e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.quiet, cli.json_logs);

    match &cli.command {
        Command::Run(args) => {
            let config = load(&cli, run_overrides(args))?;
            let metrics = run_job(config)?;
            if !cli.quiet {
                metrics.print();
            }
        }
        Command::Schema { input } => {
            let mut f = Figment::new();
            if let Some(input) = input {
                f = f.merge(Serialized::default("source.path", input));
            }
            let config = load(&cli, f)?;
            let source = read_source(&config.source)?;
            println!("{}", source.path.display());
            print!("{}", source.schema);
            for table in TABLES {
                println!("\n{}", table.name);
                for (name, ty) in table.columns {
                    println!(" |-- {name}: {ty}");
                }
            }
        }
        Command::Recover(args) => {
            let config = load(&cli, warehouse_overrides(Figment::new(), args))?;
            let warehouse = Warehouse::open(&config.warehouse)?;
            match recover(&warehouse)? {
                Recovery::Clean { removed_staging } => {
                    println!("warehouse is consistent ({removed_staging} abandoned staging dir(s) removed)");
                }
                Recovery::RolledBack { run_id } => {
                    println!("rolled back interrupted commit of run {run_id}");
                }
                Recovery::Finished { run_id } => {
                    println!("finished cleanup of committed run {run_id}");
                }
            }
        }
    }
    Ok(())
}
