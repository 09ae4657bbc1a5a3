//! slotdb CLI
//!
//! Command-line driver for a local slotdb database.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slotdb::{Config, Engine, Record, Result, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// slotdb CLI
#[derive(Parser, Debug)]
#[command(name = "slotdb-cli")]
#[command(about = "CLI for the slotdb record store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./slotdb_data")]
    data_dir: PathBuf,

    /// Database name (file prefix)
    #[arg(short, long, default_value = "students")]
    name: String,

    /// Only fsync on close instead of after every write
    #[arg(long)]
    lazy_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a new record
    Add {
        id: i32,
        name: String,
        gpa: f64,
        year: i32,
    },

    /// Get a record by id
    Get { id: i32 },

    /// Find records by field (name, gpa, year)
    Find { field: String, value: String },

    /// Replace the record with the same id
    Update {
        id: i32,
        name: String,
        gpa: f64,
        year: i32,
    },

    /// Delete a record by id
    Delete { id: i32 },

    /// Delete every record matching a field value
    DeleteBy { field: String, value: String },

    /// List every live record
    List,

    /// Snapshot the database under a name
    Backup { snapshot: String },

    /// Replace the database with a snapshot
    Restore { snapshot: String },

    /// List completed snapshots
    Snapshots,

    /// Delete every record
    Clear,

    /// Rebuild every index from the data file
    Rebuild,

    /// Show record and slot counts
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,slotdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .name(&args.name)
        .sync_strategy(if args.lazy_sync {
            SyncStrategy::OnClose
        } else {
            SyncStrategy::EveryWrite
        })
        .build();

    let mut engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&mut engine, args.command).and_then(|()| engine.close());
    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(engine: &mut Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Add { id, name, gpa, year } => {
            let offset = engine.add(&Record::new(id, &name, gpa, year))?;
            println!("Added id {} at offset {}", id, offset);
        }
        Commands::Get { id } => println!("{}", engine.find_by_id(id)?),
        Commands::Find { field, value } => {
            print_records(&engine.find_by_attribute(&field, &value)?);
        }
        Commands::Update { id, name, gpa, year } => {
            engine.update(&Record::new(id, &name, gpa, year))?;
            println!("Updated id {}", id);
        }
        Commands::Delete { id } => println!("Deleted {}", engine.delete_by_id(id)?),
        Commands::DeleteBy { field, value } => {
            let count = engine.delete_by_attribute(&field, &value)?;
            println!("Deleted {} records", count);
        }
        Commands::List => print_records(&engine.get_all()?),
        Commands::Backup { snapshot } => {
            let manifest = engine.backup(&snapshot)?;
            println!("Backed up {} files to {:?}", manifest.files.len(), snapshot);
        }
        Commands::Restore { snapshot } => {
            engine.restore(&snapshot)?;
            println!("Restored {} records from {:?}", engine.len(), snapshot);
        }
        Commands::Snapshots => {
            for name in engine.snapshots()? {
                println!("{}", name);
            }
        }
        Commands::Clear => {
            engine.clear()?;
            println!("Cleared");
        }
        Commands::Rebuild => println!("Indexed {} records", engine.rebuild_indexes()?),
        Commands::Stats => {
            let stats = engine.stats();
            println!("live records: {}", stats.live_records);
            println!("total slots:  {}", stats.total_slots);
            println!("orphan slots: {}", stats.orphan_slots);
            println!("data bytes:   {}", stats.data_bytes);
        }
    }
    Ok(())
}

fn print_records(records: &[Record]) {
    for record in records {
        println!("{}", record);
    }
    println!("({} records)", records.len());
}
