//! CLI tool for creating and bulk-loading VIN staging tables.

mod error;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use snafu::ResultExt;
use vin_staging_core::{
    CreateMode, IdentifierRule, JsonFileFormat, LoadReport, LoadRequest, OnErrorPolicy,
    StageLocation, StagingTable, TableLocation,
    identifier::{DEFAULT_VIN_OFFSET, VIN_LENGTH},
    schema::{DEFAULT_TABLE_NAME, staging_table_meta},
};

use crate::error::{
    CliResult, CreateTableSnafu, InvalidPatternSnafu, LoadSnafu, OpenTableSnafu, RenderSnafu,
    ScanSnafu, StorageSnafu,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnErrorArg {
    SkipFile,
    Continue,
    AbortStatement,
}

impl From<OnErrorArg> for OnErrorPolicy {
    fn from(v: OnErrorArg) -> Self {
        match v {
            OnErrorArg::SkipFile => OnErrorPolicy::SkipFile,
            OnErrorArg::Continue => OnErrorPolicy::Continue,
            OnErrorArg::AbortStatement => OnErrorPolicy::AbortStatement,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a staging table with columns (vin CHAR(17), raw_json VARIANT)
    Create {
        #[arg(long, env = "VINSTAGE_TABLE")]
        table: PathBuf,

        /// Logical table name recorded in the log
        #[arg(long, default_value = DEFAULT_TABLE_NAME)]
        name: String,

        /// Leave an existing table untouched instead of failing
        #[arg(long, default_value_t = false, conflicts_with = "replace")]
        if_not_exists: bool,

        /// Drop all rows of an existing table and start over
        #[arg(long, default_value_t = false)]
        replace: bool,
    },

    /// Load every JSON file under a stage prefix, keyed by the VIN in its path
    Load {
        #[arg(long, env = "VINSTAGE_TABLE")]
        table: PathBuf,

        /// Stage root directory
        #[arg(long)]
        stage: PathBuf,

        /// Path prefix under the stage root, e.g. s3/nhtsa/json_pl/
        #[arg(long, default_value = "")]
        prefix: String,

        /// 0-based character offset of the VIN in the stage path
        #[arg(long, default_value_t = DEFAULT_VIN_OFFSET, conflicts_with = "after_prefix")]
        offset: usize,

        /// Take the VIN right after this path prefix instead of at a fixed offset
        #[arg(long)]
        after_prefix: Option<String>,

        #[arg(long, value_enum, default_value_t = OnErrorArg::SkipFile)]
        on_error: OnErrorArg,

        /// Load each element of a top-level JSON array as its own row
        #[arg(long, default_value_t = false)]
        strip_outer_array: bool,

        /// Accept several concatenated or newline-delimited documents per file
        #[arg(long, default_value_t = false)]
        multiple_documents: bool,

        /// Only load stage paths matching this regular expression
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Print staged records as JSON Lines
    Scan {
        #[arg(long, env = "VINSTAGE_TABLE")]
        table: PathBuf,

        /// Only records with this exact VIN
        #[arg(long)]
        vin: Option<String>,

        #[arg(long)]
        max_rows: Option<usize>,
    },

    /// Show table name, schema, version and row counts
    Info {
        #[arg(long, env = "VINSTAGE_TABLE")]
        table: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(name = "vinstage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

struct LoadArgs {
    table: PathBuf,
    stage: PathBuf,
    prefix: String,
    offset: usize,
    after_prefix: Option<String>,
    on_error: OnErrorArg,
    strip_outer_array: bool,
    multiple_documents: bool,
    pattern: Option<String>,
}

fn table_location(table: &Path) -> CliResult<TableLocation> {
    let spec = table.to_string_lossy();
    TableLocation::parse(spec.as_ref()).context(StorageSnafu {
        path: spec.to_string(),
    })
}

async fn open_table(table: &Path) -> CliResult<StagingTable> {
    StagingTable::open(table_location(table)?)
        .await
        .context(OpenTableSnafu {
            table: table.display().to_string(),
        })
}

async fn cmd_create(
    table: &Path,
    name: String,
    if_not_exists: bool,
    replace: bool,
) -> CliResult<()> {
    let mode = if replace {
        CreateMode::Replace
    } else if if_not_exists {
        CreateMode::IfNotExists
    } else {
        CreateMode::ErrorIfExists
    };

    let t = StagingTable::create(table_location(table)?, staging_table_meta(name), mode)
        .await
        .context(CreateTableSnafu {
            table: table.display().to_string(),
        })?;

    println!(
        "Table {} {} ready at {} (version {})",
        t.meta().name,
        t.meta().schema,
        table.display(),
        t.version()
    );
    Ok(())
}

fn print_load_report(report: &LoadReport) {
    println!(
        "Loaded {} row(s) from {} file(s); skipped {} file(s)",
        report.rows_loaded,
        report.files_loaded + report.files_partially_loaded,
        report.files_skipped
    );
    for failure in &report.failures {
        if failure.rows_kept > 0 {
            eprintln!(
                "  partial {} ({} row(s) kept): {}",
                failure.path, failure.rows_kept, failure.reason
            );
        } else {
            eprintln!("  skipped {}: {}", failure.path, failure.reason);
        }
    }
    match report.version {
        Some(v) => println!("Committed version {v}"),
        None => println!("Nothing to commit"),
    }
}

async fn cmd_load(args: LoadArgs) -> CliResult<()> {
    let stage_spec = args.stage.to_string_lossy();
    let stage = StageLocation::parse(stage_spec.as_ref()).context(StorageSnafu {
        path: stage_spec.to_string(),
    })?;

    let identifier = match args.after_prefix {
        Some(prefix) => IdentifierRule::vin_after_prefix(prefix),
        None => IdentifierRule::FixedOffset {
            start: args.offset,
            length: VIN_LENGTH,
        },
    };

    let format = JsonFileFormat {
        strip_outer_array: args.strip_outer_array,
        multiple_documents: args.multiple_documents,
        ..JsonFileFormat::default()
    };

    let mut request = LoadRequest::new(stage, args.prefix)
        .with_identifier(identifier)
        .with_format(format)
        .with_on_error(args.on_error.into());

    if let Some(pattern) = args.pattern {
        let re = Regex::new(&pattern).context(InvalidPatternSnafu {
            pattern: pattern.clone(),
        })?;
        request = request.with_pattern(re);
    }

    let mut t = open_table(&args.table).await?;
    let report = t.load(&request).await.context(LoadSnafu {
        table: args.table.display().to_string(),
    })?;

    print_load_report(&report);
    Ok(())
}

async fn cmd_scan(table: &Path, vin: Option<String>, max_rows: Option<usize>) -> CliResult<()> {
    let t = open_table(table).await?;
    let records = match vin {
        Some(v) => t.scan_vin(&v).await,
        None => t.scan().await,
    }
    .context(ScanSnafu {
        table: table.display().to_string(),
    })?;

    for record in records.iter().take(max_rows.unwrap_or(usize::MAX)) {
        println!("{}", serde_json::to_string(record).context(RenderSnafu)?);
    }
    Ok(())
}

async fn cmd_info(table: &Path) -> CliResult<()> {
    let t = open_table(table).await?;
    let meta = t.meta();

    println!("name: {}", meta.name);
    println!("location: {}", t.location().as_ref().display());
    println!("schema: {}", meta.schema);
    println!("created_at: {}", meta.created_at.to_rfc3339());
    println!("version: {}", t.version());
    println!("segments: {}", t.state().segments.len());
    println!("rows: {}", t.row_count());
    Ok(())
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Create {
            table,
            name,
            if_not_exists,
            replace,
        } => cmd_create(&table, name, if_not_exists, replace).await,

        Command::Load {
            table,
            stage,
            prefix,
            offset,
            after_prefix,
            on_error,
            strip_outer_array,
            multiple_documents,
            pattern,
        } => {
            cmd_load(LoadArgs {
                table,
                stage,
                prefix,
                offset,
                after_prefix,
                on_error,
                strip_outer_array,
                multiple_documents,
                pattern,
            })
            .await
        }

        Command::Scan {
            table,
            vin,
            max_rows,
        } => cmd_scan(&table, vin, max_rows).await,

        Command::Info { table } => cmd_info(&table).await,
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
