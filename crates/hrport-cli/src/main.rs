//! hrport CLI
//!
//! Fill HR report templates from form values, append tracker rows, and read the tracker log
//! back for charting.

mod config;
mod input;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use hrport::{ExportOptions, Manifest, ReportSession, TemplateStore};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::ReportConfig;

#[derive(Parser)]
#[command(name = "hrport")]
#[command(author, version, about = "Fill HR report templates from form values", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML file with defaults for template, manifest and output directory
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ReportArgs {
    /// Bundled report id or path to a manifest YAML file
    #[arg(short, long)]
    report: Option<String>,

    /// xlsx template the report is written into
    #[arg(short, long, env = "HRPORT_TEMPLATE")]
    template: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct SubmitArgs {
    #[command(flatten)]
    report: ReportArgs,

    /// JSON object mapping field ids to values
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Field value as id=value; may be repeated and overrides --input
    #[arg(long = "set", value_name = "ID=VALUE")]
    sets: Vec<String>,

    /// Directory the exported workbook is written to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Report date (YYYY-MM-DD) used in the file name; also pins workbook timestamps
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write form values into the template's fixed cells and export the workbook
    Export(SubmitArgs),

    /// Append one row to the tracker log and export the workbook
    Append {
        #[command(flatten)]
        submit: SubmitArgs,

        /// Also write the updated log back into the template
        #[arg(long)]
        persist: bool,
    },

    /// Print the tracker log rows as JSON
    Trend(ReportArgs),

    /// Validate a report manifest
    Lint {
        #[arg(value_name = "MANIFEST")]
        file: PathBuf,
    },

    /// List the sections and fields of a report as JSON
    Fields(ReportArgs),

    /// Print the JSON schema of the manifest format
    Schema,

    /// List the bundled report ids
    Reports,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "hrport=info",
        1 => "hrport=debug",
        _ => "hrport=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };

    match cli.command {
        Commands::Export(submit) => {
            let session = open_session(&config, &submit.report)?
                .with_options(export_options(submit.date));
            let raw = input::raw_inputs(submit.input.as_deref(), &submit.sets)?;
            let artifact = session.export(&raw, report_date(submit.date))?;
            let path = artifact.write_to(out_dir(&config, &submit))?;
            println!("{}", path.display());
        }
        Commands::Append { submit, persist } => {
            let session = open_session(&config, &submit.report)?
                .with_options(export_options(submit.date));
            let raw = input::raw_inputs(submit.input.as_deref(), &submit.sets)?;
            let persist = persist || config.persist_log.unwrap_or(false);
            let date = report_date(submit.date);
            let appended = if persist {
                session.append_and_persist(&raw, date)?
            } else {
                session.append(&raw, date)?
            };
            let path = appended.artifact.write_to(out_dir(&config, &submit))?;
            println!("row {}: {}", appended.row, path.display());
        }
        Commands::Trend(args) => {
            let session = open_session(&config, &args)?;
            let rows = session.trend()?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Lint { file } => lint(&file)?,
        Commands::Fields(args) => {
            let manifest = resolve_manifest(&config, &args)?;
            println!("{}", serde_json::to_string_pretty(&manifest.sections)?);
        }
        Commands::Schema => println!("{}", hrport_spec::generate_schema_json_pretty()),
        Commands::Reports => {
            for id in hrport_spec::BUNDLED_REPORTS {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn lint(file: &Path) -> Result<()> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let manifest = Manifest::from_yaml_str(&text)
        .with_context(|| format!("parsing {}", file.display()))?;
    match manifest.validate() {
        Ok(()) => {
            println!("{}: ok", file.display());
            Ok(())
        }
        Err(err) => {
            for issue in err.issues() {
                eprintln!("{}: {issue}", file.display());
            }
            bail!("{} issue(s) in {}", err.issues().len(), file.display())
        }
    }
}

fn resolve_manifest(config: &ReportConfig, args: &ReportArgs) -> Result<Manifest> {
    let Some(report) = args.report.as_deref().or(config.manifest.as_deref()) else {
        bail!("no report given: pass --report <id|path> or set `manifest` in the config");
    };
    let manifest = match hrport_spec::bundled(report) {
        Some(parsed) => parsed.with_context(|| format!("bundled report `{report}`"))?,
        None => {
            let text = std::fs::read_to_string(report)
                .with_context(|| format!("`{report}` is neither a bundled report nor a readable file"))?;
            Manifest::from_yaml_str(&text).with_context(|| format!("parsing {report}"))?
        }
    };
    Ok(manifest)
}

fn open_session(config: &ReportConfig, args: &ReportArgs) -> Result<ReportSession> {
    let manifest = resolve_manifest(config, args)?;
    let Some(template) = args.template.clone().or_else(|| config.template.clone()) else {
        bail!("no template given: pass --template, set HRPORT_TEMPLATE or `template` in the config");
    };
    let store = if config.cache_templates.unwrap_or(true) {
        TemplateStore::new()
    } else {
        TemplateStore::uncached()
    };
    ReportSession::open(Arc::new(store), &template, manifest)
        .with_context(|| format!("binding report to {}", template.display()))
}

fn export_options(date: Option<NaiveDate>) -> ExportOptions {
    ExportOptions {
        fixed_timestamp: date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt)),
    }
}

fn report_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

fn out_dir(config: &ReportConfig, submit: &SubmitArgs) -> PathBuf {
    submit
        .out_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}
