mod prompt;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use loaner_kernel::config::{AppConfig, RemoteConfig, DEFAULT_SHEET_NAME};
use loaner_kernel::form::{FormController, READY_MESSAGE};
use loaner_kernel::record::LoanRecord;
use loaner_kernel::session::{run_form_session, run_prompt_loop, SessionOptions};
use loaner_kernel::store::{LoanStore, LocalTableStore, RemoteSheetStore};
use loaner_kernel::validate::RawEntry;

use crate::prompt::EditorPrompter;

/// Library device checkout recorder
#[derive(Parser, Debug)]
#[command(name = "loaner")]
#[command(about = "Record device checkouts to a local table or a remote sheet", long_about = None)]
struct Cli {
    /// Path to config JSON
    #[arg(long, env = "LOANER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the local loan table
    #[arg(long, env = "LOANER_TABLE")]
    table: Option<PathBuf>,

    /// Append to the remote sheet instead of the local table
    #[arg(long)]
    remote: bool,

    /// Service credential file for the remote sheet
    #[arg(long, env = "LOANER_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Remote sheet name
    #[arg(long, env = "LOANER_SHEET")]
    sheet: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive checkout form (default)
    Form {
        /// Prefill the date with today's date
        #[arg(long)]
        today: bool,
    },

    /// Plain prompt loop writing to the local table
    Prompt,

    /// Record a single checkout
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        barcode: String,
        #[arg(long)]
        date: String,
    },
}

/// Wrapper for JSON output of `add`
#[derive(Debug, Serialize)]
struct AddOutput {
    status: String,
    record: Option<LoanRecord>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    // ----------------------------
    // Load config
    // ----------------------------
    let base = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default_config(),
    };
    let config = resolve_config(&cli, base);

    let surface = match cli.command.unwrap_or(Command::Form { today: false }) {
        // The fallback loop only ever writes the local table.
        Command::Prompt => return run_prompt(local_form(&config)),
        Command::Form { today } => Surface::Form(SessionOptions {
            prefill_today: today || config.prefill_today,
        }),
        Command::Add {
            first_name,
            last_name,
            barcode,
            date,
        } => Surface::Add(RawEntry::new(first_name, last_name, barcode, date)),
    };

    // ----------------------------
    // Pick backend
    // ----------------------------
    if cli.remote {
        let Some(remote) = config.remote.clone() else {
            anyhow::bail!("--remote needs a credential file (--credentials or config `remote`)");
        };
        let store = match RemoteSheetStore::connect(&remote.credentials_path, &remote.sheet_name) {
            Ok(store) => store,
            Err(err) => {
                error!(%err, "remote sheet unavailable");
                eprintln!("Connection Error: {err}");
                return Ok(ExitCode::FAILURE);
            }
        };
        dispatch(FormController::new(store), surface)
    } else {
        dispatch(local_form(&config), surface)
    }
}

/// Front end chosen for a store-backed run.
enum Surface {
    Form(SessionOptions),
    Add(RawEntry),
}

/// Apply flag and environment overrides on top of the file config.
fn resolve_config(cli: &Cli, mut config: AppConfig) -> AppConfig {
    if let Some(table) = &cli.table {
        config.table_path = table.clone();
    }
    if let Some(credentials_path) = &cli.credentials {
        let sheet_name = config
            .remote
            .take()
            .map(|r| r.sheet_name)
            .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
        config.remote = Some(RemoteConfig {
            credentials_path: credentials_path.clone(),
            sheet_name,
        });
    }
    if let Some(sheet) = &cli.sheet {
        match config.remote.as_mut() {
            Some(remote) => remote.sheet_name = sheet.clone(),
            None => warn!(sheet = %sheet, "--sheet ignored, no remote credentials configured"),
        }
    }
    config
}

fn local_form(config: &AppConfig) -> FormController<LocalTableStore> {
    let (store, notice) = LocalTableStore::open_or_recover(&config.table_path);
    let loaded = format!(
        "Loaded {} records from {}. {READY_MESSAGE}",
        store.rows().len(),
        store.location()
    );
    let form = FormController::new(store);
    match notice {
        Some(err) => form.with_notice(format!(
            "File Error: {err}. Starting with an empty dataset."
        )),
        None => form.with_notice(loaded),
    }
}

fn dispatch<S: LoanStore>(form: FormController<S>, surface: Surface) -> Result<ExitCode> {
    match surface {
        Surface::Form(options) => run_form(form, options),
        Surface::Add(entry) => run_add(form, entry),
    }
}

fn run_form<S: LoanStore>(mut form: FormController<S>, options: SessionOptions) -> Result<ExitCode> {
    let mut prompter = EditorPrompter::new()?;
    let report = run_form_session(&mut form, &mut prompter, &mut io::stdout(), options)?;
    eprintln!(
        "saved {} / rejected {} / failed {}",
        report.saved, report.rejected, report.failed
    );
    Ok(ExitCode::SUCCESS)
}

fn run_prompt<S: LoanStore>(mut form: FormController<S>) -> Result<ExitCode> {
    let mut prompter = EditorPrompter::new()?;
    println!("{}", form.status());
    run_prompt_loop(&mut form, &mut prompter, &mut io::stdout())?;
    Ok(ExitCode::SUCCESS)
}

fn run_add<S: LoanStore>(form: FormController<S>, entry: RawEntry) -> Result<ExitCode> {
    let output = submit_one(form, entry);
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if output.record.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn submit_one<S: LoanStore>(mut form: FormController<S>, entry: RawEntry) -> AddOutput {
    *form.inputs_mut() = entry;
    let record = form.submit().ok();
    AddOutput {
        status: form.status().to_string(),
        record,
    }
}
