use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use passbook_core::ParsedStatement;
use passbook_ingest::{StatementParser, source_for};
use passbook_ledger::{DocumentReport, Importer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod report;
mod state;

use config::Config;
use state::PendingImport;

#[derive(Parser, Debug)]
#[command(name = "passbook", version, about = "Bank statement parser and ledger reconciler")]
struct Cli {
    /// Config file (default: ~/.passbook/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for passbook crates when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and parse one statement; print transactions and rejections
    Parse {
        file: PathBuf,

        /// Document password (PDF only)
        #[arg(long, env = "PASSBOOK_PDF_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Layout preset, overriding the config file
        #[arg(long)]
        layout: Option<String>,

        #[arg(long, default_value = "statement")]
        account: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Parse statements and post new transactions to the ledger
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Ledger account the statements belong to
        #[arg(long)]
        account: String,

        /// Reconcile and report, but post nothing
        #[arg(long)]
        dry_run: bool,

        #[arg(long, env = "PASSBOOK_PDF_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long)]
        layout: Option<String>,

        /// Documents processed at once
        #[arg(long, default_value_t = 2)]
        jobs: usize,

        /// Statement period; dates after its end are rejected
        #[arg(long, requires = "period_end")]
        period_start: Option<NaiveDate>,

        #[arg(long, requires = "period_start")]
        period_end: Option<NaiveDate>,

        #[arg(long, env = "PASSBOOK_LEDGER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Re-run the posting phase for a preserved document
    Retry {
        /// A file under ~/.passbook/pending/
        pending: PathBuf,

        #[arg(long)]
        dry_run: bool,

        #[arg(long, env = "PASSBOOK_LEDGER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default ~/.passbook/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.log_level);

    if let Command::Config { command } = &cli.command {
        match command {
            ConfigCommand::Init => config::init_config(cli.config.as_deref())?,
        }
        return Ok(());
    }

    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Parse {
            file,
            password,
            layout,
            account,
            json,
        } => {
            let parser = StatementParser::new(cfg.parser_config(layout.as_deref(), None)?)
                .context("compile parser config")?;
            let statement = parse_document(&file, password.as_deref(), &account, &parser)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&statement)?);
            } else {
                report::print_statement(
                    &file.display().to_string(),
                    &statement,
                    parser.config().tolerance,
                );
            }
        }

        Command::Import {
            files,
            account,
            dry_run,
            password,
            layout,
            jobs,
            period_start,
            period_end,
            api_key,
            json,
        } => {
            let period = period_start.zip(period_end);
            let parser = StatementParser::new(cfg.parser_config(layout.as_deref(), period)?)
                .context("compile parser config")?;
            let importer = Importer::with_sink(
                cfg.ledger_sink(api_key.as_deref())?,
                cfg.import_options(parser.config().tolerance),
            );
            let job = ImportJob {
                account,
                password,
                dry_run,
                parser: Arc::new(parser),
                importer,
            };
            import_all(job, files, jobs, json).await?;
        }

        Command::Retry {
            pending,
            dry_run,
            api_key,
        } => {
            retry(&cfg, &pending, dry_run, api_key.as_deref()).await?;
        }

        Command::Config { .. } => {}
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--log-level` applies to the passbook crates only.
fn init_logger(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,passbook={level},passbook_core={level},passbook_ingest={level},passbook_ledger={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_document(
    file: &Path,
    password: Option<&str>,
    account: &str,
    parser: &StatementParser,
) -> Result<ParsedStatement> {
    if !file.exists() {
        bail!("statement not found: {}", file.display());
    }
    let pages = source_for(file)
        .extract_pages(file, password)
        .with_context(|| format!("extracting {}", file.display()))?;
    Ok(parser.parse(account, &pages))
}

/// What every document of one `import` run shares.
#[derive(Clone)]
struct ImportJob {
    account: String,
    password: Option<String>,
    dry_run: bool,
    parser: Arc<StatementParser>,
    importer: Importer,
}

impl ImportJob {
    async fn run(self, file: PathBuf) -> Result<DocumentReport> {
        let document = file.display().to_string();

        let statement = {
            let (parser, account, password) =
                (self.parser.clone(), self.account.clone(), self.password.clone());
            tokio::task::spawn_blocking(move || {
                parse_document(&file, password.as_deref(), &account, &parser)
            })
            .await
            .context("parse task failed")??
        };

        match self
            .importer
            .import(&document, &self.account, &statement, self.dry_run)
            .await
        {
            Ok(report) => Ok(report),
            Err(e) => {
                let pending = PendingImport {
                    document: document.clone(),
                    account: self.account.clone(),
                    statement: e.preserved().clone(),
                };
                let path = state::write_pending(&state::pending_dir()?, &pending)?;
                Err(anyhow::Error::new(e)
                    .context(format!("preserved for `passbook retry {}`", path.display())))
            }
        }
    }
}

/// Documents run independently: a failure is reported and the rest carry on.
async fn import_all(job: ImportJob, files: Vec<PathBuf>, jobs: usize, json: bool) -> Result<()> {
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut set = JoinSet::new();

    for (idx, file) in files.into_iter().enumerate() {
        let (job, permits) = (job.clone(), permits.clone());
        set.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => job.run(file.clone()).await,
                Err(e) => Err(e.into()),
            };
            (idx, file, outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        outcomes.push(joined.context("import task failed")?);
    }
    outcomes.sort_by_key(|(idx, _, _)| *idx);

    let mut reports = Vec::new();
    let mut failed = 0;
    for (_, file, outcome) in outcomes {
        match outcome {
            Ok(r) => {
                info!(
                    document = %r.document,
                    inserted = r.inserted,
                    duplicates = r.duplicates,
                    rejected = r.rejected,
                    "document done"
                );
                if !json {
                    report::print_report(&r);
                }
                reports.push(r);
            }
            Err(e) => {
                failed += 1;
                error!(document = %file.display(), "{e:#}");
                if !json {
                    println!("{}: FAILED: {e:#}", file.display());
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        report::print_totals(&reports, failed);
    }

    if failed > 0 {
        bail!("{failed} document(s) failed");
    }
    Ok(())
}

async fn retry(cfg: &Config, pending: &Path, dry_run: bool, api_key: Option<&str>) -> Result<()> {
    let saved = state::read_pending(pending)?;
    let tolerance = cfg.parser_config(None, None)?.tolerance;
    let importer = Importer::with_sink(cfg.ledger_sink(api_key)?, cfg.import_options(tolerance));

    let report = importer
        .import(&saved.document, &saved.account, &saved.statement, dry_run)
        .await
        .with_context(|| format!("retrying {}", saved.document))?;
    report::print_report(&report);

    if !dry_run {
        state::remove_pending(pending)?;
        info!(pending = %pending.display(), "pending import posted");
    }
    Ok(())
}
