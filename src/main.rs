use std::path::{Path, PathBuf};
use std::process::ExitCode;

use beancount_import::config::ImporterConfig;
use beancount_import::error::Result;
use beancount_import::ledger::HeaderComment;
use beancount_import::Importer;
use clap::{Parser, Subcommand};

/// bank export import programm for beancount ledgers
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ImporterArgs {
    /// path to the configuration file, defaults to $BEANCOUNT_IMPORT_CONFIG or ~/.config/beancount-import/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// show which importer recognizes each file and where it would be filed
    Identify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// print the transactions of every recognized file in beancount syntax
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = ImporterArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: ImporterArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ImporterConfig::load_from(path)?,
        None => ImporterConfig::load()?,
    };
    let importers = config.build_importers()?;

    match &args.command {
        Command::Identify { files } => identify(&importers, files),
        Command::Extract { files } => extract(&importers, files),
    }
}

fn find_importer<'a>(importers: &'a [Box<dyn Importer>], file: &Path) -> Option<&'a dyn Importer> {
    let importer = importers
        .iter()
        .find(|importer| importer.recognize(file))
        .map(|importer| importer.as_ref());
    if importer.is_none() {
        eprintln!("{}: not recognized by any importer", file.display());
    }
    importer
}

fn identify(importers: &[Box<dyn Importer>], files: &[PathBuf]) -> Result<()> {
    for file in files {
        if let Some(importer) = find_importer(importers, file) {
            let date = importer
                .date(file)?
                .map(|date| date.to_string())
                .unwrap_or_else(|| "-".to_owned());
            println!(
                "{}\t{}\t{}\t{}\t{}",
                file.display(),
                importer.name(),
                importer.account(),
                date,
                importer.filename(file)?
            );
        }
    }
    Ok(())
}

fn extract(importers: &[Box<dyn Importer>], files: &[PathBuf]) -> Result<()> {
    for file in files {
        if let Some(importer) = find_importer(importers, file) {
            let transactions = importer.extract(file)?;
            let title = format!("{} import of {}", importer.name(), file.display());
            println!("{}\n", HeaderComment::new(&title));
            for transaction in &transactions {
                println!("{}\n", transaction);
            }
        }
    }
    Ok(())
}
