use artsync::config::{Cli, Command, FetchArgs, PutArgs};
use artsync::engine::{FetchOptions, SyncEngine};
use artsync::manifest::Manifest;
use artsync::upload::upload_files;
use clap::Parser;
use regex::Regex;
use std::io::IsTerminal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // stdout carries the digest lines of `put`
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let result = match &cli.command {
        Command::Fetch(args) => run_fetch(args, !cli.quiet && std::io::stderr().is_terminal()),
        Command::Put(args) => run_put(args),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn run_fetch(args: &FetchArgs, progress: bool) -> anyhow::Result<()> {
    let manifest = Manifest::load(&args.config)?;
    let pattern = args.pattern.as_deref().map(Regex::new).transpose()?;

    let mut engine = SyncEngine::open(&manifest, args.user.as_deref(), args.identity.clone())?;
    let options = FetchOptions {
        file: args.file.clone(),
        dest: Some(args.dest.clone()),
        pattern,
        verify: args.verify(),
        force: args.force(),
        progress,
    };
    let report = engine.fetch(&manifest, &options)?;
    engine.close()?;

    info!("{} fetched, {} up to date", report.fetched.len(), report.skipped.len());
    Ok(())
}

fn run_put(args: &PutArgs) -> anyhow::Result<()> {
    let mut manifest = Manifest::load(&args.config)?;
    if args.files.is_empty() {
        info!("No files to upload.");
        return Ok(());
    }

    let mut engine = SyncEngine::open(&manifest, None, args.identity.clone())?;
    let stdout = std::io::stdout();
    let uploaded = upload_files(
        &mut engine,
        &mut manifest,
        &args.config,
        &args.files,
        args.append,
        &mut stdout.lock(),
    )?;
    engine.close()?;

    info!("Uploaded {} files.", uploaded.len());
    Ok(())
}
