use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suppress non-error messages
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download artifacts listed in a manifest
    Fetch(FetchArgs),
    /// Upload files to the store
    Put(PutArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Manifest file
    #[arg(short = 'c', long = "configuration", value_name = "FILE")]
    pub config: PathBuf,

    /// Store files in directory
    #[arg(short = 'd', long = "destination", value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,

    /// Verify hash on downloaded files (default)
    #[arg(long, overrides_with = "no_verify")]
    pub verify: bool,

    /// Do not verify hash on downloaded files
    #[arg(long = "no-verify", overrides_with = "verify")]
    pub no_verify: bool,

    /// Download files even if they are present with the expected hash
    #[arg(short, long, overrides_with = "no_force")]
    pub force: bool,

    /// Skip files already present with the expected hash (default)
    #[arg(long = "no-force", overrides_with = "force")]
    pub no_force: bool,

    /// Access server with this username
    #[arg(short, long)]
    pub user: Option<String>,

    /// Download only files whose manifest key matches this regular expression
    #[arg(short = 'm', long = "match", value_name = "REGEXP")]
    pub pattern: Option<String>,

    /// Identity file for SSH
    #[arg(short = 'i', long)]
    pub identity: Option<PathBuf>,

    /// Fetch only this manifest key
    #[arg(value_name = "FILE")]
    pub file: Option<String>,
}

impl FetchArgs {
    pub fn verify(&self) -> bool {
        !self.no_verify
    }

    pub fn force(&self) -> bool {
        self.force && !self.no_force
    }
}

#[derive(Args, Debug, Clone)]
pub struct PutArgs {
    /// Manifest file
    #[arg(short = 'c', long = "configuration", value_name = "FILE")]
    pub config: PathBuf,

    /// Append uploaded files to the manifest
    #[arg(short, long, default_value_t = false)]
    pub append: bool,

    /// Identity file for SSH
    #[arg(short = 'i', long)]
    pub identity: Option<PathBuf>,

    /// Files to upload
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,
}
