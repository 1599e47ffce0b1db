use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "twig",
    about = "twig: content-addressed trees with transactional commits",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository directory
    #[arg(long, global = true, default_value = ".twig")]
    pub repo: PathBuf,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init(InitArgs),
    /// Edit a tree and commit the result in one session
    Apply(ApplyArgs),
    /// Print the content of a blob
    Cat(CatArgs),
    /// List the entries of a tree
    Ls(LsArgs),
    /// Show commit history
    Log(LogArgs),
    /// List refs
    ShowRef(ShowRefArgs),
    /// Generate a signing key
    Keygen(KeygenArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Branch HEAD points to
    #[arg(long, default_value = "main")]
    pub branch: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Ref to commit to
    #[arg(long = "ref", default_value = "HEAD")]
    pub ref_name: String,
    /// Store a file's content at a path (PATH=FILE)
    #[arg(long = "set", value_name = "PATH=FILE")]
    pub set: Vec<String>,
    /// Store literal text at a path (PATH=TEXT)
    #[arg(long = "data", value_name = "PATH=TEXT")]
    pub data: Vec<String>,
    /// Delete a path
    #[arg(long = "delete", value_name = "PATH")]
    pub delete: Vec<String>,
    /// Remove empty trees before committing
    #[arg(long)]
    pub prune: bool,
    #[arg(short, long)]
    pub message: String,
    /// Author as 'Name <email>'
    #[arg(long)]
    pub author: Option<String>,
    /// Committer as 'Name <email>'
    #[arg(long)]
    pub committer: Option<String>,
    /// Sign with the default key
    #[arg(long)]
    pub sign: bool,
    /// Sign with the named key
    #[arg(long, value_name = "KEY_ID")]
    pub key: Option<String>,
}

#[derive(Args)]
pub struct CatArgs {
    pub path: String,
    /// Commit, tree, branch or tag to read from
    #[arg(long, default_value = "HEAD")]
    pub tree: String,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(default_value = "")]
    pub path: String,
    #[arg(long, default_value = "HEAD")]
    pub tree: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(default_value = "HEAD")]
    pub rev: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowRefArgs {
    /// Only refs starting with this prefix
    #[arg(default_value = "")]
    pub prefix: String,
}

#[derive(Args)]
pub struct KeygenArgs {
    pub id: String,
    /// Make this the key used by `commit.sign`
    #[arg(long)]
    pub default: bool,
}
