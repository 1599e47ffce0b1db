use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, FixedOffset};
use colored::Colorize;
use twig_crypto::SigningKey;
use twig_refs::{Ref, RefStore, HEADS_PREFIX};
use twig_store::{Object, ObjectStore, SignatureStatus};
use twig_tree::{
    CommitOptions, IdentityConfig, SessionState, TreeError, TreeRead, TreeReader, TreeWriter,
};
use twig_types::{ObjectId, Timestamp};

use crate::cli::*;
use crate::repo::Repo;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let root = cli.repo.as_path();
    match cli.command {
        Command::Init(args) => cmd_init(root, args),
        Command::Apply(args) => cmd_apply(root, args).map(|_| ()),
        Command::Cat(args) => cmd_cat(root, args),
        Command::Ls(args) => cmd_ls(root, args),
        Command::Log(args) => cmd_log(root, args),
        Command::ShowRef(args) => cmd_show_ref(root, args),
        Command::Keygen(args) => cmd_keygen(root, args),
    }
}

fn cmd_init(root: &Path, args: InitArgs) -> anyhow::Result<()> {
    let user = IdentityConfig {
        name: args.name,
        email: args.email,
    };
    Repo::init(root, &args.branch, user)?;
    println!(
        "{} Initialized empty twig repository in {}",
        "✓".green().bold(),
        root.display().to_string().bold()
    );
    println!("  HEAD -> {}", format!("{HEADS_PREFIX}{}", args.branch).yellow());
    Ok(())
}

/// Split `PATH=VALUE`.
fn split_assignment(assignment: &str) -> anyhow::Result<(&str, &str)> {
    match assignment.split_once('=') {
        Some((path, value)) if !path.is_empty() => Ok((path, value)),
        _ => bail!("expected PATH=VALUE, got {assignment:?}"),
    }
}

/// Apply every edit in one session, then commit. Sets run first, then
/// literal data, then deletes.
fn cmd_apply(root: &Path, args: ApplyArgs) -> anyhow::Result<ObjectId> {
    let repo = Repo::open(root)?;
    let mut writer = TreeWriter::open(repo.objects.clone(), repo.refs.clone(), &args.ref_name)?
        .with_identity_source(Arc::new(repo.config.clone()));
    if args.sign || args.key.is_some() || repo.config.commit.sign {
        writer = writer.with_signer(Arc::new(repo.keyring()?));
    }

    for assignment in &args.set {
        let (path, file) = split_assignment(assignment)?;
        let data = fs::read(file).with_context(|| format!("reading {file}"))?;
        writer.set_data(path, data, None)?;
    }
    for assignment in &args.data {
        let (path, text) = split_assignment(assignment)?;
        writer.set_data(path, text.as_bytes().to_vec(), None)?;
    }
    for path in &args.delete {
        writer.remove(path)?;
    }
    if args.prune {
        let pruned = writer.prune_empty_trees()?;
        if pruned > 0 {
            println!("  pruned {} empty tree(s)", pruned.to_string().bold());
        }
    }
    if writer.state() != SessionState::Dirty {
        bail!("nothing to commit");
    }

    let mut options = CommitOptions::new(args.message.clone());
    if let Some(author) = args.author {
        options = options.with_author(author);
    }
    if let Some(committer) = args.committer {
        options = options.with_committer(committer);
    }
    if let Some(key) = args.key {
        options = options.with_signing_key(key);
    } else if args.sign {
        options = options.with_sign(true);
    }

    let target = repo.refs.resolve_target(&args.ref_name)?;
    let id = match writer.commit(&options) {
        Ok(id) => id,
        Err(TreeError::CommitConflict { ref_name }) => {
            bail!("{ref_name} moved while the edits were applied; re-run to apply them on the new head")
        }
        Err(e) => return Err(e.into()),
    };
    let branch = target.strip_prefix(HEADS_PREFIX).unwrap_or(&target);
    println!(
        "[{} {}] {}",
        branch.green(),
        id.short_hex().yellow(),
        options.subject()
    );
    Ok(id)
}

fn cmd_cat(root: &Path, args: CatArgs) -> anyhow::Result<()> {
    let repo = Repo::open(root)?;
    let reader = TreeReader::open(repo.objects.clone(), repo.refs.clone(), &args.tree)?;
    match reader.get(&args.path)? {
        Object::Blob(blob) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&blob.data)?;
            stdout.flush()?;
            Ok(())
        }
        other => bail!("{} is a {}, not a blob", args.path, other.kind()),
    }
}

fn cmd_ls(root: &Path, args: LsArgs) -> anyhow::Result<()> {
    let repo = Repo::open(root)?;
    let reader = TreeReader::open(repo.objects.clone(), repo.refs.clone(), &args.tree)?;
    let Object::Tree(tree) = reader.get(&args.path)? else {
        bail!("{} is not a tree", args.path);
    };
    for entry in tree.entries() {
        let (kind, name) = if entry.mode.is_tree() {
            ("tree", format!("{}/", entry.name).blue().bold())
        } else {
            ("blob", entry.name.normal())
        };
        println!(
            "{} {} {}  {}",
            entry.mode,
            kind,
            entry.object_id.short_hex().dimmed(),
            name
        );
    }
    Ok(())
}

/// Render a commit timestamp in its recorded timezone.
fn format_time(ts: &Timestamp) -> String {
    let offset = FixedOffset::east_opt(ts.offset_minutes * 60);
    match (DateTime::from_timestamp(ts.seconds, 0), offset) {
        (Some(utc), Some(offset)) => utc
            .with_timezone(&offset)
            .format("%a %b %e %H:%M:%S %Y %z")
            .to_string(),
        _ => ts.to_string(),
    }
}

fn cmd_log(root: &Path, args: LogArgs) -> anyhow::Result<()> {
    let repo = Repo::open(root)?;
    let mut next = Some(repo.resolve_commit(&args.rev)?);
    let mut shown = 0;
    while let Some(id) = next {
        if shown == args.limit {
            break;
        }
        let Object::Commit(commit) = repo.objects.load(&id)? else {
            bail!("{id} is not a commit");
        };
        if args.oneline {
            println!("{} {}", id.short_hex().yellow(), commit.summary());
        } else {
            println!("{} {}", "commit".yellow(), id.to_hex().yellow());
            match commit.verify_signature()? {
                SignatureStatus::Valid => {
                    let key = commit
                        .signature
                        .as_ref()
                        .and_then(|s| s.key_id.clone())
                        .unwrap_or_else(|| "default".into());
                    println!("{} ({key})", "Good signature".green());
                }
                SignatureStatus::Invalid => println!("{}", "BAD signature".red().bold()),
                SignatureStatus::Unsigned => {}
            }
            println!("Author: {}", commit.author);
            println!("Date:   {}", format_time(&commit.author_time));
            if commit.committer != commit.author {
                println!("Commit: {}", commit.committer);
            }
            println!();
            for line in commit.message.lines() {
                println!("    {line}");
            }
            println!();
        }
        shown += 1;
        next = commit.parents.first().copied();
    }
    Ok(())
}

fn cmd_show_ref(root: &Path, args: ShowRefArgs) -> anyhow::Result<()> {
    let repo = Repo::open(root)?;
    for (name, target) in repo.refs.list_refs(&args.prefix)? {
        match target {
            Ref::Direct(id) => println!("{} {}", id.to_hex().yellow(), name),
            Ref::Symbolic(to) => println!("{} {}", format!("ref: {to}").cyan(), name),
        }
    }
    Ok(())
}

fn cmd_keygen(root: &Path, args: KeygenArgs) -> anyhow::Result<()> {
    let mut repo = Repo::open(root)?;
    let key = SigningKey::generate();
    let path = repo.save_key(&args.id, &key)?;
    if args.default {
        repo.set_default_key(&args.id)?;
    }
    println!(
        "{} Generated key {} at {}",
        "✓".green().bold(),
        args.id.bold(),
        path.display()
    );
    println!("  public key: {}", key.verifying_key().to_hex().cyan());
    Ok(())
}
