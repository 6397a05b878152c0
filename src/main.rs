use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use reqtrace_vcs::logger;
use reqtrace_vcs::ArtifactVcs;

#[derive(Parser)]
#[command(name = "reqtrace-vcs")]
#[command(about = "Version control for requirements-traceability project artifacts", long_about = None)]
#[command(version)]
struct Cli {
    /// Project working directory
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Use the permission-scoped sandboxed storage backend
    #[arg(long)]
    sandbox: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize (or repair) the project repository
    Init,

    /// Show working-tree status
    Status,

    /// Commit a single file
    Commit {
        /// Repository-relative path to commit
        path: String,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Revert a file to its committed state
    Revert {
        /// Repository-relative path to revert
        path: String,
    },

    /// Show commit history
    Log {
        /// Restrict to commits touching this path
        path: Option<String>,

        /// Maximum number of commits (0 = unlimited)
        #[arg(short, long, default_value_t = 20)]
        depth: usize,
    },

    /// Print a file's content at a commit
    Show { hash: String, path: String },

    /// Reconstruct the whole project at a commit (JSON)
    Snapshot { hash: String },

    /// Manage baselines (annotated tags)
    Baseline {
        #[command(subcommand)]
        command: BaselineCommands,
    },

    /// Manage remotes
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },

    /// Manage the stored authentication token
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Fetch from a remote
    Fetch {
        #[arg(default_value = "origin")]
        remote: String,
    },

    /// Push the current branch to a remote
    Push {
        #[arg(default_value = "origin")]
        remote: String,
    },

    /// Pull from a remote (fast-forward or conflict report)
    Pull {
        #[arg(default_value = "origin")]
        remote: String,
    },

    /// Compare local history against a remote branch
    SyncStatus {
        #[arg(default_value = "origin")]
        remote: String,

        /// Branch to compare (defaults to the current branch)
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Reconcile ID counters with a remote
    Counters {
        #[command(subcommand)]
        command: CounterCommands,
    },
}

#[derive(Subcommand)]
enum BaselineCommands {
    /// Create a baseline at the current head
    Create {
        name: String,

        #[arg(short, long)]
        message: String,
    },

    /// List baselines with commit, message, and timestamp
    List,
}

#[derive(Subcommand)]
enum RemoteCommands {
    Add { name: String, url: String },
    Remove { name: String },
    List,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Store a token for remote operations
    Set { token: String },
    /// Remove the stored token
    Clear,
}

#[derive(Subcommand)]
enum CounterCommands {
    /// Adopt higher remote counter values
    Pull {
        #[arg(default_value = "origin")]
        remote: String,
    },
    /// Commit and push local counter files
    Push {
        #[arg(default_value = "origin")]
        remote: String,
    },
}

fn main() -> Result<()> {
    logger::init_logger()?;

    let cli = Cli::parse();

    let vcs = if cli.sandbox {
        ArtifactVcs::with_sandbox_store(&cli.project)
    } else {
        ArtifactVcs::with_native_store(&cli.project)
    };
    vcs.init()?;

    match cli.command {
        Commands::Init => {
            println!("{} {}", "Initialized".green(), cli.project.display());
        }

        Commands::Status => {
            let entries = vcs.get_status()?;
            if entries.is_empty() {
                println!("{}", "Working tree clean".green());
            } else {
                for entry in entries {
                    let state = entry.state.to_string();
                    let colored_state = match entry.state {
                        reqtrace_vcs::engine::FileState::Deleted => state.red(),
                        reqtrace_vcs::engine::FileState::Modified => state.yellow(),
                        _ => state.green(),
                    };
                    println!("  {:10} {}", colored_state, entry.path);
                }
            }
        }

        Commands::Commit { path, message } => {
            let hash = vcs.commit_file(&path, &message, None)?;
            println!("{} {}", "Committed".green(), &hash[..8.min(hash.len())]);
        }

        Commands::Revert { path } => {
            vcs.revert_file(&path)?;
            println!("{} {path}", "Reverted".green());
        }

        Commands::Log { path, depth } => {
            let commits = vcs.get_history(path.as_deref(), depth, "HEAD")?;
            for commit in commits {
                let when = chrono::DateTime::from_timestamp_millis(commit.timestamp_ms)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(
                    "{} {} {} {}",
                    commit.hash[..8].yellow(),
                    when.cyan(),
                    commit.author_name,
                    commit.message.lines().next().unwrap_or("")
                );
            }
        }

        Commands::Show { hash, path } => match vcs.read_file_at_commit(&path, &hash)? {
            Some(content) => print!("{content}"),
            None => {
                eprintln!("{} '{path}' did not exist at {hash}", "Not found:".red());
                std::process::exit(1);
            }
        },

        Commands::Snapshot { hash } => {
            let snapshot = vcs.load_project_snapshot(&hash)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::Baseline { command } => match command {
            BaselineCommands::Create { name, message } => {
                vcs.create_tag(&name, &message)?;
                println!("{} baseline '{name}'", "Created".green());
            }
            BaselineCommands::List => {
                for baseline in vcs.get_tags_with_details()? {
                    let when = chrono::DateTime::from_timestamp_millis(baseline.timestamp_ms)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    println!(
                        "{} {} {} {}",
                        baseline.name.bold(),
                        baseline.commit_hash[..8].yellow(),
                        when.cyan(),
                        baseline.message
                    );
                }
            }
        },

        Commands::Remote { command } => match command {
            RemoteCommands::Add { name, url } => {
                vcs.add_remote(&name, &url)?;
                println!("{} remote '{name}'", "Added".green());
            }
            RemoteCommands::Remove { name } => {
                vcs.remove_remote(&name)?;
                println!("{} remote '{name}'", "Removed".green());
            }
            RemoteCommands::List => {
                for remote in vcs.get_remotes()? {
                    println!("{}\t{}", remote.name.bold(), remote.url);
                }
            }
        },

        Commands::Token { command } => match command {
            TokenCommands::Set { token } => {
                vcs.set_auth_token(&token)?;
                println!("{}", "Token stored".green());
            }
            TokenCommands::Clear => {
                vcs.clear_auth_token()?;
                println!("{}", "Token cleared".green());
            }
        },

        Commands::Fetch { remote } => {
            vcs.fetch(&remote)?;
            println!("{} from '{remote}'", "Fetched".green());
        }

        Commands::Push { remote } => {
            let branch = vcs.get_current_branch()?;
            vcs.push(&remote, &branch)?;
            println!("{} '{branch}' to '{remote}'", "Pushed".green());
        }

        Commands::Pull { remote } => {
            let branch = vcs.get_current_branch()?;
            let outcome = vcs.pull(&remote, &branch)?;
            if outcome.success {
                println!("{}", "Pulled (up to date or fast-forward)".green());
            } else {
                println!("{}", "Pull requires manual merge:".red());
                for path in outcome.conflicts {
                    println!("  {path}");
                }
                std::process::exit(1);
            }
        }

        Commands::SyncStatus { remote, branch } => {
            let status = vcs.get_sync_status(&remote, branch.as_deref())?;
            if status.diverged {
                println!("{}", "Diverged from remote".red());
            } else if status.ahead {
                println!(
                    "{} by {} commit(s)",
                    "Ahead".yellow(),
                    status.ahead_commits.len()
                );
            } else if status.behind {
                println!(
                    "{} by {} commit(s)",
                    "Behind".yellow(),
                    status.behind_commits.len()
                );
            } else {
                println!("{}", "In sync".green());
            }
            for commit in &status.ahead_commits {
                println!("  {} {}", "local".yellow(), commit.message.lines().next().unwrap_or(""));
            }
            for commit in &status.behind_commits {
                println!("  {} {}", "remote".cyan(), commit.message.lines().next().unwrap_or(""));
            }
        }

        Commands::Counters { command } => match command {
            CounterCommands::Pull { remote } => {
                let raised = vcs.pull_counters(&remote)?;
                println!("{} {raised} counter(s)", "Raised".green());
            }
            CounterCommands::Push { remote } => {
                if vcs.push_counters(&remote, None)? {
                    println!("{}", "Counters committed and pushed".green());
                } else {
                    println!("Nothing to push");
                }
            }
        },
    }

    Ok(())
}
