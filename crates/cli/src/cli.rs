//! Command line definition for `sb`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use seedbox_core::{FilterError, TorrentQuery};

#[derive(Parser, Debug)]
#[command(
    name = "sb",
    version,
    about = "Bulk torrent operations across several qBittorrent instances"
)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/sb/config.toml)
    #[arg(long, global = true, env = "SB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for reports and listings"
    )]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List torrents on one or more clients
    Ls(ListArgs),
    /// Add .torrent files to one or more clients
    Add(AddArgs),
    /// Copy torrents missing on the destinations from a source client
    Cp(CopyArgs),
    /// Start matching torrents
    Start(ActionArgs),
    /// Recheck matching torrents
    Recheck(ActionArgs),
    /// List configured clients
    Clients,
}

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Client names, comma separated; may be repeated
    #[arg(short = 'c', long = "clients", required = true)]
    pub clients: Vec<String>,
}

impl ClientArgs {
    pub fn joined(&self) -> String {
        self.clients.join(",")
    }
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Status filter (all, downloading, seeding, completed, stopped, ...)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Category filter; "" selects uncategorized torrents
    #[arg(long)]
    pub category: Option<String>,
}

impl FilterArgs {
    pub fn query(&self) -> Result<TorrentQuery, FilterError> {
        TorrentQuery::from_args(self.status.as_deref(), self.category.as_deref())
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub clients: ClientArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// .torrent files or directories containing them
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    #[command(flatten)]
    pub clients: ClientArgs,
    /// Delete each file once it is on every client
    #[arg(long)]
    pub delete_after: bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Source client
    pub from: String,
    /// Destination clients, comma separated
    pub to: String,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ActionArgs {
    #[command(flatten)]
    pub clients: ClientArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbox_core::{CategoryFilter, StatusFilter};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sb").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_repeated_clients_are_joined() {
        let cli = parse(&["start", "-c", "aClient", "-c", "bClient,cClient"]);
        match cli.command {
            Command::Start(args) => assert_eq!(args.clients.joined(), "aClient,bClient,cClient"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["ls", "-c", "a", "-vv", "--output", "json"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_add_flags() {
        let cli = parse(&["add", "one.torrent", "dir", "-c", "a", "--delete-after", "--dry-run"]);
        match cli.command {
            Command::Add(args) => {
                assert_eq!(args.paths, vec![PathBuf::from("one.torrent"), PathBuf::from("dir")]);
                assert!(args.delete_after);
                assert!(args.dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cp_positional_and_filters() {
        let cli = parse(&["cp", "a", "b,c", "--status", "completed", "--category", "movies/"]);
        match cli.command {
            Command::Cp(args) => {
                assert_eq!(args.from, "a");
                assert_eq!(args.to, "b,c");
                let query = args.filter.query().unwrap();
                assert_eq!(query.status, StatusFilter::Completed);
                assert_eq!(query.category, CategoryFilter::Path("movies".to_string()));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_empty_category_means_uncategorized() {
        let cli = parse(&["ls", "-c", "a", "--category", ""]);
        match cli.command {
            Command::Ls(args) => {
                assert_eq!(args.filter.query().unwrap().category, CategoryFilter::Uncategorized)
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_is_rejected_at_query_time() {
        let cli = parse(&["recheck", "-c", "a", "--status", "sleeping"]);
        match cli.command {
            Command::Recheck(args) => assert!(args.filter.query().is_err()),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_clients_required() {
        assert!(Cli::try_parse_from(["sb", "start"]).is_err());
        assert!(Cli::try_parse_from(["sb", "add", "x.torrent"]).is_err());
    }
}
