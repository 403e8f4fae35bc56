use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "labscan", version, about = "SSL Labs TLS assessment client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors and hide progress
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assess one or more hosts and print the reports as JSON
    Analyze(AnalyzeArgs),
    /// Show the remote service's capacity and version
    Info(InfoArgs),
    /// Inspect or purge the local result cache
    Cache(CacheArgs),
}

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    /// Hosts to assess
    #[arg(required = true)]
    pub hosts: Vec<String>,

    /// Reattach to a running assessment instead of starting a new one
    #[arg(long, conflicts_with = "use_cache")]
    pub resume: bool,

    /// Publish results on the public SSL Labs board
    #[arg(long)]
    pub publish: bool,

    /// Proceed even when the certificate does not match the host
    #[arg(long)]
    pub ignore_mismatch: bool,

    /// Accept cached reports (local first, then remote)
    #[arg(long)]
    pub use_cache: bool,

    /// Maximum report age in hours for --use-cache
    #[arg(long)]
    pub max_age: Option<u64>,

    /// API base URL (skips discovery)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Seconds between polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Overall deadline per host in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Concurrent endpoint detail requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Do not write finished reports to the local cache
    #[arg(long)]
    pub no_store: bool,

    /// Local result cache database
    #[arg(long)]
    pub cache_path: Option<String>,
}

#[derive(Args, Clone)]
pub struct InfoArgs {
    /// API base URL (skips discovery)
    #[arg(long)]
    pub api_url: Option<String>,
}

#[derive(Args, Clone)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,

    /// Local result cache database
    #[arg(long, global = true)]
    pub cache_path: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum CacheAction {
    /// List cached reports
    List,
    /// Remove cached reports
    Clear {
        /// Only remove reports for this host
        #[arg(long)]
        host: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::try_parse_from([
            "labscan", "-vv", "analyze", "example.com", "example.org",
            "--use-cache", "--max-age", "2", "--concurrency", "8",
        ]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.hosts, vec!["example.com", "example.org"]);
                assert!(args.use_cache);
                assert_eq!(args.max_age, Some(2));
                assert_eq!(args.concurrency, Some(8));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_analyze_requires_host() {
        assert!(Cli::try_parse_from(["labscan", "analyze"]).is_err());
    }

    #[test]
    fn test_resume_conflicts_with_use_cache() {
        assert!(Cli::try_parse_from(["labscan", "analyze", "a.com", "--resume", "--use-cache"]).is_err());
    }

    #[test]
    fn test_cache_clear_host() {
        let cli = Cli::try_parse_from(["labscan", "--config", "c.yaml", "cache", "clear", "--host", "a.com"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("c.yaml"));
        match cli.command {
            Commands::Cache(CacheArgs { action: CacheAction::Clear { host }, .. }) => {
                assert_eq!(host.as_deref(), Some("a.com"));
            }
            _ => panic!("expected cache clear"),
        }
    }
}
