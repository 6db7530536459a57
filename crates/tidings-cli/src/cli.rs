//! CLI argument parsing and command definitions.
//!
//! Global flags select the config file, log verbosity, and per-run overrides
//! of the store backend, embedding provider and collection.

use clap::{Parser, Subcommand};

/// Default articles file read by `index` and `run`.
pub const DEFAULT_ARTICLES_FILE: &str = "articles.json";

/// Default results file written by `run`.
pub const DEFAULT_RESULTS_FILE: &str = "search_results.json";

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "tidings", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "TIDINGS_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Store backend override: "qdrant" or "memory".
    #[arg(long)]
    pub backend: Option<String>,

    /// Embedding provider override: "fastembed" or "mock".
    #[arg(long)]
    pub provider: Option<String>,

    /// Collection name override.
    #[arg(long)]
    pub collection: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index an `{"articles": [...]}` JSON file.
    Index {
        /// Articles file.
        #[arg(default_value = DEFAULT_ARTICLES_FILE)]
        file: String,
    },

    /// Run one fused search.
    Search {
        /// Query text.
        query: String,

        /// Neighbours per field (defaults to the configured top-K).
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Also write the results to this JSON file.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Search a list of portfolio queries.
    Portfolio {
        /// JSON file holding `[{"portfolio_tag", "text"}]` (built-in list if omitted).
        #[arg(long)]
        queries: Option<String>,

        /// Neighbours per field (defaults to the configured top-K).
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Also write the results to this JSON file.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Index a file, search the portfolio, and write the results.
    Run {
        /// Articles file.
        #[arg(default_value = DEFAULT_ARTICLES_FILE)]
        file: String,

        /// Results file.
        #[arg(short, long, default_value = DEFAULT_RESULTS_FILE)]
        output: String,

        /// JSON file holding portfolio queries (built-in list if omitted).
        #[arg(long)]
        queries: Option<String>,

        /// Neighbours per field (defaults to the configured top-K).
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Index a built-in sample article and search it.
    Demo {
        /// Neighbours per field (defaults to the configured top-K).
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Drop the article collection.
    DeleteCollection,

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Get a configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "vector.dimension").
        key: String,
    },

    /// Set a configuration value by dotted key.
    Set {
        /// Dotted key (e.g., "qdrant.url").
        key: String,

        /// Value to set.
        value: String,
    },

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved configuration as `TIDINGS_*` assignments.
    Export,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_args_default() {
        let args = CliArgs::parse_from(["tidings"]);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(args.backend.is_none());
        assert!(args.provider.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn test_cli_args_overrides() {
        let args = CliArgs::parse_from([
            "tidings",
            "--backend",
            "memory",
            "--provider",
            "mock",
            "--collection",
            "news",
            "version",
        ]);
        assert_eq!(args.backend.as_deref(), Some("memory"));
        assert_eq!(args.provider.as_deref(), Some("mock"));
        assert_eq!(args.collection.as_deref(), Some("news"));
        assert!(matches!(args.command, Some(Command::Version)));
    }

    #[test]
    fn test_cli_args_config() {
        let args = CliArgs::parse_from(["tidings", "--config", "/path/to/config.toml"]);
        assert_eq!(args.config, Some("/path/to/config.toml".to_string()));
    }

    #[test]
    fn test_index_command_default_file() {
        let args = CliArgs::parse_from(["tidings", "index"]);
        match args.command {
            Some(Command::Index { file }) => assert_eq!(file, "articles.json"),
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_search_command() {
        let args = CliArgs::parse_from(["tidings", "search", "tax policy", "-k", "3"]);
        match args.command {
            Some(Command::Search {
                query,
                top_k,
                output,
            }) => {
                assert_eq!(query, "tax policy");
                assert_eq!(top_k, Some(3));
                assert!(output.is_none());
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_search_requires_query() {
        assert!(CliArgs::try_parse_from(["tidings", "search"]).is_err());
    }

    #[test]
    fn test_portfolio_command() {
        let args = CliArgs::parse_from([
            "tidings",
            "portfolio",
            "--queries",
            "q.json",
            "--output",
            "out.json",
        ]);
        match args.command {
            Some(Command::Portfolio {
                queries,
                top_k,
                output,
            }) => {
                assert_eq!(queries.as_deref(), Some("q.json"));
                assert!(top_k.is_none());
                assert_eq!(output.as_deref(), Some("out.json"));
            }
            _ => panic!("Expected Portfolio command"),
        }
    }

    #[test]
    fn test_run_command_defaults() {
        let args = CliArgs::parse_from(["tidings", "run"]);
        match args.command {
            Some(Command::Run {
                file,
                output,
                queries,
                top_k,
            }) => {
                assert_eq!(file, "articles.json");
                assert_eq!(output, "search_results.json");
                assert!(queries.is_none());
                assert!(top_k.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_demo_command() {
        let args = CliArgs::parse_from(["tidings", "demo", "--top-k", "2"]);
        match args.command {
            Some(Command::Demo { top_k }) => assert_eq!(top_k, Some(2)),
            _ => panic!("Expected Demo command"),
        }
    }

    #[test]
    fn test_delete_collection_command() {
        let args = CliArgs::parse_from(["tidings", "delete-collection"]);
        assert!(matches!(args.command, Some(Command::DeleteCollection)));
    }

    // ------------------------------------------------------------------------
    // Config command tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_get_command() {
        let args = CliArgs::parse_from(["tidings", "config", "get", "vector.dimension"]);
        match args.command {
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Get { key },
            })) => assert_eq!(key, "vector.dimension"),
            _ => panic!("Expected Config Get command"),
        }
    }

    #[test]
    fn test_config_set_command() {
        let args = CliArgs::parse_from([
            "tidings",
            "config",
            "set",
            "qdrant.url",
            "http://qdrant:6333",
        ]);
        match args.command {
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Set { key, value },
            })) => {
                assert_eq!(key, "qdrant.url");
                assert_eq!(value, "http://qdrant:6333");
            }
            _ => panic!("Expected Config Set command"),
        }
    }

    #[test]
    fn test_config_init_force() {
        let args = CliArgs::parse_from(["tidings", "config", "init", "--force"]);
        match args.command {
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Init { file, force },
            })) => {
                assert!(file.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command with force"),
        }
    }

    #[test]
    fn test_config_export_command() {
        let args = CliArgs::parse_from(["tidings", "config", "export"]);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Export
            }))
        ));
    }
}
