use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tablechat::Result;
use tablechat::commands::{ask, chat, clean_file, show_config};
use tablechat::indexer::DEFAULT_TOP_K;

#[derive(Parser)]
#[command(name = "tablechat")]
#[command(about = "Ask questions about CSV and Excel tables, answered by a hosted model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a table (drop duplicate rows, fill missing values) and save it as CSV
    Clean {
        /// Path to the CSV or Excel file
        file: PathBuf,
        /// Where to write the cleaned CSV (defaults to <file>_cleaned.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Ask a single question about a table
    Ask {
        /// Path to the CSV or Excel file
        file: PathBuf,
        /// The question to answer
        question: String,
        /// Completion model to use (defaults to DEPLOYMENT_NAME from the environment)
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature, between 0.0 and 1.0
        #[arg(long, default_value_t = 0.0)]
        temperature: f32,
        /// How many chunks to retrieve as context
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Start an interactive question/answer session
    Chat {
        /// Optional table to load and index up front
        #[arg(long)]
        file: Option<PathBuf>,
        /// Completion model to use (defaults to DEPLOYMENT_NAME from the environment)
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature, between 0.0 and 1.0
        #[arg(long, default_value_t = 0.0)]
        temperature: f32,
    },
    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { file, output } => {
            clean_file(&file, output.as_deref())?;
        }
        Commands::Ask {
            file,
            question,
            model,
            temperature,
            top_k,
        } => {
            ask(&file, &question, model.as_deref(), temperature, top_k)?;
        }
        Commands::Chat {
            file,
            model,
            temperature,
        } => {
            chat(file.as_deref(), model.as_deref(), temperature)?;
        }
        Commands::Config => {
            show_config()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["tablechat", "config"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Config);
        }
    }

    #[test]
    fn clean_command_with_file() {
        let cli = Cli::try_parse_from(["tablechat", "clean", "sales.csv"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Clean { file, output } = parsed.command {
                assert_eq!(file, PathBuf::from("sales.csv"));
                assert_eq!(output, None);
            }
        }
    }

    #[test]
    fn ask_command_defaults() {
        let cli = Cli::try_parse_from(["tablechat", "ask", "sales.xlsx", "Average price per store?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                file,
                question,
                model,
                temperature,
                top_k,
            } = parsed.command
            {
                assert_eq!(file, PathBuf::from("sales.xlsx"));
                assert_eq!(question, "Average price per store?");
                assert_eq!(model, None);
                assert_eq!(temperature, 0.0);
                assert_eq!(top_k, DEFAULT_TOP_K);
            }
        }
    }

    #[test]
    fn ask_command_with_model_and_temperature() {
        let cli = Cli::try_parse_from([
            "tablechat",
            "ask",
            "sales.csv",
            "Total revenue?",
            "--model",
            "gpt-4o",
            "--temperature",
            "0.7",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                model, temperature, ..
            } = parsed.command
            {
                assert_eq!(model, Some("gpt-4o".to_string()));
                assert_eq!(temperature, 0.7);
            }
        }
    }

    #[test]
    fn chat_command_without_file() {
        let cli = Cli::try_parse_from(["tablechat", "chat"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chat { file, .. } = parsed.command {
                assert_eq!(file, None);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["tablechat", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["tablechat", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
