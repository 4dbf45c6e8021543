use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "transcriber",
    about = "URL Transcriber - Turn a link to an audio or video file into a transcript",
    version,
    long_about = "An HTTP service that downloads audio/video from a direct media URL and transcribes it with the OpenAI Whisper API. POST {\"audioUrl\": \"...\", \"language\": \"en\"} to /api/transcribe."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a YAML config file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind, overrides the configured one
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a configuration template to the default location
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    /// The requested command, `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Serve { bind: None })
    }
}
