use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "subdub")]
#[command(about = "Create an account and get a video subtitled and dubbed")]
#[command(long_about = "Subdub walks one video through intake, account signup, email verification \
                       and remote processing, then prints the download links. Get started with \
                       'subdub run --email you@example.com --video-url <URL> --full-name <NAME> --password <PASSWORD>'.")]
pub struct Cli {
    /// Read configuration from this TOML file instead of subdub.toml/.subdub-rc
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long, global = true, help = "Write structured JSON logs to stderr")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one session end to end: intake, signup, verification, processing
    Run {
        /// Email for the intake form
        #[arg(long, help = "Email address used for the intake and, by default, the signup")]
        email: String,
        /// Public URL of the video to process
        #[arg(long, help = "http(s) URL of the source video")]
        video_url: String,
        /// Subtitle language code
        #[arg(long, default_value = "en", help = "Subtitle language code (see 'subdub languages')")]
        subtitle_language: String,
        /// Dubbing language code
        #[arg(long, default_value = "es", help = "Dubbing language code (see 'subdub languages')")]
        dubbing_language: String,
        /// Full name for the new account
        #[arg(long, help = "Full name for the new account")]
        full_name: String,
        /// Account password, at least 8 characters
        #[arg(long, help = "Password for the new account (min 8 characters)")]
        password: String,
        /// Email for the signup, when it differs from the intake email
        #[arg(long, help = "Signup email; replaces the intake email for the rest of the session")]
        signup_email: Option<String>,
        /// Verification code; prompted for on stdin when absent
        #[arg(long, help = "Six-digit verification code (prompted for if omitted)")]
        code: Option<String>,
        /// Never contact the remote service
        #[arg(long, help = "Serve demo data instead of calling the remote service")]
        offline: bool,
        /// Override the tracker tick interval
        #[arg(long, help = "Milliseconds between progress ticks")]
        tick_ms: Option<u64>,
    },
    /// List the supported subtitle and dubbing languages
    Languages,
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to a file
        #[arg(long, help = "Save the effective configuration as TOML to this path")]
        save: Option<PathBuf>,
    },
}
