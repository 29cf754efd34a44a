use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Vetrina binary.
#[derive(Debug, Parser)]
#[command(name = "vetrina", version, about = "Vetrina site data client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the backend base URL.
    #[arg(long = "backend-url", value_name = "URL", global = true)]
    pub backend_url: Option<String>,

    /// Override the bearer token presented to the backend.
    #[arg(long = "token", env = "VETRINA_TOKEN", value_name = "TOKEN", global = true)]
    pub token: Option<String>,

    /// Override the per-request timeout.
    #[arg(long = "request-timeout-seconds", value_name = "SECONDS", global = true)]
    pub request_timeout_seconds: Option<u64>,

    /// Override the upload chunk size in bytes.
    #[arg(long = "upload-chunk-bytes", value_name = "BYTES", global = true)]
    pub upload_chunk_bytes: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the site introduction.
    Intro,
    /// List achievements.
    Achievements,
    /// List blog posts, newest first.
    Posts,
    /// List content sections in display order.
    Sections,
    /// List contact messages (admin).
    Messages,
    /// Print site counters.
    Stats,
    /// Print CMS settings.
    Cms,
    /// Print chatbot settings.
    Ai(AiArgs),
    /// Show the caller's role and capabilities.
    Whoami,
    /// Submit a contact form.
    Contact(ContactArgs),
    /// Publish a blog post, optionally with a featured image.
    #[command(name = "add-post")]
    AddPost(AddPostArgs),
}

#[derive(Debug, Args, Clone)]
pub struct AiArgs {
    /// Include privileged fields (admin only).
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub full: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ContactArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub message: String,
}

#[derive(Debug, Args, Clone)]
pub struct AddPostArgs {
    #[arg(long)]
    pub title: String,

    /// File holding the post body.
    #[arg(long = "content-file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub content_file: PathBuf,

    /// Publication date (YYYY-MM-DD); defaults to now.
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// Featured image to upload with the post.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub image: Option<PathBuf>,
}
