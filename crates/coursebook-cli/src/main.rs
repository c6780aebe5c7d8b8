//! Coursebook - command-line client for a learning-management backend.
//!
//! Signs in against the backend, keeps the session between runs and offers
//! the course list and course form as subcommands.

mod app;
mod render;

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter};

use coursebook_core::config::{Config, StorageKind};
use coursebook_core::models::Role;

use app::App;

#[derive(Parser)]
#[command(name = "coursebook")]
#[command(version, about = "Course management for the learning platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL (overrides config and COURSEBOOK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Keep the session in memory only; nothing is written to disk
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        /// Account username (prompted when omitted)
        username: Option<String>,
    },
    /// Create an account and sign in as it
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in, from the stored session
    Whoami,
    /// View or edit the signed-in profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Ask the backend to email a password reset link
    ForgotPassword { email: String },
    /// Set a new password using a reset token
    ResetPassword { token: String },
    /// List course categories
    Categories,
    /// Course management
    Courses {
        #[command(subcommand)]
        command: CoursesCommand,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Fetch the profile from the backend
    Show,
    /// Change profile fields
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum CoursesCommand {
    /// List the courses visible to the signed-in account
    List,
    /// Show one course
    Show { id: i64 },
    /// Create a course
    Create {
        #[command(flatten)]
        fields: CourseFields,
    },
    /// Edit a course; only the given fields change
    Edit {
        id: i64,
        #[command(flatten)]
        fields: CourseFields,
    },
    /// Delete a course
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct CourseFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Category id (see `coursebook categories`)
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub hours: Option<f64>,
    /// Publish the course
    #[arg(long, conflicts_with = "draft")]
    pub publish: bool,
    /// Keep the course as a draft
    #[arg(long)]
    pub draft: bool,
}

impl CourseFields {
    /// The requested publish state, if either flag was given.
    pub fn published(&self) -> Option<bool> {
        match (self.publish, self.draft) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Student,
    Instructor,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Student => Role::Student,
            RoleArg::Instructor => Role::Instructor,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Subscriber used while the config (and with it `log_file`) is being
/// loaded, before `init_tracing` can run.
fn bootstrap_subscriber<W>(make_writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(make_writer))
        .with(env_filter())
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=coursebook_core=debug).
/// The returned guard flushes the log file and must outlive `main`'s work.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = env_filter();

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path.file_name().unwrap_or_else(|| OsStr::new("coursebook.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }
    if cli.ephemeral {
        config.storage = StorageKind::Memory;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let loaded = tracing::subscriber::with_default(bootstrap_subscriber(io::stderr), || load_config(&cli));
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(config.log_file.as_deref());
    info!(api = %config.api_base(), storage = ?config.storage, "Coursebook starting");

    let mut app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&mut app, cli.command).await;
    match app.finish(result) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Login { username } => app.login(username).await,
        Command::Register {
            username,
            email,
            first_name,
            last_name,
            role,
        } => {
            app.register(username, email, first_name, last_name, role.map(Role::from))
                .await
        }
        Command::Logout => {
            app.logout();
            Ok(())
        }
        Command::Whoami => {
            app.whoami();
            Ok(())
        }
        Command::Profile { command } => match command {
            ProfileCommand::Show => app.show_profile().await,
            ProfileCommand::Update {
                email,
                first_name,
                last_name,
            } => app.update_profile(email, first_name, last_name).await,
        },
        Command::ForgotPassword { email } => app.forgot_password(&email).await,
        Command::ResetPassword { token } => app.reset_password(&token).await,
        Command::Categories => app.list_categories().await,
        Command::Courses { command } => match command {
            CoursesCommand::List => app.list_courses().await,
            CoursesCommand::Show { id } => app.show_course(id).await,
            CoursesCommand::Create { fields } => app.save_course(None, fields).await,
            CoursesCommand::Edit { id, fields } => app.save_course(Some(id), fields).await,
            CoursesCommand::Delete { id, yes } => app.delete_course(id, yes).await,
        },
    }
}
