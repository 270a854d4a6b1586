//! aiterate CLI: generate tests and an implementation from a description, then
//! iterate with the model until the tests pass.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use aiterate::cancel::CancelToken;
use aiterate::core::language::Language;
use aiterate::core::session::Session;
use aiterate::error::AiterateError;
use aiterate::exit_codes;
use aiterate::generator::Generator;
use aiterate::io::completion::OpenAiClient;
use aiterate::io::config::{AiterateConfig, default_config_path, load_config};
use aiterate::io::dependencies::ToolchainDependencyUpdater;
use aiterate::io::session_store::SessionStore;
use aiterate::io::test_runner::ToolchainExecutor;
use aiterate::iterate::{Collaborators, LoopEvent, LoopStop};
use aiterate::run::{RunEvent, RunSettings, run_new};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0    success; for `new`, the tests passed
  1    invalid input, configuration, or any fatal error
  2    `new` used every iteration without passing tests (files are still written)
  130  interrupted";

#[derive(Parser)]
#[command(
    name = "aiterate",
    version,
    about = "AI-powered code generation with test-driven iteration",
    after_help = EXIT_CODES_HELP
)]
struct Cli {
    /// Config file (defaults to ~/.aiterate/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate tests and an implementation, iterating until the tests pass.
    New {
        /// What the function should do. Prompted for when omitted.
        description: Option<String>,
        /// Target language (go, python). Prompted for when omitted.
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Print a stored session.
    Show {
        session_id: String,
        /// Print the raw JSON record.
        #[arg(long)]
        json: bool,
    },
    /// List stored sessions, oldest first.
    List,
}

fn main() {
    aiterate::logging::init();
    let cancel = CancelToken::new();
    #[cfg(unix)]
    if let Err(err) = aiterate::cancel::cancel_on_interrupt(cancel.clone()) {
        tracing::warn!(err = %format!("{err:#}"), "interrupt handling unavailable");
    }
    let code = match run(&cancel) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AiterateError>() {
        Some(AiterateError::Cancelled) => exit_codes::CANCELLED,
        _ => exit_codes::INVALID,
    }
}

fn run(cancel: &CancelToken) -> Result<i32> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let cfg = load_config(&config_path)
        .map_err(|err| AiterateError::Configuration(format!("{err:#}")))?;
    let store = SessionStore::open(cfg.resolve_storage_dir()?)?;

    match cli.command {
        Command::New {
            description,
            language,
        } => cmd_new(&cfg, &store, description, language, cancel),
        Command::Show { session_id, json } => cmd_show(&store, &session_id, json),
        Command::List => cmd_list(&store),
    }
}

fn cmd_new(
    cfg: &AiterateConfig,
    store: &SessionStore,
    description: Option<String>,
    language: Option<String>,
    cancel: &CancelToken,
) -> Result<i32> {
    // Fail on a missing credential before prompting or touching the filesystem.
    let client = OpenAiClient::from_env(cfg)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let description = match description {
        Some(description) => description,
        None => prompt_line(
            &mut input,
            "Enter a description of the function you want to create: ",
        )?,
    };
    if description.trim().is_empty() {
        return Err(anyhow!("description is required"));
    }
    let language = match language {
        Some(language) => language,
        None => prompt_line(
            &mut input,
            &format!(
                "Enter the programming language ({}): ",
                Language::supported_tags()
            ),
        )?,
    };
    if language.trim().is_empty() {
        return Err(anyhow!("language is required"));
    }
    let language: Language = language.parse()?;

    let generator = Generator::new(&client);
    let executor = ToolchainExecutor {
        timeout: cfg.test_timeout(),
        output_limit_bytes: cfg.output_limit_bytes,
    };
    let dependencies = ToolchainDependencyUpdater {
        timeout: cfg.setup_timeout(),
        output_limit_bytes: cfg.output_limit_bytes,
    };
    let collab = Collaborators {
        generator: &generator,
        executor: &executor,
        dependencies: &dependencies,
        store,
    };
    let settings = RunSettings::from_config(cfg);

    let report = run_new(
        &description,
        language,
        &settings,
        &collab,
        cancel,
        print_event,
    )?;

    match report.outcome.stop {
        LoopStop::Passed { iteration } => {
            println!(
                "{}",
                format!("✓ All tests passed on iteration {iteration}").green().bold()
            );
            println!(
                "Check {} for the files.",
                report.output_dir.display().to_string().bright_cyan()
            );
            Ok(exit_codes::OK)
        }
        LoopStop::Exhausted { iterations } => {
            println!(
                "{}",
                format!("✗ Failed to generate a passing implementation after {iterations} iterations")
                    .red()
                    .bold()
            );
            println!("{}", "Last test output:".yellow());
            println!("{}", report.outcome.last_output);
            println!(
                "{} {}",
                "Files have been saved to:".yellow(),
                report.output_dir.display()
            );
            Ok(exit_codes::EXHAUSTED)
        }
    }
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::SessionCreated { id } => {
            println!("{} {}", "Session:".bold(), id.bright_cyan());
        }
        RunEvent::OutputDirectory { path } => {
            println!("{} {}", "Output directory:".blue(), path.display());
        }
        RunEvent::Loop(LoopEvent::GeneratingTests) => println!("{}", "Generating tests...".blue()),
        RunEvent::Loop(LoopEvent::GeneratingImplementation) => {
            println!("{}", "Generating initial implementation...".blue());
        }
        RunEvent::Loop(LoopEvent::Running {
            iteration,
            max_iterations,
        }) => {
            println!(
                "{}",
                format!("Running tests (iteration {iteration}/{max_iterations})...").blue()
            );
        }
        RunEvent::Loop(LoopEvent::Recorded {
            success, output, ..
        }) => {
            if !success {
                println!("{}", "Tests failed. Test output:".yellow());
                println!("{output}");
            }
        }
        RunEvent::Loop(LoopEvent::Repairing { .. }) => {
            println!("{}", "Attempting to fix implementation and tests...".yellow());
        }
    }
}

fn cmd_show(store: &SessionStore, id: &str, json: bool) -> Result<i32> {
    let session = store.get_session(id)?;
    if json {
        let raw = serde_json::to_string_pretty(&session).context("serialize session")?;
        println!("{raw}");
        return Ok(exit_codes::OK);
    }

    println!("{} {}", "Session:".bold(), session.id.bright_cyan());
    println!("{:<13} {}", "Description:".bold(), session.description);
    println!("{:<13} {}", "Language:".bold(), session.language);
    println!("{:<13} {}", "Created:".bold(), session.created_at.to_rfc3339());
    println!("{:<13} {}", "Updated:".bold(), session.updated_at.to_rfc3339());
    println!("{:<13} {}", "Status:".bold(), status_label(&session));
    for iteration in &session.iterations {
        let result = if iteration.success {
            "passed".green()
        } else {
            "failed".red()
        };
        println!(
            "\n{} {} ({})",
            "Iteration".bold(),
            iteration.number,
            result
        );
        println!("{:<13} {}", "At:".bold(), iteration.timestamp.to_rfc3339());
        println!("{}", "Test output:".bold());
        println!("{}", iteration.test_logs.trim_end());
    }
    Ok(exit_codes::OK)
}

fn cmd_list(store: &SessionStore) -> Result<i32> {
    let sessions = store.list_sessions()?;
    if sessions.is_empty() {
        println!("No sessions found in {}", store.root().display());
        return Ok(exit_codes::OK);
    }
    println!(
        "{:<36}  {:<8}  {:<10}  {:<5}  {}",
        "ID".bold(),
        "LANGUAGE".bold(),
        "STATUS".bold(),
        "ITERS".bold(),
        "DESCRIPTION".bold()
    );
    for session in &sessions {
        println!(
            "{:<36}  {:<8}  {:<10}  {:<5}  {}",
            session.id,
            session.language.as_str(),
            status_label(session),
            session.iterations.len(),
            first_line(&session.description)
        );
    }
    Ok(exit_codes::OK)
}

fn status_label(session: &Session) -> colored::ColoredString {
    if session.passed() {
        "passed".green()
    } else if session.iterations.is_empty() {
        "empty".dimmed()
    } else {
        "failed".red()
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn prompt_line(input: &mut impl BufRead, prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    input.read_line(&mut line).context("read stdin")?;
    Ok(line.trim().to_string())
}
