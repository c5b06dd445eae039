// src/bin/netscope.rs

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use colored::*;
use netscope::{
    CancellationToken,
    cli::{
        Cli, dispatcher,
        render::{self, CommandOutput},
    },
    constants::DEFAULT_ACCOUNT,
    core::{
        cache::{CacheService, SystemClock},
        config_loader, hierarchy, validators,
    },
    models::RuntimeSettings,
    state::Session,
    system::provider::InventoryProvider,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The main entry point of `netscope`.
/// Sets up logging, builds the session, and either runs the `-c` commands or
/// starts the REPL. Only startup failures exit non-zero.
fn main() {
    env_logger::init();
    let cancellation_token = Arc::new(AtomicBool::new(false));

    if let Err(e) = run(Cli::parse(), cancellation_token) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let config = config_loader::load_or_create(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let settings = RuntimeSettings {
        profile: cli
            .profile
            .as_deref()
            .map(validators::validate_profile)
            .transpose()?,
        regions: Vec::new(),
        no_cache: cli.no_cache,
        output_format: cli
            .format
            .as_deref()
            .map(validators::validate_output_format)
            .transpose()?
            .unwrap_or_default(),
    };

    let provider = match &cli.inventory {
        Some(path) => InventoryProvider::from_path(path)?,
        None => {
            let path = config.inventory_path()?;
            if path.exists() {
                InventoryProvider::from_path(&path)?
            } else {
                log::warn!(
                    "No inventory at '{}'. Starting with an empty provider.",
                    path.display()
                );
                InventoryProvider::default()
            }
        }
    };

    let cache = CacheService::new(config.cache_dir()?, Arc::new(SystemClock), DEFAULT_ACCOUNT);
    let mut session = Session::new(
        hierarchy::standard(),
        config,
        settings,
        Arc::new(provider),
        cache,
        Arc::clone(&cancellation_token),
    );

    // A declared command without a handler is a build defect, not a user error.
    let report = dispatcher::validate_graph(&session);
    if !report.is_valid() {
        eprintln!(
            "{}",
            render::render(&CommandOutput::GraphReport(report), session.settings.output_format)
        );
        bail!("The command hierarchy is inconsistent; refusing to start.");
    }

    spawn_interrupt_listener(cancellation_token);

    if !cli.command.is_empty() {
        for line in &cli.command {
            if !run_line(line, &mut session) {
                break;
            }
        }
        return Ok(());
    }

    repl(&mut session)
}

/// Runs one line and prints its result. Returns `false` when the shell should stop.
fn run_line(line: &str, session: &mut Session) -> bool {
    match dispatcher::dispatch_line(line, session) {
        Ok(CommandOutput::Quit) => false,
        Ok(CommandOutput::ClearScreen) => {
            print!("\x1b[2J\x1b[H");
            true
        }
        Ok(output) => {
            let text = render::render(&output, session.settings.output_format);
            if !text.is_empty() {
                println!("{}", text);
            }
            true
        }
        Err(e) => {
            if session.cancellation_token().load(Ordering::SeqCst) {
                eprintln!("{}", "Interrupted.".yellow());
            } else {
                eprintln!("{}: {:#}", "Error".red().bold(), e);
            }
            true
        }
    }
}

fn repl(session: &mut Session) -> Result<()> {
    println!(
        "netscope {}. Type '?' for help, 'exit' to quit.",
        env!("CARGO_PKG_VERSION")
    );
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!(
            "{}",
            render::prompt(session.navigator.frames(), &session.config.prompt)
        );
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(());
        };
        if !run_line(&line?, session) {
            return Ok(());
        }
    }
}

/// Ctrl-C only interrupts the running command; the shell keeps going.
fn spawn_interrupt_listener(cancellation_token: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("interrupt-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::warn!("Interrupt handling unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    cancellation_token.store(true, Ordering::SeqCst);
                    eprintln!("\n{}", "Interrupt received. Type 'exit' to leave the shell.".yellow());
                }
            });
        });
    if let Err(e) = spawned {
        log::warn!("Could not start the interrupt listener: {}", e);
    }
}
