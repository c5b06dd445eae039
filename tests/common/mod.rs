// tests/common/mod.rs

#![allow(dead_code)]

use netscope::{
    cli::{dispatcher, render::CommandOutput},
    core::{
        cache::{CacheService, Clock, ManualClock},
        config_loader::ShellConfig,
        hierarchy,
    },
    models::RuntimeSettings,
    state::Session,
    system::provider::InventoryProvider,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("inventory.json")
}

/// A session over the fixture inventory with an in-memory cache.
pub fn session() -> Session {
    session_with(None, RuntimeSettings::default())
}

/// A session over the fixture inventory, optionally persisting to `disk_dir`.
pub fn session_with(disk_dir: Option<PathBuf>, settings: RuntimeSettings) -> Session {
    let provider = InventoryProvider::from_path(&fixture_path()).expect("fixture inventory must load");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1_700_000_000));
    Session::new(
        hierarchy::standard(),
        ShellConfig::default(),
        settings,
        Arc::new(provider),
        CacheService::new(disk_dir, clock, "unused"),
        Arc::new(AtomicBool::new(false)),
    )
}

/// Runs a line that is expected to succeed.
pub fn run(session: &mut Session, line: &str) -> CommandOutput {
    dispatcher::dispatch_line(line, session)
        .unwrap_or_else(|e| panic!("'{}' failed: {:#}", line, e))
}

/// Runs a line that is expected to fail and returns the error.
pub fn fail(session: &mut Session, line: &str) -> anyhow::Error {
    match dispatcher::dispatch_line(line, session) {
        Ok(output) => panic!("'{}' unexpectedly succeeded with {:?}", line, output),
        Err(e) => e,
    }
}

pub fn listing_ids(output: &CommandOutput) -> Vec<String> {
    match output {
        CommandOutput::Listing { items, .. } => items
            .iter()
            .filter_map(|i| i.get("id").and_then(|v| v.as_str()).map(str::to_string))
            .collect(),
        other => panic!("expected a listing, got {:?}", other),
    }
}
