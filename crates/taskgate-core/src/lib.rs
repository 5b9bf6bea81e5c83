pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod form;
pub mod notice;
pub mod render;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{debug, info};

use crate::commands::{App, Outcome};

/// Exit status for refused input (validation failure, unknown id, blank
/// login name).
const EXIT_REJECTED: u8 = 2;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<ExitCode> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting taskgate");
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    let storage = storage::FileStorage::open(&data_dir)
        .with_context(|| format!("failed to open storage at {}", data_dir.display()))?;

    let renderer = render::Renderer::stdout(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;
    let mut app = App::new(&storage, renderer, cfg.notice_window()?)?;

    if inv.command == "shell" {
        let stdin = std::io::stdin();
        commands::shell::run_shell(&mut app, &cfg, stdin.lock())?;
        info!("shell closed");
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = app.dispatch(&inv, Utc::now(), Instant::now())?;
    info!(?outcome, "done");

    Ok(match outcome {
        Outcome::Done | Outcome::Redirected => ExitCode::SUCCESS,
        Outcome::Rejected => ExitCode::from(EXIT_REJECTED),
    })
}
