pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod error;
pub mod model;
pub mod reltime;
pub mod render;
pub mod session;
pub mod view_state;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

/// Runs the CLI and returns the process exit code.
#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<i32> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting bettertasks CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let session =
    session::Session::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open session at \
           {}",
          data_dir.display()
        )
      })?;

  let api_url = cli
    .api
    .clone()
    .unwrap_or_else(|| cfg.api_url());
  let api = api::HttpApi::new(
    &api_url,
    cfg.api_timeout()?
  )?;
  info!(api = %api.base_url(), "using API");

  let mut renderer =
    render::Renderer::new(
      &cfg,
      session.load_theme()?
    )?;

  let code = commands::dispatch(
    commands::Dispatch {
      api,
      session,
      renderer: &mut renderer,
      fallback_user: cfg
        .fallback_user()?,
      list_override: cli.list
    },
    cli.command
  )?;

  info!(code, "done");
  Ok(code)
}
