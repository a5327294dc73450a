pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod filter;
pub mod render;
pub mod saver;
pub mod session;
pub mod store;
pub mod todo;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let split =
    cli::split_rc_args(raw_args);
  let cli = cli::GlobalCli::parse_from(
    split.args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting ticklist CLI"
  );
  debug!(
    ?split.overrides,
    "positional settings"
  );

  let mut cfg = config::Config::load(
    cli.ticklistrc.as_deref()
  )?;
  cfg.apply_overrides(
    split
      .overrides
      .into_iter()
      .chain(cli.rc_overrides)
  )?;
  if !cfg.unknown_keys.is_empty() {
    warn!(
      keys = ?cfg.unknown_keys,
      "ignored unknown settings"
    );
  }

  let data_dir = cfg
    .data_dir(cli.data.as_deref())
    .context(
      "failed to resolve data \
       directory"
    )?;

  let backend =
    datastore::FileStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;

  let options = session::SessionOptions {
    initial_filter: cfg.default_filter,
    save_debounce:  cfg.save_debounce
  };
  let mut session =
    session::Session::open(
      datastore::PersistenceAdapter::new(
        Arc::new(backend)
      ),
      options
    )?;

  let mut renderer =
    render::Renderer::new(&cfg);
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &mut session,
    &cfg,
    &mut renderer,
    inv
  )?;
  session.flush();

  info!("done");
  Ok(())
}
