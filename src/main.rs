#![allow(clippy::enum_variant_names)]

use clap::Parser as _;
use tracing::debug;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
};

mod application;
mod cli;
mod config;
mod executor;
mod ext;
mod probe;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    setup_tracing(&cli_args);
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(cli_args).await?;

    Ok(())
}

fn setup_tracing(cli_args: &Cli) {
    let Some(filter) = cli_args.log_level.to_target_filter() else {
        return;
    };

    tracing_subscriber::registry()
        .with(fmt::layer().without_time().compact())
        .with(filter)
        .init();
}
