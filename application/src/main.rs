use std::{io, process::ExitCode, sync::OnceLock};

use application::{Api, Args, Config};
use session::{
    infra::{storage::File, transport::Reqwest},
    Session,
};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_writer(io::stdout)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (!STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::WARN)
                                >= *meta.level()
                })),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::WARN)
                                >= *meta.level()
                })),
        )
        .init();

    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

async fn start() -> Result<(), ()> {
    let Args { config, command } =
        Args::parse().unwrap_or_else(|e| e.exit());

    let Config { api, storage, log } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let transport = Reqwest::new(&api.into()).map_err(|e| {
        log::error!("failed to initialize HTTP transport: {e}");
    })?;
    let session = Session::new(File::new(storage.path), transport);
    session.client().on_unauthorized(|| {
        log::warn!("session has expired, sign in again with `dishes login`");
    });

    let output = application::run(&Api::new(session), command)
        .await
        .map_err(|e| {
            log::error!("{e}");
        })?;

    if let Some(output) = output {
        let output = serde_json::to_string_pretty(&output).map_err(|e| {
            log::error!("failed to format output: {e}");
        })?;
        println!("{output}");
    }
    Ok(())
}
