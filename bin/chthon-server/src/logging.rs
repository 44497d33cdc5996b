//! Tracing subscriber setup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::Config;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `RUST_LOG` wins over `CHTHON_LOG`; an unparsable value falls back to `info`.
fn env_filter(cfg: &Config) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: CHTHON_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                    cfg.log_level, e
                );
                EnvFilter::new("info")
            }
        },
    }
}

fn fmt_layer<W>(json: bool, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(ansi);
    if json { layer.json().boxed() } else { layer.boxed() }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process, dropping it
/// flushes and stops the file writer.
pub fn init(cfg: &Config) -> Option<WorkerGuard> {
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(cfg.log_json, std::io::stdout, !cfg.log_json)];

    let guard = cfg.log_dir.as_ref().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, "chthon-server.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt_layer(cfg.log_json, writer, false));
        guard
    });

    tracing_subscriber::registry().with(layers).with(env_filter(cfg)).init();
    guard
}
