use env_logger::{Builder, Target};
use log::LevelFilter;

/// Environment variable holding `env_logger` filter directives.
pub const FILTER_ENV: &str = "RUST_LOG";

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn filters_from(envs: &[(String, String)]) -> Option<&str> {
    envs.iter()
        .find(|(key, _)| key == FILTER_ENV)
        .map(|(_, value)| value.as_str())
}

/// Log to stderr at a level picked by the number of `-v` flags.
///
/// Without any `-v`, `RUST_LOG` from `envs` is honoured if set and logging is off otherwise.
pub fn init_logger(verbosity: u8, envs: &[(String, String)]) {
    let mut builder = Builder::new();
    let filters = filters_from(envs);
    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }
    if verbosity > 0 || filters.is_none() {
        builder.filter_level(level_for(verbosity));
    }

    // `run_mailer` may run several times in one process (integration tests),
    // so a second initialisation must not panic.
    let _ = builder
        .target(Target::Stderr)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
