//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

/// Returns the filter used when `RUST_LOG` is not set.
///
/// HTTP client internals are held at `warn` so that each scrape does not produce
/// connection-level noise.
pub fn default_directives(environment: Environment) -> &'static str {
    match environment {
        Environment::Dev => "notice_relay=debug,reqwest=warn,hyper=warn,hyper_util=warn",
        Environment::Prod => "notice_relay=info,reqwest=warn,hyper=warn,hyper_util=warn",
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the environment's default directives.
pub fn init_tracing(environment: Environment) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(environment).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        for environment in [Environment::Dev, Environment::Prod] {
            assert!(EnvFilter::try_new(default_directives(environment)).is_ok());
        }
    }

    #[test]
    fn prod_is_quieter_than_dev() {
        assert!(default_directives(Environment::Dev).starts_with("notice_relay=debug"));
        assert!(default_directives(Environment::Prod).starts_with("notice_relay=info"));
    }
}
