//! Sentry integration

use sentry;
use sentry::integrations::panic::register_panic_handler;
use sentry::internals::ClientInitGuard;

use config::SentryConfig;

/// Initializes error reporting when a dsn is configured. The returned guard
/// must be kept alive for the lifetime of the process.
pub fn init(config: Option<&SentryConfig>) -> Option<ClientInitGuard> {
    config.map(|config| {
        info!("Initializing sentry with dsn: {}", config.dsn);
        let guard = sentry::init(config.dsn.as_str());
        register_panic_handler();
        guard
    })
}
