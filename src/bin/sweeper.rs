extern crate env_logger;
extern crate failure;
extern crate futures;
#[macro_use]
extern crate log;
extern crate redemptions_lib;
extern crate tokio_core;
extern crate tokio_signal;

use failure::{err_msg, Error as FailureError};
use futures::{future, Future, Stream};
use tokio_core::reactor::Core;

fn main() {
    let config = redemptions_lib::config::Config::new().expect("Can't load app config!");

    // Prepare logger
    env_logger::init();

    // Prepare sentry integration
    let _sentry = redemptions_lib::sentry_integration::init(config.sentry.as_ref());

    let ctrl_c = tokio_signal::ctrl_c()
        .flatten_stream()
        .into_future()
        .map_err(|(err, _rest)| FailureError::from(err))
        .and_then(|(ctrl_c, _rest)| match ctrl_c {
            None => future::err(err_msg("Unexpected error: Ctrl+C stream ended")),
            Some(_) => {
                info!("Ctrl+C received. Exiting...");
                future::ok(())
            }
        });

    let fut = redemptions_lib::start_sweeper(config).select(ctrl_c).map_err(|(err, _fut)| err);

    Core::new()
        .expect("Unexpected error occurred when creating an event loop core for Sweeper")
        .run(fut)
        .unwrap();
}
