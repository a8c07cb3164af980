//! Redemptions is a microservice responsible for the coupon redemption
//! lifecycle. This crate is for running the service from `redemptions_lib`.
//! See `redemptions_lib` for details.

extern crate env_logger;
extern crate redemptions_lib;

fn main() {
    let config = redemptions_lib::config::Config::new().expect("Can't load app config!");

    // Prepare logger
    env_logger::init();

    // Prepare sentry integration
    let _sentry = redemptions_lib::sentry_integration::init(config.sentry.as_ref());

    redemptions_lib::start_server(config, &None, || ());
}
