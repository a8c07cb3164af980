//! Redemptions is a microservice responsible for the time-boxed redemption
//! code lifecycle of local-business coupons: eligibility checks, code
//! generation, the pending/redeemed/expired/cancelled state machine and the
//! periodic cleanup sweep.
//! The layered structure of the app is
//!
//! `Application -> Controller -> Service -> Repo`
//!
//! Each layer can throw Error with context or cover occurred error with
//! Error in the context. When error is not covered with Error it will
//! be translated to code 500 in the http answer "Internal server error" of
//! microservice.

#![allow(proc_macro_derive_resolution_fallback)]
#![recursion_limit = "128"]
extern crate chrono;
extern crate config as config_crate;
#[macro_use]
extern crate diesel;
extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate hyper;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate r2d2;
extern crate rand;
extern crate regex;
extern crate sentry;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate tokio;
extern crate tokio_core;
extern crate tokio_signal;
extern crate validator;
#[macro_use]
extern crate validator_derive;

#[macro_use]
pub mod macros;
pub mod config;
pub mod controller;
pub mod errors;
pub mod loaders;
pub mod models;
pub mod repos;
pub mod schema;
pub mod sentry_integration;
pub mod services;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use failure::Error as FailureError;
use futures::{future, Future, Stream};
use futures_cpupool::CpuPool;
use hyper::server::Http;
use tokio_core::reactor::Core;

use config::Config;
use controller::app::Application;
use controller::context::StaticContext;
use loaders::sweeper::{self, SweeperContext};
use repos::repo_factory::ReposFactoryImpl;

/// Starts new web service from provided `Config`
pub fn start_server<F: FnOnce() + 'static>(config: Config, port: &Option<String>, callback: F) {
    // Prepare reactor
    let mut core = Core::new().expect("Unexpected error creating event loop core");
    let handle = Arc::new(core.handle());

    // Prepare database pool
    let database_url: String = config.server.database.parse().expect("Database URL must be set in configuration");
    let db_manager = ConnectionManager::<PgConnection>::new(database_url);
    let db_pool = r2d2::Pool::builder()
        .build(db_manager)
        .expect("Failed to create DB connection pool");

    let thread_count = config.server.thread_count;

    // Prepare CPU pool
    let cpu_pool = CpuPool::new(thread_count);

    // Prepare server
    let address = {
        let port = port.as_ref().unwrap_or(&config.server.port);
        format!("{}:{}", config.server.host, port).parse().expect("Could not parse address")
    };

    // Repo factory
    let repo_factory = ReposFactoryImpl::new();

    // In-process sweep: runs once eagerly at start and then on the
    // configured interval, so stale pending records never outlive their
    // window even without a standalone sweeper process
    let sweeper_ctx = SweeperContext {
        db_pool: db_pool.clone(),
        interval: Duration::from_secs(config.sweeper.interval_s),
        thread_pool: cpu_pool.clone(),
    };
    handle.spawn(sweeper::run(sweeper_ctx).map_err(|e| error!("Sweeper error: {:?}", e)));

    let context = StaticContext::new(db_pool, cpu_pool, Arc::new(config), repo_factory);

    let serve = Http::new()
        .serve_addr_handle(&address, &handle, move || {
            // Prepare application
            let controller = controller::ControllerImpl::new(context.clone());

            Ok(Application::new(controller))
        }).unwrap_or_else(|why| {
            error!("Http Server Initialization Error: {}", why);
            process::exit(1);
        });

    let handle_arc2 = handle.clone();
    handle.spawn(
        serve
            .for_each(move |conn| {
                handle_arc2.spawn(conn.map(|_| ()).map_err(|why| error!("Server Error: {}", why)));
                Ok(())
            }).map_err(|_| ()),
    );

    info!("Listening on http://{}, threads: {}", address, thread_count);
    handle.spawn_fn(move || {
        callback();
        future::ok(())
    });

    core.run(tokio_signal::ctrl_c().flatten_stream().take(1u64).for_each(|()| {
        info!("Ctrl+C received. Exit");

        Ok(())
    })).unwrap();
}

/// Builds the standalone sweeper future from provided `Config`
pub fn start_sweeper(config: Config) -> impl Future<Item = (), Error = FailureError> {
    let Config { server, sweeper, .. } = config;

    // Prepare database pool
    let database_url = server.database.parse::<String>().expect("Failed to parse database URL");
    let db_manager = ConnectionManager::<PgConnection>::new(database_url);
    let db_pool = r2d2::Pool::builder().build(db_manager).expect("Failed to create connection pool");

    let interval = Duration::from_secs(sweeper.interval_s);

    let thread_pool = CpuPool::new(sweeper.thread_count);

    let ctx = SweeperContext {
        db_pool,
        interval,
        thread_pool,
    };

    sweeper::run(ctx)
}
