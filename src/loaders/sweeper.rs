//! Periodic sweep: the authoritative pending -> expired transition for
//! records whose window has passed

use std::time::{Duration, Instant, SystemTime};

use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use failure::{Error as FailureError, Fail};
use futures::{future, Future, Stream};
use futures_cpupool::CpuPool;
use r2d2::Pool;
use sentry::integrations::failure::capture_error;
use tokio::timer::Interval;

use repos::legacy_acl::SystemACL;
use repos::redemptions::{RedemptionsRepo, RedemptionsRepoImpl};

#[derive(Clone)]
pub struct SweeperContext {
    pub db_pool: Pool<ConnectionManager<PgConnection>>,
    pub interval: Duration,
    pub thread_pool: CpuPool,
}

/// Runs one sweep immediately and then one per interval tick. A failed sweep
/// is logged, captured and retried on the next tick; the returned future
/// never resolves with an error on its own.
pub fn run(ctx: SweeperContext) -> impl Future<Item = (), Error = FailureError> {
    Interval::new(Instant::now(), ctx.interval)
        .map_err(FailureError::from)
        .fold(ctx, |ctx, _| {
            debug!("Started expiring stale redemptions");
            expire_stale(ctx.clone()).then(|res| {
                match res {
                    Ok(0) => {
                        debug!("No stale redemptions to expire");
                    }
                    Ok(affected) => {
                        info!("Expired {} stale redemptions", affected);
                    }
                    Err(err) => {
                        let err = FailureError::from(err.context("An error occurred while expiring stale redemptions"));
                        error!("{:?}", &err);
                        capture_error(&err);
                    }
                };

                future::ok::<_, FailureError>(ctx)
            })
        }).map(|_| ())
}

fn expire_stale(ctx: SweeperContext) -> impl Future<Item = usize, Error = FailureError> {
    let SweeperContext { db_pool, thread_pool, .. } = ctx;

    thread_pool.spawn(future::lazy(move || {
        let conn = db_pool.get().map_err(FailureError::from)?;
        let repo = RedemptionsRepoImpl::new(&conn, Box::new(SystemACL::default()));
        repo.expire_stale(SystemTime::now())
    }))
}
