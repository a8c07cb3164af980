use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Error as FailureError;

use models::authorization::*;
use models::{AnalyticsEvent, NewAnalyticsEvent, UserId};
use repos::acl;
use repos::legacy_acl::CheckScope;
use repos::types::{RepoAcl, RepoResult};
use schema::analytics_events::dsl as AnalyticsEvents;

/// AnalyticsEvents repository. Events are best-effort bookkeeping; callers
/// log and swallow failures instead of propagating them.
pub struct AnalyticsEventsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<RepoAcl<AnalyticsEvent>>,
}

pub trait AnalyticsEventsRepo {
    /// Records new analytics event
    fn create(&self, payload: NewAnalyticsEvent) -> RepoResult<AnalyticsEvent>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> AnalyticsEventsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<RepoAcl<AnalyticsEvent>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> AnalyticsEventsRepo
    for AnalyticsEventsRepoImpl<'a, T>
{
    /// Records new analytics event
    fn create(&self, payload: NewAnalyticsEvent) -> RepoResult<AnalyticsEvent> {
        debug!("Create new analytics event {:?}.", payload);

        let query = diesel::insert_into(AnalyticsEvents::analytics_events).values(&payload);
        query
            .get_result::<AnalyticsEvent>(self.db_conn)
            .map_err(From::from)
            .and_then(|value| {
                acl::check(&*self.acl, Resource::AnalyticsEvents, Action::Create, self, Some(&value))?;

                Ok(value)
            }).map_err(|e: FailureError| e.context(format!("Creates new analytics event: {:?} error occurred", payload)).into())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, AnalyticsEvent>
    for AnalyticsEventsRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&AnalyticsEvent>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(event) = obj {
                    event.user_id == Some(user_id)
                } else {
                    false
                }
            }
        }
    }
}
