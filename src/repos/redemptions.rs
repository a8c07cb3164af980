use std::time::SystemTime;

use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Bool;
use diesel::Connection;
use failure::Error as FailureError;

use errors::Error;
use models::authorization::*;
use models::{BusinessId, CouponId, NewRedemption, RedeemRedemption, Redemption, RedemptionId, RedemptionStatus, ScanCode, UserId};
use repos::acl;
use repos::legacy_acl::CheckScope;
use repos::types::{RepoAcl, RepoResult};
use schema::redemptions::dsl as Redemptions;

/// Search redemptions
#[derive(Clone, Debug)]
pub enum RedemptionSearch {
    All,
    User(UserId),
    Business(BusinessId),
}

/// Redemptions repository, responsible for handling redemptions table.
/// Status transitions go through conditional updates so a record leaves
/// `pending` exactly once regardless of concurrent confirmations.
pub struct RedemptionsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<RepoAcl<Redemption>>,
}

pub trait RedemptionsRepo {
    /// Creates new pending redemption. A scan code collision surfaces as
    /// `Error::DuplicateCode` in the failure chain so the caller can retry
    /// with freshly generated codes.
    fn create(&self, payload: NewRedemption) -> RepoResult<Redemption>;

    /// Get redemption by scan code
    fn get_by_scan_code(&self, scan_code_arg: ScanCode) -> RepoResult<Option<Redemption>>;

    /// Search redemptions, newest first
    fn find_by(&self, search: RedemptionSearch) -> RepoResult<Vec<Redemption>>;

    /// Count redeemed records of a user for a coupon, optionally since a
    /// window start
    fn count_redeemed(&self, coupon_id_arg: CouponId, user_id_arg: UserId, since: Option<SystemTime>) -> RepoResult<i64>;

    /// Conditional pending -> redeemed transition; `None` when no pending,
    /// unexpired record matches the scan code
    fn mark_redeemed(&self, scan_code_arg: ScanCode, payload: RedeemRedemption) -> RepoResult<Option<Redemption>>;

    /// Conditional pending -> cancelled transition; `None` when no pending
    /// record has this id
    fn cancel(&self, id_arg: RedemptionId) -> RepoResult<Option<Redemption>>;

    /// Batch pending -> expired transition for records past their window,
    /// returns the number of affected rows
    fn expire_stale(&self, now: SystemTime) -> RepoResult<usize>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> RedemptionsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<RepoAcl<Redemption>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> RedemptionsRepo
    for RedemptionsRepoImpl<'a, T>
{
    /// Creates new pending redemption
    fn create(&self, payload: NewRedemption) -> RepoResult<Redemption> {
        debug!("Create new redemption {:?}.", payload);

        let query = diesel::insert_into(Redemptions::redemptions).values(&payload);
        query
            .get_result::<Redemption>(self.db_conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    FailureError::from(e).context(Error::DuplicateCode).into()
                }
                e => FailureError::from(e),
            }).and_then(|value| {
                acl::check(&*self.acl, Resource::Redemptions, Action::Create, self, Some(&value))?;

                Ok(value)
            }).map_err(|e: FailureError| e.context(format!("Creates new redemption: {:?} error occurred", payload)).into())
    }

    /// Get redemption by scan code
    fn get_by_scan_code(&self, scan_code_arg: ScanCode) -> RepoResult<Option<Redemption>> {
        debug!("Find in redemption with scan code {}.", scan_code_arg);
        let query = Redemptions::redemptions.filter(Redemptions::scan_code.eq(&scan_code_arg));
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|value: Option<Redemption>| {
                if let Some(value) = value.as_ref() {
                    acl::check(&*self.acl, Resource::Redemptions, Action::Read, self, Some(value))?;
                };

                Ok(value)
            }).map_err(|e: FailureError| {
                e.context(format!("Find redemption by scan code: {} error occurred", scan_code_arg)).into()
            })
    }

    /// Search redemptions, newest first
    fn find_by(&self, search: RedemptionSearch) -> RepoResult<Vec<Redemption>> {
        debug!("Get redemptions by search: {:?}.", search);

        let search_exp: Box<BoxableExpression<Redemptions::redemptions, Pg, SqlType = Bool>> = match search {
            RedemptionSearch::All => Box::new(sql::<Bool>("TRUE")),
            RedemptionSearch::User(user_id) => Box::new(Redemptions::user_id.eq(user_id)),
            RedemptionSearch::Business(business_id) => Box::new(Redemptions::business_id.eq(business_id)),
        };

        let query = Redemptions::redemptions.filter(search_exp).order(Redemptions::created_at.desc());

        query
            .get_results(self.db_conn)
            .map_err(From::from)
            .and_then(|values: Vec<Redemption>| {
                for value in &values {
                    acl::check(&*self.acl, Resource::Redemptions, Action::Read, self, Some(&value))?;
                }

                Ok(values)
            }).map_err(|e: FailureError| e.context("Search redemptions failed.").into())
    }

    /// Count redeemed records of a user for a coupon
    fn count_redeemed(&self, coupon_id_arg: CouponId, user_id_arg: UserId, since: Option<SystemTime>) -> RepoResult<i64> {
        debug!(
            "Count redeemed records for coupon {} and user {} since {:?}.",
            coupon_id_arg, user_id_arg, since
        );

        acl::check(&*self.acl, Resource::Redemptions, Action::Read, self, None)?;

        let query = Redemptions::redemptions
            .filter(Redemptions::coupon_id.eq(&coupon_id_arg))
            .filter(Redemptions::user_id.eq(&user_id_arg))
            .filter(Redemptions::status.eq(RedemptionStatus::Redeemed));

        let counted = match since {
            Some(since) => query.filter(Redemptions::created_at.ge(since)).count().get_result(self.db_conn),
            None => query.count().get_result(self.db_conn),
        };

        counted.map_err(From::from).map_err(|e: FailureError| {
            e.context(format!(
                "Count redeemed records for coupon {} and user {} error occurred",
                coupon_id_arg, user_id_arg
            )).into()
        })
    }

    /// Conditional pending -> redeemed transition. The expiry predicate runs
    /// inside the store, never against a client clock.
    fn mark_redeemed(&self, scan_code_arg: ScanCode, payload: RedeemRedemption) -> RepoResult<Option<Redemption>> {
        debug!("Mark redemption with scan code {} redeemed.", scan_code_arg);

        let filtered = Redemptions::redemptions
            .filter(Redemptions::scan_code.eq(&scan_code_arg))
            .filter(Redemptions::status.eq(RedemptionStatus::Pending))
            .filter(Redemptions::expires_at.gt(payload.redeemed_at));

        diesel::update(filtered)
            .set(&payload)
            .get_result::<Redemption>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|value: Option<Redemption>| {
                if let Some(value) = value.as_ref() {
                    acl::check(&*self.acl, Resource::Redemptions, Action::Update, self, Some(value))?;
                };

                Ok(value)
            }).map_err(|e: FailureError| {
                e.context(format!("Mark redemption redeemed by scan code: {} error occurred", scan_code_arg)).into()
            })
    }

    /// Conditional pending -> cancelled transition
    fn cancel(&self, id_arg: RedemptionId) -> RepoResult<Option<Redemption>> {
        debug!("Cancel redemption with id {}.", id_arg);

        let filtered = Redemptions::redemptions
            .filter(Redemptions::id.eq(&id_arg))
            .filter(Redemptions::status.eq(RedemptionStatus::Pending));

        diesel::update(filtered)
            .set(Redemptions::status.eq(RedemptionStatus::Cancelled))
            .get_result::<Redemption>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|value: Option<Redemption>| {
                if let Some(value) = value.as_ref() {
                    acl::check(&*self.acl, Resource::Redemptions, Action::Update, self, Some(value))?;
                };

                Ok(value)
            }).map_err(|e: FailureError| e.context(format!("Cancel redemption: {} error occurred", id_arg)).into())
    }

    /// Batch pending -> expired transition for records past their window
    fn expire_stale(&self, now: SystemTime) -> RepoResult<usize> {
        debug!("Expire stale pending redemptions.");

        acl::check(&*self.acl, Resource::Redemptions, Action::Update, self, None)?;

        let filtered = Redemptions::redemptions
            .filter(Redemptions::status.eq(RedemptionStatus::Pending))
            .filter(Redemptions::expires_at.lt(now));

        diesel::update(filtered)
            .set(Redemptions::status.eq(RedemptionStatus::Expired))
            .execute(self.db_conn)
            .map_err(From::from)
            .map_err(|e: FailureError| e.context("Expire stale pending redemptions error occurred").into())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, Redemption>
    for RedemptionsRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&Redemption>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(redemption) = obj {
                    redemption.user_id == user_id
                } else {
                    false
                }
            }
        }
    }
}
