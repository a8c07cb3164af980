use std::time::SystemTime;

use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::sql_types::Bool;
use diesel::Connection;
use failure::Error as FailureError;

use models::authorization::*;
use models::{BusinessId, Coupon, CouponId, NewCoupon, UpdateCoupon, UserId};
use repos::acl;
use repos::legacy_acl::CheckScope;
use repos::types::{RepoAcl, RepoResult};
use schema::coupons::dsl as Coupons;

/// Search coupons
#[derive(Clone, Debug)]
pub enum CouponSearch {
    Business(BusinessId),
    /// Active coupons whose validity window contains the given instant
    Live(SystemTime),
}

/// Coupons repository, responsible for handling coupons table
pub struct CouponsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<RepoAcl<Coupon>>,
}

pub trait CouponsRepo {
    /// Creates new coupon
    fn create(&self, payload: NewCoupon) -> RepoResult<Coupon>;

    /// Get coupon
    fn get(&self, id_arg: CouponId) -> RepoResult<Option<Coupon>>;

    /// Search coupons
    fn find_by(&self, search: CouponSearch) -> RepoResult<Vec<Coupon>>;

    /// Update coupon
    fn update(&self, id_arg: CouponId, payload: UpdateCoupon) -> RepoResult<Coupon>;

    /// Deactivate coupon
    fn deactivate(&self, id_arg: CouponId) -> RepoResult<Coupon>;

    /// Increment the global usage counter by one
    fn increment_uses(&self, id_arg: CouponId) -> RepoResult<Coupon>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CouponsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<RepoAcl<Coupon>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CouponsRepo for CouponsRepoImpl<'a, T> {
    /// Creates new coupon
    fn create(&self, payload: NewCoupon) -> RepoResult<Coupon> {
        debug!("Create new coupon {:?}.", payload);

        let query = diesel::insert_into(Coupons::coupons).values(&payload);
        query
            .get_result::<Coupon>(self.db_conn)
            .map_err(From::from)
            .and_then(|value| {
                acl::check(&*self.acl, Resource::Coupons, Action::Create, self, Some(&value))?;

                Ok(value)
            }).map_err(|e: FailureError| e.context(format!("Creates new coupon: {:?} error occurred", payload)).into())
    }

    /// Get coupon
    fn get(&self, id_arg: CouponId) -> RepoResult<Option<Coupon>> {
        debug!("Find in coupon with id {}.", id_arg);
        let query = Coupons::coupons.filter(Coupons::id.eq(&id_arg));
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|value: Option<Coupon>| {
                if let Some(value) = value.as_ref() {
                    acl::check(&*self.acl, Resource::Coupons, Action::Read, self, Some(value))?;
                };

                Ok(value)
            }).map_err(|e: FailureError| e.context(format!("Find coupon by id: {} error occurred", id_arg)).into())
    }

    /// Search coupons
    fn find_by(&self, search: CouponSearch) -> RepoResult<Vec<Coupon>> {
        debug!("Get coupons by search: {:?}.", search);

        let search_exp: Box<BoxableExpression<Coupons::coupons, Pg, SqlType = Bool>> = match search {
            CouponSearch::Business(business_id) => Box::new(Coupons::business_id.eq(business_id)),
            CouponSearch::Live(now) => Box::new(
                Coupons::is_active
                    .eq(true)
                    .and(Coupons::valid_from.le(now))
                    .and(Coupons::valid_until.ge(now)),
            ),
        };

        let query = Coupons::coupons.filter(search_exp).order(Coupons::id);

        query
            .get_results(self.db_conn)
            .map_err(From::from)
            .and_then(|values: Vec<Coupon>| {
                for value in &values {
                    acl::check(&*self.acl, Resource::Coupons, Action::Read, self, Some(&value))?;
                }

                Ok(values)
            }).map_err(|e: FailureError| e.context("Search coupons failed.").into())
    }

    /// Update coupon
    fn update(&self, id_arg: CouponId, payload: UpdateCoupon) -> RepoResult<Coupon> {
        debug!("Updating coupon with id {} and payload {:?}.", id_arg, payload);
        let query = Coupons::coupons.find(&id_arg);

        query
            .get_result(self.db_conn)
            .map_err(From::from)
            .and_then(|value| acl::check(&*self.acl, Resource::Coupons, Action::Update, self, Some(&value)))
            .and_then(|_| {
                let filtered = Coupons::coupons.filter(Coupons::id.eq(&id_arg));
                let query = diesel::update(filtered).set(&payload);

                query.get_result::<Coupon>(self.db_conn).map_err(From::from)
            }).map_err(|e: FailureError| {
                e.context(format!(
                    "Updates specific coupon: id: {}, payload: {:?}, error occurred",
                    id_arg, payload
                )).into()
            })
    }

    /// Deactivate coupon
    fn deactivate(&self, id_arg: CouponId) -> RepoResult<Coupon> {
        debug!("Deactivate coupon with id {:?}.", id_arg);

        acl::check(&*self.acl, Resource::Coupons, Action::Delete, self, None)?;

        let filtered = Coupons::coupons.filter(Coupons::id.eq(&id_arg));
        let query = diesel::update(filtered).set(Coupons::is_active.eq(false));

        query
            .get_result::<Coupon>(self.db_conn)
            .map_err(From::from)
            .map_err(|e: FailureError| e.context(format!("Deactivate coupon: {:?} error occurred", id_arg)).into())
    }

    /// Increment the global usage counter by one. The increment happens in a
    /// single conditional UPDATE so concurrent confirmations never lose
    /// counts.
    fn increment_uses(&self, id_arg: CouponId) -> RepoResult<Coupon> {
        debug!("Increment usage counter of coupon {}.", id_arg);

        acl::check(&*self.acl, Resource::Coupons, Action::Update, self, None)?;

        let filtered = Coupons::coupons.filter(Coupons::id.eq(&id_arg));
        let query = diesel::update(filtered).set(Coupons::current_uses.eq(Coupons::current_uses + 1));

        query
            .get_result::<Coupon>(self.db_conn)
            .map_err(From::from)
            .map_err(|e: FailureError| e.context(format!("Increment usage counter of coupon: {} error occurred", id_arg)).into())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, Coupon>
    for CouponsRepoImpl<'a, T>
{
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&Coupon>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => false,
        }
    }
}
