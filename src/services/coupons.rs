//! Coupons Services, presents CRUD operations with coupons

use std::time::SystemTime;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use errors::Error;
use models::validation_rules::validate_coupon_window;
use models::*;
use repos::{CouponSearch, ReposFactory};
use services::Service;

pub trait CouponsService {
    /// Creates new coupon
    fn create_coupon(&self, payload: NewCoupon) -> ServiceFuture<Coupon>;
    /// Returns coupon by id
    fn get_coupon(&self, id_arg: CouponId) -> ServiceFuture<Option<Coupon>>;
    /// Returns coupons that are live right now
    fn list_live_coupons(&self) -> ServiceFuture<Vec<Coupon>>;
    /// Search coupons
    fn find_coupons(&self, search: CouponSearch) -> ServiceFuture<Vec<Coupon>>;
    /// Update coupon
    fn update_coupon(&self, id_arg: CouponId, payload: UpdateCoupon) -> ServiceFuture<Coupon>;
    /// Deactivates coupon
    fn deactivate_coupon(&self, id_arg: CouponId) -> ServiceFuture<Coupon>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > CouponsService for Service<T, M, F>
{
    /// Creates new coupon
    fn create_coupon(&self, payload: NewCoupon) -> ServiceFuture<Coupon> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                payload.validate().map_err(Error::Validate).map_err(FailureError::from)?;
                validate_coupon_window(payload.valid_from, payload.valid_until)
                    .map_err(Error::Validate)
                    .map_err(FailureError::from)?;

                let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);
                conn.transaction::<Coupon, FailureError, _>(move || coupons_repo.create(payload))
            }.map_err(|e: FailureError| e.context("Service Coupons, create_coupon endpoint error occurred.").into())
        })
    }

    /// Returns coupon by id
    fn get_coupon(&self, id_arg: CouponId) -> ServiceFuture<Option<Coupon>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);

            coupons_repo
                .get(id_arg)
                .map_err(|e| e.context("Service Coupons, get_coupon endpoint error occurred.").into())
        })
    }

    /// Returns coupons that are live right now
    fn list_live_coupons(&self) -> ServiceFuture<Vec<Coupon>> {
        self.find_coupons(CouponSearch::Live(SystemTime::now()))
    }

    /// Search coupons
    fn find_coupons(&self, search: CouponSearch) -> ServiceFuture<Vec<Coupon>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);

            coupons_repo
                .find_by(search)
                .map_err(|e| e.context("Service Coupons, find_coupons endpoint error occurred.").into())
        })
    }

    /// Update coupon
    fn update_coupon(&self, id_arg: CouponId, payload: UpdateCoupon) -> ServiceFuture<Coupon> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                payload.validate().map_err(Error::Validate).map_err(FailureError::from)?;

                let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);
                coupons_repo.update(id_arg, payload)
            }.map_err(|e: FailureError| e.context("Service Coupons, update_coupon endpoint error occurred.").into())
        })
    }

    /// Deactivates coupon
    fn deactivate_coupon(&self, id_arg: CouponId) -> ServiceFuture<Coupon> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);

            coupons_repo
                .deactivate(id_arg)
                .map_err(|e| e.context("Service Coupons, deactivate_coupon endpoint error occurred.").into())
        })
    }
}
