//! `Controller` is a top layer that handles all http-related
//! stuff like reading bodies, parsing params, forming a response.
//! Basically it provides inputs to `Service` layer and converts outputs
//! of `Service` layer to http responses

pub mod app;
pub mod context;
pub mod router;
pub mod routes;
pub mod types;
pub mod utils;

use std::sync::Arc;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use futures::{future, Future};
use hyper::header::Authorization;
use hyper::server::Request;
use hyper::Method::{Delete, Get, Post, Put};
use r2d2::ManageConnection;

use self::context::{DynamicContext, StaticContext};
use self::router::RouteParser;
use self::routes::{create_route_parser, Route};
use self::types::ControllerFuture;
use self::utils::{parse_body, serialize_future};
use errors::Error;
use models::*;
use repos::repo_factory::ReposFactory;
use repos::CouponSearch;
use services::businesses::BusinessesService;
use services::coupons::CouponsService;
use services::redemptions::RedemptionsService;
use services::system::{SystemService, SystemServiceImpl};
use services::Service;

/// Controller handles route parsing and calling `Service` layer
pub struct ControllerImpl<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub static_context: StaticContext<T, M, F>,
    pub route_parser: Arc<RouteParser<Route>>,
}

impl<T, M, F> ControllerImpl<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    /// Create a new controller based on the static context
    pub fn new(static_context: StaticContext<T, M, F>) -> Self {
        let route_parser = Arc::new(create_route_parser());
        Self {
            static_context,
            route_parser,
        }
    }

    /// Handle a request and get future response
    pub fn call(&self, req: Request) -> ControllerFuture {
        let user_id = req
            .headers()
            .get::<Authorization<String>>()
            .and_then(|auth| auth.0.parse::<i32>().ok())
            .map(UserId);

        let dynamic_context = DynamicContext::new(user_id);
        let service = Service::new(self.static_context.clone(), dynamic_context);

        let method = req.method().clone();
        let path = req.path().to_string();
        let query = req.query().unwrap_or_default().to_string();

        match (method, self.route_parser.test(&path)) {
            // GET /healthcheck
            (Get, Some(Route::Healthcheck)) => serialize_future(SystemServiceImpl::default().healthcheck()),

            // GET /businesses
            (Get, Some(Route::Businesses)) => {
                let (latitude, longitude) = parse_query!(query, "latitude" => f64, "longitude" => f64);
                let from_point = match (latitude, longitude) {
                    (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
                    _ => None,
                };
                serialize_future(service.list_businesses(from_point))
            }

            // POST /businesses
            (Post, Some(Route::Businesses)) => serialize_future(
                parse_body::<NewBusiness>(req.body()).and_then(move |new_business| service.create_business(new_business)),
            ),

            // GET /businesses/<business_id>
            (Get, Some(Route::Business(business_id))) => serialize_future(service.get_business(business_id)),

            // DELETE /businesses/<business_id>
            (Delete, Some(Route::Business(business_id))) => serialize_future(service.deactivate_business(business_id)),

            // GET /businesses/<business_id>/coupons
            (Get, Some(Route::BusinessCoupons(business_id))) => {
                serialize_future(service.find_coupons(CouponSearch::Business(business_id)))
            }

            // GET /coupons
            (Get, Some(Route::Coupons)) => serialize_future(service.list_live_coupons()),

            // POST /coupons
            (Post, Some(Route::Coupons)) => {
                serialize_future(parse_body::<NewCoupon>(req.body()).and_then(move |new_coupon| service.create_coupon(new_coupon)))
            }

            // GET /coupons/<coupon_id>
            (Get, Some(Route::Coupon(coupon_id))) => serialize_future(service.get_coupon(coupon_id)),

            // PUT /coupons/<coupon_id>
            (Put, Some(Route::Coupon(coupon_id))) => serialize_future(
                parse_body::<UpdateCoupon>(req.body()).and_then(move |update_coupon| service.update_coupon(coupon_id, update_coupon)),
            ),

            // DELETE /coupons/<coupon_id>
            (Delete, Some(Route::Coupon(coupon_id))) => serialize_future(service.deactivate_coupon(coupon_id)),

            // POST /redemptions
            (Post, Some(Route::Redemptions)) => serialize_future(
                parse_body::<CreateRedemptionPayload>(req.body()).and_then(move |payload| service.create_redemption(payload)),
            ),

            // GET /redemptions
            (Get, Some(Route::Redemptions)) => serialize_future(service.list_redemptions_for_user()),

            // GET /redemptions/by_scan_code/<scan_code>
            (Get, Some(Route::RedemptionByScanCode(scan_code))) => {
                serialize_future(service.get_redemption_by_scan_code(scan_code))
            }

            // POST /redemptions/redeemed
            (Post, Some(Route::RedemptionsRedeemed)) => serialize_future(
                parse_body::<RedeemByScanCodePayload>(req.body()).and_then(move |payload| service.mark_redeemed(payload)),
            ),

            // POST /redemptions/<redemption_id>/cancel
            (Post, Some(Route::RedemptionCancel(redemption_id))) => {
                serialize_future(service.cancel_redemption(redemption_id))
            }

            // GET /redemptions/stats
            (Get, Some(Route::RedemptionsStats)) => {
                let business_id = parse_query!(query, "business_id" => i32);
                serialize_future(service.redemption_stats(business_id.map(BusinessId)))
            }

            // Fallback
            _ => Box::new(future::err(
                format_err!("Url `{}` not found", path).context(Error::NotFound).into(),
            )),
        }
    }
}
