use controller::router::RouteParser;
use models::{BusinessId, CouponId, RedemptionId, ScanCode};

/// List of all routes with params for the app
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    Healthcheck,
    Businesses,
    Business(BusinessId),
    BusinessCoupons(BusinessId),
    Coupons,
    Coupon(CouponId),
    Redemptions,
    RedemptionByScanCode(ScanCode),
    RedemptionsRedeemed,
    RedemptionCancel(RedemptionId),
    RedemptionsStats,
}

pub fn create_route_parser() -> RouteParser<Route> {
    let mut router = RouteParser::default();

    // Healthcheck
    router.add_route(r"^/healthcheck$", || Route::Healthcheck);

    // Businesses Routes
    router.add_route(r"^/businesses$", || Route::Businesses);

    // Businesses/:id route
    router.add_route_with_params(r"^/businesses/(\d+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse::<i32>().ok())
            .map(|business_id| Route::Business(BusinessId(business_id)))
    });

    // Businesses/:id/coupons route
    router.add_route_with_params(r"^/businesses/(\d+)/coupons$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse::<i32>().ok())
            .map(|business_id| Route::BusinessCoupons(BusinessId(business_id)))
    });

    // Coupons Routes
    router.add_route(r"^/coupons$", || Route::Coupons);

    // Coupons/:id route
    router.add_route_with_params(r"^/coupons/(\d+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse::<i32>().ok())
            .map(|coupon_id| Route::Coupon(CouponId(coupon_id)))
    });

    // Redemptions Routes
    router.add_route(r"^/redemptions$", || Route::Redemptions);

    // Redemptions redeemed route
    router.add_route(r"^/redemptions/redeemed$", || Route::RedemptionsRedeemed);

    // Redemptions stats route
    router.add_route(r"^/redemptions/stats$", || Route::RedemptionsStats);

    // Redemptions/by_scan_code/:code route
    router.add_route_with_params(r"^/redemptions/by_scan_code/([A-Z0-9-]+)$", |params| {
        params
            .get(0)
            .map(|code| Route::RedemptionByScanCode(ScanCode(code.to_string())))
    });

    // Redemptions/:id/cancel route
    router.add_route_with_params(r"^/redemptions/(\d+)/cancel$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse::<i32>().ok())
            .map(|redemption_id| Route::RedemptionCancel(RedemptionId(redemption_id)))
    });

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        let router = create_route_parser();

        assert_eq!(router.test("/healthcheck"), Some(Route::Healthcheck));
        assert_eq!(router.test("/businesses"), Some(Route::Businesses));
        assert_eq!(router.test("/businesses/12"), Some(Route::Business(BusinessId(12))));
        assert_eq!(router.test("/businesses/12/coupons"), Some(Route::BusinessCoupons(BusinessId(12))));
        assert_eq!(router.test("/coupons/7"), Some(Route::Coupon(CouponId(7))));
        assert_eq!(router.test("/redemptions"), Some(Route::Redemptions));
        assert_eq!(router.test("/redemptions/redeemed"), Some(Route::RedemptionsRedeemed));
        assert_eq!(router.test("/redemptions/stats"), Some(Route::RedemptionsStats));
        assert_eq!(
            router.test("/redemptions/by_scan_code/RDM-SB63DC0-QX14PT7M2"),
            Some(Route::RedemptionByScanCode(ScanCode("RDM-SB63DC0-QX14PT7M2".to_string())))
        );
        assert_eq!(router.test("/redemptions/3/cancel"), Some(Route::RedemptionCancel(RedemptionId(3))));
    }

    #[test]
    fn test_unknown_route() {
        let router = create_route_parser();

        assert_eq!(router.test("/unknown"), None);
        assert_eq!(router.test("/businesses/not_a_number"), None);
        assert_eq!(router.test("/redemptions/by_scan_code/lower_case!"), None);
    }
}
