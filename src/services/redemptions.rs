//! Redemptions Services, the only authority creating and transitioning
//! redemption records

use std::time::{Duration, SystemTime};

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use futures::future;
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use errors::Error;
use loaders::countdown::remaining_seconds;
use models::*;
use repos::{RedemptionSearch, RedemptionsRepo, ReposFactory};
use services::Service;

pub trait RedemptionsService {
    /// Creates new pending redemption with a fresh code set for the current
    /// user, after eligibility checks pass
    fn create_redemption(&self, payload: CreateRedemptionPayload) -> ServiceFuture<RedemptionDetails>;
    /// Returns redemption with its business/coupon snapshot by scan code
    fn get_redemption_by_scan_code(&self, scan_code_arg: ScanCode) -> ServiceFuture<Option<RedemptionDetails>>;
    /// Returns the current user's redemptions, newest first
    fn list_redemptions_for_user(&self) -> ServiceFuture<Vec<Redemption>>;
    /// Confirms a pending redemption before its window passes
    fn mark_redeemed(&self, payload: RedeemByScanCodePayload) -> ServiceFuture<Redemption>;
    /// Voids a pending redemption before expiry
    fn cancel_redemption(&self, id_arg: RedemptionId) -> ServiceFuture<Redemption>;
    /// Counts redemptions by status, optionally for one business
    fn redemption_stats(&self, business_id: Option<BusinessId>) -> ServiceFuture<RedemptionStats>;
}

/// Eligibility check evaluated before a redemption is created. All
/// preconditions must hold; each failure maps to its own error so callers can
/// tell "come back later" from "you're capped".
pub fn check_eligibility(coupon: &Coupon, prior_redeemed: i64, now: SystemTime) -> Result<(), Error> {
    if !coupon.is_live(now) {
        return Err(Error::CouponNotLive);
    }

    if let Some(max_total_uses) = coupon.max_total_uses {
        if coupon.current_uses >= max_total_uses {
            return Err(Error::GlobalLimitReached);
        }
    }

    match coupon.usage_limit_type {
        UsageLimit::Unlimited => {}
        _ => {
            if prior_redeemed >= i64::from(coupon.max_uses_per_user) {
                return Err(Error::UserLimitReached);
            }
        }
    }

    Ok(())
}

/// Redemption counts by status plus the summed value snapshot
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct RedemptionStats {
    pub total: i64,
    pub pending: i64,
    pub redeemed: i64,
    pub expired: i64,
    pub cancelled: i64,
    pub total_value: f64,
}

impl RedemptionStats {
    pub fn collect(redemptions: &[Redemption]) -> Self {
        redemptions.iter().fold(RedemptionStats::default(), |mut stats, redemption| {
            stats.total += 1;
            match redemption.status {
                RedemptionStatus::Pending => stats.pending += 1,
                RedemptionStatus::Redeemed => stats.redeemed += 1,
                RedemptionStatus::Expired => stats.expired += 1,
                RedemptionStatus::Cancelled => stats.cancelled += 1,
            }
            if let Some(discount_amount) = redemption.discount_amount {
                stats.total_value += discount_amount;
            }
            stats
        })
    }
}

/// Inserts a pending redemption, regenerating codes on scan code collision.
/// The unique constraint in the store is the authoritative uniqueness check;
/// a collision is a retry, not a caller-facing failure.
fn insert_with_fresh_codes(
    redemptions_repo: &RedemptionsRepo,
    coupon: &Coupon,
    user_id: UserId,
    location: Option<Coordinates>,
    now: SystemTime,
    window: Duration,
    max_attempts: u32,
) -> Result<Redemption, FailureError> {
    let mut attempt = 0;
    loop {
        let codes = RedemptionCodes::generate(now);
        let new_redemption = NewRedemption {
            coupon_id: coupon.id,
            business_id: coupon.business_id,
            user_id,
            scan_code: codes.scan_code,
            display_code: codes.display_code,
            verification_code: codes.verification_code,
            status: RedemptionStatus::Pending,
            created_at: now,
            expires_at: now + window,
            redemption_latitude: location.map(|l| l.latitude),
            redemption_longitude: location.map(|l| l.longitude),
            discount_amount: Some(coupon.discount_value),
        };

        match redemptions_repo.create(new_redemption) {
            Ok(redemption) => return Ok(redemption),
            Err(e) => {
                attempt += 1;
                let code_collision = e.iter_chain().any(|cause| match cause.downcast_ref::<Error>() {
                    Some(&Error::DuplicateCode) => true,
                    _ => false,
                });
                if code_collision && attempt < max_attempts {
                    warn!("Scan code collision on coupon {}, regenerating (attempt {}).", coupon.id, attempt);
                    continue;
                }
                return Err(e);
            }
        }
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > RedemptionsService for Service<T, M, F>
{
    /// Creates new pending redemption with a fresh code set for the current
    /// user.
    ///
    /// The global cap check is read-then-insert, so two simultaneous requests
    /// can both pass it and overshoot `max_total_uses` by a small margin.
    fn create_redemption(&self, payload: CreateRedemptionPayload) -> ServiceFuture<RedemptionDetails> {
        let repo_factory = self.static_context.repo_factory.clone();
        let window = Duration::from_secs(self.static_context.config.redemptions.window_s);
        let max_attempts = self.static_context.config.redemptions.max_code_attempts;

        let user_id = match self.dynamic_context.user_id {
            Some(user_id) => user_id,
            None => {
                return Box::new(future::err(
                    format_err!("Denied request to create redemption for unauthorized user")
                        .context(Error::Forbidden)
                        .into(),
                ));
            }
        };

        self.spawn_on_pool(move |conn| {
            {
                if let Some(location) = payload.location {
                    location.validate().map_err(Error::Validate).map_err(FailureError::from)?;
                }

                let coupons_repo = repo_factory.create_coupons_repo(&*conn, Some(user_id));
                let businesses_repo = repo_factory.create_businesses_repo(&*conn, Some(user_id));
                let redemptions_repo = repo_factory.create_redemptions_repo(&*conn, Some(user_id));
                let counting_repo = repo_factory.create_redemptions_repo_with_sys_acl(&*conn);

                let now = SystemTime::now();

                let coupon = coupons_repo.get(payload.coupon_id)?.ok_or_else(|| -> FailureError {
                    format_err!("Coupon {} does not exist", payload.coupon_id)
                        .context(Error::CouponNotFound)
                        .into()
                })?;

                let window_start = coupon.usage_limit_type.count_window_start(now);
                let prior_redeemed = counting_repo.count_redeemed(coupon.id, user_id, window_start)?;

                check_eligibility(&coupon, prior_redeemed, now).map_err(|e| {
                    format_err!("Coupon {} is not eligible for user {}", coupon.id, user_id).context(e)
                })?;

                let business = businesses_repo.get(coupon.business_id)?.ok_or_else(|| -> FailureError {
                    format_err!("Business {} of coupon {} does not exist", coupon.business_id, coupon.id)
                        .context(Error::NotFound)
                        .into()
                })?;

                let redemption =
                    insert_with_fresh_codes(&*redemptions_repo, &coupon, user_id, payload.location, now, window, max_attempts)?;

                info!(
                    "Created pending redemption {} for coupon {} and user {}, expires at {:?}.",
                    redemption.id, coupon.id, user_id, redemption.expires_at
                );

                let remaining_s = remaining_seconds(redemption.expires_at, now);
                Ok(RedemptionDetails {
                    redemption,
                    coupon,
                    business,
                    remaining_s,
                })
            }.map_err(|e: FailureError| e.context("Service Redemptions, create_redemption endpoint error occurred.").into())
        })
    }

    /// Returns redemption with its business/coupon snapshot by scan code.
    /// Lookup is by possession of the code, so no user scoping applies.
    fn get_redemption_by_scan_code(&self, scan_code_arg: ScanCode) -> ServiceFuture<Option<RedemptionDetails>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                let redemptions_repo = repo_factory.create_redemptions_repo_with_sys_acl(&*conn);
                let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);
                let businesses_repo = repo_factory.create_businesses_repo(&*conn, user_id);

                let redemption = match redemptions_repo.get_by_scan_code(scan_code_arg)? {
                    Some(redemption) => redemption,
                    None => return Ok(None),
                };

                let coupon = coupons_repo.get(redemption.coupon_id)?.ok_or_else(|| -> FailureError {
                    format_err!("Coupon {} of redemption {} does not exist", redemption.coupon_id, redemption.id)
                        .context(Error::NotFound)
                        .into()
                })?;
                let business = businesses_repo.get(redemption.business_id)?.ok_or_else(|| -> FailureError {
                    format_err!("Business {} of redemption {} does not exist", redemption.business_id, redemption.id)
                        .context(Error::NotFound)
                        .into()
                })?;

                let remaining_s = remaining_seconds(redemption.expires_at, SystemTime::now());
                Ok(Some(RedemptionDetails {
                    redemption,
                    coupon,
                    business,
                    remaining_s,
                }))
            }.map_err(|e: FailureError| {
                e.context("Service Redemptions, get_redemption_by_scan_code endpoint error occurred.").into()
            })
        })
    }

    /// Returns the current user's redemptions, newest first
    fn list_redemptions_for_user(&self) -> ServiceFuture<Vec<Redemption>> {
        let repo_factory = self.static_context.repo_factory.clone();

        let user_id = match self.dynamic_context.user_id {
            Some(user_id) => user_id,
            None => {
                return Box::new(future::err(
                    format_err!("Denied request to list redemptions for unauthorized user")
                        .context(Error::Forbidden)
                        .into(),
                ));
            }
        };

        self.spawn_on_pool(move |conn| {
            let redemptions_repo = repo_factory.create_redemptions_repo(&*conn, Some(user_id));

            redemptions_repo
                .find_by(RedemptionSearch::User(user_id))
                .map_err(|e| e.context("Service Redemptions, list_redemptions_for_user endpoint error occurred.").into())
        })
    }

    /// Confirms a pending redemption before its window passes. The transition
    /// itself is a conditional update in the store; usage counter increment
    /// and the analytics event are best-effort bookkeeping that never rolls
    /// it back.
    fn mark_redeemed(&self, payload: RedeemByScanCodePayload) -> ServiceFuture<Redemption> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                if let Some(location) = payload.location {
                    location.validate().map_err(Error::Validate).map_err(FailureError::from)?;
                }

                let redemptions_repo = repo_factory.create_redemptions_repo_with_sys_acl(&*conn);
                let coupons_repo = repo_factory.create_coupons_repo_with_sys_acl(&*conn);
                let analytics_repo = repo_factory.create_analytics_events_repo_with_sys_acl(&*conn);

                let now = SystemTime::now();
                let updated = redemptions_repo.mark_redeemed(payload.scan_code.clone(), RedeemRedemption::new(now, payload.location))?;

                match updated {
                    Some(redemption) => {
                        if let Err(e) = coupons_repo.increment_uses(redemption.coupon_id) {
                            warn!("Failed to increment usage counter of coupon {}: {}", redemption.coupon_id, e);
                        }
                        if let Err(e) = analytics_repo.create(NewAnalyticsEvent::coupon_redeem(&redemption)) {
                            warn!("Failed to record coupon_redeem event for redemption {}: {}", redemption.id, e);
                        }

                        info!("Redemption {} confirmed for coupon {}.", redemption.id, redemption.coupon_id);
                        Ok(redemption)
                    }
                    None => match redemptions_repo.get_by_scan_code(payload.scan_code.clone())? {
                        // still pending means the window has passed
                        Some(ref redemption) if redemption.status == RedemptionStatus::Pending => {
                            Err(format_err!("Redemption {} expired at {:?}", redemption.id, redemption.expires_at)
                                .context(Error::RedemptionExpired)
                                .into())
                        }
                        // terminal or absent: a second confirmation never
                        // silently succeeds
                        _ => Err(format_err!("No pending redemption with scan code {}", payload.scan_code)
                            .context(Error::RedemptionNotFound)
                            .into()),
                    },
                }
            }.map_err(|e: FailureError| e.context("Service Redemptions, mark_redeemed endpoint error occurred.").into())
        })
    }

    /// Voids a pending redemption before expiry
    fn cancel_redemption(&self, id_arg: RedemptionId) -> ServiceFuture<Redemption> {
        let repo_factory = self.static_context.repo_factory.clone();

        let user_id = match self.dynamic_context.user_id {
            Some(user_id) => user_id,
            None => {
                return Box::new(future::err(
                    format_err!("Denied request to cancel redemption for unauthorized user")
                        .context(Error::Forbidden)
                        .into(),
                ));
            }
        };

        self.spawn_on_pool(move |conn| {
            {
                let redemptions_repo = repo_factory.create_redemptions_repo(&*conn, Some(user_id));

                redemptions_repo.cancel(id_arg)?.ok_or_else(|| -> FailureError {
                    format_err!("No pending redemption with id {}", id_arg)
                        .context(Error::RedemptionNotFound)
                        .into()
                })
            }.map_err(|e: FailureError| e.context("Service Redemptions, cancel_redemption endpoint error occurred.").into())
        })
    }

    /// Counts redemptions by status, optionally for one business
    fn redemption_stats(&self, business_id: Option<BusinessId>) -> ServiceFuture<RedemptionStats> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                let redemptions_repo = repo_factory.create_redemptions_repo_with_sys_acl(&*conn);

                let search = match business_id {
                    Some(business_id) => RedemptionSearch::Business(business_id),
                    None => RedemptionSearch::All,
                };
                let redemptions = redemptions_repo.find_by(search)?;

                Ok(RedemptionStats::collect(&redemptions))
            }.map_err(|e: FailureError| e.context("Service Redemptions, redemption_stats endpoint error occurred.").into())
        })
    }
}
