//! Model coupons
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use diesel::sql_types::VarChar;
use validator::Validate;

use models::validation_rules::*;
use models::{BusinessId, CouponId};

use schema::coupons;

/// DB representation of a coupon
#[derive(Debug, Serialize, Deserialize, Queryable, Clone, Identifiable)]
#[table_name = "coupons"]
pub struct Coupon {
    pub id: CouponId,
    pub business_id: BusinessId,
    pub title: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub usage_limit_type: UsageLimit,
    pub max_uses_per_user: i32,
    pub max_total_uses: Option<i32>,
    pub current_uses: i32,
    pub valid_from: SystemTime,
    pub valid_until: SystemTime,
    pub is_active: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Coupon {
    /// A coupon is live when it is active and `now` falls inside its
    /// validity window (bounds inclusive).
    pub fn is_live(&self, now: SystemTime) -> bool {
        self.is_active && self.valid_from <= now && now <= self.valid_until
    }
}

/// Payload for creating a coupon
#[derive(Serialize, Deserialize, Insertable, Clone, Validate, Debug)]
#[table_name = "coupons"]
pub struct NewCoupon {
    pub business_id: BusinessId,
    #[validate(length(min = "1", message = "Title must not be empty"))]
    pub title: String,
    pub description: String,
    pub discount_type: DiscountType,
    #[validate(custom = "validate_non_negative")]
    pub discount_value: f64,
    pub usage_limit_type: UsageLimit,
    #[validate(custom = "validate_positive_quantity")]
    pub max_uses_per_user: i32,
    pub max_total_uses: Option<i32>,
    pub valid_from: SystemTime,
    pub valid_until: SystemTime,
}

/// Payload for updating a coupon
#[derive(Serialize, Deserialize, Insertable, AsChangeset, Validate, Debug)]
#[table_name = "coupons"]
pub struct UpdateCoupon {
    #[validate(length(min = "1", message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub discount_value: Option<f64>,
    pub usage_limit_type: Option<UsageLimit>,
    #[validate(custom = "validate_positive_quantity")]
    pub max_uses_per_user: Option<i32>,
    pub max_total_uses: Option<i32>,
    pub valid_from: Option<SystemTime>,
    pub valid_until: Option<SystemTime>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    BuyOneGetOne,
    FreeItem,
}

diesel_text_enum!(DiscountType);

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FixedAmount => write!(f, "fixed_amount"),
            DiscountType::BuyOneGetOne => write!(f, "buy_one_get_one"),
            DiscountType::FreeItem => write!(f, "free_item"),
        }
    }
}

impl FromStr for DiscountType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed_amount" => Ok(DiscountType::FixedAmount),
            "buy_one_get_one" => Ok(DiscountType::BuyOneGetOne),
            "free_item" => Ok(DiscountType::FreeItem),
            _ => Err(()),
        }
    }
}

/// Usage-limit policy for the per-user cap. The policy scopes the window the
/// user's prior redeemed records are counted over.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "lowercase")]
pub enum UsageLimit {
    Once,
    Daily,
    Weekly,
    Monthly,
    Unlimited,
}

diesel_text_enum!(UsageLimit);

impl UsageLimit {
    /// Start of the window prior redeemed records are counted over.
    /// `None` means all time (`Once`) or that the cap does not apply
    /// (`Unlimited`).
    pub fn count_window_start(&self, now: SystemTime) -> Option<SystemTime> {
        let now_utc: DateTime<Utc> = now.into();
        let today = now_utc.date();

        match *self {
            UsageLimit::Once | UsageLimit::Unlimited => None,
            UsageLimit::Daily => Some(today.and_hms(0, 0, 0).into()),
            UsageLimit::Weekly => {
                let days_from_monday = i64::from(today.weekday().num_days_from_monday());
                Some((today - ChronoDuration::days(days_from_monday)).and_hms(0, 0, 0).into())
            }
            UsageLimit::Monthly => Some(today.with_day(1).unwrap_or(today).and_hms(0, 0, 0).into()),
        }
    }
}

impl fmt::Display for UsageLimit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            UsageLimit::Once => write!(f, "once"),
            UsageLimit::Daily => write!(f, "daily"),
            UsageLimit::Weekly => write!(f, "weekly"),
            UsageLimit::Monthly => write!(f, "monthly"),
            UsageLimit::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl FromStr for UsageLimit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(UsageLimit::Once),
            "daily" => Ok(UsageLimit::Daily),
            "weekly" => Ok(UsageLimit::Weekly),
            "monthly" => Ok(UsageLimit::Monthly),
            "unlimited" => Ok(UsageLimit::Unlimited),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    // 2024-01-15T10:00:00Z
    const MID_JANUARY: u64 = 1_705_312_800;

    fn at(unix_seconds: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(unix_seconds)
    }

    fn test_coupon(valid_from: SystemTime, valid_until: SystemTime) -> Coupon {
        Coupon {
            id: CouponId(1),
            business_id: BusinessId(1),
            title: "Two tacos for one".to_string(),
            description: "Weekday lunch special".to_string(),
            discount_type: DiscountType::BuyOneGetOne,
            discount_value: 0.0,
            usage_limit_type: UsageLimit::Once,
            max_uses_per_user: 1,
            max_total_uses: None,
            current_uses: 0,
            valid_from,
            valid_until,
            is_active: true,
            created_at: valid_from,
            updated_at: valid_from,
        }
    }

    #[test]
    fn test_coupon_live_inside_window() {
        let coupon = test_coupon(at(MID_JANUARY - 3600), at(MID_JANUARY + 3600));
        assert!(coupon.is_live(at(MID_JANUARY)));
    }

    #[test]
    fn test_coupon_not_live_outside_window() {
        let coupon = test_coupon(at(MID_JANUARY - 7200), at(MID_JANUARY - 3600));
        assert!(!coupon.is_live(at(MID_JANUARY)));

        let coupon = test_coupon(at(MID_JANUARY + 3600), at(MID_JANUARY + 7200));
        assert!(!coupon.is_live(at(MID_JANUARY)));
    }

    #[test]
    fn test_coupon_not_live_when_inactive() {
        let mut coupon = test_coupon(at(MID_JANUARY - 3600), at(MID_JANUARY + 3600));
        coupon.is_active = false;
        assert!(!coupon.is_live(at(MID_JANUARY)));
    }

    #[test]
    fn test_count_window_all_time_policies() {
        let now = at(MID_JANUARY);
        assert_eq!(UsageLimit::Once.count_window_start(now), None);
        assert_eq!(UsageLimit::Unlimited.count_window_start(now), None);
    }

    #[test]
    fn test_count_window_daily_starts_at_midnight() {
        let now = at(MID_JANUARY); // 2024-01-15T10:00:00Z, a Monday
        let start = UsageLimit::Daily.count_window_start(now).unwrap();
        assert_eq!(start, at(MID_JANUARY - 10 * 3600));
    }

    #[test]
    fn test_count_window_weekly_starts_on_monday() {
        // 2024-01-17T10:00:00Z, a Wednesday; week began Monday the 15th
        let now = at(MID_JANUARY + 2 * 86_400);
        let start = UsageLimit::Weekly.count_window_start(now).unwrap();
        assert_eq!(start, at(MID_JANUARY - 10 * 3600));
    }

    #[test]
    fn test_count_window_monthly_starts_on_the_first() {
        let now = at(MID_JANUARY);
        let start = UsageLimit::Monthly.count_window_start(now).unwrap();
        // 2024-01-01T00:00:00Z
        assert_eq!(start, at(1_704_067_200));
    }
}
