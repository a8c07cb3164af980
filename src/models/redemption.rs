//! Model redemptions
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use diesel::sql_types::VarChar;
use rand::{thread_rng, Rng};

use models::{Business, Coordinates, Coupon, BusinessId, CouponId, RedemptionId, ScanCode, UserId};

use schema::redemptions;

/// DB representation of one redemption attempt. Created `pending`,
/// transitions exactly once to a terminal status and is immutable after.
#[derive(Debug, Serialize, Deserialize, Queryable, Clone, Identifiable)]
#[table_name = "redemptions"]
pub struct Redemption {
    pub id: RedemptionId,
    pub coupon_id: CouponId,
    pub business_id: BusinessId,
    pub user_id: UserId,
    pub scan_code: ScanCode,
    pub display_code: String,
    pub verification_code: String,
    pub status: RedemptionStatus,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
    pub redeemed_at: Option<SystemTime>,
    pub redemption_latitude: Option<f64>,
    pub redemption_longitude: Option<f64>,
    pub discount_amount: Option<f64>,
}

/// Payload for inserting a pending redemption
#[derive(Serialize, Deserialize, Insertable, Clone, Debug)]
#[table_name = "redemptions"]
pub struct NewRedemption {
    pub coupon_id: CouponId,
    pub business_id: BusinessId,
    pub user_id: UserId,
    pub scan_code: ScanCode,
    pub display_code: String,
    pub verification_code: String,
    pub status: RedemptionStatus,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
    pub redemption_latitude: Option<f64>,
    pub redemption_longitude: Option<f64>,
    pub discount_amount: Option<f64>,
}

/// Changeset for the pending -> redeemed transition. Location fields are
/// skipped when absent.
#[derive(AsChangeset, Clone, Debug)]
#[table_name = "redemptions"]
pub struct RedeemRedemption {
    pub status: RedemptionStatus,
    pub redeemed_at: SystemTime,
    pub redemption_latitude: Option<f64>,
    pub redemption_longitude: Option<f64>,
}

impl RedeemRedemption {
    pub fn new(redeemed_at: SystemTime, location: Option<Coordinates>) -> Self {
        Self {
            status: RedemptionStatus::Redeemed,
            redeemed_at,
            redemption_latitude: location.map(|l| l.latitude),
            redemption_longitude: location.map(|l| l.longitude),
        }
    }
}

/// Request payload for creating a redemption
#[derive(Deserialize, Clone, Debug)]
pub struct CreateRedemptionPayload {
    pub coupon_id: CouponId,
    pub location: Option<Coordinates>,
}

/// Request payload for confirming a pending redemption by its scan code
#[derive(Deserialize, Clone, Debug)]
pub struct RedeemByScanCodePayload {
    pub scan_code: ScanCode,
    pub location: Option<Coordinates>,
}

/// Redemption with the denormalized business/coupon snapshot for display.
/// `remaining_s` is a derived presentation value, not authoritative state.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RedemptionDetails {
    pub redemption: Redemption,
    pub coupon: Coupon,
    pub business: Business,
    pub remaining_s: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Redeemed,
    Expired,
    Cancelled,
}

diesel_text_enum!(RedemptionStatus);

impl RedemptionStatus {
    pub fn is_terminal(&self) -> bool {
        *self != RedemptionStatus::Pending
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RedemptionStatus::Pending => write!(f, "pending"),
            RedemptionStatus::Redeemed => write!(f, "redeemed"),
            RedemptionStatus::Expired => write!(f, "expired"),
            RedemptionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for RedemptionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RedemptionStatus::Pending),
            "redeemed" => Ok(RedemptionStatus::Redeemed),
            "expired" => Ok(RedemptionStatus::Expired),
            "cancelled" => Ok(RedemptionStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// The three parallel identifiers generated per redemption attempt: one for
/// scanners, one for manual cashier entry, one for a secondary check.
/// Statistical uniqueness only; the store's unique constraint on `scan_code`
/// is the authoritative guarantee and collisions are retried by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RedemptionCodes {
    pub scan_code: ScanCode,
    pub display_code: String,
    pub verification_code: String,
}

/// Unambiguous alphabet for manual entry codes
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const DISPLAY_CODE_LENGTH: usize = 8;
const SCAN_SUFFIX_LENGTH: usize = 9;

impl RedemptionCodes {
    pub const SCAN_CODE_PREFIX: &'static str = "RDM";

    pub fn generate(now: SystemTime) -> RedemptionCodes {
        let mut rng = thread_rng();

        let unix_seconds = now.duration_since(UNIX_EPOCH).unwrap_or(Duration::from_secs(0)).as_secs();
        let suffix = random_code(&mut rng, SCAN_SUFFIX_LENGTH);
        let scan_code = ScanCode(format!("{}-{}-{}", Self::SCAN_CODE_PREFIX, encode_base36(unix_seconds), suffix));

        RedemptionCodes {
            scan_code,
            display_code: random_code(&mut rng, DISPLAY_CODE_LENGTH),
            verification_code: rng.gen_range(100_000u32, 1_000_000).to_string(),
        }
    }
}

fn random_code<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0, CODE_ALPHABET.len())] as char)
        .collect()
}

fn encode_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if value == 0 {
        return "0".to_string();
    }

    let mut encoded = Vec::new();
    while value > 0 {
        encoded.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    encoded.reverse();

    String::from_utf8(encoded).unwrap_or_default()
}
