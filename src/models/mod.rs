//! Models contains all structures that are used in different
//! modules of the app

pub mod analytics;
pub mod authorization;
pub mod business;
pub mod coupon;
pub mod location;
pub mod redemption;
pub mod types;
pub mod user_role;
pub mod validation_rules;

pub use self::analytics::*;
pub use self::authorization::*;
pub use self::business::*;
pub use self::coupon::*;
pub use self::location::*;
pub use self::redemption::*;
pub use self::types::*;
pub use self::user_role::*;
pub use self::validation_rules::*;
