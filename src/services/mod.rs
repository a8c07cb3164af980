//! Services is a core layer for the app business logic like
//! eligibility checks, code generation, validation.

pub mod businesses;
pub mod coupons;
pub mod redemptions;
pub mod system;
pub mod types;

pub use self::businesses::*;
pub use self::coupons::*;
pub use self::redemptions::*;
pub use self::system::*;
pub use self::types::*;
