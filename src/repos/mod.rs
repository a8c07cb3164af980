//! Repos is a module responsible for interacting with postgres db

#[macro_use]
pub mod acl;
pub mod analytics_events;
pub mod businesses;
pub mod coupons;
pub mod legacy_acl;
pub mod redemptions;
pub mod repo_factory;
pub mod types;
pub mod user_roles;

pub use self::acl::*;
pub use self::analytics_events::*;
pub use self::businesses::*;
pub use self::coupons::*;
pub use self::redemptions::*;
pub use self::repo_factory::*;
pub use self::types::*;
pub use self::user_roles::*;
