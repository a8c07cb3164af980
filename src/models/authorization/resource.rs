//! Enum for resources available in ACLs
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resource {
    AnalyticsEvents,
    Businesses,
    Coupons,
    Redemptions,
    UserRoles,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Resource::AnalyticsEvents => write!(f, "analytics events"),
            Resource::Businesses => write!(f, "businesses"),
            Resource::Coupons => write!(f, "coupons"),
            Resource::Redemptions => write!(f, "redemptions"),
            Resource::UserRoles => write!(f, "user roles"),
        }
    }
}
