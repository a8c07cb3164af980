//! Newtype identifiers used across models, repos and services

use std::fmt;

use diesel::sql_types::{Integer, VarChar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression, Default)]
#[sql_type = "Integer"]
pub struct BusinessId(pub i32);
newtype_id!(BusinessId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression, Default)]
#[sql_type = "Integer"]
pub struct CouponId(pub i32);
newtype_id!(CouponId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression, Default)]
#[sql_type = "Integer"]
pub struct RedemptionId(pub i32);
newtype_id!(RedemptionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression, Default)]
#[sql_type = "Integer"]
pub struct UserId(pub i32);
newtype_id!(UserId);

/// Machine-scannable redemption code, unique per redemption at the store level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
pub struct ScanCode(pub String);
newtype_code!(ScanCode);

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CouponId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for RedemptionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ScanCode {
    fn from(code: String) -> Self {
        ScanCode(code)
    }
}
