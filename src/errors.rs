use hyper::StatusCode;
use serde_json;
use validator::ValidationErrors;

/// Crate-wide error kinds. Lower layers attach these as failure context;
/// the controller walks the failure chain and maps the innermost kind to an
/// http status code.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Not found")]
    NotFound,
    #[fail(display = "Coupon not found")]
    CouponNotFound,
    #[fail(display = "Coupon is not live")]
    CouponNotLive,
    #[fail(display = "Coupon total usage limit reached")]
    GlobalLimitReached,
    #[fail(display = "Usage limit for this coupon reached")]
    UserLimitReached,
    #[fail(display = "Redemption not found")]
    RedemptionNotFound,
    #[fail(display = "Redemption window has passed")]
    RedemptionExpired,
    #[fail(display = "Duplicate redemption code")]
    DuplicateCode,
    #[fail(display = "Parse error")]
    Parse,
    #[fail(display = "Validation error: {}", _0)]
    Validate(ValidationErrors),
    #[fail(display = "Server is refusing to fullfil the request")]
    Forbidden,
    #[fail(display = "Connection error")]
    Connection,
}

impl Error {
    /// Converts `Error` to HTTP Status Code
    pub fn code(&self) -> StatusCode {
        match *self {
            Error::NotFound | Error::CouponNotFound | Error::RedemptionNotFound => StatusCode::NotFound,
            Error::CouponNotLive | Error::GlobalLimitReached | Error::UserLimitReached => StatusCode::UnprocessableEntity,
            Error::RedemptionExpired => StatusCode::Gone,
            Error::Validate(_) => StatusCode::BadRequest,
            Error::Parse => StatusCode::UnprocessableEntity,
            Error::Forbidden => StatusCode::Forbidden,
            Error::DuplicateCode | Error::Connection => StatusCode::InternalServerError,
        }
    }

    /// Converts `Error` to a user facing message
    pub fn message(&self) -> String {
        match *self {
            Error::Validate(ref errors) => serde_json::to_string(errors).unwrap_or_else(|_| "Bad request".to_string()),
            Error::DuplicateCode | Error::Connection => "Internal server error".to_string(),
            ref other => format!("{}", other),
        }
    }
}
