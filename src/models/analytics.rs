//! Model analytics_events
//!
//! Best-effort usage events. Failing to record one never rolls back the
//! operation that produced it.
use std::time::SystemTime;

use serde_json;

use models::{Redemption, UserId};

use schema::analytics_events;

#[derive(Debug, Serialize, Deserialize, Queryable, Clone, Identifiable)]
#[table_name = "analytics_events"]
pub struct AnalyticsEvent {
    pub id: i32,
    pub user_id: Option<UserId>,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub created_at: SystemTime,
}

#[derive(Serialize, Deserialize, Insertable, Clone, Debug)]
#[table_name = "analytics_events"]
pub struct NewAnalyticsEvent {
    pub user_id: Option<UserId>,
    pub event_type: String,
    pub event_data: serde_json::Value,
}

impl NewAnalyticsEvent {
    /// "redemption occurred" event with the coupon, business and discount
    /// metadata snapshot.
    pub fn coupon_redeem(redemption: &Redemption) -> Self {
        Self {
            user_id: Some(redemption.user_id),
            event_type: "coupon_redeem".to_string(),
            event_data: json!({
                "coupon_id": redemption.coupon_id,
                "business_id": redemption.business_id,
                "discount_amount": redemption.discount_amount,
            }),
        }
    }
}
