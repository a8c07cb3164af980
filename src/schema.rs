/// diesel table for businesses
table! {
    businesses (id) {
        id -> Integer,
        name -> VarChar,
        category -> VarChar,
        email -> VarChar,
        phone -> Nullable<VarChar>,
        street_address -> VarChar,
        city -> VarChar,
        state -> VarChar,
        latitude -> Double,
        longitude -> Double,
        is_active -> Bool,
        created_at -> Timestamp, // UTC 0, generated at db level
        updated_at -> Timestamp, // UTC 0, generated at db level
    }
}

/// diesel table for coupons
table! {
    coupons (id) {
        id -> Integer,
        business_id -> Integer,
        title -> VarChar,
        description -> VarChar,
        discount_type -> VarChar,
        discount_value -> Double,
        usage_limit_type -> VarChar,
        max_uses_per_user -> Integer,
        max_total_uses -> Nullable<Integer>,
        current_uses -> Integer,
        valid_from -> Timestamp,
        valid_until -> Timestamp,
        is_active -> Bool,
        created_at -> Timestamp, // UTC 0, generated at db level
        updated_at -> Timestamp, // UTC 0, generated at db level
    }
}

/// diesel table for redemptions
table! {
    redemptions (id) {
        id -> Integer,
        coupon_id -> Integer,
        business_id -> Integer,
        user_id -> Integer,
        scan_code -> VarChar,
        display_code -> VarChar,
        verification_code -> VarChar,
        status -> VarChar,
        created_at -> Timestamp,
        expires_at -> Timestamp,
        redeemed_at -> Nullable<Timestamp>,
        redemption_latitude -> Nullable<Double>,
        redemption_longitude -> Nullable<Double>,
        discount_amount -> Nullable<Double>,
    }
}

/// diesel table for analytics_events
table! {
    analytics_events (id) {
        id -> Integer,
        user_id -> Nullable<Integer>,
        event_type -> VarChar,
        event_data -> Jsonb,
        created_at -> Timestamp, // UTC 0, generated at db level
    }
}

table! {
    user_roles (id) {
        id -> Integer,
        user_id -> Integer,
        role -> VarChar,
    }
}

joinable!(coupons -> businesses (business_id));
joinable!(redemptions -> businesses (business_id));
joinable!(redemptions -> coupons (coupon_id));
allow_tables_to_appear_in_same_query!(businesses, coupons, redemptions);
