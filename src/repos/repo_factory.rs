use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;

use models::*;
use repos::legacy_acl::{Acl, SystemACL};
use repos::*;

pub trait ReposFactory<C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>:
    Clone + Send + 'static
{
    fn create_businesses_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<BusinessesRepo + 'a>;
    fn create_coupons_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<CouponsRepo + 'a>;
    fn create_coupons_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<CouponsRepo + 'a>;
    fn create_redemptions_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<RedemptionsRepo + 'a>;
    fn create_redemptions_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<RedemptionsRepo + 'a>;
    fn create_analytics_events_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<AnalyticsEventsRepo + 'a>;
    fn create_user_roles_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UserRolesRepo + 'a>;
}

#[derive(Clone, Default)]
pub struct ReposFactoryImpl;

impl ReposFactoryImpl {
    pub fn new() -> Self {
        ReposFactoryImpl
    }

    pub fn get_roles<'a, C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>(
        &self,
        id: UserId,
        db_conn: &'a C,
    ) -> Vec<Role> {
        self.create_user_roles_repo_with_sys_acl(db_conn)
            .list_for_user(id)
            .ok()
            .unwrap_or_default()
    }

    fn get_acl<'a, T, C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>(
        &self,
        db_conn: &'a C,
        user_id: Option<UserId>,
    ) -> Box<Acl<Resource, Action, Scope, FailureError, T>> {
        user_id.map_or(
            Box::new(UnauthorizedAcl::default()) as Box<Acl<Resource, Action, Scope, FailureError, T>>,
            |id| {
                let roles = self.get_roles(id, db_conn);
                (Box::new(ApplicationAcl::new(roles, id)) as Box<Acl<Resource, Action, Scope, FailureError, T>>)
            },
        )
    }
}

impl<C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> ReposFactory<C> for ReposFactoryImpl {
    fn create_businesses_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<BusinessesRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(BusinessesRepoImpl::new(db_conn, acl)) as Box<BusinessesRepo>
    }
    fn create_coupons_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<CouponsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(CouponsRepoImpl::new(db_conn, acl)) as Box<CouponsRepo>
    }
    fn create_coupons_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<CouponsRepo + 'a> {
        Box::new(CouponsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, Coupon>>,
        )) as Box<CouponsRepo>
    }
    fn create_redemptions_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<RedemptionsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(RedemptionsRepoImpl::new(db_conn, acl)) as Box<RedemptionsRepo>
    }
    fn create_redemptions_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<RedemptionsRepo + 'a> {
        Box::new(RedemptionsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, Redemption>>,
        )) as Box<RedemptionsRepo>
    }
    fn create_analytics_events_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<AnalyticsEventsRepo + 'a> {
        Box::new(AnalyticsEventsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, AnalyticsEvent>>,
        )) as Box<AnalyticsEventsRepo>
    }
    fn create_user_roles_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UserRolesRepo + 'a> {
        Box::new(UserRolesRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, UserRole>>,
        )) as Box<UserRolesRepo>
    }
}

#[cfg(test)]
pub mod tests {

    use std::error::Error;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime};

    use diesel::connection::AnsiTransactionManager;
    use diesel::connection::SimpleConnection;
    use diesel::deserialize::QueryableByName;
    use diesel::pg::Pg;
    use diesel::query_builder::AsQuery;
    use diesel::query_builder::QueryFragment;
    use diesel::query_builder::QueryId;
    use diesel::sql_types::HasSqlType;
    use diesel::Connection;
    use diesel::ConnectionResult;
    use diesel::QueryResult;
    use diesel::Queryable;
    use failure::Error as FailureError;
    use futures_cpupool::CpuPool;
    use r2d2;
    use r2d2::ManageConnection;

    use config::Config;
    use controller::context::{DynamicContext, StaticContext};
    use errors::Error as AppError;
    use models::*;
    use repos::*;
    use services::Service;

    pub static MOCK_USER_ID: UserId = UserId(1);
    pub static MOCK_BUSINESS_ID: BusinessId = BusinessId(1);
    pub static MOCK_COUPON_ID: CouponId = CouponId(1);

    pub fn create_service(
        user_id: Option<UserId>,
        repo_factory: ReposFactoryMock,
    ) -> Service<MockConnection, MockConnectionManager, ReposFactoryMock> {
        let manager = MockConnectionManager::default();
        let db_pool = r2d2::Pool::builder().build(manager).expect("Failed to create connection pool");
        let cpu_pool = CpuPool::new(1);

        let config = Config::new().unwrap();
        let static_context = StaticContext::new(db_pool, cpu_pool, Arc::new(config), repo_factory);
        let dynamic_context = DynamicContext::new(user_id);

        Service::new(static_context, dynamic_context)
    }

    pub fn create_test_business(id: BusinessId) -> Business {
        let yesterday = SystemTime::now() - Duration::from_secs(86_400);
        Business {
            id,
            name: "Corner Cafe".to_string(),
            category: BusinessCategory::Restaurant,
            email: "owner@cornercafe.test".to_string(),
            phone: Some("5035551234".to_string()),
            street_address: "100 Main St".to_string(),
            city: "Portland".to_string(),
            state: "OR".to_string(),
            latitude: 45.5152,
            longitude: -122.6784,
            is_active: true,
            created_at: yesterday,
            updated_at: yesterday,
        }
    }

    /// Coupon live for a day around the current instant
    pub fn create_test_coupon(id: CouponId) -> Coupon {
        let now = SystemTime::now();
        Coupon {
            id,
            business_id: MOCK_BUSINESS_ID,
            title: "Free coffee with pastry".to_string(),
            description: "One free drip coffee with any pastry purchase".to_string(),
            discount_type: DiscountType::FreeItem,
            discount_value: 3.5,
            usage_limit_type: UsageLimit::Once,
            max_uses_per_user: 1,
            max_total_uses: None,
            current_uses: 0,
            valid_from: now - Duration::from_secs(86_400),
            valid_until: now + Duration::from_secs(86_400),
            is_active: true,
            created_at: now - Duration::from_secs(86_400),
            updated_at: now - Duration::from_secs(86_400),
        }
    }

    /// Shared in-memory storage standing in for the store; repos created by
    /// the factory operate on the same rows, so multi-step service flows see
    /// each other's writes like they would through a real connection.
    #[derive(Clone, Default)]
    pub struct ReposFactoryMock {
        pub businesses: Arc<Mutex<Vec<Business>>>,
        pub coupons: Arc<Mutex<Vec<Coupon>>>,
        pub redemptions: Arc<Mutex<Vec<Redemption>>>,
        pub analytics_events: Arc<Mutex<Vec<NewAnalyticsEvent>>>,
    }

    impl ReposFactoryMock {
        pub fn with_business_and_coupon() -> Self {
            let factory = ReposFactoryMock::default();
            factory.seed_business(create_test_business(MOCK_BUSINESS_ID));
            factory.seed_coupon(create_test_coupon(MOCK_COUPON_ID));
            factory
        }

        pub fn seed_business(&self, business: Business) {
            self.businesses.lock().unwrap().push(business);
        }

        pub fn seed_coupon(&self, coupon: Coupon) {
            self.coupons.lock().unwrap().push(coupon);
        }

        pub fn coupon(&self, id: CouponId) -> Option<Coupon> {
            self.coupons.lock().unwrap().iter().find(|c| c.id == id).cloned()
        }

        pub fn stored_redemptions(&self) -> Vec<Redemption> {
            self.redemptions.lock().unwrap().clone()
        }

        pub fn analytics_events_count(&self) -> usize {
            self.analytics_events.lock().unwrap().len()
        }
    }

    impl<C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> ReposFactory<C> for ReposFactoryMock {
        fn create_businesses_repo<'a>(&self, _db_conn: &'a C, _user_id: Option<UserId>) -> Box<BusinessesRepo + 'a> {
            Box::new(BusinessesRepoMock {
                storage: self.businesses.clone(),
            }) as Box<BusinessesRepo>
        }
        fn create_coupons_repo<'a>(&self, _db_conn: &'a C, _user_id: Option<UserId>) -> Box<CouponsRepo + 'a> {
            Box::new(CouponsRepoMock {
                storage: self.coupons.clone(),
            }) as Box<CouponsRepo>
        }
        fn create_coupons_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<CouponsRepo + 'a> {
            Box::new(CouponsRepoMock {
                storage: self.coupons.clone(),
            }) as Box<CouponsRepo>
        }
        fn create_redemptions_repo<'a>(&self, _db_conn: &'a C, _user_id: Option<UserId>) -> Box<RedemptionsRepo + 'a> {
            Box::new(RedemptionsRepoMock {
                storage: self.redemptions.clone(),
            }) as Box<RedemptionsRepo>
        }
        fn create_redemptions_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<RedemptionsRepo + 'a> {
            Box::new(RedemptionsRepoMock {
                storage: self.redemptions.clone(),
            }) as Box<RedemptionsRepo>
        }
        fn create_analytics_events_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<AnalyticsEventsRepo + 'a> {
            Box::new(AnalyticsEventsRepoMock {
                storage: self.analytics_events.clone(),
            }) as Box<AnalyticsEventsRepo>
        }
        fn create_user_roles_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<UserRolesRepo + 'a> {
            Box::new(UserRolesRepoMock::default()) as Box<UserRolesRepo>
        }
    }

    #[derive(Clone)]
    pub struct BusinessesRepoMock {
        pub storage: Arc<Mutex<Vec<Business>>>,
    }

    impl BusinessesRepo for BusinessesRepoMock {
        fn create(&self, payload: NewBusiness) -> RepoResult<Business> {
            let mut storage = self.storage.lock().unwrap();
            let business = Business {
                id: BusinessId(storage.len() as i32 + 1),
                name: payload.name,
                category: payload.category,
                email: payload.email,
                phone: payload.phone,
                street_address: payload.street_address,
                city: payload.city,
                state: payload.state,
                latitude: payload.latitude,
                longitude: payload.longitude,
                is_active: true,
                created_at: SystemTime::now(),
                updated_at: SystemTime::now(),
            };
            storage.push(business.clone());
            Ok(business)
        }

        fn get(&self, id_arg: BusinessId) -> RepoResult<Option<Business>> {
            Ok(self.storage.lock().unwrap().iter().find(|b| b.id == id_arg).cloned())
        }

        fn list_active(&self) -> RepoResult<Vec<Business>> {
            Ok(self.storage.lock().unwrap().iter().filter(|b| b.is_active).cloned().collect())
        }

        fn update(&self, id_arg: BusinessId, payload: UpdateBusiness) -> RepoResult<Business> {
            let mut storage = self.storage.lock().unwrap();
            let business = storage
                .iter_mut()
                .find(|b| b.id == id_arg)
                .ok_or_else(|| FailureError::from(AppError::NotFound))?;
            if let Some(name) = payload.name {
                business.name = name;
            }
            if let Some(is_active) = payload.is_active {
                business.is_active = is_active;
            }
            Ok(business.clone())
        }

        fn deactivate(&self, id_arg: BusinessId) -> RepoResult<Business> {
            let mut storage = self.storage.lock().unwrap();
            let business = storage
                .iter_mut()
                .find(|b| b.id == id_arg)
                .ok_or_else(|| FailureError::from(AppError::NotFound))?;
            business.is_active = false;
            Ok(business.clone())
        }
    }

    #[derive(Clone)]
    pub struct CouponsRepoMock {
        pub storage: Arc<Mutex<Vec<Coupon>>>,
    }

    impl CouponsRepo for CouponsRepoMock {
        fn create(&self, payload: NewCoupon) -> RepoResult<Coupon> {
            let mut storage = self.storage.lock().unwrap();
            let coupon = Coupon {
                id: CouponId(storage.len() as i32 + 1),
                business_id: payload.business_id,
                title: payload.title,
                description: payload.description,
                discount_type: payload.discount_type,
                discount_value: payload.discount_value,
                usage_limit_type: payload.usage_limit_type,
                max_uses_per_user: payload.max_uses_per_user,
                max_total_uses: payload.max_total_uses,
                current_uses: 0,
                valid_from: payload.valid_from,
                valid_until: payload.valid_until,
                is_active: true,
                created_at: SystemTime::now(),
                updated_at: SystemTime::now(),
            };
            storage.push(coupon.clone());
            Ok(coupon)
        }

        fn get(&self, id_arg: CouponId) -> RepoResult<Option<Coupon>> {
            Ok(self.storage.lock().unwrap().iter().find(|c| c.id == id_arg).cloned())
        }

        fn find_by(&self, search: CouponSearch) -> RepoResult<Vec<Coupon>> {
            let storage = self.storage.lock().unwrap();
            let coupons = match search {
                CouponSearch::Business(business_id) => {
                    storage.iter().filter(|c| c.business_id == business_id).cloned().collect()
                }
                CouponSearch::Live(now) => storage.iter().filter(|c| c.is_live(now)).cloned().collect(),
            };
            Ok(coupons)
        }

        fn update(&self, id_arg: CouponId, payload: UpdateCoupon) -> RepoResult<Coupon> {
            let mut storage = self.storage.lock().unwrap();
            let coupon = storage
                .iter_mut()
                .find(|c| c.id == id_arg)
                .ok_or_else(|| FailureError::from(AppError::NotFound))?;
            if let Some(title) = payload.title {
                coupon.title = title;
            }
            if let Some(discount_value) = payload.discount_value {
                coupon.discount_value = discount_value;
            }
            if let Some(max_uses_per_user) = payload.max_uses_per_user {
                coupon.max_uses_per_user = max_uses_per_user;
            }
            if let Some(is_active) = payload.is_active {
                coupon.is_active = is_active;
            }
            Ok(coupon.clone())
        }

        fn deactivate(&self, id_arg: CouponId) -> RepoResult<Coupon> {
            let mut storage = self.storage.lock().unwrap();
            let coupon = storage
                .iter_mut()
                .find(|c| c.id == id_arg)
                .ok_or_else(|| FailureError::from(AppError::NotFound))?;
            coupon.is_active = false;
            Ok(coupon.clone())
        }

        fn increment_uses(&self, id_arg: CouponId) -> RepoResult<Coupon> {
            let mut storage = self.storage.lock().unwrap();
            let coupon = storage
                .iter_mut()
                .find(|c| c.id == id_arg)
                .ok_or_else(|| FailureError::from(AppError::NotFound))?;
            coupon.current_uses += 1;
            Ok(coupon.clone())
        }
    }

    #[derive(Clone)]
    pub struct RedemptionsRepoMock {
        pub storage: Arc<Mutex<Vec<Redemption>>>,
    }

    impl RedemptionsRepo for RedemptionsRepoMock {
        fn create(&self, payload: NewRedemption) -> RepoResult<Redemption> {
            let mut storage = self.storage.lock().unwrap();
            // same behavior as the unique constraint on scan_code
            if storage.iter().any(|r| r.scan_code == payload.scan_code) {
                return Err(format_err!("duplicate key value violates unique constraint")
                    .context(AppError::DuplicateCode)
                    .into());
            }
            let redemption = Redemption {
                id: RedemptionId(storage.len() as i32 + 1),
                coupon_id: payload.coupon_id,
                business_id: payload.business_id,
                user_id: payload.user_id,
                scan_code: payload.scan_code,
                display_code: payload.display_code,
                verification_code: payload.verification_code,
                status: payload.status,
                created_at: payload.created_at,
                expires_at: payload.expires_at,
                redeemed_at: None,
                redemption_latitude: payload.redemption_latitude,
                redemption_longitude: payload.redemption_longitude,
                discount_amount: payload.discount_amount,
            };
            storage.push(redemption.clone());
            Ok(redemption)
        }

        fn get_by_scan_code(&self, scan_code_arg: ScanCode) -> RepoResult<Option<Redemption>> {
            Ok(self.storage.lock().unwrap().iter().find(|r| r.scan_code == scan_code_arg).cloned())
        }

        fn find_by(&self, search: RedemptionSearch) -> RepoResult<Vec<Redemption>> {
            let storage = self.storage.lock().unwrap();
            let mut redemptions: Vec<Redemption> = match search {
                RedemptionSearch::All => storage.clone(),
                RedemptionSearch::User(user_id) => storage.iter().filter(|r| r.user_id == user_id).cloned().collect(),
                RedemptionSearch::Business(business_id) => {
                    storage.iter().filter(|r| r.business_id == business_id).cloned().collect()
                }
            };
            redemptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(redemptions)
        }

        fn count_redeemed(&self, coupon_id_arg: CouponId, user_id_arg: UserId, since: Option<SystemTime>) -> RepoResult<i64> {
            let storage = self.storage.lock().unwrap();
            let count = storage
                .iter()
                .filter(|r| r.coupon_id == coupon_id_arg)
                .filter(|r| r.user_id == user_id_arg)
                .filter(|r| r.status == RedemptionStatus::Redeemed)
                .filter(|r| since.map(|since| r.created_at >= since).unwrap_or(true))
                .count();
            Ok(count as i64)
        }

        fn mark_redeemed(&self, scan_code_arg: ScanCode, payload: RedeemRedemption) -> RepoResult<Option<Redemption>> {
            let mut storage = self.storage.lock().unwrap();
            let matching = storage
                .iter_mut()
                .find(|r| r.scan_code == scan_code_arg && r.status == RedemptionStatus::Pending && r.expires_at > payload.redeemed_at);
            Ok(matching.map(|redemption| {
                redemption.status = RedemptionStatus::Redeemed;
                redemption.redeemed_at = Some(payload.redeemed_at);
                if payload.redemption_latitude.is_some() {
                    redemption.redemption_latitude = payload.redemption_latitude;
                }
                if payload.redemption_longitude.is_some() {
                    redemption.redemption_longitude = payload.redemption_longitude;
                }
                redemption.clone()
            }))
        }

        fn cancel(&self, id_arg: RedemptionId) -> RepoResult<Option<Redemption>> {
            let mut storage = self.storage.lock().unwrap();
            let matching = storage.iter_mut().find(|r| r.id == id_arg && r.status == RedemptionStatus::Pending);
            Ok(matching.map(|redemption| {
                redemption.status = RedemptionStatus::Cancelled;
                redemption.clone()
            }))
        }

        fn expire_stale(&self, now: SystemTime) -> RepoResult<usize> {
            let mut storage = self.storage.lock().unwrap();
            let mut affected = 0;
            for redemption in storage.iter_mut() {
                if redemption.status == RedemptionStatus::Pending && redemption.expires_at < now {
                    redemption.status = RedemptionStatus::Expired;
                    affected += 1;
                }
            }
            Ok(affected)
        }
    }

    #[derive(Clone)]
    pub struct AnalyticsEventsRepoMock {
        pub storage: Arc<Mutex<Vec<NewAnalyticsEvent>>>,
    }

    impl AnalyticsEventsRepo for AnalyticsEventsRepoMock {
        fn create(&self, payload: NewAnalyticsEvent) -> RepoResult<AnalyticsEvent> {
            let mut storage = self.storage.lock().unwrap();
            storage.push(payload.clone());
            Ok(AnalyticsEvent {
                id: storage.len() as i32,
                user_id: payload.user_id,
                event_type: payload.event_type,
                event_data: payload.event_data,
                created_at: SystemTime::now(),
            })
        }
    }

    #[derive(Clone, Default)]
    pub struct UserRolesRepoMock;

    impl UserRolesRepo for UserRolesRepoMock {
        fn list_for_user(&self, user_id_arg: UserId) -> RepoResult<Vec<Role>> {
            Ok(match user_id_arg.0 {
                1 => vec![Role::Superuser],
                _ => vec![Role::User],
            })
        }
    }

    #[derive(Default)]
    pub struct MockConnection {
        tr: AnsiTransactionManager,
    }

    impl Connection for MockConnection {
        type Backend = Pg;
        type TransactionManager = AnsiTransactionManager;

        fn establish(_database_url: &str) -> ConnectionResult<MockConnection> {
            Ok(MockConnection::default())
        }

        fn execute(&self, _query: &str) -> QueryResult<usize> {
            unimplemented!()
        }

        fn query_by_index<T, U>(&self, _source: T) -> QueryResult<Vec<U>>
        where
            T: AsQuery,
            T::Query: QueryFragment<Pg> + QueryId,
            Pg: HasSqlType<T::SqlType>,
            U: Queryable<T::SqlType, Pg>,
        {
            unimplemented!()
        }

        fn query_by_name<T, U>(&self, _source: &T) -> QueryResult<Vec<U>>
        where
            T: QueryFragment<Pg> + QueryId,
            U: QueryableByName<Pg>,
        {
            unimplemented!()
        }

        fn execute_returning_count<T>(&self, _source: &T) -> QueryResult<usize>
        where
            T: QueryFragment<Pg> + QueryId,
        {
            unimplemented!()
        }

        fn transaction_manager(&self) -> &Self::TransactionManager {
            &self.tr
        }
    }

    impl SimpleConnection for MockConnection {
        fn batch_execute(&self, _query: &str) -> QueryResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockConnectionManager;

    impl ManageConnection for MockConnectionManager {
        type Connection = MockConnection;
        type Error = MockError;

        fn connect(&self) -> Result<MockConnection, MockError> {
            Ok(MockConnection::default())
        }

        fn is_valid(&self, _conn: &mut MockConnection) -> Result<(), MockError> {
            Ok(())
        }

        fn has_broken(&self, _conn: &mut MockConnection) -> bool {
            false
        }
    }

    #[derive(Debug)]
    pub struct MockError {}

    impl fmt::Display for MockError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "Mock connection error")
        }
    }

    impl Error for MockError {
        fn description(&self) -> &str {
            "Mock connection error"
        }
    }
}
