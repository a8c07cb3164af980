//! Businesses Services, presents CRUD operations with businesses

use std::cmp::Ordering;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use errors::Error;
use models::*;
use repos::ReposFactory;
use services::Service;

pub trait BusinessesService {
    /// Creates new business
    fn create_business(&self, payload: NewBusiness) -> ServiceFuture<Business>;
    /// Returns business by id
    fn get_business(&self, id_arg: BusinessId) -> ServiceFuture<Option<Business>>;
    /// Returns active businesses, closest first when a point is given
    fn list_businesses(&self, from_point: Option<Coordinates>) -> ServiceFuture<Vec<Business>>;
    /// Deactivates business
    fn deactivate_business(&self, id_arg: BusinessId) -> ServiceFuture<Business>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > BusinessesService for Service<T, M, F>
{
    /// Creates new business
    fn create_business(&self, payload: NewBusiness) -> ServiceFuture<Business> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            payload.validate().map_err(Error::Validate).map_err(FailureError::from)?;

            let businesses_repo = repo_factory.create_businesses_repo(&*conn, user_id);
            conn.transaction::<Business, FailureError, _>(move || businesses_repo.create(payload))
                .map_err(|e| e.context("Service Businesses, create_business endpoint error occurred.").into())
        })
    }

    /// Returns business by id
    fn get_business(&self, id_arg: BusinessId) -> ServiceFuture<Option<Business>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let businesses_repo = repo_factory.create_businesses_repo(&*conn, user_id);

            businesses_repo
                .get(id_arg)
                .map_err(|e| e.context("Service Businesses, get_business endpoint error occurred.").into())
        })
    }

    /// Returns active businesses, closest first when a point is given
    fn list_businesses(&self, from_point: Option<Coordinates>) -> ServiceFuture<Vec<Business>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                if let Some(from_point) = from_point {
                    from_point.validate().map_err(Error::Validate).map_err(FailureError::from)?;
                }

                let businesses_repo = repo_factory.create_businesses_repo(&*conn, user_id);
                let mut businesses = businesses_repo.list_active()?;

                if let Some(from_point) = from_point {
                    businesses.sort_by(|a, b| {
                        let to_a = distance_miles(
                            from_point,
                            Coordinates {
                                latitude: a.latitude,
                                longitude: a.longitude,
                            },
                        );
                        let to_b = distance_miles(
                            from_point,
                            Coordinates {
                                latitude: b.latitude,
                                longitude: b.longitude,
                            },
                        );
                        to_a.partial_cmp(&to_b).unwrap_or(Ordering::Equal)
                    });
                }

                Ok(businesses)
            }.map_err(|e: FailureError| e.context("Service Businesses, list_businesses endpoint error occurred.").into())
        })
    }

    /// Deactivates business
    fn deactivate_business(&self, id_arg: BusinessId) -> ServiceFuture<Business> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let businesses_repo = repo_factory.create_businesses_repo(&*conn, user_id);

            businesses_repo
                .deactivate(id_arg)
                .map_err(|e| e.context("Service Businesses, deactivate_business endpoint error occurred.").into())
        })
    }
}
