use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Error as FailureError;

use models::authorization::*;
use models::{Business, BusinessId, NewBusiness, UpdateBusiness, UserId};
use repos::acl;
use repos::legacy_acl::CheckScope;
use repos::types::{RepoAcl, RepoResult};
use schema::businesses::dsl as Businesses;

/// Businesses repository, responsible for handling businesses table
pub struct BusinessesRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<RepoAcl<Business>>,
}

pub trait BusinessesRepo {
    /// Creates new business
    fn create(&self, payload: NewBusiness) -> RepoResult<Business>;

    /// Get business
    fn get(&self, id_arg: BusinessId) -> RepoResult<Option<Business>>;

    /// List all active businesses
    fn list_active(&self) -> RepoResult<Vec<Business>>;

    /// Update business
    fn update(&self, id_arg: BusinessId, payload: UpdateBusiness) -> RepoResult<Business>;

    /// Deactivate business
    fn deactivate(&self, id_arg: BusinessId) -> RepoResult<Business>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> BusinessesRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<RepoAcl<Business>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> BusinessesRepo
    for BusinessesRepoImpl<'a, T>
{
    /// Creates new business
    fn create(&self, payload: NewBusiness) -> RepoResult<Business> {
        debug!("Create new business {:?}.", payload);

        let query = diesel::insert_into(Businesses::businesses).values(&payload);
        query
            .get_result::<Business>(self.db_conn)
            .map_err(From::from)
            .and_then(|value| {
                acl::check(&*self.acl, Resource::Businesses, Action::Create, self, Some(&value))?;

                Ok(value)
            }).map_err(|e: FailureError| e.context(format!("Creates new business: {:?} error occurred", payload)).into())
    }

    /// Get business
    fn get(&self, id_arg: BusinessId) -> RepoResult<Option<Business>> {
        debug!("Find in business with id {}.", id_arg);
        let query = Businesses::businesses.filter(Businesses::id.eq(&id_arg));
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|value: Option<Business>| {
                if let Some(value) = value.as_ref() {
                    acl::check(&*self.acl, Resource::Businesses, Action::Read, self, Some(value))?;
                };

                Ok(value)
            }).map_err(|e: FailureError| e.context(format!("Find business by id: {} error occurred", id_arg)).into())
    }

    /// List all active businesses
    fn list_active(&self) -> RepoResult<Vec<Business>> {
        debug!("Find all active businesses.");
        let query = Businesses::businesses.filter(Businesses::is_active.eq(true)).order(Businesses::id);

        query
            .get_results(self.db_conn)
            .map_err(From::from)
            .and_then(|values: Vec<Business>| {
                for value in &values {
                    acl::check(&*self.acl, Resource::Businesses, Action::Read, self, Some(&value))?;
                }

                Ok(values)
            }).map_err(|e: FailureError| e.context("List all active businesses").into())
    }

    /// Update business
    fn update(&self, id_arg: BusinessId, payload: UpdateBusiness) -> RepoResult<Business> {
        debug!("Updating business with id {} and payload {:?}.", id_arg, payload);
        let query = Businesses::businesses.find(&id_arg);

        query
            .get_result(self.db_conn)
            .map_err(From::from)
            .and_then(|value| acl::check(&*self.acl, Resource::Businesses, Action::Update, self, Some(&value)))
            .and_then(|_| {
                let filtered = Businesses::businesses.filter(Businesses::id.eq(&id_arg));
                let query = diesel::update(filtered).set(&payload);

                query.get_result::<Business>(self.db_conn).map_err(From::from)
            }).map_err(|e: FailureError| {
                e.context(format!(
                    "Updates specific business: id: {}, payload: {:?}, error occurred",
                    id_arg, payload
                )).into()
            })
    }

    /// Deactivate business
    fn deactivate(&self, id_arg: BusinessId) -> RepoResult<Business> {
        debug!("Deactivate business with id {:?}.", id_arg);

        acl::check(&*self.acl, Resource::Businesses, Action::Delete, self, None)?;

        let filtered = Businesses::businesses.filter(Businesses::id.eq(&id_arg));
        let query = diesel::update(filtered).set(Businesses::is_active.eq(false));

        query
            .get_result::<Business>(self.db_conn)
            .map_err(From::from)
            .map_err(|e: FailureError| e.context(format!("Deactivate business: {:?} error occurred", id_arg)).into())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, Business>
    for BusinessesRepoImpl<'a, T>
{
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&Business>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => false,
        }
    }
}
