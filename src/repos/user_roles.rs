use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Error as FailureError;

use models::authorization::*;
use models::{Role, UserId, UserRole};
use repos::legacy_acl::CheckScope;
use repos::types::{RepoAcl, RepoResult};
use schema::user_roles::dsl as UserRoles;

/// UserRoles repository, responsible for reading user roles for the ACL layer
pub struct UserRolesRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<RepoAcl<UserRole>>,
}

pub trait UserRolesRepo {
    /// List roles for user
    fn list_for_user(&self, user_id_arg: UserId) -> RepoResult<Vec<Role>>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> UserRolesRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<RepoAcl<UserRole>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> UserRolesRepo
    for UserRolesRepoImpl<'a, T>
{
    /// List roles for user
    fn list_for_user(&self, user_id_arg: UserId) -> RepoResult<Vec<Role>> {
        debug!("List roles for user {}.", user_id_arg);
        let query = UserRoles::user_roles.filter(UserRoles::user_id.eq(user_id_arg));

        query
            .get_results::<UserRole>(self.db_conn)
            .map(|user_roles| user_roles.into_iter().map(|user_role| user_role.role).collect())
            .map_err(From::from)
            .map_err(|e: FailureError| e.context(format!("List roles for user {} error occurred", user_id_arg)).into())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, UserRole>
    for UserRolesRepoImpl<'a, T>
{
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&UserRole>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(user_role) = obj {
                    user_role.user_id == user_id
                } else {
                    false
                }
            }
        }
    }
}
