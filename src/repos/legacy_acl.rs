//! Base traits for access control

use models::UserId;

/// Access control layer checked by every repo before data leaves it.
pub trait Acl<Resource, Action, Scope, E, T> {
    /// Tells if a user with `user_id` can do `action` on `resource`.
    /// `scope_checker` returns if this resource is in some scope.
    fn allows(&self, resource: Resource, action: Action, scope_checker: &CheckScope<Scope, T>, obj: Option<&T>) -> Result<bool, E>;
}

pub trait CheckScope<Scope, T> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&T>) -> bool;
}

/// `SystemACL` allows all manipulation with objects in all cases.
#[derive(Clone, Debug, Default)]
pub struct SystemACL;

impl<Resource, Action, Scope, E, T> Acl<Resource, Action, Scope, E, T> for SystemACL {
    fn allows(&self, _resource: Resource, _action: Action, _scope_checker: &CheckScope<Scope, T>, _obj: Option<&T>) -> Result<bool, E> {
        Ok(true)
    }
}
