//! Scope enum for authorization
use std::fmt;

// All - allows operating on every record of the resource.
// Owned - restricts the operation to records owned by the requesting user.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scope {
    All,
    Owned,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Scope::All => write!(f, "all"),
            Scope::Owned => write!(f, "owned"),
        }
    }
}
