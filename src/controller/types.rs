use failure::Error as FailureError;
use futures::future::Future;

/// Controller layer Future
pub type ControllerFuture = Box<Future<Item = String, Error = FailureError>>;
