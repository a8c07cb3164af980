//! System service, responsible for health check
use futures::future;

use super::types::ServiceFuture;

pub trait SystemService {
    /// Returns ok if the service is up
    fn healthcheck(&self) -> ServiceFuture<String>;
}

#[derive(Clone, Default)]
pub struct SystemServiceImpl;

impl SystemService for SystemServiceImpl {
    fn healthcheck(&self) -> ServiceFuture<String> {
        Box::new(future::ok("Ok".to_string()))
    }
}
