//! Application is the glue between hyper and the controller: it turns
//! controller results into http responses and maps failure chains to status
//! codes.

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use futures::{future, Future};
use hyper;
use hyper::header::{ContentLength, ContentType};
use hyper::server::{Request, Response, Service};
use hyper::StatusCode;
use r2d2::ManageConnection;
use serde_json;

use super::ControllerImpl;
use errors::Error;
use repos::repo_factory::ReposFactory;

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
}

pub struct Application<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub controller: ControllerImpl<T, M, F>,
}

impl<T, M, F> Application<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub fn new(controller: ControllerImpl<T, M, F>) -> Self {
        Self { controller }
    }
}

impl<T, M, F> Service for Application<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    type Request = Request;
    type Response = Response;
    type Error = hyper::Error;
    type Future = Box<Future<Item = Response, Error = hyper::Error>>;

    fn call(&self, req: Request) -> Self::Future {
        debug!("Received request: {} {}", req.method(), req.path());

        Box::new(self.controller.call(req).then(|result| match result {
            Ok(body) => future::ok(json_response(StatusCode::Ok, body)),
            Err(e) => {
                let code = error_code(&e);
                if code == StatusCode::InternalServerError {
                    error!("{:?}", e);
                } else {
                    // expected flow (stale codes, capped users), not incidents
                    debug!("{:?}", e);
                }

                let payload = ErrorMessage {
                    code: code.as_u16(),
                    message: error_message(&e),
                };
                let body = serde_json::to_string(&payload).unwrap_or_default();
                future::ok(json_response(code, body))
            }
        }))
    }
}

fn json_response(status: StatusCode, body: String) -> Response {
    Response::new()
        .with_status(status)
        .with_header(ContentLength(body.len() as u64))
        .with_header(ContentType::json())
        .with_body(body)
}

/// Innermost crate error in the failure chain drives the status code
fn error_code(err: &FailureError) -> StatusCode {
    err.iter_chain()
        .filter_map(|cause| cause.downcast_ref::<Error>())
        .next()
        .map(|e| e.code())
        .unwrap_or(StatusCode::InternalServerError)
}

fn error_message(err: &FailureError) -> String {
    err.iter_chain()
        .filter_map(|cause| cause.downcast_ref::<Error>())
        .next()
        .map(|e| e.message())
        .unwrap_or_else(|| "Internal server error".to_string())
}
