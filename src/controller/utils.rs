//! Controller utils: body reading and response serialization

use failure::Error as FailureError;
use futures::future::Future;
use futures::{future, Stream};
use hyper;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json;

use super::types::ControllerFuture;
use errors::Error;

/// Reads request body and parses it as json
pub fn parse_body<T>(body: hyper::Body) -> Box<Future<Item = T, Error = FailureError>>
where
    T: DeserializeOwned + 'static,
{
    Box::new(
        read_body(body)
            .map_err(|e| FailureError::from(e).context(Error::Parse).into())
            .and_then(|body| serde_json::from_str::<T>(&body).map_err(|e| FailureError::from(e).context(Error::Parse).into())),
    )
}

/// Reads request body into a string
pub fn read_body(body: hyper::Body) -> impl Future<Item = String, Error = hyper::Error> {
    body.fold(Vec::new(), |mut acc, chunk| {
        acc.extend_from_slice(&*chunk);
        future::ok::<_, hyper::Error>(acc)
    }).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Transforms a service future into a controller future with a json body
pub fn serialize_future<T, F>(fut: F) -> ControllerFuture
where
    T: Serialize + 'static,
    F: Future<Item = T, Error = FailureError> + 'static,
{
    Box::new(fut.and_then(|resp| serde_json::to_string(&resp).map_err(|e| FailureError::from(e).context(Error::Parse).into())))
}
