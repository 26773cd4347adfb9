use std::fmt;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("{0}")]
    Message(String),
}

impl TransportError {
    #[allow(dead_code)]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// A fully prepared HTTP request, ready to hand to a [`Transport`].
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    content_type: Option<&'static str>,
    body: Vec<u8>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// POST with an `application/x-www-form-urlencoded` body built from `fields`, in order.
    pub fn post_form(url: Url, fields: &[(&str, &str)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        Self {
            method: Method::POST,
            url,
            content_type: Some(FORM_CONTENT_TYPE),
            body: body.into_bytes(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    #[allow(dead_code)]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[allow(dead_code)]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type
    }

    #[allow(dead_code)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Status plus a not-yet-read body. Reading the body consumes the response;
/// dropping it unread releases the connection as well.
pub struct Response {
    status: StatusCode,
    body: BoxStream<'static, Result<Vec<u8>, TransportError>>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Response {
    pub fn new<S>(status: StatusCode, body: S) -> Self
    where
        S: futures::Stream<Item = Result<Vec<u8>, TransportError>> + Send + 'static,
    {
        Self {
            status,
            body: body.boxed(),
        }
    }

    #[allow(dead_code)]
    pub fn from_bytes(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, stream::iter(vec![Ok(body.into())]))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Drain the whole body.
    pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
        self.body.try_concat().await
    }

    /// Drain the whole body as text; invalid UTF-8 is replaced, not rejected.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Executes one prepared request. The only seam between the bot and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

/// Production transport backed by a shared `reqwest::Client` with default timeouts.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let Request {
            method,
            url,
            content_type,
            body,
        } = request;

        // The relay URL embeds the bot token, so only the host is logged.
        debug!(
            "Sending {} request to {}",
            method,
            url.host_str().unwrap_or_default()
        );

        let mut builder = self.client.request(method, url);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        // reqwest errors print the request URL, which carries the bot token.
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from(e.without_url()))?;
        let status = response.status();

        Ok(Response::new(
            status,
            response
                .bytes_stream()
                .map_ok(|chunk| chunk.to_vec())
                .map_err(|e| TransportError::from(e.without_url())),
        ))
    }
}

/// Programmable stand-in used by the client and dispatcher tests.
#[cfg(test)]
pub mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    type Handler = Box<dyn Fn(&Request) -> Result<Response, TransportError> + Send + Sync>;

    /// Answers each request with the handler registered for its HTTP method,
    /// and records every request it sees.
    #[derive(Default)]
    pub struct FakeTransport {
        handlers: HashMap<Method, Handler>,
        requests: Mutex<Vec<Request>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on<F>(mut self, method: Method, handler: F) -> Self
        where
            F: Fn(&Request) -> Result<Response, TransportError> + Send + Sync + 'static,
        {
            self.handlers.insert(method, Box::new(handler));
            self
        }

        pub fn respond(self, method: Method, status: StatusCode, body: &str) -> Self {
            let body = body.to_string();
            self.on(method, move |_| {
                Ok(Response::from_bytes(status, body.clone()))
            })
        }

        pub fn fail(self, method: Method, message: &str) -> Self {
            let message = message.to_string();
            self.on(method, move |_| Err(TransportError::message(message.clone())))
        }

        /// Responds with `status`, but the body breaks off after `prefix`.
        pub fn broken_body(self, method: Method, status: StatusCode, prefix: &str) -> Self {
            let prefix = prefix.as_bytes().to_vec();
            self.on(method, move |_| {
                Ok(Response::new(
                    status,
                    stream::iter(vec![
                        Ok(prefix.clone()),
                        Err(TransportError::message("connection reset by peer")),
                    ]),
                ))
            })
        }

        pub fn calls(&self, method: &Method) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.method() == method)
                .count()
        }

        pub fn total_calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, request: Request) -> Result<Response, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            match self.handlers.get(request.method()) {
                Some(handler) => handler(&request),
                None => Err(TransportError::message(format!(
                    "no fake response registered for {}",
                    request.method()
                ))),
            }
        }
    }
}
