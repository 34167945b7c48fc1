//! In-memory transport for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ResolutionError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Serves canned responses keyed by method and URL, and stores the body of
/// every `PUT` so a later `GET` of the same URL returns it.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Method, String), HttpResponse>>,
    stored: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<HttpRequest>>,
    unreachable: bool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A transport whose every request fails before reaching a server
    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub(crate) fn route(self, method: Method, url: &str, response: HttpResponse) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, url.to_string()), response);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, ResolutionError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.unreachable {
            return Err(ResolutionError::Transport("connection refused".to_string()));
        }

        let url = request.url.to_string();
        if let Some(response) = self.routes.lock().unwrap().get(&(request.method, url.clone())) {
            return Ok(response.clone());
        }

        match request.method {
            Method::Put => {
                let body = request.body.unwrap_or_default();
                self.stored.lock().unwrap().insert(url, body.clone());
                Ok(HttpResponse::new(200, body))
            }
            Method::Get => match self.stored.lock().unwrap().get(&url) {
                Some(body) => Ok(HttpResponse::new(200, body.clone())),
                None => Ok(HttpResponse::new(404, "Not Found")),
            },
            Method::Post => Ok(HttpResponse::new(404, "Not Found")),
        }
    }
}
