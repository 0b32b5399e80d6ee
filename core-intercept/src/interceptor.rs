//! Network Interceptor
//!
//! Sits in front of the platform's networking stack. Requests to the
//! reserved scheme become bridge calls; everything else is untouched. Every
//! response, bridged or not, goes through the same status normalization.

use async_trait::async_trait;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse, Result};
use core_bridge::{BridgeContext, BridgeTransport};
use core_runtime::InterceptionConfig;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::normalize::{bridged_response, failure_response, normalize_status, TEXT_PLAIN};
use crate::route::{resolve, Resolution};

/// What to do with one outgoing request.
pub enum Interception {
    /// Send the request through the regular networking stack.
    PassThrough(HttpRequest),
    /// The bridge answers. The future always yields a response, never an
    /// error, and never stays pending once the bridge is shut down.
    Bridged(LocalBoxFuture<'static, HttpResponse>),
}

impl Interception {
    pub fn is_bridged(&self) -> bool {
        matches!(self, Interception::Bridged(_))
    }
}

/// Translates reserved-scheme requests into bridge calls.
#[derive(Clone)]
pub struct NetworkInterceptor {
    transport: BridgeTransport,
    rules: InterceptionConfig,
}

impl NetworkInterceptor {
    pub fn new(context: &BridgeContext) -> Self {
        Self::with_rules(context.transport().clone(), context.interception().clone())
    }

    pub fn with_rules(transport: BridgeTransport, rules: InterceptionConfig) -> Self {
        Self { transport, rules }
    }

    pub fn rules(&self) -> &InterceptionConfig {
        &self.rules
    }

    /// Inspect `request` and, when it targets the bridge, issue the call.
    ///
    /// The bridge call is transmitted before this returns.
    pub fn intercept(&self, request: HttpRequest) -> Interception {
        let route = match resolve(&self.rules, &request) {
            Resolution::PassThrough => return Interception::PassThrough(request),
            Resolution::Route(route) => route,
            Resolution::Malformed(reason) => {
                warn!(url = %request.url, %reason, "Rejecting malformed bridge address");
                let response = HttpResponse::new(400, reason)
                    .with_header(bridge_traits::http::CONTENT_TYPE, TEXT_PLAIN);
                return Interception::Bridged(futures::future::ready(response).boxed_local());
            }
        };

        let name = route.service_method();
        debug!(%name, path = %route.path, binary = route.binary, "Intercepted request");

        let pending = self
            .transport
            .call(name, Some(route.call_payload(request.body.as_ref())));

        Interception::Bridged(
            async move {
                match pending.await.and_then(|payload| bridged_response(&route, payload)) {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(path = %route.path, error = %err, "Bridged request failed");
                        failure_response(&err)
                    }
                }
            }
            .boxed_local(),
        )
    }

    /// Apply the configured post-processing to any response.
    pub fn finish(&self, response: HttpResponse) -> HttpResponse {
        if self.rules.normalize_zero_status {
            normalize_status(response)
        } else {
            response
        }
    }
}

/// [`HttpClient`] decorator that routes reserved-scheme requests over the
/// bridge and everything else to `C`.
pub struct InterceptingClient<C> {
    inner: C,
    interceptor: NetworkInterceptor,
}

impl<C: HttpClient> InterceptingClient<C> {
    pub fn new(inner: C, interceptor: NetworkInterceptor) -> Self {
        Self { inner, interceptor }
    }

    pub fn interceptor(&self) -> &NetworkInterceptor {
        &self.interceptor
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait(?Send)]
impl<C: HttpClient> HttpClient for InterceptingClient<C> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = match self.interceptor.intercept(request) {
            Interception::PassThrough(request) => self.inner.execute(request).await?,
            Interception::Bridged(response) => response.await,
        };
        Ok(self.interceptor.finish(response))
    }
}
