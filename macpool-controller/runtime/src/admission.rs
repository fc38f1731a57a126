use crate::{metrics::Metrics, store::ClusterStore};
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use json_patch::Patch;
use kube::{core::DynamicObject, Resource};
use macpool_controller_core::{AdmissionError, MacAllocator};
use macpool_controller_k8s_api::{Pod, VirtualMachine};
use macpool_controller_mutate::{PodMutator, VirtualMachineMutator};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Serves the mutating webhook endpoint, routing each admission request to
/// the mutator for its resource kind.
#[derive(Clone)]
pub struct Admission {
    pods: PodMutator,
    virtual_machines: VirtualMachineMutator,
    metrics: Metrics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;

type Body = http_body_util::Full<bytes::Bytes>;

// === impl Admission ===

impl tower::Service<Request<hyper::body::Incoming>> for Admission {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        if req.method() != http::Method::POST || req.uri().path() != "/" {
            return Box::pin(future::ok(
                Response::builder()
                    .status(http::StatusCode::NOT_FOUND)
                    .body(Body::default())
                    .expect("not found response must be valid"),
            ));
        }

        let admission = self.clone();
        Box::pin(async move {
            use bytes::Buf;
            let bytes = req.into_body().collect().await?.to_bytes();
            let review: Review = match serde_json::from_reader(bytes.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "failed to parse request body");
                    return client_error_response(&error);
                }
            };
            trace!(?review);

            let req: AdmissionRequest = match review.try_into() {
                Ok(req) => req,
                Err(error) => {
                    warn!(%error, "invalid admission request");
                    return client_error_response(&error);
                }
            };
            debug!(?req);

            match admission.admit(req).await {
                Ok(rsp) => {
                    debug!(?rsp);
                    json_response(rsp.into_review())
                }
                Err(error) => {
                    info!(%error, "admission failed");
                    error_response(&error)
                }
            }
        })
    }
}

impl Admission {
    pub fn new(allocator: Arc<dyn MacAllocator>, store: ClusterStore, metrics: Metrics) -> Self {
        Self {
            pods: PodMutator::new(allocator.clone()),
            virtual_machines: VirtualMachineMutator::new(allocator, Arc::new(store)),
            metrics,
        }
    }

    async fn admit(self, req: AdmissionRequest) -> Result<AdmissionResponse, AdmissionError> {
        let rsp = AdmissionResponse::from(&req);

        if is_kind::<Pod>(&req) {
            let patch = self.admit_pod(req).await;
            return self.respond("Pod", rsp, patch);
        }

        if is_kind::<VirtualMachine>(&req) {
            let patch = self.admit_virtual_machine(req).await;
            return self.respond("VirtualMachine", rsp, patch);
        }

        // Kinds this webhook is not registered for pass through untouched.
        debug!(
            group = %req.kind.group,
            kind = %req.kind.kind,
            "ignoring an unsupported resource kind"
        );
        Ok(rsp)
    }

    async fn admit_pod(&self, req: AdmissionRequest) -> Result<Patch, AdmissionError> {
        let pod = decode::<Pod>("Pod", req.object)?;
        self.pods.admit(req.namespace.as_deref(), pod).await
    }

    async fn admit_virtual_machine(&self, req: AdmissionRequest) -> Result<Patch, AdmissionError> {
        let vm = decode::<VirtualMachine>("VirtualMachine", req.object)?;
        self.virtual_machines
            .admit(&req.operation, req.namespace.as_deref(), vm)
            .await
    }

    fn respond(
        &self,
        kind: &'static str,
        rsp: AdmissionResponse,
        patch: Result<Patch, AdmissionError>,
    ) -> Result<AdmissionResponse, AdmissionError> {
        self.metrics.incr_requests(kind);
        let patch = patch.inspect_err(|_| self.metrics.incr_errors(kind))?;
        if patch.0.is_empty() {
            return Ok(rsp);
        }

        self.metrics.incr_patched(kind);
        rsp.with_patch(patch)
            .map_err(|error| AdmissionError::SerializePatch(error.to_string()))
    }
}

fn is_kind<T>(req: &AdmissionRequest) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    req.kind.group.eq_ignore_ascii_case(&T::group(&dt))
        && req.kind.kind.eq_ignore_ascii_case(&T::kind(&dt))
}

fn decode<T: DeserializeOwned>(
    kind: &'static str,
    obj: Option<DynamicObject>,
) -> Result<T, AdmissionError> {
    let obj = obj.ok_or_else(|| AdmissionError::Decode {
        kind,
        source: <serde_json::Error as serde::de::Error>::custom(
            "admission request has no object",
        ),
    })?;
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|source| AdmissionError::Decode { kind, source })
}

fn json_response(rsp: Review) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}

fn client_error_response(error: &dyn std::fmt::Display) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(http::StatusCode::BAD_REQUEST)
        .body(Body::from(bytes::Bytes::from(error.to_string())))
        .expect("bad request response must be valid"))
}

fn error_response(error: &AdmissionError) -> Result<Response<Body>, Error> {
    let status = if error.is_client_error() {
        http::StatusCode::BAD_REQUEST
    } else {
        http::StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok(Response::builder()
        .status(status)
        .body(Body::from(bytes::Bytes::from(error.to_string())))
        .expect("error response must be valid"))
}
