use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::callback::{acknowledgement_for, CallbackCorrelator, CallbackDelivery};
use super::codec::CallbackAck;
use super::domain::{RequestId, SubmissionDetails};
use super::error::VerificationError;
use super::mapping;
use super::probe::DiagnosticsProbe;
use super::query::VerificationQueries;
use super::repository::{DocumentStore, RepositoryError, RequestRepository, ResultRepository};
use super::submission::SubmissionOrchestrator;
use super::transport::ProviderTransport;
use crate::config::{CallbackConfig, ProviderConfig};

/// The four verification services sharing one set of stores.
#[derive(Clone)]
pub struct VerificationServices {
    pub submissions: Arc<SubmissionOrchestrator>,
    pub callbacks: Arc<CallbackCorrelator>,
    pub probe: Arc<DiagnosticsProbe>,
    pub queries: Arc<VerificationQueries>,
    pub callback_body_limit: usize,
}

impl VerificationServices {
    pub fn assemble(
        provider: ProviderConfig,
        callback: CallbackConfig,
        requests: Arc<dyn RequestRepository>,
        results: Arc<dyn ResultRepository>,
        documents: Arc<dyn DocumentStore>,
        transport: Arc<dyn ProviderTransport>,
    ) -> Self {
        let callback_body_limit = callback.max_body_bytes;
        Self {
            submissions: Arc::new(SubmissionOrchestrator::new(
                requests.clone(),
                transport.clone(),
                provider.clone(),
            )),
            callbacks: Arc::new(CallbackCorrelator::new(
                requests.clone(),
                results.clone(),
                documents,
                callback,
            )),
            probe: Arc::new(DiagnosticsProbe::new(transport, provider)),
            queries: Arc::new(VerificationQueries::new(requests, results)),
            callback_body_limit,
        }
    }
}

/// Router builder exposing submission, query, callback, and diagnostics endpoints.
pub fn verification_router(services: VerificationServices) -> Router {
    let callback_limit = DefaultBodyLimit::max(services.callback_body_limit);
    Router::new()
        .route("/api/v1/verification/types", get(types_handler))
        .route(
            "/api/v1/verification/requests",
            post(submit_handler).get(list_handler),
        )
        .route(
            "/api/v1/verification/requests/:request_id",
            get(detail_handler),
        )
        .route(
            "/api/v1/mie/callback",
            post(callback_handler).layer(callback_limit),
        )
        .route("/api/v1/mie/test", post(probe_handler))
        .with_state(services)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn types_handler() -> Response {
    (StatusCode::OK, Json(mapping::catalog())).into_response()
}

pub(crate) async fn submit_handler(
    State(services): State<VerificationServices>,
    payload: Result<Json<SubmissionDetails>, JsonRejection>,
) -> Response {
    let details = match payload {
        Ok(Json(details)) => details,
        Err(rejection) => {
            return failure_response(&VerificationError::Validation(rejection.body_text()));
        }
    };

    let orchestrator = services.submissions.clone();
    match tokio::task::spawn_blocking(move || orchestrator.submit(details)).await {
        Ok(Ok(receipt)) => {
            let payload = json!({
                "success": true,
                "message": "Verification request submitted successfully",
                "requestId": receipt.request_id,
                "remoteRequestId": receipt.remote_request_id,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(Err(err)) => failure_response(&err),
        Err(join_error) => {
            error!(error = %join_error, "submission task aborted");
            internal_error()
        }
    }
}

pub(crate) async fn list_handler(
    State(services): State<VerificationServices>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return failure_response(&VerificationError::Validation(rejection.body_text()));
        }
    };
    match services.queries.recent(params.limit) {
        Ok(requests) => (StatusCode::OK, Json(json!({ "requests": requests }))).into_response(),
        Err(err) => failure_response(&err),
    }
}

pub(crate) async fn detail_handler(
    State(services): State<VerificationServices>,
    Path(request_id): Path<String>,
) -> Response {
    match services.queries.detail(&RequestId(request_id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => failure_response(&err),
    }
}

/// Every reply, including rejections, is the provider's XML acknowledgement.
pub(crate) async fn callback_handler(
    State(services): State<VerificationServices>,
    form: Result<Form<CallbackDelivery>, FormRejection>,
) -> Response {
    let delivery = match form {
        Ok(Form(delivery)) => delivery,
        Err(rejection) => {
            let err = VerificationError::MalformedCallback(rejection.body_text());
            return xml_response(callback_status(&err), &acknowledgement_for(&err));
        }
    };

    let correlator = services.callbacks.clone();
    match tokio::task::spawn_blocking(move || correlator.process(delivery)).await {
        Ok(Ok(_)) => xml_response(StatusCode::OK, &CallbackAck::success()),
        Ok(Err(err)) => xml_response(callback_status(&err), &acknowledgement_for(&err)),
        Err(join_error) => {
            error!(error = %join_error, "callback task aborted");
            xml_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &CallbackAck::failure("internal error"),
            )
        }
    }
}

pub(crate) async fn probe_handler(State(services): State<VerificationServices>) -> Response {
    let probe = services.probe.clone();
    match tokio::task::spawn_blocking(move || probe.run()).await {
        Ok(Ok(report)) => {
            let payload = json!({
                "success": true,
                "message": report.message,
                "itemTypes": report.raw_response,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(Err(err)) => failure_response(&err),
        Err(join_error) => {
            error!(error = %join_error, "diagnostics task aborted");
            internal_error()
        }
    }
}

fn caller_status(err: &VerificationError) -> StatusCode {
    match err {
        VerificationError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VerificationError::ProviderFault(_) => StatusCode::BAD_GATEWAY,
        VerificationError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        VerificationError::Persistence(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        VerificationError::Configuration(_)
        | VerificationError::Persistence(_)
        | VerificationError::MalformedCallback(_)
        | VerificationError::UnauthorizedCallback
        | VerificationError::CorrelationMiss(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn callback_status(err: &VerificationError) -> StatusCode {
    match err {
        VerificationError::UnauthorizedCallback => StatusCode::UNAUTHORIZED,
        VerificationError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn failure_response(err: &VerificationError) -> Response {
    let payload = json!({
        "success": false,
        "error": err.to_string(),
        "kind": err.kind(),
    });
    (caller_status(err), Json(payload)).into_response()
}

fn internal_error() -> Response {
    let payload = json!({
        "success": false,
        "error": "internal error",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

fn xml_response(status: StatusCode, ack: &CallbackAck) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, mime::TEXT_XML.essence_str())],
        ack.to_xml(),
    )
        .into_response()
}
