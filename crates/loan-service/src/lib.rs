#![deny(unsafe_code)]

pub mod render;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use loan_core::{
    ApplicantInput, ArtifactPaths, DecisionPipeline, DecisionRecord, LoadedArtifacts, LoanError,
    ModelArchitecture, RawApplicantForm, ScaleWriteback,
};
use render::{render_page, PageOutcome};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub artifacts: ArtifactPaths,
    pub writeback: ScaleWriteback,
}

/// Process-wide state: immutable artifacts and the pipeline built on them.
#[derive(Clone)]
pub struct ServiceState {
    pub pipeline: DecisionPipeline,
    pub artifacts: Arc<LoadedArtifacts>,
}

impl ServiceState {
    /// Loads the artifacts once. Failure here must abort startup.
    pub fn bootstrap(config: ServiceConfig) -> Result<Self, ServiceError> {
        let artifacts = LoadedArtifacts::load(&config.artifacts)?;
        Ok(Self::from_artifacts(artifacts).with_writeback(config.writeback))
    }

    pub fn from_artifacts(artifacts: LoadedArtifacts) -> Self {
        Self {
            pipeline: DecisionPipeline::from_artifacts(&artifacts),
            artifacts: Arc::new(artifacts),
        }
    }

    pub fn with_writeback(mut self, writeback: ScaleWriteback) -> Self {
        self.pipeline = self.pipeline.with_writeback(writeback);
        self
    }
}

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/v1/health", get(health))
        .route("/v1/model", get(model_architecture))
        .route("/v1/decide", post(decide))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("artifact configuration error: {0}")]
    Artifacts(#[from] LoanError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Pipeline(#[from] LoanError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Http {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Pipeline(err) if err.is_user_error() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "loan decision failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

async fn index(State(state): State<ServiceState>) -> Html<String> {
    Html(render_page(
        &state.artifacts.architecture,
        &RawApplicantForm::default(),
        None,
    ))
}

async fn submit(State(state): State<ServiceState>, Form(form): Form<RawApplicantForm>) -> Response {
    let architecture = &state.artifacts.architecture;
    let outcome = form
        .to_input()
        .and_then(|input| state.pipeline.evaluate(&input));

    match outcome {
        Ok(record) => Html(render_page(
            architecture,
            &form,
            Some(&PageOutcome::Decided(record.decision)),
        ))
        .into_response(),
        Err(err) if err.is_user_error() => {
            warn!(error = %err, "rejected applicant form");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_page(
                    architecture,
                    &form,
                    Some(&PageOutcome::Invalid(err.to_string())),
                )),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "loan decision failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_page(
                    architecture,
                    &form,
                    Some(&PageOutcome::Invalid(format!(
                        "The decision could not be computed: {}",
                        err
                    ))),
                )),
            )
                .into_response()
        }
    }
}

async fn decide(
    State(state): State<ServiceState>,
    payload: Result<Json<ApplicantInput>, JsonRejection>,
) -> Result<Json<DecisionRecord>, ApiError> {
    let Json(input) = payload?;
    Ok(Json(state.pipeline.evaluate(&input)?))
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    model_fingerprint: String,
    scaler_fingerprint: String,
    scale_writeback: ScaleWriteback,
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "loan-service",
        model_fingerprint: state.artifacts.model_fingerprint.clone(),
        scaler_fingerprint: state.artifacts.scaler_fingerprint.clone(),
        scale_writeback: state.pipeline.writeback(),
    })
}

async fn model_architecture(State(state): State<ServiceState>) -> Json<ModelArchitecture> {
    Json(state.artifacts.architecture.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use loan_core::{
        BaseEstimator, DecisionTree, FeatureScaler, LogisticRegression, RandomForest,
        StackingClassifier, StandardScaler, TreeNode,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn leaf(rejected: f64, approved: f64) -> TreeNode {
        TreeNode {
            feature: 0,
            threshold: 0.0,
            left: -1,
            right: -1,
            value: [rejected, approved],
        }
    }

    fn credit_tree() -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode {
                    feature: 9,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                    value: [50.0, 50.0],
                },
                leaf(45.0, 5.0),
                leaf(8.0, 42.0),
            ],
        }
    }

    fn artifacts() -> LoadedArtifacts {
        let mut coef = vec![0.0; 11];
        coef[9] = 3.0;
        let model = StackingClassifier {
            n_features: 11,
            estimators: vec![
                BaseEstimator::LogisticRegression(LogisticRegression {
                    coef,
                    intercept: -1.5,
                }),
                BaseEstimator::DecisionTree(credit_tree()),
                BaseEstimator::RandomForest(RandomForest {
                    trees: vec![credit_tree(), credit_tree()],
                }),
            ],
            final_estimator: LogisticRegression {
                coef: vec![2.0, 2.0, 2.0],
                intercept: -3.0,
            },
            passthrough: false,
        };
        let scaler = StandardScaler {
            mean: vec![5403.46, 1621.25, 146.41],
            scale: vec![6104.09, 2923.87, 84.04],
        };
        LoadedArtifacts::from_parts(model, scaler, "model-fp", "scaler-fp").unwrap()
    }

    fn app() -> Router {
        build_router(ServiceState::from_artifacts(artifacts()))
    }

    fn form_body(credit_history: &str, property_area: &str) -> String {
        format!(
            "applicant_income=5000&coapplicant_income=0&loan_amount=128&loan_term_years=30\
             &credit_history={}&employment=Salaried&property_area={}",
            credit_history, property_area
        )
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_renders_the_applicant_form() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("Applicant Details"));
        assert!(html.contains("Check Loan Eligibility"));
        assert!(!html.contains("Prediction Result"));
    }

    #[tokio::test]
    async fn form_submission_renders_decision() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form_body("Yes", "Urban")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("Prediction Result"));
        assert!(html.contains("Loan Approved"));
        assert!(html.contains("Confidence Score"));
    }

    #[tokio::test]
    async fn unknown_property_area_is_unprocessable() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form_body("Yes", "Suburban")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let html = body_string(response).await;
        assert!(html.contains("Suburban"));
        assert!(!html.contains("Prediction Result"));
    }

    #[tokio::test]
    async fn decide_endpoint_returns_record() {
        let payload = serde_json::json!({
            "applicant_income": 5000.0,
            "coapplicant_income": 0.0,
            "loan_amount": 128.0,
            "loan_term_years": 30,
            "credit_history": "No",
            "employment": "Self-Employed",
            "property_area": "Semi-Urban"
        });

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/decide")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let record: DecisionRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            record.features.0,
            [1.0, 1.0, 0.0, 1.0, 1.0, 5000.0, 0.0, 128.0, 360.0, 0.0, 1.0]
        );
        assert_eq!(record.decision.label, loan_core::DecisionLabel::Rejected);
        assert!(record.decision.confidence >= 50.0);
        assert!(Uuid::parse_str(&record.trace_id).is_ok());
    }

    #[tokio::test]
    async fn decide_endpoint_rejects_out_of_range_term() {
        let payload = serde_json::json!({
            "applicant_income": 5000.0,
            "coapplicant_income": 0.0,
            "loan_amount": 128.0,
            "loan_term_years": 40,
            "credit_history": "Yes",
            "employment": "Salaried",
            "property_area": "Urban"
        });

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/decide")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body
            .get("error")
            .and_then(|v| v.as_str())
            .map(|message| message.contains("loan_term_years"))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn decide_endpoint_reports_unknown_enum_as_json() {
        let payload = serde_json::json!({
            "applicant_income": 5000.0,
            "coapplicant_income": 0.0,
            "loan_amount": 128.0,
            "loan_term_years": 30,
            "credit_history": "Yes",
            "employment": "Salaried",
            "property_area": "Suburban"
        });

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/decide")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body
            .get("error")
            .and_then(|v| v.as_str())
            .map(|message| message.contains("Suburban"))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn decide_endpoint_reports_malformed_json_as_json() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/decide")
                    .header("content-type", "application/json")
                    .body(Body::from("{ not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("error").and_then(|v| v.as_str()).is_some());
    }

    #[tokio::test]
    async fn shape_mismatch_is_a_server_error() {
        let mut artifacts = artifacts();
        let narrow: Arc<dyn FeatureScaler> = Arc::new(StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        });
        artifacts.scaler = narrow;
        let app = build_router(ServiceState::from_artifacts(artifacts));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form_body("Yes", "Urban")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_string(response).await;
        assert!(!html.contains("Loan Approved"));
    }

    #[tokio::test]
    async fn health_reports_artifact_fingerprints() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(
            body.get("model_fingerprint").and_then(|v| v.as_str()),
            Some("model-fp")
        );
    }

    #[test]
    fn bootstrap_fails_without_artifacts() {
        let dir = std::env::temp_dir().join(format!("loan-service-{}", Uuid::new_v4()));
        let err = ServiceState::bootstrap(ServiceConfig {
            artifacts: ArtifactPaths::new(dir.join("model.json"), dir.join("scaler.json")),
            writeback: ScaleWriteback::Exact,
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("artifact configuration error"));
    }

    #[test]
    fn bootstrap_loads_bundled_artifacts() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models");
        let state = ServiceState::bootstrap(ServiceConfig {
            artifacts: ArtifactPaths::new(
                root.join("stack_model.json"),
                root.join("scaler.json"),
            ),
            writeback: ScaleWriteback::Integer,
        })
        .unwrap();
        assert_eq!(state.artifacts.architecture.base_models.len(), 3);
        assert_eq!(state.pipeline.writeback(), ScaleWriteback::Integer);
    }
}
