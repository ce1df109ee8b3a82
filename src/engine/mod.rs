mod http;

pub use http::HttpBackend;

use crate::error::ClientError;
use crate::model::{AugmentRequest, HealthStatus, InferResponse, SelectedFile};
use async_trait::async_trait;

/// The remote inference service as seen by the controller.
///
/// Implementations must not retry; a failure is reported once and the user
/// decides whether to try again.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Run inference on an uploaded file. A fresh session is created.
    async fn infer_upload(&self, file: SelectedFile) -> Result<InferResponse, ClientError>;

    /// Refine the inference of an existing session with supplementary text.
    async fn infer_augment(&self, request: AugmentRequest) -> Result<InferResponse, ClientError>;

    /// Run inference on the sample record bundled with the backend.
    async fn infer_demo(&self) -> Result<InferResponse, ClientError>;

    async fn health(&self) -> Result<HealthStatus, ClientError>;
}
