//! Image generation through a ComfyUI server.
//!
//! The rest of the workspace only sees the [`ImageGenerator`] trait.
//! [`ComfyUIGenerator`] implements it by uploading the reference photo,
//! queueing an img2img workflow, following execution over the ComfyUI
//! WebSocket and downloading the first output image.

pub mod api;
pub mod client;
pub mod config;
pub mod generator;
pub mod messages;
pub mod workflow;

use std::time::Duration;

use async_trait::async_trait;

pub use config::ComfyUIConfig;
pub use generator::ComfyUIGenerator;

/// Reference image handed to the generator.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Without a reference the workflow starts from an empty latent.
    pub reference: Option<ImageInput>,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Api(#[from] api::ComfyUIApiError),

    #[error(transparent)]
    Client(#[from] client::ComfyUIClientError),

    #[error("Execution failed at node {node_id}: {exception_type}: {message}")]
    Execution {
        node_id: String,
        exception_type: String,
        message: String,
    },

    #[error("Execution was interrupted")]
    Interrupted,

    #[error("Workflow produced no output image")]
    NoOutput,

    #[error("Invalid generator configuration: {0}")]
    Config(String),
}

/// A black-box "prompt + reference in, image out" service.
///
/// Calls are slow and may fail; callers treat every failure as local to
/// the one request.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError>;
}
