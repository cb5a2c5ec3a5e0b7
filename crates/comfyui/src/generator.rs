//! [`ImageGenerator`] backed by a ComfyUI server.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::api::{first_output_image, ComfyUIApi};
use crate::client::{ComfyUIClient, ComfyUIClientError, ComfyUIStream};
use crate::config::ComfyUIConfig;
use crate::messages::{parse_message, Completion};
use crate::workflow::build_workflow;
use crate::{GeneratedImage, GenerationRequest, GeneratorError, ImageGenerator};

pub struct ComfyUIGenerator {
    config: ComfyUIConfig,
    api: ComfyUIApi,
    client: ComfyUIClient,
}

impl ComfyUIGenerator {
    pub fn new(config: ComfyUIConfig) -> Result<Self, GeneratorError> {
        let api = ComfyUIApi::new(config.server_url.clone());
        let client = ComfyUIClient::from_api_url(&config.server_url)?;
        Ok(Self {
            config,
            api,
            client,
        })
    }

    async fn run(&self, request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        // Subscribe before queueing so no event for our prompt is missed.
        let mut stream = self.client.connect(&client_id).await?;

        let input_image = match &request.reference {
            Some(reference) => {
                let file_name = format!("{client_id}.{}", extension_for(&reference.content_type));
                let uploaded = self
                    .api
                    .upload_image(&file_name, reference.bytes.clone(), &reference.content_type)
                    .await?;
                Some(if uploaded.subfolder.is_empty() {
                    uploaded.name
                } else {
                    format!("{}/{}", uploaded.subfolder, uploaded.name)
                })
            }
            None => None,
        };

        let seed = uuid::Uuid::new_v4().as_u64_pair().0;
        let workflow = build_workflow(&self.config, &request.prompt, input_image.as_deref(), seed);
        let submitted = self.api.submit_workflow(&workflow, &client_id).await?;
        tracing::debug!(prompt_id = %submitted.prompt_id, queue = submitted.number, "Workflow queued");

        match wait_for_completion(&mut stream, &submitted.prompt_id).await? {
            Completion::Finished => {}
            Completion::Failed {
                node_id,
                exception_type,
                message,
            } => {
                return Err(GeneratorError::Execution {
                    node_id,
                    exception_type,
                    message,
                })
            }
            Completion::Interrupted => return Err(GeneratorError::Interrupted),
        }
        let _ = stream.close(None).await;

        let history = self.api.get_history(&submitted.prompt_id).await?;
        let output = first_output_image(&history, &submitted.prompt_id)
            .ok_or(GeneratorError::NoOutput)?;
        let bytes = self.api.view(&output).await?;

        Ok(GeneratedImage {
            bytes,
            content_type: "image/png".to_string(),
        })
    }
}

#[async_trait]
impl ImageGenerator for ComfyUIGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError> {
        match tokio::time::timeout(self.config.timeout, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                // Free the GPU for the next request.
                if let Err(e) = self.api.interrupt().await {
                    tracing::warn!(error = %e, "Failed to interrupt timed-out execution");
                }
                Err(GeneratorError::Timeout(self.config.timeout))
            }
        }
    }
}

/// Read WebSocket frames until `prompt_id` finishes, fails or is interrupted.
async fn wait_for_completion(
    stream: &mut ComfyUIStream,
    prompt_id: &str,
) -> Result<Completion, GeneratorError> {
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| ComfyUIClientError::Protocol(e.to_string()))?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Binary frames are latent previews.
            _ => continue,
        };

        match parse_message(&text) {
            Ok(message) => {
                if let Some(completion) = message.completion_for(prompt_id) {
                    return Ok(completion);
                }
            }
            Err(e) => tracing::trace!(error = %e, "Skipping unrecognized ComfyUI message"),
        }
    }

    Err(ComfyUIClientError::Protocol(format!(
        "WebSocket closed before prompt {prompt_id} finished"
    ))
    .into())
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
