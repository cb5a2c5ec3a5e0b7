use std::time::Duration;

use crate::GeneratorError;

/// Connection and sampler settings for the ComfyUI adapter.
#[derive(Debug, Clone)]
pub struct ComfyUIConfig {
    pub server_url: String,
    /// Adapter-level deadline for one generation call.
    pub timeout: Duration,
    pub checkpoint: String,
    pub steps: u32,
    pub cfg: f32,
    pub sampler: String,
    /// img2img strength; ignored without a reference image.
    pub denoise: f32,
}

impl ComfyUIConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            timeout: Duration::from_secs(600),
            checkpoint: "model.safetensors".to_string(),
            steps: 20,
            cfg: 7.0,
            sampler: "euler".to_string(),
            denoise: 0.75,
        }
    }

    /// Load from environment variables.
    ///
    /// Returns `Ok(None)` when `COMFYUI_SERVER_URL` is unset, meaning no
    /// generator is configured.
    ///
    /// | Env var                | Default             |
    /// |------------------------|---------------------|
    /// | `COMFYUI_SERVER_URL`   | unset               |
    /// | `COMFYUI_TIMEOUT_SECS` | `600`               |
    /// | `COMFYUI_CHECKPOINT`   | `model.safetensors` |
    /// | `COMFYUI_STEPS`        | `20`                |
    /// | `COMFYUI_CFG`          | `7.0`               |
    /// | `COMFYUI_SAMPLER`      | `euler`             |
    /// | `COMFYUI_DENOISE`      | `0.75`              |
    pub fn from_env() -> Result<Option<Self>, GeneratorError> {
        let Some(server_url) = std::env::var("COMFYUI_SERVER_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        else {
            return Ok(None);
        };

        let mut config = Self::new(server_url);
        if let Some(secs) = parse_var::<u64>("COMFYUI_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(checkpoint) = std::env::var("COMFYUI_CHECKPOINT") {
            config.checkpoint = checkpoint;
        }
        if let Some(steps) = parse_var("COMFYUI_STEPS")? {
            config.steps = steps;
        }
        if let Some(cfg) = parse_var("COMFYUI_CFG")? {
            config.cfg = cfg;
        }
        if let Ok(sampler) = std::env::var("COMFYUI_SAMPLER") {
            config.sampler = sampler;
        }
        if let Some(denoise) = parse_var::<f32>("COMFYUI_DENOISE")? {
            if !(0.0..=1.0).contains(&denoise) {
                return Err(GeneratorError::Config(format!(
                    "COMFYUI_DENOISE must be within 0.0..=1.0 (got {denoise})"
                )));
            }
            config.denoise = denoise;
        }
        Ok(Some(config))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, GeneratorError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GeneratorError::Config(format!("{name} has an invalid value '{raw}'"))),
        Err(_) => Ok(None),
    }
}
