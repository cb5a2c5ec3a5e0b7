//! ComfyUI API-format workflow templates.
//!
//! Node ids are fixed so the output node is always `"9"`.

use serde_json::{json, Value};

use crate::config::ComfyUIConfig;

const NEGATIVE_PROMPT: &str =
    "blurry, low quality, distorted face, deformed, extra limbs, watermark, text";

/// Output resolution of the text-only workflow.
const LATENT_SIZE: u32 = 1024;

/// Build an img2img workflow when `input_image` names an uploaded file,
/// otherwise a txt2img workflow over an empty latent.
pub fn build_workflow(
    config: &ComfyUIConfig,
    prompt: &str,
    input_image: Option<&str>,
    seed: u64,
) -> Value {
    let mut workflow = json!({
        "4": {
            "class_type": "CheckpointLoaderSimple",
            "inputs": { "ckpt_name": config.checkpoint }
        },
        "6": {
            "class_type": "CLIPTextEncode",
            "inputs": { "text": prompt, "clip": ["4", 1] }
        },
        "7": {
            "class_type": "CLIPTextEncode",
            "inputs": { "text": NEGATIVE_PROMPT, "clip": ["4", 1] }
        },
        "3": {
            "class_type": "KSampler",
            "inputs": {
                "seed": seed,
                "steps": config.steps,
                "cfg": config.cfg,
                "sampler_name": config.sampler,
                "scheduler": "normal",
                "denoise": 1.0,
                "model": ["4", 0],
                "positive": ["6", 0],
                "negative": ["7", 0],
                "latent_image": ["5", 0]
            }
        },
        "8": {
            "class_type": "VAEDecode",
            "inputs": { "samples": ["3", 0], "vae": ["4", 2] }
        },
        "9": {
            "class_type": "SaveImage",
            "inputs": { "filename_prefix": "barbcut", "images": ["8", 0] }
        }
    });

    match input_image {
        Some(image) => {
            workflow["10"] = json!({
                "class_type": "LoadImage",
                "inputs": { "image": image }
            });
            workflow["5"] = json!({
                "class_type": "VAEEncode",
                "inputs": { "pixels": ["10", 0], "vae": ["4", 2] }
            });
            workflow["3"]["inputs"]["denoise"] = json!(config.denoise);
        }
        None => {
            workflow["5"] = json!({
                "class_type": "EmptyLatentImage",
                "inputs": { "width": LATENT_SIZE, "height": LATENT_SIZE, "batch_size": 1 }
            });
        }
    }

    workflow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn img2img_encodes_the_uploaded_reference() {
        let config = ComfyUIConfig::new("http://localhost:8188");
        let workflow = build_workflow(&config, "a fade", Some("ref.png"), 42);

        assert_eq!(workflow["10"]["inputs"]["image"], "ref.png");
        assert_eq!(workflow["5"]["class_type"], "VAEEncode");
        assert_eq!(workflow["3"]["inputs"]["seed"], 42);
        assert_eq!(workflow["3"]["inputs"]["denoise"], json!(0.75_f32));
        assert_eq!(workflow["6"]["inputs"]["text"], "a fade");
    }

    #[test]
    fn txt2img_uses_empty_latent() {
        let config = ComfyUIConfig::new("http://localhost:8188");
        let workflow = build_workflow(&config, "a fade", None, 1);

        assert!(workflow.get("10").is_none());
        assert_eq!(workflow["5"]["class_type"], "EmptyLatentImage");
        assert_eq!(workflow["3"]["inputs"]["denoise"], 1.0);
    }
}
