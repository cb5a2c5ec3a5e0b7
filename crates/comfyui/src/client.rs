//! WebSocket connection to a ComfyUI instance.

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type ComfyUIStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket endpoint of one ComfyUI server.
#[derive(Debug, Clone)]
pub struct ComfyUIClient {
    ws_url: String,
}

impl ComfyUIClient {
    /// Derive the WebSocket base URL from the HTTP one
    /// (`http` -> `ws`, `https` -> `wss`).
    pub fn from_api_url(api_url: &str) -> Result<Self, ComfyUIClientError> {
        let mut url = url::Url::parse(api_url)
            .map_err(|e| ComfyUIClientError::Connection(format!("Invalid URL {api_url}: {e}")))?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            "ws" | "wss" => return Ok(Self::new(api_url.trim_end_matches('/').to_string())),
            other => {
                return Err(ComfyUIClientError::Connection(format!(
                    "Unsupported URL scheme '{other}'"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| ComfyUIClientError::Connection(format!("Cannot rewrite {api_url}")))?;
        Ok(Self::new(url.as_str().trim_end_matches('/').to_string()))
    }

    /// * `ws_url` - WebSocket base URL, e.g. `ws://host:8188`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open `/ws?clientId=...` so ComfyUI addresses prompt events to us.
    pub async fn connect(&self, client_id: &str) -> Result<ComfyUIStream, ComfyUIClientError> {
        let url = format!("{}/ws?clientId={}", self.ws_url, client_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ComfyUIClientError::Connection(format!(
                "Failed to connect to ComfyUI at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::debug!(client_id, "Connected to ComfyUI at {}", self.ws_url);
        Ok(ws_stream)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComfyUIClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failure on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_follows_http_scheme() {
        let plain = ComfyUIClient::from_api_url("http://gpu:8188").unwrap();
        assert_eq!(plain.ws_url(), "ws://gpu:8188");
        let tls = ComfyUIClient::from_api_url("https://gpu.example.com/").unwrap();
        assert_eq!(tls.ws_url(), "wss://gpu.example.com");
        assert!(ComfyUIClient::from_api_url("ftp://gpu").is_err());
    }
}
