use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use super::{AnalysisTransport, ImageUpload, NetworkError, TransportResponse};
use crate::config::ControllerConfig;

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectFailed(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// `reqwest`-backed transport for the analysis service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ControllerConfig) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| NetworkError::ClientBuild(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn finish(response: reqwest::Response) -> Result<TransportResponse, NetworkError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| NetworkError::Body(err.to_string()))?;
        debug!(status, bytes = body.len(), "analysis service responded");
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn post_json(&self, path: &str, body: &Value) -> Result<TransportResponse, NetworkError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::finish(response).await
    }

    async fn post_file(
        &self,
        path: &str,
        field: &str,
        upload: &ImageUpload,
    ) -> Result<TransportResponse, NetworkError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|err| NetworkError::InvalidUpload(err.to_string()))?;
        let form = Form::new().part(field.to_string(), part);

        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await?;
        Self::finish(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_endpoint() {
        let config = ControllerConfig {
            base_url: "http://localhost:5000/".to_string(),
            ..ControllerConfig::default()
        };
        let transport = HttpTransport::new(&config).expect("client");
        assert_eq!(transport.url("/optimize"), "http://localhost:5000/optimize");
        assert_eq!(transport.url("measure"), "http://localhost:5000/measure");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invalid_mime_type_is_rejected_before_sending() {
        let transport = HttpTransport::new(&ControllerConfig::default()).expect("client");
        let upload = ImageUpload {
            file_name: "shot.png".to_string(),
            mime_type: "not a mime".to_string(),
            bytes: vec![0x89, 0x50],
        };
        let result = transport.post_file("/image-to-code", "file", &upload).await;
        assert!(matches!(result, Err(NetworkError::InvalidUpload(_))));
    }
}
