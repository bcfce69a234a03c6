use async_trait::async_trait;
use livegen_client::{Client, GenerationClientError, GenerationRequest, StreamingResponse};

/// Anything that can answer a generation request with a frame stream.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    async fn open(
        &self,
        request: &GenerationRequest,
    ) -> Result<StreamingResponse, GenerationClientError>;
}

#[async_trait]
impl GenerationBackend for Client {
    async fn open(
        &self,
        request: &GenerationRequest,
    ) -> Result<StreamingResponse, GenerationClientError> {
        self.generate(request).await
    }
}
