use crate::utils::error::Result;
use async_trait::async_trait;

/// Where a pipeline's output goes. Inputs are fetched by the pipeline itself.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Human readable location of `path`, used in log lines and the final report.
    fn location(&self, path: &str) -> String;
}

/// One batch job split into its three phases. `load` returns where the result went.
#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}
