// ── Data gateway ──
//
// The four read operations the navigator needs, behind a trait so the
// engine runs against the HTTP client in production and in-memory data
// in tests.

use std::future::Future;

use loadshed_api::{ApiClient, Schedule, StageReading, Town};

use crate::error::CoreError;

/// Source of stage, place and schedule data.
///
/// Operations are idempotent reads with no retries; a failed response
/// or unparsable body is a [`CoreError::Transport`].
pub trait ScheduleSource: Send + Sync + 'static {
    fn stage(&self) -> impl Future<Output = Result<StageReading, CoreError>> + Send;

    fn provinces(&self) -> impl Future<Output = Result<Vec<String>, CoreError>> + Send;

    fn towns(&self, province: &str) -> impl Future<Output = Result<Vec<Town>, CoreError>> + Send;

    fn schedule(
        &self,
        province: &str,
        town: &str,
    ) -> impl Future<Output = Result<Schedule, CoreError>> + Send;
}

impl ScheduleSource for ApiClient {
    async fn stage(&self) -> Result<StageReading, CoreError> {
        Ok(ApiClient::stage(self).await?)
    }

    async fn provinces(&self) -> Result<Vec<String>, CoreError> {
        Ok(ApiClient::provinces(self).await?)
    }

    async fn towns(&self, province: &str) -> Result<Vec<Town>, CoreError> {
        Ok(ApiClient::towns(self, province).await?)
    }

    async fn schedule(&self, province: &str, town: &str) -> Result<Schedule, CoreError> {
        Ok(ApiClient::schedule(self, province, town).await?)
    }
}
