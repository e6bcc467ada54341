// Schedule endpoint

use tracing::debug;

use crate::client::{ApiClient, require_non_empty};
use crate::error::{Error, Operation};
use crate::models::Schedule;

impl ApiClient {
    /// Fetch the loadshedding schedule for a town at the current stage.
    ///
    /// `GET /api/schedule/{province}/{town}`
    pub async fn schedule(&self, province: &str, town: &str) -> Result<Schedule, Error> {
        require_non_empty(Operation::Schedule, "province", province)?;
        require_non_empty(Operation::Schedule, "town", town)?;
        let url = self.api_url(&["schedule", province, town])?;
        debug!(province, town, "fetching schedule");
        self.get_json(Operation::Schedule, url).await
    }
}
