// Stage endpoint
//
// The current stage is a single reading; the same shape arrives on the
// push channel (see `sse`).

use tracing::debug;

use crate::client::ApiClient;
use crate::error::{Error, Operation};
use crate::models::StageReading;

impl ApiClient {
    /// Fetch the current loadshedding stage.
    ///
    /// `GET /api/stage`
    pub async fn stage(&self) -> Result<StageReading, Error> {
        let url = self.api_url(&["stage"])?;
        debug!("fetching stage");
        self.get_json(Operation::Stage, url).await
    }
}
