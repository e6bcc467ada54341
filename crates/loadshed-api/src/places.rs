// Place endpoints
//
// Provinces come back as a bare list of names in server order; towns are
// scoped to one province.

use tracing::debug;

use crate::client::{ApiClient, require_non_empty};
use crate::error::{Error, Operation};
use crate::models::Town;

impl ApiClient {
    /// List all province names.
    ///
    /// `GET /api/provinces`
    pub async fn provinces(&self) -> Result<Vec<String>, Error> {
        let url = self.api_url(&["provinces"])?;
        debug!("listing provinces");
        self.get_json(Operation::Provinces, url).await
    }

    /// List the towns of a province.
    ///
    /// `GET /api/towns/{province}`
    pub async fn towns(&self, province: &str) -> Result<Vec<Town>, Error> {
        require_non_empty(Operation::Towns, "province", province)?;
        let url = self.api_url(&["towns", province])?;
        debug!(province, "listing towns");
        self.get_json(Operation::Towns, url).await
    }
}
