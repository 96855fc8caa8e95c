//! Settings endpoints.

use std::sync::Arc;

use backoffice_proto::Setting;

use crate::client::Client;
use crate::error::Error;

/// Read access to settings grouped by module.
#[derive(Debug, Clone)]
pub struct SettingsApi {
    client: Arc<Client>,
}

impl SettingsApi {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// All settings of `module`.
    pub async fn by_module(&self, module: &str) -> Result<Vec<Setting>, Error> {
        let path = self.client.config().endpoints.settings_for(module);
        self.client.get_data(&path).await
    }
}
