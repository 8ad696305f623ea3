//! The coin catalogue.

use crate::client::FolioClient;
use crate::config;
use crate::error::{Error, Result};
use crate::models::holdings::OneOrMany;

pub struct CoinsApi<'a> {
    client: &'a FolioClient,
}

impl<'a> CoinsApi<'a> {
    pub(crate) fn new(client: &'a FolioClient) -> Self {
        Self { client }
    }

    /// Coin names known to the server. An empty catalogue answers 404.
    pub async fn list(&self) -> Result<Vec<String>> {
        match self.client.pipeline().get_json::<OneOrMany>(config::COINS_PATH).await {
            Ok(coins) => Ok(coins.into()),
            Err(Error::Api { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
