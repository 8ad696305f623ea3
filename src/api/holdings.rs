//! Portfolio holdings.

use tracing::debug;

use crate::client::FolioClient;
use crate::config;
use crate::error::Result;
use crate::models::holdings::{Holding, HoldingDraft};
use crate::transport::request::PendingRequest;

/// Holdings operations, borrowed from a [`FolioClient`].
pub struct HoldingsApi<'a> {
    client: &'a FolioClient,
}

impl<'a> HoldingsApi<'a> {
    pub(crate) fn new(client: &'a FolioClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Holding>> {
        let holdings: Vec<Holding> = self.client.pipeline().get_json(config::HOLDINGS_PATH).await?;
        debug!(count = holdings.len(), "Holdings fetched");
        Ok(holdings)
    }

    pub async fn create(&self, draft: &HoldingDraft) -> Result<()> {
        self.client
            .pipeline()
            .send(PendingRequest::post(config::HOLDINGS_PATH).json(draft)?)
            .await?;
        debug!(coin = draft.coin_name.as_str(), "Holding created");
        Ok(())
    }

    pub async fn update(&self, id: i64, draft: &HoldingDraft) -> Result<()> {
        let path = format!("{}/{id}", config::HOLDINGS_PATH);
        self.client
            .pipeline()
            .send(PendingRequest::put(path).json(draft)?)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let path = format!("{}/{id}", config::HOLDINGS_PATH);
        self.client.pipeline().send(PendingRequest::delete(path)).await?;
        Ok(())
    }
}
