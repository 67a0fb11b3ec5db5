//! Channel resolution and video listing.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::adapters::MetadataProvider;
use crate::domain::{ChannelId, ChannelInfo, ChannelRef, ResolveError, VideoSummary};

/// Resolves channel references and lists channel uploads
pub struct ChannelResolver {
    provider: Arc<dyn MetadataProvider>,
}

impl ChannelResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self { provider }
    }

    /// Resolve a raw reference string to a channel ID
    pub async fn resolve(&self, reference: &str) -> Result<ChannelId, ResolveError> {
        self.resolve_ref(&ChannelRef::parse(reference)).await
    }

    /// Resolve an already-parsed reference.
    ///
    /// Direct lookups (handle, username) fall back to a channel search.
    #[instrument(skip(self, reference), fields(reference = %reference))]
    pub async fn resolve_ref(&self, reference: &ChannelRef) -> Result<ChannelId, ResolveError> {
        let (name, direct, query) = match reference {
            ChannelRef::ChannelIdUrl(id) => return Ok(id.clone()),
            ChannelRef::Invalid(raw) => return Err(ResolveError::InvalidReference(raw.clone())),
            ChannelRef::HandleUrl(handle) => (
                handle,
                self.provider.channel_by_handle(handle).await?,
                format!("@{}", handle),
            ),
            ChannelRef::CustomUrl(name) | ChannelRef::UserUrl(name) => (
                name,
                self.provider.channel_by_username(name).await?,
                name.clone(),
            ),
        };

        if let Some(id) = direct {
            info!(channel_id = %id, "Resolved channel");
            return Ok(id);
        }

        debug!(%query, "Direct lookup found nothing, searching");
        match self.provider.search_channel(&query).await? {
            Some(id) => {
                info!(channel_id = %id, "Resolved channel via search");
                Ok(id)
            }
            None => Err(ResolveError::ChannelNotFound(name.clone())),
        }
    }

    /// List every upload of a channel, following pagination to the end
    #[instrument(skip(self, channel_id), fields(channel_id = %channel_id))]
    pub async fn list_videos(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Vec<VideoSummary>, ResolveError> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;
        let mut reported_total = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .provider
                .uploads_page(channel_id, page_token.as_deref())
                .await?;
            pages += 1;

            if reported_total.is_none() {
                reported_total = page.total_results;
            }
            debug!(page = pages, count = page.videos.len(), "Fetched uploads page");
            videos.extend(page.videos);

            match page.next_page_token {
                Some(token) if Some(token.as_str()) != page_token.as_deref() => {
                    page_token = Some(token)
                }
                Some(_) => {
                    warn!("Provider returned the same page token twice, stopping");
                    break;
                }
                None => break,
            }
        }

        if let Some(total) = reported_total {
            if total != videos.len() as u64 {
                warn!(
                    collected = videos.len(),
                    reported = total,
                    "Collected video count differs from the reported total"
                );
            }
        }

        info!(count = videos.len(), pages, "Listed channel videos");
        Ok(videos)
    }

    /// Title and statistics for a resolved channel
    pub async fn channel_info(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelInfo>, ResolveError> {
        Ok(self.provider.channel_info(channel_id).await?)
    }
}
