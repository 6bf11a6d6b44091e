use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::config::FetchConfig;
use crate::email::{normalize, NormalizedEmail};
use crate::error::MailResult;
use crate::mailbox::{list_message_ids, Connector, LabelChange, ListQuery, MailProvider, MessageFormat, MessageRef};

/// Outcome of fetching the details of a batch of messages
#[derive(Debug, Default)]
pub struct FetchReport {
    pub emails: Vec<NormalizedEmail>,
    pub failed: Vec<String>,
}

/// Orchestrates listing, concurrent fetching and normalization, plus the
/// single-message mutations
pub struct Inbox {
    connector: Arc<dyn Connector>,
    query: ListQuery,
    format: MessageFormat,
    concurrency: usize,
}

impl Inbox {
    pub fn new(connector: Arc<dyn Connector>, config: &FetchConfig) -> Self {
        Self {
            connector,
            query: ListQuery {
                label_ids: config.labels.clone(),
                page_size: config.page_size,
            },
            format: config.format,
            concurrency: config.concurrency,
        }
    }

    /// List every matching message and return the ones that could be fetched
    pub async fn fetch_emails(&self) -> MailResult<Vec<NormalizedEmail>> {
        debug!("Authorizing mail client");
        let provider = self.connector.connect().await?;

        debug!("Listing messages");
        let refs = list_message_ids(provider.as_ref(), &self.query).await?;
        info!("Found {} messages, fetching details...", refs.len());

        let report = fetch_details(provider.as_ref(), refs, self.format, self.concurrency).await;
        if !report.failed.is_empty() {
            warn!("⚠️  {} message(s) could not be fetched: {:?}", report.failed.len(), report.failed);
        }
        info!("Successfully processed {} emails", report.emails.len());

        Ok(report.emails)
    }

    pub async fn mark_read(&self, id: &str) -> MailResult<()> {
        info!("Marking email as read: {}", id);
        let provider = self.connector.connect().await?;
        provider.modify_labels(id, &LabelChange::mark_read()).await?;
        info!("✅ Email {} marked as read", id);
        Ok(())
    }

    pub async fn trash(&self, id: &str) -> MailResult<()> {
        info!("Moving email to trash: {}", id);
        let provider = self.connector.connect().await?;
        provider.modify_labels(id, &LabelChange::move_to_trash()).await?;
        info!("🗑️  Email {} moved to trash", id);
        Ok(())
    }
}

/// Fetch and normalize `refs` concurrently (at most `concurrency` in flight).
/// A failing message is recorded in the report and never fails the batch;
/// successes keep the listing order.
pub async fn fetch_details(
    provider: &dyn MailProvider,
    refs: Vec<MessageRef>,
    format: MessageFormat,
    concurrency: usize,
) -> FetchReport {
    let results: Vec<_> = stream::iter(refs)
        .map(move |message_ref| async move {
            let result = provider.get_message(&message_ref.id, format).await;
            (message_ref.id, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = FetchReport::default();
    for (id, result) in results {
        match result {
            Ok(message) => report.emails.push(normalize(message)),
            Err(e) => {
                warn!("Error processing message {}: {}", id, e);
                report.failed.push(id);
            }
        }
    }
    report
}
