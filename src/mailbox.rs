//! Provider-agnostic view of a mailbox: the operations the inbox needs
//! and the paging loop over the list endpoint.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;

use crate::email::RawMessage;
use crate::error::MailResult;

pub const LABEL_UNREAD: &str = "UNREAD";
pub const LABEL_INBOX: &str = "INBOX";
pub const LABEL_TRASH: &str = "TRASH";

/// Identifier pair returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

/// One page of the list endpoint
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub refs: Vec<MessageRef>,
    pub next_page_token: Option<String>,
}

/// Filter applied when listing messages
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub label_ids: Vec<String>,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            label_ids: vec![LABEL_UNREAD.to_string(), LABEL_INBOX.to_string()],
            page_size: 500,
        }
    }
}

/// How much of a message the provider should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// From/To/Subject/Date headers, labels and snippet only
    Metadata,
    /// Complete MIME part tree with inline body data
    Full,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Metadata => "metadata",
            MessageFormat::Full => "full",
        }
    }
}

impl FromStr for MessageFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metadata" => Ok(MessageFormat::Metadata),
            "full" => Ok(MessageFormat::Full),
            other => anyhow::bail!("Format de message inconnu: '{}' (attendu: full ou metadata)", other),
        }
    }
}

/// Labels to add and remove on a single message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelChange {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl LabelChange {
    pub fn mark_read() -> Self {
        Self {
            add: Vec::new(),
            remove: vec![LABEL_UNREAD.to_string()],
        }
    }

    pub fn move_to_trash() -> Self {
        Self {
            add: vec![LABEL_TRASH.to_string()],
            remove: vec![LABEL_INBOX.to_string(), LABEL_UNREAD.to_string()],
        }
    }
}

/// Operations the inbox needs from a mail provider
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Fetch one page of message references
    async fn list_page(&self, query: &ListQuery, page_token: Option<&str>) -> MailResult<MessagePage>;

    /// Fetch a single message
    async fn get_message(&self, id: &str, format: MessageFormat) -> MailResult<RawMessage>;

    /// Apply a label change to a single message
    async fn modify_labels(&self, id: &str, change: &LabelChange) -> MailResult<()>;
}

/// Hands out an authorized provider for the duration of a request
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> MailResult<Arc<dyn MailProvider>>;
}

/// List every message matching `query`, following continuation tokens
/// until the provider stops returning one. Any failing page aborts the listing.
pub async fn list_message_ids(provider: &dyn MailProvider, query: &ListQuery) -> MailResult<Vec<MessageRef>> {
    let mut all_refs = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = provider.list_page(query, page_token.as_deref()).await?;
        pages += 1;
        all_refs.extend(page.refs);
        debug!("Page {} fetched, {} message(s) so far", pages, all_refs.len());

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    info!("Total messages found: {} ({} page(s))", all_refs.len(), pages);
    Ok(all_refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_format_parsing() {
        assert_eq!("full".parse::<MessageFormat>().unwrap(), MessageFormat::Full);
        assert_eq!(" Metadata ".parse::<MessageFormat>().unwrap(), MessageFormat::Metadata);
        assert!("minimal".parse::<MessageFormat>().is_err());
        assert_eq!(MessageFormat::Metadata.as_str(), "metadata");
    }

    #[test]
    fn test_label_changes() {
        let read = LabelChange::mark_read();
        assert!(read.add.is_empty());
        assert_eq!(read.remove, vec!["UNREAD"]);

        let trash = LabelChange::move_to_trash();
        assert_eq!(trash.add, vec!["TRASH"]);
        assert_eq!(trash.remove, vec!["INBOX", "UNREAD"]);
    }
}
