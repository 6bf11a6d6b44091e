#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use inbox_relay::email::decode::encode_base64;
use inbox_relay::email::RawMessage;
use inbox_relay::error::{MailError, MailResult};
use inbox_relay::mailbox::{Connector, LabelChange, ListQuery, MailProvider, MessageFormat, MessagePage, MessageRef};

/// In-memory mailbox serving pre-built pages and messages
#[derive(Default)]
pub struct FakeMailbox {
    pub pages: Vec<Vec<MessageRef>>,
    pub messages: HashMap<String, RawMessage>,
    pub failing: HashSet<String>,
    pub failing_page: Option<usize>,
    pub labels: Mutex<HashMap<String, BTreeSet<String>>>,
    pub page_tokens_seen: Mutex<Vec<Option<String>>>,
}

impl FakeMailbox {
    /// One page per entry of `page_sizes`, ids numbered across pages
    pub fn with_pages(page_sizes: &[usize]) -> Self {
        let mut mailbox = FakeMailbox::default();
        let mut counter = 0;
        for size in page_sizes {
            let mut page = Vec::new();
            for _ in 0..*size {
                let id = format!("msg-{:04}", counter);
                page.push(MessageRef {
                    id: id.clone(),
                    thread_id: format!("thread-{:04}", counter),
                });
                mailbox.insert(simple_message(&id, &format!("Subject {}", counter)));
                counter += 1;
            }
            mailbox.pages.push(page);
        }
        mailbox
    }

    pub fn insert(&mut self, message: RawMessage) {
        self.labels
            .lock()
            .unwrap()
            .insert(message.id.clone(), message.label_ids.iter().cloned().collect());
        self.messages.insert(message.id.clone(), message);
    }

    pub fn labels_of(&self, id: &str) -> BTreeSet<String> {
        self.labels.lock().unwrap().get(id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl MailProvider for FakeMailbox {
    async fn list_page(&self, _query: &ListQuery, page_token: Option<&str>) -> MailResult<MessagePage> {
        self.page_tokens_seen
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));

        let index = match page_token {
            None => 0,
            Some(token) => token
                .trim_start_matches("page-")
                .parse::<usize>()
                .map_err(|_| MailError::provider(format!("bad page token {}", token)))?,
        };

        if self.failing_page == Some(index) {
            return Err(MailError::provider(format!("page {} unavailable", index)));
        }

        let refs = self.pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(MessagePage { refs, next_page_token })
    }

    async fn get_message(&self, id: &str, _format: MessageFormat) -> MailResult<RawMessage> {
        if self.failing.contains(id) {
            return Err(MailError::provider(format!("message {} unavailable", id)));
        }
        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| MailError::provider(format!("message {} not found", id)))
    }

    async fn modify_labels(&self, id: &str, change: &LabelChange) -> MailResult<()> {
        let mut labels = self.labels.lock().unwrap();
        let current = labels
            .get_mut(id)
            .ok_or_else(|| MailError::provider(format!("message {} not found", id)))?;
        for label in &change.remove {
            current.remove(label);
        }
        for label in &change.add {
            current.insert(label.clone());
        }
        Ok(())
    }
}

/// Connector always returning the same provider, or failing authorization
pub struct FakeConnector {
    pub mailbox: Option<Arc<FakeMailbox>>,
}

impl FakeConnector {
    pub fn new(mailbox: Arc<FakeMailbox>) -> Self {
        Self { mailbox: Some(mailbox) }
    }

    pub fn unauthorized() -> Self {
        Self { mailbox: None }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> MailResult<Arc<dyn MailProvider>> {
        match &self.mailbox {
            Some(mailbox) => {
                let provider: Arc<dyn MailProvider> = mailbox.clone();
                Ok(provider)
            }
            None => Err(MailError::authorization("no saved credentials and no AUTH_CODE supplied")),
        }
    }
}

pub fn b64(text: &str) -> String {
    encode_base64(text.as_bytes())
}

/// Single-part text/plain message in the inbox
pub fn simple_message(id: &str, subject: &str) -> RawMessage {
    serde_json::from_value(json!({
        "id": id,
        "threadId": format!("thread-{}", id),
        "labelIds": ["UNREAD", "INBOX"],
        "snippet": format!("Snippet of {}", id),
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                {"name": "From", "value": "Alice <alice@example.com>"},
                {"name": "To", "value": "bob@example.com"},
                {"name": "Subject", "value": subject},
                {"name": "Date", "value": "Mon, 6 Oct 2025 09:15:00 +0200"}
            ],
            "body": {"size": 5, "data": b64("Hello")}
        }
    }))
    .unwrap()
}
