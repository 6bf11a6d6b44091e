use std::sync::Arc;

use async_trait::async_trait;
use google_gmail1::api::{self, Scope};
use google_gmail1::{oauth2, Gmail};
use log::{debug, info};
use tokio::sync::OnceCell;

use crate::config::GmailConfig;
use crate::credentials::{CredentialStore, StoredCredential};
use crate::email::decode::encode_base64;
use crate::email::{Header, MimePart, PartBody, RawMessage};
use crate::error::{MailError, MailResult};
use crate::mailbox::{Connector, LabelChange, ListQuery, MailProvider, MessageFormat, MessagePage, MessageRef};

const USER_ID: &str = "me";
const METADATA_HEADERS: [&str; 4] = ["From", "To", "Subject", "Date"];

pub type HttpsConnector = hyper_rustls::HttpsConnector<hyper::client::HttpConnector>;
pub type HttpsClient = hyper::Client<HttpsConnector>;

pub(crate) fn https_client() -> HttpsClient {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();

    hyper::Client::builder().build(connector)
}

pub struct GmailClient {
    hub: Gmail<HttpsConnector>,
}

impl GmailClient {
    pub async fn new(credential: &StoredCredential) -> MailResult<Self> {
        info!("Connecting to Gmail API via OAuth2");

        let secret = serde_json::to_value(credential)
            .and_then(serde_json::from_value)
            .map_err(|e| MailError::authorization(format!("invalid stored credential: {}", e)))?;

        // Access tokens are refreshed by the authenticator from the stored refresh token
        let auth = oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .map_err(|e| MailError::authorization(format!("unable to create OAuth2 authenticator: {}", e)))?;

        let hub = Gmail::new(https_client(), auth);

        info!("✅ Gmail API connection established successfully");

        Ok(GmailClient { hub })
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_page(&self, query: &ListQuery, page_token: Option<&str>) -> MailResult<MessagePage> {
        debug!("Fetching page of messages (labels: {:?})", query.label_ids);

        let mut call = self
            .hub
            .users()
            .messages_list(USER_ID)
            .max_results(query.page_size)
            .add_scope(Scope::Modify);
        for label in &query.label_ids {
            call = call.add_label_ids(label);
        }
        if let Some(token) = page_token {
            call = call.page_token(token);
        }

        let (_, response) = call.doit().await?;

        let refs = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg| {
                Some(MessageRef {
                    id: msg.id?,
                    thread_id: msg.thread_id.unwrap_or_default(),
                })
            })
            .collect();

        Ok(MessagePage {
            refs,
            next_page_token: response.next_page_token,
        })
    }

    async fn get_message(&self, id: &str, format: MessageFormat) -> MailResult<RawMessage> {
        debug!("Retrieving message {} ({})", id, format.as_str());

        let mut call = self
            .hub
            .users()
            .messages_get(USER_ID, id)
            .format(format.as_str())
            .add_scope(Scope::Modify);
        if format == MessageFormat::Metadata {
            for name in METADATA_HEADERS {
                call = call.add_metadata_headers(name);
            }
        }

        let (_, message) = call.doit().await?;
        Ok(convert_message(message, id))
    }

    async fn modify_labels(&self, id: &str, change: &LabelChange) -> MailResult<()> {
        debug!("Modifying labels of {}: +{:?} -{:?}", id, change.add, change.remove);

        let mut request = api::ModifyMessageRequest::default();
        if !change.add.is_empty() {
            request.add_label_ids = Some(change.add.clone());
        }
        if !change.remove.is_empty() {
            request.remove_label_ids = Some(change.remove.clone());
        }

        self.hub
            .users()
            .messages_modify(request, USER_ID, id)
            .add_scope(Scope::Modify)
            .doit()
            .await?;

        Ok(())
    }
}

fn convert_message(message: api::Message, requested_id: &str) -> RawMessage {
    RawMessage {
        id: message.id.unwrap_or_else(|| requested_id.to_string()),
        thread_id: message.thread_id.unwrap_or_default(),
        label_ids: message.label_ids.unwrap_or_default(),
        snippet: message.snippet.unwrap_or_default(),
        payload: message.payload.map(convert_part),
    }
}

fn convert_part(part: api::MessagePart) -> MimePart {
    let body = part.body.unwrap_or_default();
    MimePart {
        part_id: part.part_id.unwrap_or_default(),
        mime_type: part.mime_type.unwrap_or_default(),
        filename: part.filename.unwrap_or_default(),
        headers: part
            .headers
            .unwrap_or_default()
            .into_iter()
            .map(|header| Header {
                name: header.name.unwrap_or_default(),
                value: header.value.unwrap_or_default(),
            })
            .collect(),
        body: PartBody {
            attachment_id: body.attachment_id,
            size: body.size.map(i64::from).unwrap_or_default(),
            // google-gmail1 hands back decoded bytes; keep the transport form so
            // fixtures and live payloads go through the same decoder
            data: body.data.map(|bytes| encode_base64(&bytes)),
        },
        parts: part
            .parts
            .unwrap_or_default()
            .into_iter()
            .map(convert_part)
            .collect(),
    }
}

/// Builds the Gmail client once credentials are available and keeps it for later requests
pub struct GmailConnector {
    store: CredentialStore,
    auth_code: Option<String>,
    client: OnceCell<Arc<GmailClient>>,
}

impl GmailConnector {
    pub fn new(config: &GmailConfig) -> Self {
        Self {
            store: CredentialStore::new(&config.credentials_path, &config.token_path),
            auth_code: config.auth_code.clone(),
            client: OnceCell::new(),
        }
    }
}

#[async_trait]
impl Connector for GmailConnector {
    async fn connect(&self) -> MailResult<Arc<dyn MailProvider>> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let credential = self.store.authorize(self.auth_code.as_deref()).await?;
                GmailClient::new(&credential).await.map(Arc::new)
            })
            .await?;

        let provider: Arc<dyn MailProvider> = client.clone();
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::normalize;

    fn header(name: &str, value: &str) -> api::MessagePartHeader {
        api::MessagePartHeader {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn test_convert_message_normalizes_api_payload() {
        let html = "<p>Relevé de février: 12 °C</p>";
        let message = api::Message {
            id: None,
            thread_id: Some("t-1".to_string()),
            label_ids: Some(vec!["INBOX".to_string(), "UNREAD".to_string()]),
            snippet: Some("Relevé".to_string()),
            payload: Some(api::MessagePart {
                mime_type: Some("multipart/mixed".to_string()),
                headers: Some(vec![header("Subject", "Relevé"), header("From", "capteur@example.com")]),
                parts: Some(vec![
                    api::MessagePart {
                        part_id: Some("0".to_string()),
                        mime_type: Some("text/html; charset=UTF-8".to_string()),
                        body: Some(api::MessagePartBody {
                            data: Some(html.as_bytes().to_vec()),
                            size: Some(html.len() as i32),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    api::MessagePart {
                        part_id: Some("1".to_string()),
                        mime_type: Some("application/pdf".to_string()),
                        filename: Some("releve.pdf".to_string()),
                        body: Some(api::MessagePartBody {
                            attachment_id: Some("ANGjdJ8".to_string()),
                            size: Some(2048),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let email = normalize(convert_message(message, "req-42"));

        assert_eq!(email.id, "req-42");
        assert_eq!(email.thread_id, "t-1");
        assert_eq!(email.subject, "Relevé");
        assert_eq!(email.from, "capteur@example.com");
        assert_eq!(email.to, "Unknown Recipient");
        assert_eq!(email.body, html);
        assert_eq!(email.labels, vec!["INBOX", "UNREAD"]);
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, "releve.pdf");
        assert_eq!(email.attachments[0].attachment_id, "ANGjdJ8");
    }

    #[test]
    fn test_convert_message_keeps_returned_id() {
        let message = api::Message {
            id: Some("18c2".to_string()),
            ..Default::default()
        };

        let raw = convert_message(message, "req-42");
        assert_eq!(raw.id, "18c2");
        assert!(raw.payload.is_none());
    }
}
