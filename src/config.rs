use anyhow::{Context, Result};
use serde::Deserialize;

use crate::mailbox::MessageFormat;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub gmail: GmailConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Answer 404 instead of an empty array when no email is listed
    pub empty_inbox_not_found: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GmailConfig {
    pub credentials_path: String,
    pub token_path: String,
    /// One-time authorization code, only needed until the token file exists
    pub auth_code: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    pub labels: Vec<String>,
    pub page_size: u32,
    pub format: MessageFormat,
    pub concurrency: usize,
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "4000")
            .parse::<u16>()
            .context("PORT doit être un numéro de port valide")?;

        let page_size = var("GMAIL_PAGE_SIZE", "500")
            .parse::<u32>()
            .context("GMAIL_PAGE_SIZE doit être un entier")?;
        if !(1..=500).contains(&page_size) {
            anyhow::bail!("GMAIL_PAGE_SIZE doit être compris entre 1 et 500 (reçu {})", page_size);
        }

        let concurrency = var("FETCH_CONCURRENCY", "25")
            .parse::<usize>()
            .context("FETCH_CONCURRENCY doit être un entier")?;
        if concurrency == 0 {
            anyhow::bail!("FETCH_CONCURRENCY doit être supérieur à 0");
        }

        let format = var("GMAIL_MESSAGE_FORMAT", "full").parse::<MessageFormat>()?;

        let labels: Vec<String> = var("GMAIL_LIST_LABELS", "UNREAD,INBOX")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let empty_inbox_not_found = var("EMPTY_INBOX_NOT_FOUND", "false")
            .parse::<bool>()
            .context("EMPTY_INBOX_NOT_FOUND doit valoir true ou false")?;

        Ok(Config {
            server: ServerConfig {
                port,
                empty_inbox_not_found,
            },
            gmail: GmailConfig {
                credentials_path: var("GMAIL_CREDENTIALS_PATH", "./credentials.json"),
                token_path: var("GMAIL_TOKEN_PATH", "./token.json"),
                auth_code: lookup("AUTH_CODE").filter(|code| !code.trim().is_empty()),
            },
            fetch: FetchConfig {
                labels,
                page_size,
                format,
                concurrency,
            },
        })
    }
}
