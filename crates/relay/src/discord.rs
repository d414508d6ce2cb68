//! Discord REST client.
//!
//! Stateless wrapper over the v10 HTTP API. Each method issues one request
//! (the name search pages through listings) with the client's fixed timeout
//! and no retry. Lookups treat 404 as an empty result; every other non-2xx
//! becomes `DiscordError::Status` carrying Discord's error code and message
//! when the body has them.

use std::time::Duration;

use hookrelay_protocol::{
    ActiveThreadsPage, ApiErrorBody, ArchivedThreadsPage, ChannelInfo, CreateThreadRequest,
    MessagePayload, RemoteThread, SentMessage, ThreadStatePatch, MAX_THREAD_NAME_CHARS,
    PUBLIC_THREAD_TYPE,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DiscordConfig;

/// Discord caps archived listings at 100 threads per page.
pub const ARCHIVED_PAGE_LIMIT: u8 = 100;
const AUTO_ARCHIVE_MINUTES: u32 = 1440;
const WEBHOOK_ENDPOINT: &str = "webhook";

/// Discord JSON error codes meaning a thread will not accept messages.
const UNKNOWN_CHANNEL: u64 = 10003;
const THREAD_ARCHIVED: u64 = 50083;
const THREAD_LOCKED: u64 = 160005;

#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("transport error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}{}", api_detail(.code, .message))]
    Status {
        endpoint: String,
        status: u16,
        code: Option<u64>,
        message: Option<String>,
    },

    #[error("malformed response from {endpoint}: {detail}")]
    Decode { endpoint: String, detail: String },

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

fn api_detail(code: &Option<u64>, message: &Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!(" (code {code}: {message})"),
        (None, Some(message)) => format!(" ({message})"),
        (Some(code), None) => format!(" (code {code})"),
        (None, None) => String::new(),
    }
}

impl DiscordError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    /// Discord definitively refused the target thread: it is gone, or it is
    /// archived or locked. Rate limits, 5xx and transport failures are not.
    pub fn is_thread_gone(&self) -> bool {
        match self {
            Self::Status { status: 404, .. } => true,
            Self::Status {
                status: 400 | 403,
                code: Some(code),
                ..
            } => matches!(*code, UNKNOWN_CHANNEL | THREAD_ARCHIVED | THREAD_LOCKED),
            _ => false,
        }
    }
}

/// Which archived-thread listing to page through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveVisibility {
    Public,
    Private,
}

impl ArchiveVisibility {
    fn path_segment(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    webhook_url: Option<String>,
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> Result<Self, DiscordError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("hookrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| DiscordError::Transport {
                endpoint: "client".to_string(),
                source,
            })?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            webhook_url: config.webhook_url.clone(),
        })
    }

    pub fn has_webhook(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub fn has_bot_token(&self) -> bool {
        self.bot_token.is_some()
    }

    /// Post through the webhook. With `thread_id` the message lands in that
    /// thread; with `payload.thread_name` on a forum webhook a new post is
    /// created and the returned `channel_id` is its id.
    pub async fn send_webhook(
        &self,
        payload: &MessagePayload,
        thread_id: Option<&str>,
    ) -> Result<SentMessage, DiscordError> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or(DiscordError::MissingCredential("webhook_url"))?;
        let mut query = vec![("wait", "true")];
        if let Some(thread_id) = thread_id {
            query.push(("thread_id", thread_id));
        }
        let request = self.http.post(url).query(&query).json(payload);
        self.execute(request, WEBHOOK_ENDPOINT).await
    }

    /// Post as the bot into a channel or thread.
    pub async fn send_bot_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<SentMessage, DiscordError> {
        let body = MessagePayload {
            username: None,
            thread_name: None,
            ..payload.clone()
        };
        let path = format!("/channels/{channel_id}/messages");
        let request = self.bot_request(Method::POST, &path)?.json(&body);
        self.execute(request, &path).await
    }

    /// Create a public thread (not attached to a message) in a text channel.
    pub async fn create_thread(
        &self,
        channel_id: &str,
        name: &str,
    ) -> Result<RemoteThread, DiscordError> {
        let body = CreateThreadRequest {
            name: name.chars().take(MAX_THREAD_NAME_CHARS).collect(),
            kind: PUBLIC_THREAD_TYPE,
            auto_archive_duration: AUTO_ARCHIVE_MINUTES,
        };
        let path = format!("/channels/{channel_id}/threads");
        let request = self.bot_request(Method::POST, &path)?.json(&body);
        self.execute(request, &path).await
    }

    pub async fn get_channel(&self, channel_id: &str) -> Result<Option<ChannelInfo>, DiscordError> {
        let path = format!("/channels/{channel_id}");
        let request = self.bot_request(Method::GET, &path)?;
        not_found_as_none(self.execute(request, &path).await)
    }

    pub async fn get_thread(&self, thread_id: &str) -> Result<Option<RemoteThread>, DiscordError> {
        let path = format!("/channels/{thread_id}");
        let request = self.bot_request(Method::GET, &path)?;
        not_found_as_none(self.execute(request, &path).await)
    }

    /// Active threads of the guild that belong to `channel_id`.
    pub async fn list_active_threads(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Vec<RemoteThread>, DiscordError> {
        let path = format!("/guilds/{guild_id}/threads/active");
        let request = self.bot_request(Method::GET, &path)?;
        let page: Option<ActiveThreadsPage> = not_found_as_none(self.execute(request, &path).await)?;
        Ok(page
            .map(|p| p.threads)
            .unwrap_or_default()
            .into_iter()
            .filter(|t| t.parent_id.as_deref() == Some(channel_id))
            .collect())
    }

    /// One page of archived threads. Callers loop on `has_more`, passing the
    /// last thread's `archive_timestamp` as `before`.
    pub async fn list_archived_threads(
        &self,
        channel_id: &str,
        visibility: ArchiveVisibility,
        before: Option<&str>,
        limit: u8,
    ) -> Result<ArchivedThreadsPage, DiscordError> {
        let path = format!(
            "/channels/{channel_id}/threads/archived/{}",
            visibility.path_segment()
        );
        let limit = limit.clamp(1, ARCHIVED_PAGE_LIMIT).to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(before) = before {
            query.push(("before", before));
        }
        let request = self.bot_request(Method::GET, &path)?.query(&query);
        let page: Option<ArchivedThreadsPage> =
            not_found_as_none(self.execute(request, &path).await)?;
        Ok(page.unwrap_or_default())
    }

    pub async fn unarchive_thread(&self, thread_id: &str) -> Result<RemoteThread, DiscordError> {
        self.patch_thread(
            thread_id,
            ThreadStatePatch {
                archived: false,
                locked: None,
            },
        )
        .await
    }

    /// Archive a thread; `lock` additionally prevents anyone reopening it.
    pub async fn archive_thread(
        &self,
        thread_id: &str,
        lock: bool,
    ) -> Result<RemoteThread, DiscordError> {
        self.patch_thread(
            thread_id,
            ThreadStatePatch {
                archived: true,
                locked: lock.then_some(true),
            },
        )
        .await
    }

    async fn patch_thread(
        &self,
        thread_id: &str,
        patch: ThreadStatePatch,
    ) -> Result<RemoteThread, DiscordError> {
        let path = format!("/channels/{thread_id}");
        let request = self.bot_request(Method::PATCH, &path)?.json(&patch);
        self.execute(request, &path).await
    }

    /// Search the channel's active, public archived and private archived
    /// threads (in that order) for `name`.
    ///
    /// An exact name match returns immediately; otherwise the first thread
    /// whose name contains `name` wins. A failing category is logged and
    /// skipped; an error is returned only if every category failed.
    pub async fn find_thread_by_name(
        &self,
        channel_id: &str,
        name: &str,
        max_archived_pages: u32,
    ) -> Result<Option<RemoteThread>, DiscordError> {
        let mut partial: Option<RemoteThread> = None;
        let mut last_error: Option<DiscordError> = None;
        let mut any_succeeded = false;

        match self.active_threads_for_channel(channel_id).await {
            Ok(threads) => {
                any_succeeded = true;
                if let Some(found) = pick_match(threads, name, &mut partial) {
                    return Ok(Some(found));
                }
            }
            Err(e) => {
                warn!(
                    component = "discord",
                    event = "discord.search.active_failed",
                    channel_id = %channel_id,
                    error = %e,
                    "Active thread search failed"
                );
                last_error = Some(e);
            }
        }

        for visibility in [ArchiveVisibility::Public, ArchiveVisibility::Private] {
            let mut before: Option<String> = None;
            for page_number in 0..max_archived_pages {
                let page = match self
                    .list_archived_threads(
                        channel_id,
                        visibility,
                        before.as_deref(),
                        ARCHIVED_PAGE_LIMIT,
                    )
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(
                            component = "discord",
                            event = "discord.search.archived_failed",
                            channel_id = %channel_id,
                            visibility = ?visibility,
                            page = page_number,
                            error = %e,
                            "Archived thread search failed"
                        );
                        last_error = Some(e);
                        break;
                    }
                };
                any_succeeded = true;

                let has_more = page.has_more;
                let cursor = page
                    .threads
                    .last()
                    .and_then(|t| t.thread_metadata.archive_timestamp.clone());
                if let Some(found) = pick_match(page.threads, name, &mut partial) {
                    return Ok(Some(found));
                }
                match (has_more, cursor) {
                    (true, Some(cursor)) => before = Some(cursor),
                    _ => break,
                }
            }
        }

        if partial.is_some() || any_succeeded {
            return Ok(partial);
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    async fn active_threads_for_channel(
        &self,
        channel_id: &str,
    ) -> Result<Vec<RemoteThread>, DiscordError> {
        let Some(channel) = self.get_channel(channel_id).await? else {
            return Ok(Vec::new());
        };
        let Some(guild_id) = channel.guild_id else {
            return Ok(Vec::new());
        };
        self.list_active_threads(&guild_id, channel_id).await
    }

    fn bot_request(&self, method: Method, path: &str) -> Result<RequestBuilder, DiscordError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or(DiscordError::MissingCredential("bot_token"))?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bot {token}")))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, DiscordError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let api: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            debug!(
                component = "discord",
                event = "discord.request.rejected",
                endpoint = %endpoint,
                status = status.as_u16(),
                code = ?api.code,
            );
            return Err(DiscordError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                code: api.code,
                message: api.message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(endpoint, e))?;
        serde_json::from_slice(&bytes).map_err(|e| DiscordError::Decode {
            endpoint: endpoint.to_string(),
            detail: e.to_string(),
        })
    }
}

fn transport_error(endpoint: &str, source: reqwest::Error) -> DiscordError {
    if source.is_timeout() {
        DiscordError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        DiscordError::Transport {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

fn not_found_as_none<T>(result: Result<T, DiscordError>) -> Result<Option<T>, DiscordError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Exact match, or record the first substring match in `partial`.
fn pick_match(
    threads: Vec<RemoteThread>,
    name: &str,
    partial: &mut Option<RemoteThread>,
) -> Option<RemoteThread> {
    for thread in threads {
        if thread.name == name {
            return Some(thread);
        }
        if partial.is_none() && thread.name.contains(name) {
            *partial = Some(thread);
        }
    }
    None
}
