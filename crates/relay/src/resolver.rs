//! Session → thread resolution.
//!
//! Each hook runs as a fresh process, so the resolver rebuilds the binding
//! from the cheapest source that still checks out against Discord:
//!
//! 1. the in-process cache (validated remotely),
//! 2. the SQLite store (validated and repaired remotely),
//! 3. a name search of the channel's active and archived threads,
//! 4. creating a thread (text channels only; forum posts are created by the
//!    first webhook send, see `delivery`).
//!
//! Every remote failure is logged and treated as "nothing from this step".
//! `resolve_or_create` never errors; `None` tells the caller to post to the
//! channel directly.

use std::sync::Arc;

use hookrelay_protocol::RemoteThread;
use tracing::{debug, info, warn};

use crate::config::{ChannelType, RelayConfig};
use crate::discord::DiscordClient;
use crate::thread_cache::ThreadCache;
use crate::thread_naming::thread_name;
use crate::thread_store::{ThreadRecord, ThreadStore};

/// Outcome of checking a known thread id against Discord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validation {
    Usable,
    /// Gone, locked, or could not be unarchived.
    Unusable,
    /// Discord could not be asked; the binding may still be good.
    Unreachable,
}

pub struct ThreadResolver {
    config: Arc<RelayConfig>,
    client: DiscordClient,
    store: Option<ThreadStore>,
    cache: ThreadCache,
}

impl ThreadResolver {
    pub fn new(config: Arc<RelayConfig>, client: DiscordClient, store: Option<ThreadStore>) -> Self {
        Self {
            config,
            client,
            store,
            cache: ThreadCache::new(),
        }
    }

    pub fn client(&self) -> &DiscordClient {
        &self.client
    }

    pub fn store(&self) -> Option<&ThreadStore> {
        self.store.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &ThreadCache {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) fn cache_mut(&mut self) -> &mut ThreadCache {
        &mut self.cache
    }

    pub fn thread_name_for(&self, session_id: &str) -> String {
        thread_name(&self.config.threads.prefix, session_id)
    }

    /// Find a usable thread for the session, creating one when the channel
    /// kind allows it.
    pub async fn resolve_or_create(&mut self, session_id: &str) -> Option<String> {
        if !self.config.threads_enabled() || session_id.trim().is_empty() {
            return None;
        }
        if !self.config.has_thread_credentials() {
            debug!(
                component = "resolver",
                event = "resolver.missing_credentials",
                channel_type = self.config.threads.channel_type.as_str(),
                "Threading enabled without credentials for this channel type"
            );
            return None;
        }

        if let Some(thread_id) = self.from_cache(session_id).await {
            return Some(thread_id);
        }
        if let Some(thread_id) = self.from_store(session_id).await {
            return Some(thread_id);
        }
        if let Some(thread_id) = self.from_remote(session_id).await {
            return Some(thread_id);
        }
        self.create(session_id).await
    }

    /// A thread is usable when neither archived nor locked. Archived threads
    /// are reopened; locked ones are rejected.
    pub async fn ensure_usable(&self, thread: &RemoteThread) -> bool {
        if thread.is_locked() {
            info!(
                component = "resolver",
                event = "resolver.thread_locked",
                thread_id = %thread.id,
                "Rejecting locked thread"
            );
            return false;
        }
        if !thread.is_archived() {
            return true;
        }

        match self.client.unarchive_thread(&thread.id).await {
            Ok(_) => {
                info!(
                    component = "resolver",
                    event = "resolver.thread_unarchived",
                    thread_id = %thread.id,
                    "Unarchived thread"
                );
                true
            }
            Err(e) => {
                warn!(
                    component = "resolver",
                    event = "resolver.unarchive_failed",
                    thread_id = %thread.id,
                    error = %e,
                    "Failed to unarchive thread"
                );
                false
            }
        }
    }

    /// Record a binding learned outside the resolver (forum create-on-send).
    pub fn remember(&mut self, session_id: &str, thread_id: &str) {
        let channel_id = self.config.discord.channel_id.clone().unwrap_or_default();
        let name = self.thread_name_for(session_id);
        self.bind(session_id, thread_id, &channel_id, &name);
    }

    /// Drop a binding whose thread stopped accepting messages.
    pub fn forget(&mut self, session_id: &str) {
        self.cache.remove(session_id);
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(session_id) {
                warn!(
                    component = "resolver",
                    event = "resolver.store_remove_failed",
                    session_id = %session_id,
                    error = %e,
                );
            }
        }
    }

    /// Note that the session's thread was archived at session end.
    pub fn mark_archived(&mut self, session_id: &str) {
        self.cache.remove(session_id);
        if let Some(store) = &self.store {
            if let Err(e) = store.update_status(session_id, true) {
                warn!(
                    component = "resolver",
                    event = "resolver.store_update_failed",
                    session_id = %session_id,
                    error = %e,
                );
            }
        }
    }

    async fn from_cache(&mut self, session_id: &str) -> Option<String> {
        let thread_id = self.cache.get(session_id)?.to_string();
        match self.validate(&thread_id).await {
            Validation::Usable => {
                debug!(
                    component = "resolver",
                    event = "resolver.cache_hit",
                    session_id = %session_id,
                    thread_id = %thread_id,
                );
                Some(thread_id)
            }
            Validation::Unusable | Validation::Unreachable => {
                self.cache.remove(session_id);
                None
            }
        }
    }

    async fn from_store(&mut self, session_id: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        let record = match store.get(session_id) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(
                    component = "resolver",
                    event = "resolver.store_unavailable",
                    session_id = %session_id,
                    error = %e,
                    "Thread store lookup failed; continuing without it"
                );
                return None;
            }
        };

        match self.validate(&record.thread_id).await {
            Validation::Usable => {
                if record.is_archived {
                    if let Some(Err(e)) = self.store.as_ref().map(|s| s.update_status(session_id, false)) {
                        warn!(
                            component = "resolver",
                            event = "resolver.store_update_failed",
                            session_id = %session_id,
                            error = %e,
                        );
                    }
                }
                self.cache.insert(session_id, &record.thread_id);
                debug!(
                    component = "resolver",
                    event = "resolver.store_hit",
                    session_id = %session_id,
                    thread_id = %record.thread_id,
                );
                Some(record.thread_id)
            }
            Validation::Unusable => {
                info!(
                    component = "resolver",
                    event = "resolver.stale_record",
                    session_id = %session_id,
                    thread_id = %record.thread_id,
                    "Removing binding to unusable thread"
                );
                if let Some(Err(e)) = self.store.as_ref().map(|s| s.remove(session_id)) {
                    warn!(
                        component = "resolver",
                        event = "resolver.store_remove_failed",
                        session_id = %session_id,
                        error = %e,
                    );
                }
                None
            }
            Validation::Unreachable => None,
        }
    }

    async fn from_remote(&mut self, session_id: &str) -> Option<String> {
        let channel_id = self.config.discord.channel_id.clone()?;
        if !self.client.has_bot_token() {
            return None;
        }
        let name = self.thread_name_for(session_id);

        let thread = match self
            .client
            .find_thread_by_name(
                &channel_id,
                &name,
                self.config.threads.archived_search_pages,
            )
            .await
        {
            Ok(Some(thread)) => thread,
            Ok(None) => return None,
            Err(e) => {
                warn!(
                    component = "resolver",
                    event = "resolver.search_failed",
                    session_id = %session_id,
                    thread_name = %name,
                    error = %e,
                    "Remote thread search failed"
                );
                return None;
            }
        };

        if !self.ensure_usable(&thread).await {
            return None;
        }

        info!(
            component = "resolver",
            event = "resolver.thread_discovered",
            session_id = %session_id,
            thread_id = %thread.id,
            thread_name = %thread.name,
            "Recovered thread by name"
        );
        let parent = thread.parent_id.clone().unwrap_or(channel_id);
        self.bind(session_id, &thread.id, &parent, &name);
        Some(thread.id)
    }

    async fn create(&mut self, session_id: &str) -> Option<String> {
        if self.config.threads.channel_type == ChannelType::Forum {
            // Forum posts only exist once a message names them.
            return None;
        }
        let channel_id = self.config.discord.channel_id.clone()?;
        let name = self.thread_name_for(session_id);

        match self.client.create_thread(&channel_id, &name).await {
            Ok(thread) => {
                info!(
                    component = "resolver",
                    event = "resolver.thread_created",
                    session_id = %session_id,
                    thread_id = %thread.id,
                    thread_name = %name,
                    "Created thread"
                );
                self.bind(session_id, &thread.id, &channel_id, &name);
                Some(thread.id)
            }
            Err(e) => {
                warn!(
                    component = "resolver",
                    event = "resolver.create_failed",
                    session_id = %session_id,
                    channel_id = %channel_id,
                    error = %e,
                    "Thread creation failed"
                );
                None
            }
        }
    }

    async fn validate(&self, thread_id: &str) -> Validation {
        // Webhook-only forum setups cannot read thread state; trust the
        // binding and let a failed send invalidate it.
        if !self.client.has_bot_token() {
            return Validation::Usable;
        }

        match self.client.get_thread(thread_id).await {
            Ok(Some(thread)) => {
                if self.ensure_usable(&thread).await {
                    Validation::Usable
                } else {
                    Validation::Unusable
                }
            }
            Ok(None) => Validation::Unusable,
            Err(e) => {
                warn!(
                    component = "resolver",
                    event = "resolver.validate_failed",
                    thread_id = %thread_id,
                    error = %e,
                    "Could not validate thread"
                );
                Validation::Unreachable
            }
        }
    }

    fn bind(&mut self, session_id: &str, thread_id: &str, channel_id: &str, name: &str) {
        self.cache.insert(session_id, thread_id);
        if let Some(store) = &self.store {
            let record = ThreadRecord::new(session_id, thread_id, channel_id, name);
            if let Err(e) = store.store(&record) {
                warn!(
                    component = "resolver",
                    event = "resolver.store_write_failed",
                    session_id = %session_id,
                    thread_id = %thread_id,
                    error = %e,
                    "Could not persist thread binding"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::{GET, PATCH, POST};
    use httpmock::MockServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;

    const SESSION: &str = "abc12345";

    fn config_for(server: &MockServer, dir: &TempDir) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.discord.webhook_url = Some(server.url("/api/webhooks/1/secret"));
        config.discord.bot_token = Some("bot-token".to_string());
        config.discord.channel_id = Some("100".to_string());
        config.discord.api_base = server.base_url();
        config.threads.enabled = true;
        config.threads.storage_path = Some(dir.path().join("threads.db"));
        config
    }

    fn resolver_for(config: RelayConfig) -> ThreadResolver {
        let client = DiscordClient::new(&config.discord).expect("client");
        let store = config
            .threads
            .storage_path
            .as_ref()
            .map(|p| ThreadStore::open(p, 30).expect("store"));
        ThreadResolver::new(Arc::new(config), client, store)
    }

    fn thread(id: &str, name: &str, archived: bool, locked: bool) -> Value {
        json!({
            "id": id,
            "name": name,
            "parent_id": "100",
            "guild_id": "900",
            "thread_metadata": { "archived": archived, "locked": locked }
        })
    }

    /// Channel lookup plus empty active/archived listings.
    fn mock_empty_search(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/channels/100");
            then.status(200)
                .json_body(json!({"id": "100", "type": 0, "guild_id": "900"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/guilds/900/threads/active");
            then.status(200).json_body(json!({"threads": []}));
        });
        for visibility in ["public", "private"] {
            server.mock(|when, then| {
                when.method(GET)
                    .path(format!("/channels/100/threads/archived/{visibility}"));
                then.status(200)
                    .json_body(json!({"threads": [], "has_more": false}));
            });
        }
    }

    #[tokio::test]
    async fn discovers_active_thread_by_name_without_creating() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        server.mock(|when, then| {
            when.method(GET).path("/channels/100");
            then.status(200)
                .json_body(json!({"id": "100", "type": 0, "guild_id": "900"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/guilds/900/threads/active");
            then.status(200).json_body(json!({
                "threads": [thread("555", "Session abc12345", false, false)]
            }));
        });
        let create = server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(201).json_body(thread("999", "Session abc12345", false, false));
        });

        let mut resolver = resolver_for(config_for(&server, &dir));
        let found = resolver.resolve_or_create(SESSION).await;

        assert_eq!(found.as_deref(), Some("555"));
        create.assert_calls(0);
        assert_eq!(resolver.cache().get(SESSION), Some("555"));
        let record = resolver
            .store()
            .expect("store")
            .get(SESSION)
            .expect("get")
            .expect("persisted");
        assert_eq!(record.thread_id, "555");
        assert_eq!(record.thread_name, "Session abc12345");
    }

    #[tokio::test]
    async fn repeated_resolution_returns_the_same_thread() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        mock_empty_search(&server);
        let create = server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(201).json_body(thread("555", "Session abc12345", false, false));
        });
        server.mock(|when, then| {
            when.method(GET).path("/channels/555");
            then.status(200).json_body(thread("555", "Session abc12345", false, false));
        });

        let config = config_for(&server, &dir);
        let mut resolver = resolver_for(config.clone());
        let first = resolver.resolve_or_create(SESSION).await;
        let second = resolver.resolve_or_create(SESSION).await;

        // A fresh process sees only the store.
        let mut next_invocation = resolver_for(config);
        let third = next_invocation.resolve_or_create(SESSION).await;

        assert_eq!(first.as_deref(), Some("555"));
        assert_eq!(second, first);
        assert_eq!(third, first);
        create.assert_calls(1);
    }

    #[tokio::test]
    async fn cache_entry_takes_precedence_over_store() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        let cached = server.mock(|when, then| {
            when.method(GET).path("/channels/111");
            then.status(200).json_body(thread("111", "Session abc12345", false, false));
        });
        let stored = server.mock(|when, then| {
            when.method(GET).path("/channels/222");
            then.status(200).json_body(thread("222", "Session abc12345", false, false));
        });

        let mut resolver = resolver_for(config_for(&server, &dir));
        resolver
            .store()
            .expect("store")
            .store(&ThreadRecord::new(SESSION, "222", "100", "Session abc12345"))
            .expect("seed store");
        resolver.cache_mut().insert(SESSION, "111");

        let found = resolver.resolve_or_create(SESSION).await;
        assert_eq!(found.as_deref(), Some("111"));
        cached.assert_calls(1);
        stored.assert_calls(0);
    }

    #[tokio::test]
    async fn dead_cache_entry_falls_through_to_store() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        let cached = server.mock(|when, then| {
            when.method(GET).path("/channels/111");
            then.status(404)
                .json_body(json!({"code": 10003, "message": "Unknown Channel"}));
        });
        let stored = server.mock(|when, then| {
            when.method(GET).path("/channels/222");
            then.status(200).json_body(thread("222", "Session abc12345", false, false));
        });

        let mut resolver = resolver_for(config_for(&server, &dir));
        resolver
            .store()
            .expect("store")
            .store(&ThreadRecord::new(SESSION, "222", "100", "Session abc12345"))
            .expect("seed store");
        resolver.cache_mut().insert(SESSION, "111");

        let found = resolver.resolve_or_create(SESSION).await;
        assert_eq!(found.as_deref(), Some("222"));
        assert_eq!(resolver.cache().get(SESSION), Some("222"));
        cached.assert_calls(1);
        stored.assert_calls(1);
    }

    #[tokio::test]
    async fn broken_store_falls_back_to_discovery() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        mock_empty_search(&server);
        let create = server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(201).json_body(thread("555", "Session abc12345", false, false));
        });

        let config = config_for(&server, &dir);
        let db_path = dir.path().join("threads.db");
        let mut resolver = resolver_for(config);

        // Corrupt the database after it was opened.
        for suffix in ["-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", db_path.display()));
        }
        std::fs::write(&db_path, vec![b'x'; 8192]).expect("corrupt store");
        assert!(resolver.store().expect("store").get(SESSION).is_err());

        let found = resolver.resolve_or_create(SESSION).await;
        assert_eq!(found.as_deref(), Some("555"));
        assert_eq!(resolver.cache().get(SESSION), Some("555"));
        create.assert_calls(1);
    }

    #[tokio::test]
    async fn archived_stored_thread_is_unarchived_and_reused() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        server.mock(|when, then| {
            when.method(GET).path("/channels/777");
            then.status(200).json_body(thread("777", "Session abc12345", true, false));
        });
        let unarchive = server.mock(|when, then| {
            when.method(PATCH)
                .path("/channels/777")
                .json_body(json!({"archived": false}));
            then.status(200).json_body(thread("777", "Session abc12345", false, false));
        });

        let mut resolver = resolver_for(config_for(&server, &dir));
        let store = resolver.store().expect("store");
        store
            .store(&ThreadRecord::new(SESSION, "777", "100", "Session abc12345"))
            .expect("seed store");
        store.update_status(SESSION, true).expect("mark archived");

        let found = resolver.resolve_or_create(SESSION).await;
        assert_eq!(found.as_deref(), Some("777"));
        unarchive.assert_calls(1);
        let record = resolver
            .store()
            .expect("store")
            .get(SESSION)
            .expect("get")
            .expect("present");
        assert!(!record.is_archived);
    }

    #[tokio::test]
    async fn locked_thread_is_rejected_and_chain_continues() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        server.mock(|when, then| {
            when.method(GET).path("/channels/777");
            then.status(200).json_body(thread("777", "Session abc12345", true, true));
        });
        let unarchive = server.mock(|when, then| {
            when.method(PATCH).path("/channels/777");
            then.status(200).json_body(thread("777", "Session abc12345", false, true));
        });
        mock_empty_search(&server);
        let create = server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(201).json_body(thread("888", "Session abc12345", false, false));
        });

        let mut resolver = resolver_for(config_for(&server, &dir));
        resolver
            .store()
            .expect("store")
            .store(&ThreadRecord::new(SESSION, "777", "100", "Session abc12345"))
            .expect("seed store");

        let found = resolver.resolve_or_create(SESSION).await;
        assert_eq!(found.as_deref(), Some("888"));
        unarchive.assert_calls(0);
        create.assert_calls(1);
    }

    #[tokio::test]
    async fn locked_thread_without_alternatives_yields_none() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        server.mock(|when, then| {
            when.method(GET).path("/channels/100");
            then.status(200)
                .json_body(json!({"id": "100", "type": 0, "guild_id": "900"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/guilds/900/threads/active");
            then.status(200).json_body(json!({
                "threads": [thread("777", "Session abc12345", false, true)]
            }));
        });

        let mut config = config_for(&server, &dir);
        config.threads.channel_type = ChannelType::Forum;
        let mut resolver = resolver_for(config);

        assert!(resolver.resolve_or_create(SESSION).await.is_none());
        assert!(resolver.cache().get(SESSION).is_none());
    }

    #[tokio::test]
    async fn missing_stored_thread_is_forgotten() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        server.mock(|when, then| {
            when.method(GET).path("/channels/313");
            then.status(404)
                .json_body(json!({"code": 10003, "message": "Unknown Channel"}));
        });
        mock_empty_search(&server);
        let create = server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(201).json_body(thread("999", "Session abc12345", false, false));
        });

        let mut resolver = resolver_for(config_for(&server, &dir));
        resolver
            .store()
            .expect("store")
            .store(&ThreadRecord::new(SESSION, "313", "100", "Session abc12345"))
            .expect("seed store");

        let found = resolver.resolve_or_create(SESSION).await;
        assert_eq!(found.as_deref(), Some("999"));
        create.assert_calls(1);
        let record = resolver
            .store()
            .expect("store")
            .get(SESSION)
            .expect("get")
            .expect("rebound");
        assert_eq!(record.thread_id, "999");
    }

    #[tokio::test]
    async fn unreachable_validation_keeps_the_stored_binding() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        for path in [
            "/channels/313",
            "/channels/100",
            "/channels/100/threads/archived/public",
            "/channels/100/threads/archived/private",
        ] {
            server.mock(|when, then| {
                when.method(GET).path(path);
                then.status(503);
            });
        }
        server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(503);
        });

        let mut resolver = resolver_for(config_for(&server, &dir));
        resolver
            .store()
            .expect("store")
            .store(&ThreadRecord::new(SESSION, "313", "100", "Session abc12345"))
            .expect("seed store");

        assert!(resolver.resolve_or_create(SESSION).await.is_none());
        assert!(resolver
            .store()
            .expect("store")
            .get(SESSION)
            .expect("get")
            .is_some());
    }

    #[tokio::test]
    async fn forum_channels_defer_creation_to_first_send() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        mock_empty_search(&server);
        let create = server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(201).json_body(thread("999", "Session abc12345", false, false));
        });

        let mut config = config_for(&server, &dir);
        config.threads.channel_type = ChannelType::Forum;
        let mut resolver = resolver_for(config);

        assert!(resolver.resolve_or_create(SESSION).await.is_none());
        create.assert_calls(0);
    }

    #[tokio::test]
    async fn preconditions_short_circuit_without_requests() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        let lookup = server.mock(|when, then| {
            when.method(GET).path("/channels/100");
            then.status(500);
        });
        let create = server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(500);
        });

        let mut disabled = config_for(&server, &dir);
        disabled.threads.enabled = false;
        assert!(resolver_for(disabled).resolve_or_create(SESSION).await.is_none());

        let mut text_without_bot = config_for(&server, &dir);
        text_without_bot.discord.bot_token = None;
        assert!(resolver_for(text_without_bot)
            .resolve_or_create(SESSION)
            .await
            .is_none());

        let mut forum_without_webhook = config_for(&server, &dir);
        forum_without_webhook.threads.channel_type = ChannelType::Forum;
        forum_without_webhook.discord.webhook_url = None;
        assert!(resolver_for(forum_without_webhook)
            .resolve_or_create(SESSION)
            .await
            .is_none());

        assert!(resolver_for(config_for(&server, &dir))
            .resolve_or_create("  ")
            .await
            .is_none());

        lookup.assert_calls(0);
        create.assert_calls(0);
    }

    #[tokio::test]
    async fn works_without_a_store() {
        let server = MockServer::start();
        let dir = TempDir::new().expect("tempdir");
        mock_empty_search(&server);
        server.mock(|when, then| {
            when.method(POST).path("/channels/100/threads");
            then.status(201).json_body(thread("555", "Session abc12345", false, false));
        });

        let config = config_for(&server, &dir);
        let client = DiscordClient::new(&config.discord).expect("client");
        let mut resolver = ThreadResolver::new(Arc::new(config), client, None);

        assert_eq!(resolver.resolve_or_create(SESSION).await.as_deref(), Some("555"));
        assert_eq!(resolver.cache().get(SESSION), Some("555"));
    }
}
