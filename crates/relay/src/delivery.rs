//! Delivery pipeline.
//!
//! Picks the destination for a formatted message (main channel or the
//! session's thread) and walks the transports in order until one lands:
//! webhook, then bot API. Every attempt is independent; failures are logged
//! and `deliver` reports only whether some audience was reached.

use std::sync::Arc;

use hookrelay_protocol::{EventKind, MessagePayload};
use tracing::{debug, info, warn};

use crate::config::{ChannelType, RelayConfig};
use crate::discord::{DiscordClient, DiscordError};
use crate::resolver::ThreadResolver;

pub struct DeliveryPipeline {
    config: Arc<RelayConfig>,
    resolver: ThreadResolver,
}

impl DeliveryPipeline {
    pub fn new(config: Arc<RelayConfig>, resolver: ThreadResolver) -> Self {
        Self { config, resolver }
    }

    pub fn resolver(&self) -> &ThreadResolver {
        &self.resolver
    }

    fn client(&self) -> &DiscordClient {
        self.resolver.client()
    }

    /// Deliver `message` for `session_id`. True iff at least one send
    /// succeeded.
    pub async fn deliver(&mut self, message: &MessagePayload, session_id: &str, kind: EventKind) -> bool {
        if message.is_empty() {
            debug!(
                component = "delivery",
                event = "delivery.empty_message",
                hook_event = %kind,
            );
            return false;
        }

        let delivered = if !self.config.threads_enabled() || session_id.trim().is_empty() {
            self.send_direct(message).await
        } else if kind.is_boundary() {
            self.deliver_boundary(message, session_id, kind).await
        } else {
            self.deliver_threaded(message, session_id).await
        };

        if delivered {
            debug!(
                component = "delivery",
                event = "delivery.delivered",
                session_id = %session_id,
                hook_event = %kind,
            );
        } else {
            warn!(
                component = "delivery",
                event = "delivery.failed",
                session_id = %session_id,
                hook_event = %kind,
                "No transport accepted the message"
            );
        }
        delivered
    }

    /// Thread gets the embeds, the main channel gets the mention. Session
    /// termination then archives the thread.
    async fn deliver_boundary(
        &mut self,
        message: &MessagePayload,
        session_id: &str,
        kind: EventKind,
    ) -> bool {
        let Some(thread_id) = self.resolver.resolve_or_create(session_id).await else {
            return self.send_direct(message).await;
        };

        let thread_ok = match self.send_to_thread(&thread_id, &message.embeds_only()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    component = "delivery",
                    event = "delivery.thread_send_failed",
                    session_id = %session_id,
                    thread_id = %thread_id,
                    error = %e,
                    "Boundary send to thread failed"
                );
                false
            }
        };

        let main_payload = message.mention_only().unwrap_or_else(|| message.clone());
        let main_ok = self.send_direct(&main_payload).await;

        if kind.is_termination() {
            self.archive(session_id, &thread_id).await;
        }

        thread_ok || main_ok
    }

    async fn deliver_threaded(&mut self, message: &MessagePayload, session_id: &str) -> bool {
        let thread_id = self.resolver.resolve_or_create(session_id).await;

        if let Some(thread_id) = &thread_id {
            match self.send_to_thread(thread_id, message).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(
                        component = "delivery",
                        event = "delivery.thread_send_failed",
                        session_id = %session_id,
                        thread_id = %thread_id,
                        error = %e,
                        "Send to thread failed"
                    );
                    if e.is_thread_gone() {
                        self.resolver.forget(session_id);
                    }
                }
            }
        }

        if self.config.threads.channel_type == ChannelType::Forum && self.client().has_webhook() {
            if self.create_forum_post(message, session_id).await {
                return true;
            }
        }

        self.send_direct(message).await
    }

    /// Webhook into the thread, falling back to the bot.
    async fn send_to_thread(
        &self,
        thread_id: &str,
        payload: &MessagePayload,
    ) -> Result<(), DiscordError> {
        let mut last_error = DiscordError::MissingCredential("webhook_url or bot_token");

        if self.client().has_webhook() {
            match self.client().send_webhook(payload, Some(thread_id)).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    debug!(
                        component = "delivery",
                        event = "delivery.thread_webhook_failed",
                        thread_id = %thread_id,
                        error = %e,
                    );
                    last_error = e;
                }
            }
        }

        if self.client().has_bot_token() {
            match self.client().send_bot_message(thread_id, payload).await {
                Ok(_) => return Ok(()),
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }

    /// Non-threaded send to the configured channel.
    async fn send_direct(&self, payload: &MessagePayload) -> bool {
        if self.client().has_webhook() {
            match self.client().send_webhook(payload, None).await {
                Ok(_) => return true,
                Err(e) => {
                    warn!(
                        component = "delivery",
                        event = "delivery.webhook_failed",
                        error = %e,
                        "Webhook send failed"
                    );
                }
            }
        }

        let Some(channel_id) = self.config.discord.channel_id.as_deref() else {
            return false;
        };
        if !self.client().has_bot_token() {
            return false;
        }
        match self.client().send_bot_message(channel_id, payload).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    component = "delivery",
                    event = "delivery.bot_send_failed",
                    channel_id = %channel_id,
                    error = %e,
                    "Bot send failed"
                );
                false
            }
        }
    }

    /// One webhook call that both creates the forum post and carries the
    /// message. The response's `channel_id` is the new thread.
    async fn create_forum_post(&mut self, message: &MessagePayload, session_id: &str) -> bool {
        let name = self.resolver.thread_name_for(session_id);
        let payload = message.with_thread_name(&name);

        match self.client().send_webhook(&payload, None).await {
            Ok(sent) => {
                info!(
                    component = "delivery",
                    event = "delivery.forum_post_created",
                    session_id = %session_id,
                    thread_id = %sent.channel_id,
                    thread_name = %name,
                    "Created forum post"
                );
                self.resolver.remember(session_id, &sent.channel_id);
                true
            }
            Err(e) => {
                warn!(
                    component = "delivery",
                    event = "delivery.forum_post_failed",
                    session_id = %session_id,
                    error = %e,
                    "Forum post creation failed"
                );
                false
            }
        }
    }

    async fn archive(&mut self, session_id: &str, thread_id: &str) {
        if !self.client().has_bot_token() {
            debug!(
                component = "delivery",
                event = "delivery.archive_skipped",
                thread_id = %thread_id,
                "No bot token; leaving thread open"
            );
            return;
        }
        match self.client().archive_thread(thread_id, false).await {
            Ok(_) => {
                info!(
                    component = "delivery",
                    event = "delivery.thread_archived",
                    session_id = %session_id,
                    thread_id = %thread_id,
                    "Archived session thread"
                );
                self.resolver.mark_archived(session_id);
            }
            Err(e) => {
                warn!(
                    component = "delivery",
                    event = "delivery.archive_failed",
                    session_id = %session_id,
                    thread_id = %thread_id,
                    error = %e,
                    "Failed to archive thread"
                );
            }
        }
    }
}
