//! Command and button routing
//!
//! Every event is checked against the owner's chat identity before it
//! reaches the reconciler. Strangers get one notice telling them their
//! id and nothing else happens.

use crate::reconciler::{Reconciler, Trigger};
use crate::transport::{Buttons, ChatId, Event};
use crate::uid::Uid;
use std::sync::Arc;
use tracing::{error, info, warn};

const CHECK_COMMAND: &str = "/check";

const HELP: &str = "Commands:\n/check - look for new mail now\n/start - show the keyboard";

#[derive(Clone)]
pub struct Router {
    reconciler: Arc<Reconciler>,
}

impl Router {
    #[must_use]
    pub const fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    /// Handle one inbound event to completion. Failures become notices
    /// to the owner.
    pub async fn handle(&self, event: Event) {
        let chat_id = event.chat_id();
        if chat_id != self.reconciler.dispatcher().owner() {
            self.reject(chat_id).await;
            return;
        }

        match event {
            Event::Command {
                name, first_name, ..
            } => self.command(&name, first_name.as_deref()).await,
            Event::Action { token, .. } => self.action(&token).await,
        }
    }

    async fn reject(&self, chat_id: ChatId) {
        warn!("Access denied for chat {}", chat_id);
        self.reconciler
            .dispatcher()
            .send_to(
                chat_id,
                &format!("Your id is {chat_id}. You don't have access!"),
                None,
            )
            .await;
    }

    async fn command(&self, name: &str, first_name: Option<&str>) {
        let dispatcher = self.reconciler.dispatcher();
        match name {
            "start" => {
                let greeting =
                    first_name.map_or_else(|| "Hello.".to_string(), |n| format!("Hello, {n}."));
                let keyboard = Buttons::Reply(vec![CHECK_COMMAND.to_string()]);
                dispatcher
                    .send_to(dispatcher.owner(), &greeting, Some(&keyboard))
                    .await;
            }
            "check" => {
                info!("On-demand check requested");
                if let Err(e) = self.reconciler.reconcile(Trigger::OnDemand).await {
                    error!("On-demand check failed: {}", e);
                    dispatcher.notify(&format!("Error in check: {e}")).await;
                }
            }
            other => {
                info!("Unknown command /{}", other);
                dispatcher.notify(HELP).await;
            }
        }
    }

    async fn action(&self, token: &str) {
        let dispatcher = self.reconciler.dispatcher();
        let Some(uid) = Uid::from_read_action(token) else {
            warn!("Unknown action token {:?}", token);
            dispatcher.notify("Unknown action.").await;
            return;
        };

        match self.reconciler.consume(uid).await {
            Ok(msg) => dispatcher.notify_full(&msg).await,
            Err(e) => {
                error!("Reading UID {} failed: {}", uid, e);
                dispatcher
                    .notify(&format!("Error reading message {uid}: {e}"))
                    .await;
            }
        }
    }
}
