// src/events.rs

//! Side-effect events fired by the user lifecycle.
//!
//! Handlers publish through an [`EventNotifier`]; delivery never blocks or
//! fails the request that produced the event.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::models::user::User;

/// The slice of a user a mailer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEmail {
    pub user_id: i64,
    pub nick: String,
    pub name: String,
    pub email: String,
    pub verification_email_token: Option<String>,
}

impl From<&User> for UserEmail {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            nick: user.nick.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            verification_email_token: user.verification_email_token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// A user registered, or asked for the verification mail again.
    Registered(UserEmail),
}

impl UserEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "user.registered",
        }
    }
}

#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn notify(&self, event: UserEvent);
}

/// Writes events to the log and nothing else.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl EventNotifier for LogNotifier {
    async fn notify(&self, event: UserEvent) {
        tracing::info!(event = event.name(), ?event, "user event");
    }
}

/// Queues events on a tokio channel for an out-of-band consumer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<UserEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UserEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventNotifier for ChannelNotifier {
    async fn notify(&self, event: UserEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            tracing::warn!(event = name, "event consumer is gone, dropping event");
        }
    }
}

/// A rendered outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Renders the mail for an event, if the event warrants one.
pub fn render_mail(event: &UserEvent, config: &Config) -> Option<Mail> {
    match event {
        UserEvent::Registered(user) => {
            let token = user.verification_email_token.as_deref()?;
            Some(Mail {
                to: user.email.clone(),
                subject: "Confirm your email address".to_string(),
                body: format!(
                    "Hi {},\n\nplease confirm your account ({}) by visiting:\n{}\n",
                    user.name,
                    user.nick,
                    config.verification_link(token)
                ),
            })
        }
    }
}

/// Consumes queued events and hands the rendered mail to the log.
///
/// Actual SMTP delivery lives outside this service.
pub fn spawn_mailer(mut receiver: mpsc::UnboundedReceiver<UserEvent>, config: Config) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match render_mail(&event, &config) {
                Some(mail) => tracing::info!(to = %mail.to, subject = %mail.subject, "mail queued"),
                None => tracing::debug!(event = event.name(), "event produced no mail"),
            }
        }
        tracing::info!("mailer stopped");
    })
}
