//! Notification service implementation
//!
//! Notifications are queued on an unbounded channel and delivered by a
//! background worker, so a slow or failing [`Notifier`] never holds up seat
//! accounting. Services enqueue only after their transaction has committed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::NotificationConfig;
use crate::models::{Reservation, WaitingListEntry};
use crate::utils::errors::{BookingError, Result};

pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "sk"];

pub const SCHOOL_REPRESENTATIVE_RESERVATION_EMAIL: &str = "school_representative_reservation";

/// Outbound channel for user-facing messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, message: &str) -> Result<()>;
    async fn send_email(&self, template: &str, data: &Value) -> Result<()>;
}

/// Notifier that writes every message to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: i64, message: &str) -> Result<()> {
        info!(user_id = user_id, message = message, "User notification");
        Ok(())
    }

    async fn send_email(&self, template: &str, data: &Value) -> Result<()> {
        info!(template = template, data = %data, "Email notification");
        Ok(())
    }
}

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub key: String,
    pub content: HashMap<String, String>, // language -> content mapping
}

#[derive(Debug, Clone)]
pub enum Notification {
    Message {
        user_id: i64,
        template_key: String,
        language: String,
        parameters: HashMap<String, String>,
    },
    Email {
        template: String,
        data: Value,
    },
}

enum Command {
    Deliver(Notification),
    Flush(oneshot::Sender<()>),
}

/// Notification statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_language: HashMap<String, u64>,
    pub sent_by_template: HashMap<String, u64>,
}

/// Handle for queueing notifications; cheap to clone
#[derive(Clone)]
pub struct NotificationService {
    sender: Option<mpsc::UnboundedSender<Command>>,
    default_language: String,
    stats: Arc<Mutex<NotificationStats>>,
}

impl NotificationService {
    /// Start the delivery worker and return the queue handle
    pub fn start(notifier: Arc<dyn Notifier>, config: &NotificationConfig) -> (Self, Option<JoinHandle<()>>) {
        if !config.enabled {
            info!("Notifications disabled, queued messages will be dropped");
            return (Self::disabled(&config.default_language), None);
        }

        let stats = Arc::new(Mutex::new(NotificationStats::default()));

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Worker {
            notifier,
            templates: load_default_templates(),
            default_language: config.default_language.clone(),
            stats: stats.clone(),
        };
        let handle = tokio::spawn(worker.run(receiver));

        let service = Self {
            sender: Some(sender),
            default_language: config.default_language.clone(),
            stats,
        };
        (service, Some(handle))
    }

    /// A handle that accepts and drops everything
    pub fn disabled(default_language: &str) -> Self {
        Self {
            sender: None,
            default_language: default_language.to_string(),
            stats: Arc::new(Mutex::new(NotificationStats::default())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.as_ref().map(|sender| !sender.is_closed()).unwrap_or(false)
    }

    pub fn enqueue(&self, notification: Notification) {
        let Some(sender) = &self.sender else {
            debug!(?notification, "Notification dropped, service disabled");
            return;
        };

        if sender.send(Command::Deliver(notification)).is_err() {
            warn!("Notification worker has stopped, message dropped");
            if let Ok(mut stats) = self.stats.lock() {
                stats.total_failed += 1;
            }
        }
    }

    /// Queue a templated message in the default language
    pub fn notify_user(&self, user_id: i64, template_key: &str, parameters: HashMap<String, String>) {
        self.enqueue(Notification::Message {
            user_id,
            template_key: template_key.to_string(),
            language: self.default_language.clone(),
            parameters,
        });
    }

    pub fn send_email(&self, template: &str, data: Value) {
        self.enqueue(Notification::Email { template: template.to_string(), data });
    }

    pub fn reservation_created(&self, reservation: &Reservation) {
        self.notify_user(reservation.user_id, "reservation_created", reservation_parameters(reservation));
        self.send_email(
            SCHOOL_REPRESENTATIVE_RESERVATION_EMAIL,
            json!({
                "user_id": reservation.user_id,
                "reservation_code": reservation.local_reservation_code,
                "event_id": reservation.event_id,
                "event_date_id": reservation.event_date_id,
                "number_of_students": reservation.number_of_students,
                "number_of_teachers": reservation.number_of_teachers,
                "total_seats": reservation.total_seats,
                "contact_info": reservation.contact_info,
                "special_requirements": reservation.special_requirements,
            }),
        );
    }

    pub fn reservation_confirmed(&self, reservation: &Reservation) {
        self.notify_user(reservation.user_id, "reservation_confirmed", reservation_parameters(reservation));
    }

    pub fn reservation_cancelled(&self, reservation: &Reservation) {
        self.notify_user(reservation.user_id, "reservation_cancelled", reservation_parameters(reservation));
    }

    pub fn waiting_list_added(&self, entry: &WaitingListEntry) {
        let parameters = HashMap::from([
            ("position".to_string(), entry.position.to_string()),
            ("event_date_id".to_string(), entry.event_date_id.to_string()),
        ]);
        self.notify_user(entry.user_id, "waiting_list_added", parameters);
    }

    pub fn waiting_list_promoted(&self, entry: &WaitingListEntry, reservation: &Reservation) {
        let mut parameters = reservation_parameters(reservation);
        parameters.insert("entry_id".to_string(), entry.id.to_string());
        self.notify_user(entry.user_id, "waiting_list_promoted", parameters);
    }

    /// Wait until everything queued before this call has been handled
    pub async fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if sender.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Get notification statistics
    pub fn stats(&self) -> NotificationStats {
        self.stats.lock().map(|stats| stats.clone()).unwrap_or_default()
    }
}

fn reservation_parameters(reservation: &Reservation) -> HashMap<String, String> {
    HashMap::from([
        ("reservation_code".to_string(), reservation.local_reservation_code.clone()),
        ("total_seats".to_string(), reservation.total_seats.to_string()),
        ("event_date_id".to_string(), reservation.event_date_id.to_string()),
    ])
}

struct Worker {
    notifier: Arc<dyn Notifier>,
    templates: HashMap<String, MessageTemplate>,
    default_language: String,
    stats: Arc<Mutex<NotificationStats>>,
}

impl Worker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        debug!("Notification worker started");

        while let Some(command) = receiver.recv().await {
            match command {
                Command::Deliver(notification) => self.deliver(notification).await,
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        debug!("Notification worker stopped");
    }

    async fn deliver(&self, notification: Notification) {
        let (template_key, language, result) = match notification {
            Notification::Message { user_id, template_key, language, parameters } => {
                let result = match format_message(&self.templates, &template_key, &language, &self.default_language, &parameters) {
                    Ok(text) => self.notifier.notify(user_id, &text).await,
                    Err(e) => Err(e),
                };
                (template_key, language, result)
            }
            Notification::Email { template, data } => {
                let result = self.notifier.send_email(&template, &data).await;
                (template, self.default_language.clone(), result)
            }
        };

        let Ok(mut stats) = self.stats.lock() else {
            return;
        };
        match result {
            Ok(()) => {
                stats.total_sent += 1;
                *stats.sent_by_language.entry(language).or_insert(0) += 1;
                *stats.sent_by_template.entry(template_key).or_insert(0) += 1;
            }
            Err(e) => {
                stats.total_failed += 1;
                error!(template_key = %template_key, error = %e, "Failed to deliver notification");
            }
        }
    }
}

/// Format message using template and parameters
pub fn format_message(
    templates: &HashMap<String, MessageTemplate>,
    template_key: &str,
    language: &str,
    default_language: &str,
    parameters: &HashMap<String, String>,
) -> Result<String> {
    let template = templates
        .get(template_key)
        .ok_or_else(|| BookingError::InvalidInput(format!("Template not found: {}", template_key)))?;

    let content = template
        .content
        .get(language)
        .or_else(|| template.content.get(default_language))
        .ok_or_else(|| BookingError::InvalidInput(format!("Template content not found for language: {}", language)))?;

    let mut formatted = content.clone();
    for (key, value) in parameters {
        let placeholder = format!("{{{}}}", key);
        formatted = formatted.replace(&placeholder, value);
    }

    Ok(formatted)
}

fn template(key: &str, en: &str, sk: &str) -> (String, MessageTemplate) {
    let content = HashMap::from([("en".to_string(), en.to_string()), ("sk".to_string(), sk.to_string())]);
    (key.to_string(), MessageTemplate { key: key.to_string(), content })
}

/// Load default message templates
pub fn load_default_templates() -> HashMap<String, MessageTemplate> {
    HashMap::from([
        template(
            "reservation_created",
            "Your reservation {reservation_code} for {total_seats} seats has been created.",
            "Vaša rezervácia {reservation_code} na {total_seats} miest bola vytvorená.",
        ),
        template(
            "reservation_confirmed",
            "Your reservation {reservation_code} has been confirmed.",
            "Vaša rezervácia {reservation_code} bola potvrdená.",
        ),
        template(
            "reservation_cancelled",
            "Your reservation {reservation_code} has been cancelled.",
            "Vaša rezervácia {reservation_code} bola zrušená.",
        ),
        template(
            "waiting_list_added",
            "You are number {position} on the waiting list for event date {event_date_id}.",
            "Ste na {position}. mieste v poradovníku pre termín {event_date_id}.",
        ),
        template(
            "waiting_list_promoted",
            "Seats became available. Your waiting list request is now reservation {reservation_code}.",
            "Uvoľnili sa miesta. Vaša žiadosť z poradovníka je teraz rezervácia {reservation_code}.",
        ),
    ])
}
