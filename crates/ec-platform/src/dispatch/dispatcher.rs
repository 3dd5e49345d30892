//! Event Dispatcher
//!
//! Turns a `ClinicEvent` into at most one notification and at most one
//! email. Both are best-effort: failures are logged here and reported
//! through `DispatchReport`, never returned as errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::appointment::operations::events::AppointmentChange;
use crate::dispatch::events::ClinicEvent;
use crate::dispatch::mailer::{EmailMessage, MailError, Mailer};
use crate::notification::entity::{Notification, NotificationRef, NotificationType};
use crate::notification::repository::NotificationRepository;
use crate::user::repository::UserRepository;

#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Total email attempts, including the first
    pub email_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            email_attempts: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Outcome of a dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub notified: bool,
    pub email_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Recipient {
    /// Resolved to an address through the user store
    User(String),
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EmailPlan {
    recipient: Recipient,
    subject: String,
    text: String,
    html: String,
}

#[derive(Debug, Default)]
struct Delivery {
    notification: Option<Notification>,
    email: Option<EmailPlan>,
}

pub struct EventDispatcher {
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    policy: DispatchPolicy,
    app_url: String,
}

impl EventDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            notifications,
            users,
            mailer,
            policy: DispatchPolicy::default(),
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn dispatch(&self, event: &ClinicEvent) -> DispatchReport {
        let delivery = plan(event, &self.app_url);
        let mut report = DispatchReport::default();

        if let Some(notification) = delivery.notification {
            report.notified = self.write_notification(event, &notification).await;
        }

        if let Some(email) = delivery.email {
            report.email_sent = self.send_email(event, email).await;
        }

        debug!(event = event.name(), ?report, "Event dispatched");
        report
    }

    async fn write_notification(&self, event: &ClinicEvent, notification: &Notification) -> bool {
        match self.notifications.insert(notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    event = event.name(),
                    recipient = %notification.user_id,
                    error = %e,
                    "Failed to write notification"
                );
                false
            }
        }
    }

    async fn resolve(&self, recipient: &Recipient) -> Option<String> {
        match recipient {
            Recipient::Address(address) => Some(address.clone()),
            Recipient::User(user_id) => match self.users.find_by_id(user_id).await {
                Ok(Some(user)) => Some(user.email),
                Ok(None) => {
                    warn!(user_id = %user_id, "Email recipient no longer exists");
                    None
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Failed to look up email recipient");
                    None
                }
            },
        }
    }

    async fn send_email(&self, event: &ClinicEvent, plan: EmailPlan) -> bool {
        if !self.mailer.is_enabled() {
            debug!(event = event.name(), "Mailer disabled, skipping email");
            return false;
        }

        let Some(to) = self.resolve(&plan.recipient).await else {
            return false;
        };

        let message = EmailMessage {
            to,
            subject: plan.subject,
            text: plan.text,
            html: plan.html,
        };

        let attempts = self.policy.email_attempts.max(1);
        for attempt in 1..=attempts {
            match self.mailer.send(&message).await {
                Ok(()) => {
                    info!(event = event.name(), to = %message.to, attempt, "Email sent");
                    return true;
                }
                Err(MailError::Disabled) => return false,
                Err(e) => {
                    warn!(
                        event = event.name(),
                        to = %message.to,
                        attempt,
                        attempts,
                        error = %e,
                        "Email delivery failed"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }
        false
    }
}

fn when(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn email(recipient: Recipient, subject: &str, lines: &[String], link: Option<String>) -> EmailPlan {
    let mut text = lines.join("\n\n");
    let mut html: String = lines
        .iter()
        .map(|l| format!("<p>{}</p>", escape_html(l)))
        .collect();

    if let Some(link) = link {
        text.push_str(&format!("\n\n{}", link));
        html.push_str(&format!("<p><a href=\"{0}\">{0}</a></p>", escape_html(&link)));
    }

    EmailPlan {
        recipient,
        subject: subject.to_string(),
        text,
        html,
    }
}

fn plan(event: &ClinicEvent, app_url: &str) -> Delivery {
    let dashboard = format!("{}/dashboard", app_url);

    match event {
        ClinicEvent::AppointmentBooked(e) => {
            let patient = if e.patient_name.trim().is_empty() { "A patient" } else { e.patient_name.trim() };
            let body = format!("{} booked an appointment for {}.", patient, when(&e.scheduled_for));
            Delivery {
                notification: Some(Notification::new(
                    &e.doctor_id,
                    NotificationType::Appointment,
                    "New Appointment",
                    &body,
                    NotificationRef::appointment(&e.appointment_id).with_user(&e.patient_id),
                )),
                email: Some(email(
                    Recipient::User(e.doctor_id.clone()),
                    "New appointment booked",
                    &[body, "Please review and approve it from your dashboard.".to_string()],
                    Some(dashboard),
                )),
            }
        }
        ClinicEvent::AppointmentUpdated(e) => {
            let (title, subject, body) = match e.change {
                AppointmentChange::Approved { mode } => (
                    "Appointment Approved",
                    "Your appointment has been approved",
                    format!(
                        "Your appointment on {} has been approved ({}).",
                        when(&e.scheduled_for),
                        mode.as_str()
                    ),
                ),
                AppointmentChange::Rescheduled => (
                    "Appointment Rescheduled",
                    "Your appointment has been rescheduled",
                    format!("Your appointment has been moved to {}.", when(&e.scheduled_for)),
                ),
                AppointmentChange::Cancelled => (
                    "Appointment Cancelled",
                    "Your appointment has been cancelled",
                    format!("Your appointment on {} has been cancelled.", when(&e.scheduled_for)),
                ),
            };
            Delivery {
                notification: Some(Notification::new(
                    &e.patient_id,
                    NotificationType::Appointment,
                    title,
                    &body,
                    NotificationRef::appointment(&e.appointment_id).with_user(&e.doctor_id),
                )),
                email: Some(email(Recipient::User(e.patient_id.clone()), subject, &[body], Some(dashboard))),
            }
        }
        ClinicEvent::ConsultationCompleted(e) => Delivery {
            notification: Some(Notification::new(
                &e.patient_id,
                NotificationType::Appointment,
                "Consultation Completed",
                format!(
                    "Your consultation on {} is complete. The doctor's notes are available in your dashboard.",
                    when(&e.scheduled_for)
                ),
                NotificationRef::appointment(&e.appointment_id).with_user(&e.doctor_id),
            )),
            email: None,
        },
        ClinicEvent::FeedbackSubmitted(e) => {
            let mut body = format!("A patient rated their consultation {}/5.", e.rating);
            if e.reported {
                body.push_str(" The patient flagged this consultation for review.");
            }
            Delivery {
                notification: Some(Notification::new(
                    &e.doctor_id,
                    NotificationType::Appointment,
                    "New Consultation Feedback",
                    body,
                    NotificationRef::appointment(&e.appointment_id).with_user(&e.patient_id),
                )),
                email: None,
            }
        }
        ClinicEvent::PatientRegistered(e) => {
            let greeting = if e.name.trim().is_empty() {
                "Hello,".to_string()
            } else {
                format!("Hello {},", e.name.trim())
            };
            Delivery {
                notification: None,
                email: Some(email(
                    Recipient::Address(e.email.clone()),
                    "Welcome to E-Clinic",
                    &[
                        greeting,
                        "Your account has been created. You can now book appointments with our doctors."
                            .to_string(),
                    ],
                    Some(format!("{}/login", app_url)),
                )),
            }
        }
        ClinicEvent::DoctorProvisioned(e) => Delivery {
            notification: None,
            email: Some(email(
                Recipient::Address(e.email.clone()),
                "Your E-Clinic doctor account",
                &[
                    format!("Hello {},", if e.name.trim().is_empty() { "Doctor" } else { e.name.trim() }),
                    "An administrator created a doctor account for you.".to_string(),
                    format!("Email: {}", e.email),
                    format!("Temporary password: {}", e.temporary_password.expose()),
                    "Please sign in and change this password.".to_string(),
                ],
                Some(format!("{}/login", app_url)),
            )),
        },
    }
}
