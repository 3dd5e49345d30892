//! In-memory collaborators for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use ec_platform::appointment::Appointment;
use ec_platform::auth::session_service::SessionConfig;
use ec_platform::dispatch::{BlobStore, DispatchPolicy, EmailMessage, EventDispatcher, MailError, Mailer};
use ec_platform::inventory::Medicine;
use ec_platform::notification::{MarkReadTarget, Notification};
use ec_platform::shared::error::{ClinicError, Result};
use ec_platform::user::entity::MedicalRecord;
use ec_platform::user::{Role, User};
use ec_platform::{
    AppointmentRepository, Argon2Config, MedicineRepository, NotificationRepository, PasswordService,
    Platform, SessionService, UserRepository,
};

pub const PASSWORD: &str = "secret123";

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    fn modify(&self, id: &str, change: impl FnOnce(&mut User)) {
        if let Some(existing) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            change(existing);
        }
    }

    pub fn get(&self, id: &str) -> Option<User> {
        self.all().into_iter().find(|u| u.id == id)
    }

    pub fn all(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(ClinicError::conflict("User already exists"));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn find_doctor(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id && u.role == Role::Doctor)
            .cloned())
    }

    async fn find_by_role(&self, role: Role) -> Result<Vec<User>> {
        let mut found: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let mut all = self.all();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update_profile(&self, user: &User) -> Result<()> {
        self.modify(&user.id, |existing| {
            existing.role = user.role;
            existing.name = user.name.clone();
            existing.contact_number = user.contact_number.clone();
            existing.primary_speciality = user.primary_speciality.clone();
            existing.updated_at = user.updated_at;
        });
        Ok(())
    }

    async fn update_vitals(&self, user: &User) -> Result<()> {
        self.modify(&user.id, |existing| {
            if user.blood_group.is_some() {
                existing.blood_group = user.blood_group;
            }
            if user.genotype.is_some() {
                existing.genotype = user.genotype;
            }
            existing.updated_at = user.updated_at;
        });
        Ok(())
    }

    async fn push_medical_record(&self, user_id: &str, record: &MedicalRecord) -> Result<()> {
        self.modify(user_id, |existing| existing.medical_records.push(record.clone()));
        Ok(())
    }

    async fn save_hospital_card(&self, user: &User) -> Result<()> {
        self.modify(&user.id, |existing| {
            existing.hospital_card = user.hospital_card.clone();
            existing.updated_at = user.updated_at;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryAppointments {
    appointments: Mutex<Vec<Appointment>>,
}

impl InMemoryAppointments {
    fn modify(&self, matches: impl Fn(&Appointment) -> bool, change: impl FnOnce(&mut Appointment)) {
        if let Some(existing) = self.appointments.lock().unwrap().iter_mut().find(|a| matches(a)) {
            change(existing);
        }
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }

    pub fn get(&self, id: &str) -> Option<Appointment> {
        self.all().into_iter().find(|a| a.id == id)
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointments {
    async fn insert(&self, appointment: &Appointment) -> Result<()> {
        self.appointments.lock().unwrap().push(appointment.clone());
        Ok(())
    }

    async fn find_for_patient(&self, id: &str, patient_id: &str) -> Result<Option<Appointment>> {
        Ok(self.all().into_iter().find(|a| a.id == id && a.user_id == patient_id))
    }

    async fn find_for_doctor(&self, id: &str, doctor_id: &str) -> Result<Option<Appointment>> {
        Ok(self.all().into_iter().find(|a| a.id == id && a.doctor_id == doctor_id))
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>> {
        let mut found: Vec<_> = self.all().into_iter().filter(|a| a.user_id == patient_id).collect();
        found.sort_by_key(|a| a.scheduled_for);
        Ok(found)
    }

    async fn list_by_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>> {
        let mut found: Vec<_> = self.all().into_iter().filter(|a| a.doctor_id == doctor_id).collect();
        found.sort_by_key(|a| a.scheduled_for);
        Ok(found)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        let mut all = self.all();
        all.sort_by(|a, b| b.scheduled_for.cmp(&a.scheduled_for));
        Ok(all)
    }

    async fn has_link(&self, doctor_id: &str, patient_id: &str) -> Result<bool> {
        Ok(self
            .all()
            .iter()
            .any(|a| a.doctor_id == doctor_id && a.user_id == patient_id))
    }

    async fn save_decision(&self, appointment: &Appointment) -> Result<()> {
        self.modify(|a| a.id == appointment.id && a.doctor_id == appointment.doctor_id, |existing| {
            existing.status = appointment.status;
            existing.scheduled_for = appointment.scheduled_for;
            if appointment.mode.is_some() {
                existing.mode = appointment.mode;
            }
            existing.updated_at = appointment.updated_at;
        });
        Ok(())
    }

    async fn save_consultation(&self, appointment: &Appointment) -> Result<()> {
        self.modify(|a| a.id == appointment.id && a.doctor_id == appointment.doctor_id, |existing| {
            existing.consultation = appointment.consultation.clone();
            existing.status = appointment.status;
            existing.updated_at = appointment.updated_at;
        });
        Ok(())
    }

    async fn save_feedback(&self, appointment: &Appointment) -> Result<()> {
        self.modify(|a| a.id == appointment.id && a.user_id == appointment.user_id, |existing| {
            existing.feedback = appointment.feedback.clone();
            existing.updated_at = appointment.updated_at;
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotifications {
    notifications: Mutex<Vec<Notification>>,
}

impl InMemoryNotifications {
    pub fn for_recipient(&self, recipient_id: &str) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == recipient_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotifications {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn list_for_recipient(&self, recipient_id: &str) -> Result<Vec<Notification>> {
        let mut found = self.for_recipient(recipient_id);
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn count_unread(&self, recipient_id: &str) -> Result<u64> {
        Ok(self.for_recipient(recipient_id).iter().filter(|n| !n.read).count() as u64)
    }

    async fn mark_read(&self, recipient_id: &str, target: &MarkReadTarget) -> Result<u64> {
        let mut changed = 0;
        for n in self.notifications.lock().unwrap().iter_mut() {
            let selected = match target {
                MarkReadTarget::All => true,
                MarkReadTarget::Ids(ids) => ids.contains(&n.id),
            };
            if n.user_id == recipient_id && selected && !n.read {
                n.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[derive(Default)]
pub struct InMemoryMedicines {
    medicines: Mutex<Vec<Medicine>>,
}

#[async_trait]
impl MedicineRepository for InMemoryMedicines {
    async fn insert(&self, medicine: &Medicine) -> Result<()> {
        self.medicines.lock().unwrap().push(medicine.clone());
        Ok(())
    }

    async fn list_recent(&self) -> Result<Vec<Medicine>> {
        let mut all = self.medicines.lock().unwrap().clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn list_by_name(&self) -> Result<Vec<Medicine>> {
        let mut all = self.medicines.lock().unwrap().clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

/// Records every message; optionally fails every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    attempts: Mutex<u32>,
    failing: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> std::result::Result<(), MailError> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing {
            let bad: std::result::Result<lettre::Address, _> = "not an address".parse();
            return Err(MailError::Address(bad.unwrap_err()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<Vec<(String, Bytes)>>,
}

impl MemoryBlobStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, _content_type: Option<&str>, data: Bytes) -> Result<String> {
        self.objects.lock().unwrap().push((key.to_string(), data));
        Ok(format!("https://blobs.test/{}", key))
    }
}

/// A fully wired platform over in-memory stores
pub struct TestPlatform {
    pub users: Arc<InMemoryUsers>,
    pub appointments: Arc<InMemoryAppointments>,
    pub notifications: Arc<InMemoryNotifications>,
    pub medicines: Arc<InMemoryMedicines>,
    pub mailer: Arc<RecordingMailer>,
    pub blobs: Arc<MemoryBlobStore>,
    pub passwords: Arc<PasswordService>,
    pub sessions: Arc<SessionService>,
    pub dispatcher: Arc<EventDispatcher>,
}

impl TestPlatform {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let notifications = Arc::new(InMemoryNotifications::default());
        let mailer = Arc::new(mailer);
        let dispatcher = EventDispatcher::new(
            notifications.clone(),
            users.clone(),
            mailer.clone(),
            "https://clinic.test",
        )
        .with_policy(DispatchPolicy {
            email_attempts: 2,
            retry_delay: Duration::from_millis(1),
        });

        Self {
            users,
            appointments: Arc::new(InMemoryAppointments::default()),
            notifications,
            medicines: Arc::new(InMemoryMedicines::default()),
            mailer,
            blobs: Arc::new(MemoryBlobStore::default()),
            passwords: Arc::new(PasswordService::new(Argon2Config::testing()).unwrap()),
            sessions: Arc::new(SessionService::new(SessionConfig {
                secret: "test-secret".to_string(),
                ..Default::default()
            })),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            users: self.users.clone(),
            appointments: self.appointments.clone(),
            notifications: self.notifications.clone(),
            medicines: self.medicines.clone(),
            passwords: self.passwords.clone(),
            sessions: self.sessions.clone(),
            blobs: self.blobs.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }

    /// Insert a user with `PASSWORD` and return it
    pub async fn add_user(&self, email: &str, role: Role, name: &str) -> User {
        let hash = self.passwords.hash_password(PASSWORD).unwrap();
        let user = User::new(email, hash, role).with_name(name);
        self.users.insert(&user).await.unwrap();
        user
    }

    pub fn token_for(&self, user: &User) -> String {
        self.sessions.issue(user).unwrap()
    }
}
