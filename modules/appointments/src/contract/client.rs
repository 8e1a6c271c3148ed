use async_trait::async_trait;

use crate::contract::{error::AppointmentsError, model::Appointment};

/// Public API trait for the appointments module that other modules can use.
///
/// Mirrors the REST surface but speaks typed records instead of JSON.
#[async_trait]
pub trait AppointmentsApi: Send + Sync {
    /// Store a new appointment. Duplicate ids are accepted.
    async fn insert_appointment(&self, appointment: Appointment)
        -> Result<bool, AppointmentsError>;

    /// Replace the appointment with the same id. `false` when nothing matched.
    async fn update_appointment(&self, appointment: Appointment)
        -> Result<bool, AppointmentsError>;

    /// Delete by id. `false` when nothing matched.
    async fn delete_appointment(&self, id: &str) -> Result<bool, AppointmentsError>;

    async fn find_appointment(&self, id: &str) -> Result<Option<Appointment>, AppointmentsError>;

    /// Booked appointments scheduled within `[start, end]`, cheapest first.
    async fn find_appointments_in_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Appointment>, AppointmentsError>;

    async fn all_appointments(&self) -> Result<Vec<Appointment>, AppointmentsError>;

    /// Remove every appointment. Never fails; `false` signals a store error.
    async fn delete_all_appointments(&self) -> bool;
}
