use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::contract::{
    client::AppointmentsApi,
    error::AppointmentsError,
    model::{Appointment, Document},
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of the AppointmentsApi trait that delegates to the domain service
pub struct AppointmentsLocalClient {
    service: Arc<Service>,
}

impl AppointmentsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

fn to_appointment(doc: Document) -> Result<Appointment, DomainError> {
    Appointment::from_document(doc).map_err(|e| DomainError::corrupt_document(e.to_string()))
}

fn to_contract_error(e: DomainError) -> AppointmentsError {
    warn!(error = %e, "Appointments call failed");
    AppointmentsError::from(e)
}

#[async_trait]
impl AppointmentsApi for AppointmentsLocalClient {
    async fn insert_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<bool, AppointmentsError> {
        self.service
            .insert_appointment(appointment)
            .await
            .map_err(to_contract_error)
    }

    async fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<bool, AppointmentsError> {
        self.service
            .replace_appointment(appointment)
            .await
            .map_err(to_contract_error)
    }

    async fn delete_appointment(&self, id: &str) -> Result<bool, AppointmentsError> {
        self.service
            .delete_appointment(id)
            .await
            .map_err(to_contract_error)
    }

    async fn find_appointment(&self, id: &str) -> Result<Option<Appointment>, AppointmentsError> {
        let found = self
            .service
            .find_appointment(id)
            .await
            .map_err(to_contract_error)?;
        found
            .map(to_appointment)
            .transpose()
            .map_err(to_contract_error)
    }

    async fn find_appointments_in_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Appointment>, AppointmentsError> {
        let docs = self
            .service
            .find_appointments_in_range(start, end)
            .await
            .map_err(to_contract_error)?;
        docs.into_iter()
            .map(to_appointment)
            .collect::<Result<_, _>>()
            .map_err(to_contract_error)
    }

    async fn all_appointments(&self) -> Result<Vec<Appointment>, AppointmentsError> {
        let docs = self
            .service
            .all_appointments()
            .await
            .map_err(to_contract_error)?;
        docs.into_iter()
            .map(to_appointment)
            .collect::<Result<_, _>>()
            .map_err(to_contract_error)
    }

    async fn delete_all_appointments(&self) -> bool {
        self.service.delete_all_appointments().await
    }
}
