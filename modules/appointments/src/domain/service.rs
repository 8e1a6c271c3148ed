use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::contract::model::{Appointment, Document};
use crate::domain::error::DomainError;
use crate::domain::query;
use crate::domain::repo::AppointmentsRepository;

/// Operation executor: one method per REST verb.
///
/// Each call builds its query, issues exactly one store request and maps the
/// outcome. "No match" is reported through the return value, store failures
/// through `DomainError::Storage`. Nothing is retried.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn AppointmentsRepository>,
}

fn storage_error(operation: &'static str) -> impl FnOnce(anyhow::Error) -> DomainError {
    move |e| DomainError::storage(operation, format!("{e:#}"))
}

impl Service {
    /// Create a service over the given store handle.
    pub fn new(repo: Arc<dyn AppointmentsRepository>) -> Self {
        Self { repo }
    }

    /// Insert without any uniqueness check on `id`.
    #[instrument(
        name = "appointments.service.insert_appointment",
        skip(self, appointment),
        fields(appointment_id = %appointment.id)
    )]
    pub async fn insert_appointment(&self, appointment: Appointment) -> Result<bool, DomainError> {
        let document_id = self
            .repo
            .insert(appointment.to_document())
            .await
            .map_err(storage_error("insert"))?;
        info!(%document_id, "Insert completed for appointment");
        Ok(true)
    }

    #[instrument(
        name = "appointments.service.delete_appointment",
        skip(self),
        fields(appointment_id = %id)
    )]
    pub async fn delete_appointment(&self, id: &str) -> Result<bool, DomainError> {
        let filter = query::by_id(id);
        let removed = self
            .repo
            .find_one_and_delete(&filter)
            .await
            .map_err(storage_error("find_one_and_delete"))?;
        Ok(report_modification("delete", removed.is_some()))
    }

    /// Wholesale replacement of the record whose `id` matches.
    #[instrument(
        name = "appointments.service.replace_appointment",
        skip(self, appointment),
        fields(appointment_id = %appointment.id)
    )]
    pub async fn replace_appointment(&self, appointment: Appointment) -> Result<bool, DomainError> {
        let filter = query::by_id(&appointment.id);
        let previous = self
            .repo
            .find_one_and_replace(&filter, appointment.to_document())
            .await
            .map_err(storage_error("find_one_and_replace"))?;
        Ok(report_modification("update", previous.is_some()))
    }

    #[instrument(
        name = "appointments.service.find_appointment",
        skip(self),
        fields(appointment_id = %id)
    )]
    pub async fn find_appointment(&self, id: &str) -> Result<Option<Document>, DomainError> {
        let filter = query::by_id(id);
        let found = self
            .repo
            .find_one(&filter)
            .await
            .map_err(storage_error("find_one"))?;
        if found.is_none() {
            info!("No entry exists for given query");
        }
        Ok(found)
    }

    /// Booked appointments in `[start, end]`, ascending by price.
    #[instrument(name = "appointments.service.find_appointments_in_range", skip(self))]
    pub async fn find_appointments_in_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Document>, DomainError> {
        self.search(
            query::by_date_range_booked(start, end),
            query::ascending_by_price(),
        )
        .await
    }

    #[instrument(name = "appointments.service.all_appointments", skip(self))]
    pub async fn all_appointments(&self) -> Result<Vec<Document>, DomainError> {
        self.search(query::match_all(), query::FindOptions::default())
            .await
    }

    /// Clear the collection. A store failure collapses to `false`.
    #[instrument(name = "appointments.service.delete_all_appointments", skip(self))]
    pub async fn delete_all_appointments(&self) -> bool {
        match self.repo.delete_many(&query::match_all()).await {
            Ok(deleted) => {
                info!(deleted, "Deleted all appointments");
                true
            }
            Err(e) => {
                let message = format!("{e:#}");
                warn!(error = %message, "Delete all appointments failed");
                false
            }
        }
    }

    async fn search(
        &self,
        filter: query::Filter,
        options: query::FindOptions,
    ) -> Result<Vec<Document>, DomainError> {
        let rendered = serde_json::Value::Object(filter.to_document());
        debug!(filter = %rendered, "Searching appointments");
        let found = self
            .repo
            .find_many(&filter, &options)
            .await
            .map_err(storage_error("find_many"))?;
        info!("Found {} element(s) for given search", found.len());
        Ok(found)
    }
}

fn report_modification(operation: &str, matched: bool) -> bool {
    if matched {
        info!("Operation {} completed successfully for appointment", operation);
    } else {
        info!("Operation {} matched no appointment", operation);
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::AppointmentStatus;
    use crate::domain::query::{Filter, FindOptions};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use tracing_test::traced_test;

    /// Records every call and answers from canned values.
    #[derive(Default)]
    struct RecordingRepo {
        calls: Mutex<Vec<(String, Filter, FindOptions)>>,
        hit: Option<Document>,
    }

    impl RecordingRepo {
        fn record(&self, op: &str, filter: &Filter, options: &FindOptions) {
            self.calls
                .lock()
                .push((op.to_string(), filter.clone(), options.clone()));
        }
    }

    #[async_trait]
    impl AppointmentsRepository for RecordingRepo {
        async fn insert(&self, _doc: Document) -> anyhow::Result<String> {
            self.record("insert", &Filter::All, &FindOptions::default());
            Ok("generated".to_string())
        }
        async fn find_one(&self, filter: &Filter) -> anyhow::Result<Option<Document>> {
            self.record("find_one", filter, &FindOptions::default());
            Ok(self.hit.clone())
        }
        async fn find_many(
            &self,
            filter: &Filter,
            options: &FindOptions,
        ) -> anyhow::Result<Vec<Document>> {
            self.record("find_many", filter, options);
            Ok(self.hit.clone().into_iter().collect())
        }
        async fn find_one_and_replace(
            &self,
            filter: &Filter,
            _doc: Document,
        ) -> anyhow::Result<Option<Document>> {
            self.record("find_one_and_replace", filter, &FindOptions::default());
            Ok(self.hit.clone())
        }
        async fn find_one_and_delete(&self, filter: &Filter) -> anyhow::Result<Option<Document>> {
            self.record("find_one_and_delete", filter, &FindOptions::default());
            Ok(self.hit.clone())
        }
        async fn delete_many(&self, filter: &Filter) -> anyhow::Result<u64> {
            self.record("delete_many", filter, &FindOptions::default());
            Ok(0)
        }
    }

    fn sample(id: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            created_time: 1,
            appointment_date: 2,
            appointment_duration: 3,
            doctor_name: "Dr. Hannibal".to_string(),
            status: AppointmentStatus::Booked,
            price: 10.0,
        }
    }

    fn service_with(repo: Arc<RecordingRepo>) -> Service {
        Service::new(repo)
    }

    #[tokio::test]
    async fn each_operation_issues_one_request_with_its_query() {
        let repo = Arc::new(RecordingRepo::default());
        let svc = service_with(repo.clone());

        svc.insert_appointment(sample("a")).await.unwrap();
        svc.delete_appointment("a").await.unwrap();
        svc.replace_appointment(sample("b")).await.unwrap();
        svc.find_appointment("c").await.unwrap();
        svc.find_appointments_in_range(5, 9).await.unwrap();
        svc.all_appointments().await.unwrap();
        svc.delete_all_appointments().await;

        let calls = repo.calls.lock().clone();
        let ops: Vec<&str> = calls.iter().map(|(op, _, _)| op.as_str()).collect();
        assert_eq!(
            ops,
            vec![
                "insert",
                "find_one_and_delete",
                "find_one_and_replace",
                "find_one",
                "find_many",
                "find_many",
                "delete_many"
            ]
        );
        assert_eq!(calls[1].1, query::by_id("a"));
        assert_eq!(calls[2].1, query::by_id("b"));
        assert_eq!(calls[3].1, query::by_id("c"));
        assert_eq!(calls[4].1, query::by_date_range_booked(5, 9));
        assert_eq!(calls[4].2, query::ascending_by_price());
        assert_eq!(calls[5].1, query::match_all());
        assert!(calls[5].2.sort.is_empty());
        assert_eq!(calls[6].1, query::match_all());
    }

    #[tokio::test]
    async fn no_match_is_not_an_error() {
        let svc = service_with(Arc::new(RecordingRepo::default()));
        assert!(!svc.delete_appointment("missing").await.unwrap());
        assert!(!svc.replace_appointment(sample("missing")).await.unwrap());
        assert!(svc.find_appointment("missing").await.unwrap().is_none());
        assert!(svc.all_appointments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn match_reports_success() {
        let hit = json!({"_id": "x", "id": "a"}).as_object().cloned();
        let svc = service_with(Arc::new(RecordingRepo {
            hit,
            ..Default::default()
        }));
        assert!(svc.delete_appointment("a").await.unwrap());
        assert!(svc.replace_appointment(sample("a")).await.unwrap());
        assert_eq!(
            svc.find_appointment("a").await.unwrap().unwrap()["id"],
            json!("a")
        );
    }

    struct FailingRepo;

    #[async_trait]
    impl AppointmentsRepository for FailingRepo {
        async fn insert(&self, _doc: Document) -> anyhow::Result<String> {
            anyhow::bail!("store unreachable")
        }
        async fn find_one(&self, _filter: &Filter) -> anyhow::Result<Option<Document>> {
            anyhow::bail!("store unreachable")
        }
        async fn find_many(
            &self,
            _filter: &Filter,
            _options: &FindOptions,
        ) -> anyhow::Result<Vec<Document>> {
            anyhow::bail!("store unreachable")
        }
        async fn find_one_and_replace(
            &self,
            _filter: &Filter,
            _doc: Document,
        ) -> anyhow::Result<Option<Document>> {
            anyhow::bail!("store unreachable")
        }
        async fn find_one_and_delete(&self, _filter: &Filter) -> anyhow::Result<Option<Document>> {
            anyhow::bail!("store unreachable")
        }
        async fn delete_many(&self, _filter: &Filter) -> anyhow::Result<u64> {
            anyhow::bail!("store unreachable")
        }
    }

    #[tokio::test]
    async fn store_failures_surface_as_storage_errors() {
        let svc = Service::new(Arc::new(FailingRepo));
        let err = svc.insert_appointment(sample("a")).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Storage {
                operation: "insert",
                ..
            }
        ));
        assert!(svc.delete_appointment("a").await.is_err());
        assert!(svc.replace_appointment(sample("a")).await.is_err());
        assert!(svc.find_appointment("a").await.is_err());
        assert!(svc.find_appointments_in_range(0, 1).await.is_err());
        assert!(svc.all_appointments().await.is_err());
    }

    #[tokio::test]
    #[traced_test]
    async fn delete_all_folds_store_failure_into_false() {
        let svc = Service::new(Arc::new(FailingRepo));
        assert!(!svc.delete_all_appointments().await);
        assert!(logs_contain("Delete all appointments failed"));
        assert!(logs_contain("store unreachable"));
    }
}
