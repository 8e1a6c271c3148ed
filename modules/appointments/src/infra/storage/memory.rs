//! Process-local document collection.
//!
//! Each operation takes the lock once, so single-document operations are
//! atomic with respect to each other. Natural order is insertion order.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::contract::model::{Document, INTERNAL_ID_FIELD};
use crate::domain::query::{compare_documents, Filter, FindOptions};
use crate::domain::repo::AppointmentsRepository;

#[derive(Default)]
pub struct InMemoryAppointmentsRepository {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryAppointmentsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl AppointmentsRepository for InMemoryAppointmentsRepository {
    async fn insert(&self, mut doc: Document) -> anyhow::Result<String> {
        let id = match doc.get(INTERNAL_ID_FIELD) {
            Some(Value::String(existing)) => existing.clone(),
            _ => new_document_id(),
        };
        doc.insert(INTERNAL_ID_FIELD.to_string(), Value::String(id.clone()));
        self.docs.write().push(doc);
        Ok(id)
    }

    async fn find_one(&self, filter: &Filter) -> anyhow::Result<Option<Document>> {
        Ok(self.docs.read().iter().find(|d| filter.matches(d)).cloned())
    }

    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> anyhow::Result<Vec<Document>> {
        let mut found: Vec<Document> = self
            .docs
            .read()
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        if !options.sort.is_empty() {
            // stable: ties keep insertion order
            found.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }
        Ok(found)
    }

    async fn find_one_and_replace(
        &self,
        filter: &Filter,
        mut doc: Document,
    ) -> anyhow::Result<Option<Document>> {
        let mut docs = self.docs.write();
        let Some(slot) = docs.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(None);
        };
        let identity = slot
            .get(INTERNAL_ID_FIELD)
            .cloned()
            .unwrap_or_else(|| Value::String(new_document_id()));
        doc.insert(INTERNAL_ID_FIELD.to_string(), identity);
        Ok(Some(std::mem::replace(slot, doc)))
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> anyhow::Result<Option<Document>> {
        let mut docs = self.docs.write();
        Ok(docs
            .iter()
            .position(|d| filter.matches(d))
            .map(|pos| docs.remove(pos)))
    }

    async fn delete_many(&self, filter: &Filter) -> anyhow::Result<u64> {
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }
}
