//! Restriction store: validation and normalization over a backend

use std::sync::Arc;

use super::backend::RestrictionBackend;
use super::error::{RestrictionError, RestrictionResult};
use super::types::{NewRestriction, PersistedRestriction, Restriction, RestrictionKind};

/// List, create and delete restrictions for a document
#[derive(Clone)]
pub struct RestrictionStore {
    backend: Arc<dyn RestrictionBackend>,
}

impl RestrictionStore {
    pub fn new(backend: Arc<dyn RestrictionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn list(&self, document_id: &str) -> RestrictionResult<Vec<Restriction>> {
        let records = self.backend.list(document_id).await?;
        let restrictions: Vec<Restriction> = records
            .into_iter()
            .map(|record| record.into_restriction(document_id))
            .collect();

        tracing::debug!(
            "Loaded {} restrictions for document {} from {}",
            restrictions.len(),
            document_id,
            self.backend.name()
        );
        Ok(restrictions)
    }

    /// Validate and persist. Invalid payloads never reach the backend.
    pub async fn create(
        &self,
        document_id: &str,
        payload: NewRestriction,
    ) -> RestrictionResult<Restriction> {
        validate(&payload)?;

        let record = PersistedRestriction::from_new(document_id, &payload);
        let created = self.backend.create(document_id, record).await?;
        let restriction = created.into_restriction(document_id);

        tracing::info!(
            "Created {:?} restriction {} on document {} page {}",
            restriction.kind,
            restriction.label(),
            document_id,
            restriction.page_number
        );
        Ok(restriction)
    }

    pub async fn delete(&self, document_id: &str, restriction_id: &str) -> RestrictionResult<()> {
        if restriction_id.trim().is_empty() {
            return Err(RestrictionError::Validation("restriction id is required".to_string()));
        }
        self.backend.delete(document_id, restriction_id).await?;
        tracing::info!("Deleted restriction {} from document {}", restriction_id, document_id);
        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Creation rules shared by every backend
pub fn validate(payload: &NewRestriction) -> RestrictionResult<()> {
    if payload.reason.trim().is_empty() {
        return Err(RestrictionError::Validation("reason is required".to_string()));
    }
    match payload.kind {
        RestrictionKind::AreaMask => {
            if is_blank(payload.subject_role.as_deref())
                && is_blank(payload.subject_user.as_deref())
            {
                return Err(RestrictionError::Validation(
                    "area restrictions need a subject role or user".to_string(),
                ));
            }
        }
        RestrictionKind::FieldMask => {
            if is_blank(payload.field.as_deref()) {
                return Err(RestrictionError::Validation(
                    "field restrictions need a field name".to_string(),
                ));
            }
        }
    }
    if payload.rect.is_degenerate() {
        return Err(RestrictionError::Validation(format!(
            "rect must have positive width and height, got {}x{}",
            payload.rect.width, payload.rect.height
        )));
    }
    if payload.page_number == 0 {
        return Err(RestrictionError::Validation("page number starts at 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records calls and echoes creates back with an id
    #[derive(Default)]
    struct RecordingBackend {
        created: Mutex<Vec<PersistedRestriction>>,
    }

    #[async_trait]
    impl RestrictionBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn list(&self, _document_id: &str) -> RestrictionResult<Vec<PersistedRestriction>> {
            Ok(self.created.lock().clone())
        }

        async fn create(
            &self,
            _document_id: &str,
            record: PersistedRestriction,
        ) -> RestrictionResult<PersistedRestriction> {
            let mut created = self.created.lock();
            let record = PersistedRestriction {
                id: Some(format!("r{}", created.len() + 1)),
                ..record
            };
            created.push(record.clone());
            Ok(record)
        }

        async fn delete(&self, _document_id: &str, _restriction_id: &str) -> RestrictionResult<()> {
            Ok(())
        }
    }

    fn area_payload() -> NewRestriction {
        NewRestriction {
            kind: RestrictionKind::AreaMask,
            field: None,
            rect: Rect::new(150.0, 150.0, 150.0, 30.0),
            page_number: 1,
            subject_role: Some("clerk".into()),
            subject_user: None,
            reason: "privacy".into(),
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_roundtrip() {
        let backend = Arc::new(RecordingBackend::default());
        let store = RestrictionStore::new(backend.clone());

        let created = store.create("doc", area_payload()).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("r1"));
        assert_eq!(created.kind, RestrictionKind::AreaMask);

        let listed = store.list("doc").await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_invalid_payloads_never_reach_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let store = RestrictionStore::new(backend.clone());

        let mut blank_reason = area_payload();
        blank_reason.reason = "   ".into();

        let mut no_subject = area_payload();
        no_subject.subject_role = None;

        let mut no_field = area_payload();
        no_field.kind = RestrictionKind::FieldMask;

        let mut zero_width = area_payload();
        zero_width.rect.width = 0.0;

        let mut page_zero = area_payload();
        page_zero.page_number = 0;

        for payload in [blank_reason, no_subject, no_field, zero_width, page_zero] {
            let result = store.create("doc", payload).await;
            assert!(matches!(result, Err(RestrictionError::Validation(_))));
        }
        assert!(backend.created.lock().is_empty());
    }

    #[test]
    fn test_field_mask_needs_field_not_subject() {
        let mut payload = area_payload();
        payload.kind = RestrictionKind::FieldMask;
        payload.subject_role = None;
        payload.field = Some("ssn".into());
        assert!(validate(&payload).is_ok());
    }
}
