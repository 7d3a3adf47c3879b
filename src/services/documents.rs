//! Document records: codes, live status, file ownership and expiry alerts.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{optional_text, required_text, Deps, OrNotFound};
use crate::blob::{BlobArea, Upload};
use crate::error::{AppError, AppResult};
use crate::models::{
    Alert, Document, DocumentChanges, DocumentOwner, DocumentType, FileRef, NewAlert, NewDocument,
    ALERT_THIRTY_DAYS,
};
use crate::outcome::{SideEffect, WithSideEffects};
use crate::status::{alert_date_for, classify, deserialize_optional_date, DocumentStatus};
use crate::store::DocumentScope;

const CODE_ATTEMPTS: usize = 3;

/// Document metadata as submitted on create and edit.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DocumentInput {
    /// Required for driver documents; vehicle documents get a generated code
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub doc_type: DocumentType,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn code_prefix(year: i32) -> String {
    format!("DOC{year}")
}

/// Next sequential vehicle document code for `year`, given the codes already
/// issued with that year's prefix.
pub fn next_document_code(year: i32, existing: &[String]) -> String {
    let prefix = code_prefix(year);
    let highest = existing
        .iter()
        .filter_map(|code| code.strip_prefix(prefix.as_str()))
        .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{:04}", highest + 1)
}

#[derive(Clone)]
pub struct DocumentRegistry {
    deps: Deps,
}

impl DocumentRegistry {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn create(
        &self,
        owner: DocumentOwner,
        input: DocumentInput,
        file: Option<Upload>,
    ) -> AppResult<WithSideEffects<Document>> {
        let name = required_text(Some(&input.name), "name")?;
        if !input.doc_type.applies_to(owner.kind()) {
            return Err(AppError::validation(format!(
                "document type {:?} does not apply to a {:?}",
                input.doc_type,
                owner.kind()
            )));
        }
        self.require_owner(owner).await?;

        let today = self.deps.clock.today();
        let status = classify(input.expiry_date, today);
        let draft = NewDocument {
            code: String::new(),
            owner,
            name,
            doc_type: input.doc_type,
            issue_date: input.issue_date,
            expiry_date: input.expiry_date,
            current_status: status,
            storage_location: optional_text(input.storage_location),
            notes: optional_text(input.notes),
            file: None,
        };
        let document = match owner {
            DocumentOwner::Vehicle(_) => self.insert_with_generated_code(draft, today).await?,
            DocumentOwner::Driver(_) => {
                let code = required_text(input.code.as_deref(), "code")?;
                self.deps
                    .store
                    .insert_document(NewDocument { code, ..draft }, self.deps.clock.now())
                    .await?
            }
        };

        info!(
            document_id = %document.id,
            code = %document.code,
            owner_id = %owner.id(),
            status = status.as_str(),
            "Document created"
        );

        let mut outcome = WithSideEffects::new(document);

        if let Some(upload) = file {
            let document_id = outcome.value.id;
            match self.put_file(document_id, upload).await {
                Ok(with_file) => outcome.value = with_file,
                Err(err) => {
                    // without its file the record is meaningless
                    if let Err(cleanup) = self.deps.store.delete_document(document_id).await {
                        warn!(
                            document_id = %document_id,
                            error = %cleanup,
                            "Failed to remove document after file storage failed"
                        );
                    }
                    return Err(err);
                }
            }
        }

        match (status, outcome.value.expiry_date) {
            (DocumentStatus::Expiring30Days, Some(expiry)) => {
                let alert = NewAlert {
                    document_id: outcome.value.id,
                    alert_type: ALERT_THIRTY_DAYS.to_string(),
                    alert_date: alert_date_for(expiry),
                };
                let result = self
                    .deps
                    .store
                    .insert_alert(alert, self.deps.clock.now())
                    .await
                    .map(|_| ());
                outcome.record(SideEffect::ExpiryAlert, result);
            }
            _ => outcome.skip(SideEffect::ExpiryAlert),
        }

        Ok(outcome)
    }

    async fn insert_with_generated_code(
        &self,
        draft: NewDocument,
        today: NaiveDate,
    ) -> AppResult<Document> {
        let prefix = code_prefix(today.year());
        let mut attempt = 1;
        loop {
            let existing = self.deps.store.codes_with_prefix(&prefix).await?;
            let code = next_document_code(today.year(), &existing);
            let new = NewDocument {
                code: code.clone(),
                ..draft.clone()
            };
            match self.deps.store.insert_document(new, self.deps.clock.now()).await {
                Err(err) if err.is_conflict() && attempt < CODE_ATTEMPTS => {
                    warn!(code = %code, attempt, "Document code taken, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Attach a file, or replace the current one.
    ///
    /// The previous blob is only released once the record points at the new
    /// one; a failed release leaves an orphan blob behind and is reported.
    pub async fn attach_file(
        &self,
        document_id: Uuid,
        upload: Upload,
    ) -> AppResult<WithSideEffects<Document>> {
        let current = self
            .deps
            .store
            .get_document(document_id)
            .await?
            .or_not_found(format!("document {document_id}"))?;

        let updated = self.put_file(document_id, upload).await?;
        let mut outcome = WithSideEffects::new(updated.with_live_status(self.deps.clock.today()));

        match current.file {
            Some(old) => {
                let result = self.deps.blobs.delete(&old.path).await;
                outcome.record(SideEffect::BlobCleanup, result);
            }
            None => outcome.skip(SideEffect::BlobCleanup),
        }

        info!(document_id = %document_id, "Document file attached");
        Ok(outcome)
    }

    /// Store the blob, then point the record at it. The new blob is released
    /// again if the record cannot be updated.
    async fn put_file(&self, document_id: Uuid, upload: Upload) -> AppResult<Document> {
        let file = self
            .deps
            .blobs
            .store(BlobArea::Documents, document_id, upload)
            .await?;

        let result = self
            .deps
            .store
            .set_document_file(document_id, Some(file.clone()), self.deps.clock.now())
            .await;

        match result {
            Ok(Some(document)) => Ok(document),
            Ok(None) => {
                self.release_unreferenced(&file).await;
                Err(AppError::not_found(format!("document {document_id}")))
            }
            Err(err) => {
                self.release_unreferenced(&file).await;
                Err(err)
            }
        }
    }

    async fn release_unreferenced(&self, file: &FileRef) {
        if let Err(err) = self.deps.blobs.delete(&file.path).await {
            warn!(file_path = %file.path, error = %err, "Failed to release unreferenced blob");
        }
    }

    pub async fn update(&self, document_id: Uuid, input: DocumentInput) -> AppResult<Document> {
        let current = self
            .deps
            .store
            .get_document(document_id)
            .await?
            .or_not_found(format!("document {document_id}"))?;

        if !input.doc_type.applies_to(current.owner.kind()) {
            return Err(AppError::validation(format!(
                "document type {:?} does not apply to a {:?}",
                input.doc_type,
                current.owner.kind()
            )));
        }

        let changes = DocumentChanges {
            name: required_text(Some(&input.name), "name")?,
            doc_type: input.doc_type,
            issue_date: input.issue_date,
            expiry_date: input.expiry_date,
            current_status: classify(input.expiry_date, self.deps.clock.today()),
            storage_location: optional_text(input.storage_location),
            notes: optional_text(input.notes),
        };

        let updated = self
            .deps
            .store
            .update_document(document_id, changes, self.deps.clock.now())
            .await?
            .or_not_found(format!("document {document_id}"))?;

        info!(document_id = %document_id, status = updated.current_status.as_str(), "Document updated");
        Ok(updated)
    }

    /// Row first, blob second: a failed row delete leaves the blob in place.
    pub async fn delete(&self, document_id: Uuid) -> AppResult<WithSideEffects<()>> {
        let document = self
            .deps
            .store
            .get_document(document_id)
            .await?
            .or_not_found(format!("document {document_id}"))?;

        if !self.deps.store.delete_document(document_id).await? {
            return Err(AppError::not_found(format!("document {document_id}")));
        }
        info!(document_id = %document_id, code = %document.code, "Document deleted");

        let mut outcome = WithSideEffects::new(());
        match document.file {
            Some(file) => {
                let result = self.deps.blobs.delete(&file.path).await;
                outcome.record(SideEffect::BlobCleanup, result);
            }
            None => outcome.skip(SideEffect::BlobCleanup),
        }
        Ok(outcome)
    }

    pub async fn get(&self, document_id: Uuid) -> AppResult<Document> {
        let document = self
            .deps
            .store
            .get_document(document_id)
            .await?
            .or_not_found(format!("document {document_id}"))?;
        Ok(document.with_live_status(self.deps.clock.today()))
    }

    pub async fn list_all(&self) -> AppResult<Vec<Document>> {
        self.list(DocumentScope::All).await
    }

    /// Documents of one vehicle or driver, soonest expiry first.
    pub async fn list_for(&self, owner: DocumentOwner) -> AppResult<Vec<Document>> {
        self.require_owner(owner).await?;
        self.list(DocumentScope::Owner(owner)).await
    }

    async fn list(&self, scope: DocumentScope) -> AppResult<Vec<Document>> {
        let today = self.deps.clock.today();
        Ok(self
            .deps
            .store
            .list_documents(scope)
            .await?
            .into_iter()
            .map(|document| document.with_live_status(today))
            .collect())
    }

    pub async fn download(&self, document_id: Uuid) -> AppResult<(FileRef, Vec<u8>)> {
        let document = self
            .deps
            .store
            .get_document(document_id)
            .await?
            .or_not_found(format!("document {document_id}"))?;
        let file = document
            .file
            .or_not_found(format!("file for document {document_id}"))?;
        let bytes = self.deps.blobs.read(&file).await?;
        Ok((file, bytes))
    }

    pub async fn alerts(&self, document_id: Uuid) -> AppResult<Vec<Alert>> {
        self.deps
            .store
            .get_document(document_id)
            .await?
            .or_not_found(format!("document {document_id}"))?;
        self.deps.store.list_alerts(document_id).await
    }

    /// Rewrite stale stored statuses. Returns how many rows changed.
    pub async fn refresh_statuses(&self) -> AppResult<u64> {
        let today = self.deps.clock.today();
        let mut changed = 0;
        for document in self.deps.store.list_documents(DocumentScope::All).await? {
            let live = classify(document.expiry_date, today);
            if live != document.current_status
                && self.deps.store.set_stored_status(document.id, live).await?
            {
                changed += 1;
            }
        }
        info!(changed, %today, "Document statuses refreshed");
        Ok(changed)
    }

    async fn require_owner(&self, owner: DocumentOwner) -> AppResult<()> {
        match owner {
            DocumentOwner::Vehicle(id) => self
                .deps
                .store
                .get_vehicle(id)
                .await?
                .map(|_| ())
                .or_not_found(format!("vehicle {id}")),
            DocumentOwner::Driver(id) => self
                .deps
                .store
                .get_driver(id)
                .await?
                .map(|_| ())
                .or_not_found(format!("driver {id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn first_code_of_the_year_starts_at_one() {
        assert_eq!(next_document_code(2024, &[]), "DOC20240001");
    }

    #[test]
    fn continues_from_the_highest_suffix() {
        let existing = codes(&["DOC20240002", "DOC20240010", "DOC20240007"]);
        assert_eq!(next_document_code(2024, &existing), "DOC20240011");
    }

    #[test]
    fn ignores_codes_that_are_not_sequential() {
        let existing = codes(&["DOC2024", "DOC2024ABCD", "DOC20230099", "MANUAL-1", "DOC20240003"]);
        assert_eq!(next_document_code(2024, &existing), "DOC20240004");
    }

    #[test]
    fn sequence_grows_past_four_digits() {
        let existing = codes(&["DOC20249999"]);
        assert_eq!(next_document_code(2024, &existing), "DOC202410000");
    }
}
