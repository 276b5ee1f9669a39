//! Service creation and auto-fill handlers

use std::sync::Arc;

use crate::error::AppError;
use crate::history::{HistoryKey, HistoryStore, ServiceFields};
use crate::service_record::ServiceStore;

use super::{CreateServiceCommand, CreateServiceResult};

// =========================================================================
// CreateServiceHandler
// =========================================================================

/// Handler for service creation.
///
/// The record insert and the history upsert are separate writes; a failed
/// upsert surfaces as a server error and the client may resubmit.
pub struct CreateServiceHandler {
    services: Arc<dyn ServiceStore>,
    history: Arc<dyn HistoryStore>,
}

impl CreateServiceHandler {
    pub fn new(services: Arc<dyn ServiceStore>, history: Arc<dyn HistoryStore>) -> Self {
        Self { services, history }
    }

    /// Execute the create service command
    pub async fn execute(&self, command: CreateServiceCommand) -> Result<CreateServiceResult, AppError> {
        let (new_record, submission) = command.into_parts();

        let record = self.services.create(new_record).await?;
        let history = self.history.upsert(submission).await?;

        tracing::info!(
            service_id = record.id,
            tripulante_id = %history.key.crew_member_id,
            numero_servico = %history.key.service_number,
            contagem = history.repeat_count,
            edicoes_count = history.edit_count,
            "Service created"
        );

        Ok(CreateServiceResult { record, history })
    }
}

// =========================================================================
// AutoFillHandler
// =========================================================================

/// Read-only lookup of the pre-fill suggestion for a service number
pub struct AutoFillHandler {
    history: Arc<dyn HistoryStore>,
}

impl AutoFillHandler {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    /// Stored values when the pattern has been repeated often enough
    pub async fn execute(&self, key: &HistoryKey) -> Result<Option<ServiceFields>, AppError> {
        let history = self.history.get(key).await?;
        Ok(history.and_then(|h| h.suggestion().cloned()))
    }
}
