//! Zone operation polling.

use std::time::Instant;

use tokio::time::sleep;
use tracing::debug;

use super::models::Operation;
use super::{ComputeClient, ComputeError};

impl ComputeClient {
    /// Fetches a zone operation.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::Api`] when the request fails.
    pub async fn get_zone_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> Result<Operation, ComputeError> {
        let url = self.api.url(&[
            "projects",
            project,
            "zones",
            zone,
            "operations",
            operation,
        ])?;
        Ok(self.api.get_json(&url).await?)
    }

    /// Polls a zone operation of `project` every `poll_interval` until it
    /// reports `DONE`.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::OperationFailed`] when the finished operation
    /// carries errors, [`ComputeError::Timeout`] when the deadline passes, and
    /// [`ComputeError::Api`] when polling itself fails.
    pub async fn wait_for_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> Result<Operation, ComputeError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let current = self.get_zone_operation(project, zone, operation).await?;
            if current.is_done() {
                if let Some(message) = current.error_message() {
                    return Err(ComputeError::OperationFailed {
                        operation: operation.to_owned(),
                        message,
                    });
                }
                return Ok(current);
            }

            debug!(operation, zone, status = %current.status, "operation still in progress");
            if Instant::now() + self.poll_interval > deadline {
                return Err(ComputeError::Timeout {
                    operation: operation.to_owned(),
                    zone: zone.to_owned(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}
