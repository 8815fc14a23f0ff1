use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::AppConfig;
use crate::error::Error;
use crate::identity::IdentityClient;
use crate::mail::MailClient;
use crate::reporting::{ExportJob, ExportStatus, ReportingClient};
use crate::session::SessionUser;

/// A delivered export: the artifact was downloaded and mailed.
#[derive(Debug, Clone)]
pub struct DeliveredExport {
    /// Base64 of the rendered PNG, for inline display in the response.
    pub png_base64: String,
}

/// The export-and-deliver workflow: trigger a report export, poll it to a
/// terminal state, download the artifact, and mail it under a freshly
/// acquired mail-scope token.
///
/// The poll is bounded: a fixed interval with an attempt cap, so the
/// workflow always terminates with delivered, failed, or timed out. It runs
/// inside the request's task and is cancelled with it if the client goes
/// away.
pub struct ExportOrchestrator {
    identity: Arc<IdentityClient>,
    reporting: Arc<ReportingClient>,
    mail: Arc<MailClient>,
    recipient: String,
    mail_scopes: Vec<String>,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl ExportOrchestrator {
    #[must_use]
    pub fn new(
        config: &AppConfig,
        identity: Arc<IdentityClient>,
        reporting: Arc<ReportingClient>,
        mail: Arc<MailClient>,
    ) -> Self {
        Self {
            identity,
            reporting,
            mail,
            recipient: config.report_recipient.clone(),
            mail_scopes: config.mail_scopes.clone(),
            poll_interval: config.poll_interval,
            poll_max_attempts: config.poll_max_attempts,
        }
    }

    /// Run the whole workflow for the signed-in user.
    ///
    /// # Errors
    ///
    /// Any step's failure propagates: [`Error::Api`]/[`Error::Http`] from the
    /// trigger, poll, download, or mail call, [`Error::ExportFailed`] on a
    /// terminal `Failed` status, [`Error::ExportTimedOut`] when the attempt
    /// cap is exhausted, and [`Error::NoCachedAccount`] if the silent
    /// mail-scope acquisition has no account to work from.
    pub async fn export_and_deliver(&self, user: &SessionUser) -> Result<DeliveredExport, Error> {
        let job = self.reporting.start_export(&user.access_token).await?;
        tracing::info!(job_id = %job.id, "report export started");

        let finished = self.wait_for_export(&user.access_token, job).await?;
        let bytes = self
            .reporting
            .download_export(&user.access_token, &finished)
            .await?;
        let png_base64 = STANDARD.encode(&bytes);

        let mail_token = self
            .identity
            .acquire_token_silent(&user.account_id, &self.mail_scopes)
            .await?;
        self.mail
            .send_report(&mail_token.access_token, &self.recipient, &png_base64)
            .await?;

        Ok(DeliveredExport { png_base64 })
    }

    /// Poll the job on a fixed interval until it is terminal or the attempt
    /// cap runs out. Only an exact `Succeeded` is success.
    async fn wait_for_export(
        &self,
        access_token: &str,
        job: ExportJob,
    ) -> Result<ExportJob, Error> {
        for attempt in 1..=self.poll_max_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let current = self.reporting.export_status(access_token, &job.id).await?;
            match current.status {
                ExportStatus::Succeeded => return Ok(current),
                ExportStatus::Failed => {
                    return Err(Error::ExportFailed {
                        job_id: current.id,
                    })
                }
                ExportStatus::NotStarted | ExportStatus::Running => {
                    tracing::debug!(
                        job_id = %current.id,
                        attempt,
                        percent = current.percent_complete,
                        status = %current.status,
                        "export still in progress"
                    );
                }
                ExportStatus::Other(ref value) => {
                    tracing::warn!(
                        job_id = %current.id,
                        attempt,
                        status = %value,
                        "unrecognized export status, treating as in progress"
                    );
                }
            }
        }

        Err(Error::ExportTimedOut {
            job_id: job.id,
            attempts: self.poll_max_attempts,
        })
    }
}
