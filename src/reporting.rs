use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::config::AppConfig;
use crate::error::{error_for_status, Error};

/// Client for the reporting REST surface: embed tokens, report exports, and
/// data-pipeline job runs, all against the configured workspace and report.
pub struct ReportingClient {
    http: reqwest::Client,
    reporting_base: Url,
    pipeline_base: Url,
    embed_base: Url,
    workspace_id: String,
    report_id: String,
    pipeline_item_id: String,
    export_page: String,
    export_visual: String,
}

/// Embed token issued by the reporting API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct EmbedToken {
    pub token: String,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
}

/// Short-lived bundle handed to the browser for rendering the report.
///
/// Composed per request, never cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedTokenBundle {
    pub access_token: String,
    pub embed_token: EmbedToken,
    #[serde(rename = "embedTokenURL")]
    pub embed_token_url: String,
    pub workspace_id: String,
    pub report_id: String,
}

/// Status of an asynchronous export job.
///
/// Only an exact `Succeeded` permits download; unrecognized values decode
/// into `Other` so new API states cannot be mistaken for success.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ExportStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl From<String> for ExportStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NotStarted" => Self::NotStarted,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => f.write_str("NotStarted"),
            Self::Running => f.write_str("Running"),
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Failed => f.write_str("Failed"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// An export job as reported by the trigger and status endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ExportJob {
    pub id: String,
    pub status: ExportStatus,
    #[serde(default)]
    pub resource_location: Option<String>,
    #[serde(default)]
    pub percent_complete: Option<u8>,
}

impl ReportingClient {
    #[must_use]
    pub fn new(config: &AppConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            reporting_base: config.reporting_base.clone(),
            pipeline_base: config.pipeline_base.clone(),
            embed_base: config.embed_base.clone(),
            workspace_id: config.workspace_id.clone(),
            report_id: config.report_id.clone(),
            pipeline_item_id: config.pipeline_item_id.clone(),
            export_page: config.export_page.clone(),
            export_visual: config.export_visual.clone(),
        }
    }

    fn report_url(&self, suffix: &str) -> String {
        format!(
            "{}/groups/{}/reports/{}{}",
            self.reporting_base.as_str().trim_end_matches('/'),
            self.workspace_id,
            self.report_id,
            suffix,
        )
    }

    /// Embed URL the browser loads, with the embed token appended.
    fn embed_url(&self, embed_token: &str) -> String {
        format!(
            "{}?reportId={}&groupId={}&embedToken={}",
            self.embed_base.as_str().trim_end_matches('/'),
            self.report_id,
            self.workspace_id,
            urlencoding::encode(embed_token),
        )
    }

    /// Generate a view-only embed token and compose the embed bundle around
    /// the caller's access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// reporting API rejects the request.
    pub async fn generate_embed_token(
        &self,
        access_token: &str,
    ) -> Result<EmbedTokenBundle, Error> {
        let response = self
            .http
            .post(self.report_url("/GenerateToken"))
            .bearer_auth(access_token)
            .json(&json!({
                "accessLevel": "View",
                "allowSaveAs": "false",
            }))
            .send()
            .await?;

        let response = error_for_status(response, "embed token generation").await?;
        let embed_token: EmbedToken = response.json().await?;
        let embed_token_url = self.embed_url(&embed_token.token);

        Ok(EmbedTokenBundle {
            access_token: access_token.to_string(),
            embed_token,
            embed_token_url,
            workspace_id: self.workspace_id.clone(),
            report_id: self.report_id.clone(),
        })
    }

    /// Trigger a PNG export of the configured page/visual.
    ///
    /// The reporting API is the source of truth for page and visual
    /// identifier validity; an unknown name surfaces as [`Error::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// export request is rejected.
    pub async fn start_export(&self, access_token: &str) -> Result<ExportJob, Error> {
        let response = self
            .http
            .post(self.report_url("/ExportTo"))
            .bearer_auth(access_token)
            .json(&json!({
                "format": "PNG",
                "powerBIReportConfiguration": {
                    "pages": [{
                        "pageName": self.export_page,
                        "visualName": self.export_visual,
                    }],
                },
            }))
            .send()
            .await?;

        let response = error_for_status(response, "export trigger").await?;
        response.json::<ExportJob>().await.map_err(Into::into)
    }

    /// Query the status of an export job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// status query is rejected.
    pub async fn export_status(
        &self,
        access_token: &str,
        job_id: &str,
    ) -> Result<ExportJob, Error> {
        let response = self
            .http
            .get(self.report_url(&format!("/exports/{job_id}")))
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = error_for_status(response, "export status").await?;
        response.json::<ExportJob>().await.map_err(Into::into)
    }

    /// Download the rendered artifact of a succeeded export job.
    ///
    /// Follows the job's resource location when present, falling back to the
    /// conventional file endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// download is rejected.
    pub async fn download_export(
        &self,
        access_token: &str,
        job: &ExportJob,
    ) -> Result<Vec<u8>, Error> {
        let location = match &job.resource_location {
            Some(location) => location.clone(),
            None => self.report_url(&format!("/exports/{}/file", job.id)),
        };

        let response = self
            .http
            .get(location)
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = error_for_status(response, "export download").await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Run the configured data-pipeline job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// job submission is rejected — failures propagate, they are not
    /// swallowed.
    pub async fn run_pipeline(&self, access_token: &str) -> Result<(), Error> {
        let url = format!(
            "{}/workspaces/{}/items/{}/jobs/instances?jobType=Pipeline",
            self.pipeline_base.as_str().trim_end_matches('/'),
            self.workspace_id,
            self.pipeline_item_id,
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&json!({}))
            .send()
            .await?;

        error_for_status(response, "pipeline run").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ReportingClient {
        let config = AppConfig::new(
            "test-client",
            "test-secret",
            "http://localhost:3456/redirect".parse().unwrap(),
        );
        ReportingClient::new(&config, reqwest::Client::new())
    }

    #[test]
    fn test_embed_url_names_report_workspace_and_token() {
        let client = test_client();
        let url = client.embed_url("ET");

        assert!(url.contains(&format!("reportId={}", client.report_id)));
        assert!(url.contains(&format!("groupId={}", client.workspace_id)));
        assert!(url.ends_with("&embedToken=ET"));
    }

    #[test]
    fn test_report_url_composition() {
        let client = test_client();
        let url = client.report_url("/ExportTo");

        assert!(url.starts_with("https://api.powerbi.com/v1.0/myorg/groups/"));
        assert!(url.contains(&client.workspace_id));
        assert!(url.contains(&client.report_id));
        assert!(url.ends_with("/ExportTo"));
    }

    #[test]
    fn test_export_status_decodes_known_and_unknown_values() {
        let job: ExportJob = serde_json::from_str(
            r#"{"id": "exp1", "status": "Succeeded", "resourceLocation": "https://example.com/f", "percentComplete": 100}"#,
        )
        .unwrap();
        assert_eq!(job.status, ExportStatus::Succeeded);
        assert_eq!(job.resource_location.as_deref(), Some("https://example.com/f"));

        let job: ExportJob =
            serde_json::from_str(r#"{"id": "exp2", "status": "Paused"}"#).unwrap();
        assert_eq!(job.status, ExportStatus::Other("Paused".into()));
        assert!(job.resource_location.is_none());
    }

    #[test]
    fn test_only_exact_succeeded_is_succeeded() {
        assert_ne!(ExportStatus::from("succeeded".to_string()), ExportStatus::Succeeded);
        assert_ne!(ExportStatus::from("SUCCEEDED".to_string()), ExportStatus::Succeeded);
        assert_eq!(ExportStatus::from("Succeeded".to_string()), ExportStatus::Succeeded);
    }
}
