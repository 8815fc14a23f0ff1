/// Errors from the identity, reporting, and mail clients and the export
/// orchestrator.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A downstream API answered with a non-success status.
    #[error("{operation} failed with status {status}: {detail}")]
    Api {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The identity provider reported an error on the authorization callback.
    #[error("identity provider returned {error}: {description}")]
    Provider { error: String, description: String },

    /// The authorization callback was malformed (missing code, state
    /// mismatch, lost verifier).
    #[error("invalid authorization callback: {0}")]
    Callback(&'static str),

    /// Silent acquisition was asked for an account that never signed in here.
    #[error("no cached account for id {account_id}")]
    NoCachedAccount { account_id: String },

    #[error("export job {job_id} reported Failed")]
    ExportFailed { job_id: String },

    #[error("export job {job_id} still not finished after {attempts} polls")]
    ExportTimedOut { job_id: String, attempts: u32 },

    #[error("session store error: {0}")]
    Store(String),
}

/// Checks an HTTP response status; returns the response on success or an
/// [`Error::Api`] carrying the body as detail.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    Err(Error::Api {
        operation,
        status,
        detail,
    })
}
