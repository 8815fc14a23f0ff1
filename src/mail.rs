use serde_json::{json, Value};
use url::Url;

use crate::config::AppConfig;
use crate::error::{error_for_status, Error};

const SUBJECT: &str = "Your report export";
const BODY: &str = "Attached is the latest export of the report visual.";
const ATTACHMENT_NAME: &str = "report.png";

/// Submits report exports by mail through the graph API, on behalf of the
/// signed-in user (mail-scope token, not the reporting one).
pub struct MailClient {
    http: reqwest::Client,
    graph_base: Url,
}

impl MailClient {
    #[must_use]
    pub fn new(config: &AppConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            graph_base: config.graph_base.clone(),
        }
    }

    /// Send a single mail with the base64-encoded PNG attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// graph API rejects the submission. Failures propagate to the caller;
    /// nothing is fire-and-forget.
    pub async fn send_report(
        &self,
        access_token: &str,
        recipient: &str,
        png_base64: &str,
    ) -> Result<(), Error> {
        let url = format!(
            "{}/me/sendMail",
            self.graph_base.as_str().trim_end_matches('/')
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&message_body(recipient, png_base64))
            .send()
            .await?;

        error_for_status(response, "mail submission").await?;
        tracing::info!(recipient, "report export mailed");
        Ok(())
    }
}

fn message_body(recipient: &str, png_base64: &str) -> Value {
    json!({
        "message": {
            "subject": SUBJECT,
            "body": {
                "contentType": "Text",
                "content": BODY,
            },
            "toRecipients": [
                {
                    "emailAddress": {
                        "address": recipient,
                    }
                }
            ],
            "attachments": [
                {
                    "@odata.type": "#microsoft.graph.fileAttachment",
                    "name": ATTACHMENT_NAME,
                    "contentType": "image/png",
                    "contentBytes": png_base64,
                }
            ],
        },
        "saveToSentItems": "true",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_shape() {
        let body = message_body("u@x.com", "QUJD");

        assert_eq!(
            body["message"]["toRecipients"][0]["emailAddress"]["address"],
            "u@x.com"
        );
        let attachment = &body["message"]["attachments"][0];
        assert_eq!(attachment["@odata.type"], "#microsoft.graph.fileAttachment");
        assert_eq!(attachment["contentType"], "image/png");
        assert_eq!(attachment["contentBytes"], "QUJD");
        assert_eq!(body["saveToSentItems"], "true");
    }

    #[test]
    fn test_message_body_has_single_attachment() {
        let body = message_body("u@x.com", "QUJD");
        assert_eq!(body["message"]["attachments"].as_array().unwrap().len(), 1);
    }
}
