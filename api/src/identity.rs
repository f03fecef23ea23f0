use std::time::Duration;

use url::Url;

/// Mints identity tokens for backend calls from the instance metadata server.
///
/// Tokens are best effort: any failure is logged and the call proceeds
/// without an `Authorization` header.
#[derive(Debug, Clone)]
pub struct IdentityTokens {
    http: reqwest::Client,
    identity_url: Option<Url>,
    timeout: Duration,
}

impl IdentityTokens {
    pub fn new(http: reqwest::Client, identity_url: Option<Url>, timeout: Duration) -> Self {
        Self {
            http,
            identity_url,
            timeout,
        }
    }

    /// Token scoped to `audience` (the backend base URL), if one can be had.
    pub async fn fetch(&self, audience: &str) -> Option<String> {
        let identity_url = self.identity_url.as_ref()?;
        if audience.is_empty() {
            tracing::warn!("Target audience URL is empty, cannot get identity token");
            return None;
        }

        match self.request(identity_url, audience).await {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) => {
                tracing::warn!(audience, "Metadata server returned an empty identity token");
                None
            }
            Err(err) => {
                if err.is_timeout() {
                    tracing::warn!(
                        audience,
                        "Timed out fetching identity token; calling without auth"
                    );
                } else {
                    tracing::warn!(
                        audience,
                        error = %err,
                        "Could not obtain identity token; calling without auth"
                    );
                }
                None
            }
        }
    }

    async fn request(&self, identity_url: &Url, audience: &str) -> Result<String, reqwest::Error> {
        let token = self
            .http
            .get(identity_url.clone())
            .query(&[("audience", audience)])
            .header("Metadata-Flavor", "Google")
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(token.trim().to_string())
    }
}
