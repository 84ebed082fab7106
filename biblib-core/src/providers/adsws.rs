use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use biblib_model::AbsoluteUid;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::identity::{IdentityError, IdentityLookup};

/// Identity client for the user-lookup API. `GET {base}/{uid}` answers with
/// the email, `GET {base}/{email}` with the uid.
pub struct AdswsIdentityClient {
    http: reqwest::Client,
    base: Url,
    service_token: Option<String>,
}

impl fmt::Debug for AdswsIdentityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdswsIdentityClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct EmailBody {
    email: String,
}

#[derive(Debug, Deserialize)]
struct UidBody {
    id: i64,
}

impl AdswsIdentityClient {
    pub fn new(
        base: &str,
        service_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let base = Url::parse(base)
            .map_err(|e| IdentityError::InvalidEndpoint(format!("{base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(IdentityError::InvalidEndpoint(base.to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            service_token,
        })
    }

    fn lookup_url(&self, key: &str) -> Result<Url, IdentityError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<T, IdentityError> {
        let url = self.lookup_url(key)?;
        debug!(url = %url, "Identity lookup");

        let mut request = self.http.get(url);
        if let Some(token) = &self.service_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Identity lookup failed");
            return Err(IdentityError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IdentityError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityLookup for AdswsIdentityClient {
    async fn email_for(&self, uid: AbsoluteUid) -> Result<String, IdentityError> {
        let body: EmailBody = self.get(&uid.to_string()).await?;
        Ok(body.email)
    }

    async fn uid_for_email(
        &self,
        email: &str,
    ) -> Result<AbsoluteUid, IdentityError> {
        let body: UidBody = self.get(email).await?;
        Ok(AbsoluteUid(body.id))
    }
}
