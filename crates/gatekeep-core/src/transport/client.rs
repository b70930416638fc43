//! Multi-mirror request client
//!
//! Every remote call goes through [`ApiClient::send`], which walks the mirror
//! list in priority order and classifies the first answer it gets.

use super::endpoints::Endpoint;
use super::error_codes;
use crate::error::{CallError, GatekeepError};
use gatekeep_types::ClientConfig;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Uniform return type of every remote call
pub type RequestOutcome = Result<String, CallError>;

/// Field carrying the software identifier
pub const SOFT_ID_FIELD: &str = "Softid";
/// Field carrying the endpoint discriminant
pub const TYPE_FIELD: &str = "type";

/// Ordered, non-empty list of mirror base addresses.
///
/// Order is priority and never changes after construction.
#[derive(Debug, Clone)]
pub struct MirrorList {
    mirrors: Arc<[Url]>,
}

impl MirrorList {
    pub fn new<I, S>(mirrors: I) -> Result<Self, GatekeepError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mirrors = mirrors
            .into_iter()
            .map(|m| {
                let raw = m.as_ref();
                Url::parse(raw).map_err(|_| GatekeepError::InvalidUrl(raw.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if mirrors.is_empty() {
            return Err(GatekeepError::NoMirrors);
        }

        Ok(Self {
            mirrors: mirrors.into(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.mirrors.iter()
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }
}

/// A fully built request. Immutable once built.
#[derive(Debug, Clone)]
pub struct Request {
    endpoint: Endpoint,
    fields: BTreeMap<String, String>,
}

impl Request {
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Builder for [`Request`]
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    soft_id: String,
    endpoint: Option<Endpoint>,
    fields: BTreeMap<String, String>,
}

impl RequestBuilder {
    pub fn new(soft_id: impl Into<String>) -> Self {
        Self {
            soft_id: soft_id.into(),
            endpoint: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn field(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a field only when it has a value; `None` is omitted, not sent empty
    pub fn optional<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    pub fn build(self) -> Result<Request, CallError> {
        let endpoint = self.endpoint.ok_or_else(|| {
            CallError::Contract("request parameter error: missing type".to_string())
        })?;

        let mut fields = self.fields;
        fields.insert(SOFT_ID_FIELD.to_string(), self.soft_id);
        fields.insert(TYPE_FIELD.to_string(), endpoint.discriminant().to_string());

        Ok(Request { endpoint, fields })
    }
}

/// Classify a response body into an outcome
pub fn classify(body: &str) -> RequestOutcome {
    let text = body.trim();
    if text.starts_with('-') {
        Err(CallError::Application {
            code: text.to_string(),
            message: error_codes::decode(text),
        })
    } else {
        Ok(text.to_string())
    }
}

/// Client for the licensing service
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    mirrors: MirrorList,
    soft_id: String,
    version: String,
    mac: String,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, GatekeepError> {
        let mirrors = MirrorList::new(&config.mirrors)?;
        Self::with_mirrors(config, mirrors, config.request_timeout())
    }

    /// Create a client with an explicit mirror list and per-attempt timeout
    pub fn with_mirrors(
        config: &ClientConfig,
        mirrors: MirrorList,
        timeout: Duration,
    ) -> Result<Self, GatekeepError> {
        let http = Client::builder()
            .user_agent(concat!("Gatekeep/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            mirrors,
            soft_id: config.soft_id.clone(),
            version: config.version.clone(),
            mac: config.mac.clone(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn mirrors(&self) -> &MirrorList {
        &self.mirrors
    }

    /// Start a request carrying this client's software identifier
    pub fn request(&self) -> RequestBuilder {
        RequestBuilder::new(self.soft_id.clone())
    }

    /// Build and send a request. Contract errors never reach the network.
    pub async fn execute(&self, builder: RequestBuilder) -> RequestOutcome {
        let request = builder.build()?;
        self.send(&request).await
    }

    /// Call an endpoint with named fields; `None` values are omitted
    pub async fn call(&self, endpoint: Endpoint, fields: &[(&str, Option<&str>)]) -> RequestOutcome {
        let builder = fields
            .iter()
            .fold(self.request().endpoint(endpoint), |b, (name, value)| {
                b.optional(name, *value)
            });
        self.execute(builder).await
    }

    /// Send a built request, sweeping the mirrors once in priority order.
    ///
    /// The first mirror that answers decides the outcome. Mirrors that fail to
    /// connect or time out are skipped and never retried within the sweep.
    pub async fn send(&self, request: &Request) -> RequestOutcome {
        let discriminant = request.endpoint().discriminant();

        for mirror in self.mirrors.iter() {
            debug!(mirror = %mirror, endpoint = ?request.endpoint(), "Sending request");

            let response = match self
                .http
                .post(mirror.clone())
                .query(&[(TYPE_FIELD, discriminant)])
                .form(request.fields())
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(mirror = %mirror, error = %e, "Request failed, switching to next mirror");
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!(mirror = %mirror, status = status.as_u16(), "Mirror answered with error status");
                return Err(CallError::Status(status.as_u16()));
            }

            match response.text().await {
                Ok(body) => return classify(&body),
                Err(e) => {
                    warn!(mirror = %mirror, error = %e, "Reading response failed, switching to next mirror");
                    continue;
                }
            }
        }

        warn!(endpoint = ?request.endpoint(), "All mirrors unreachable");
        Err(CallError::Unreachable)
    }
}
