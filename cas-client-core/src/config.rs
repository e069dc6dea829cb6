use crate::{CasError, CasResult};

use std::env;
use url::Url;

const DEFAULT_CAS_PORT: u16 = 443;

/// Location of the CAS server and the defaults used for validation.
///
/// Built once, then shared read-only by every validation call.
#[derive(Clone, Debug, PartialEq)]
pub struct CasEndpointConfig {
    base_url: Url,
    validate_url: Url,
    default_service: Option<String>,
    verify_server_certificate: bool,
}

impl CasEndpointConfig {
    // ################################################################################
    // Constructors
    // ################################################################################
    /// Configuration with every option left at its default.
    pub fn new(base_url: &str) -> CasResult<Self> {
        Self::builder(base_url).build()
    }

    pub fn builder(base_url: &str) -> CasEndpointConfigBuilder {
        CasEndpointConfigBuilder::new(base_url)
    }

    /// Reads the configuration from `CAS_URL`, `CAS_VALIDATE_URL`,
    /// `CAS_SERVICE_URL` and `CAS_VERIFY_CERTIFICATE`.
    pub fn from_env() -> CasResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> CasResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("CAS_URL").ok_or_else(|| {
            CasError::Configuration(String::from("Environment variable `CAS_URL` missing."))
        })?;
        let mut builder = Self::builder(&base_url);
        if let Some(validate_url) = lookup("CAS_VALIDATE_URL") {
            builder.set_validate_url(&validate_url);
        }
        if let Some(service) = lookup("CAS_SERVICE_URL") {
            builder.set_default_service(&service);
        }
        if let Some(verify) = lookup("CAS_VERIFY_CERTIFICATE") {
            let verify = !matches!(
                verify.trim().to_lowercase().as_str(),
                "false" | "0" | "no" | "off"
            );
            builder.set_verify_server_certificate(verify);
        }
        builder.build()
    }

    // ################################################################################
    // Getters
    // ################################################################################
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn validate_url(&self) -> &Url {
        &self.validate_url
    }

    pub fn default_service(&self) -> Option<&str> {
        self.default_service.as_deref()
    }

    pub fn verify_server_certificate(&self) -> bool {
        self.verify_server_certificate
    }

    /// Port of the CAS server, 443 unless the base url names one.
    pub fn port(&self) -> u16 {
        self.base_url.port().unwrap_or(DEFAULT_CAS_PORT)
    }
}

#[derive(Clone, Debug)]
pub struct CasEndpointConfigBuilder {
    base_url: String,
    validate_url: Option<String>,
    default_service: Option<String>,
    verify_server_certificate: bool,
}

impl CasEndpointConfigBuilder {
    fn new(base_url: &str) -> Self {
        CasEndpointConfigBuilder {
            base_url: base_url.trim().to_string(),
            validate_url: None,
            default_service: None,
            verify_server_certificate: true,
        }
    }

    /// Separate url for ticket validation. Defaults to the base url.
    pub fn set_validate_url(&mut self, validate_url: &str) -> &mut Self {
        self.validate_url = non_empty(validate_url);
        self
    }

    /// Service used when `validate` is called without one.
    pub fn set_default_service(&mut self, default_service: &str) -> &mut Self {
        self.default_service = non_empty(default_service);
        self
    }

    pub fn set_verify_server_certificate(&mut self, verify: bool) -> &mut Self {
        self.verify_server_certificate = verify;
        self
    }

    pub fn build(&self) -> CasResult<CasEndpointConfig> {
        if self.base_url.is_empty() {
            return Err(CasError::Configuration(String::from(
                "Required CAS option `base_url` missing.",
            )));
        }
        let base_url = Url::parse(&self.base_url)?;
        if base_url.scheme() != "https" {
            error!("CAS base url must use https: {}", base_url);
            return Err(CasError::Configuration(String::from(
                "Only https CAS servers are supported.",
            )));
        }
        if base_url.host_str().unwrap_or_default().is_empty() {
            return Err(CasError::Configuration(String::from(
                "Option `base_url` must be a valid url like: https://example.com/cas",
            )));
        }

        let validate_url = match &self.validate_url {
            Some(url) => Url::parse(url)?,
            None => base_url.clone(),
        };
        if !matches!(validate_url.scheme(), "http" | "https") || validate_url.host_str().is_none() {
            return Err(CasError::Configuration(format!(
                "Invalid CAS validate url: {}",
                validate_url
            )));
        }

        Ok(CasEndpointConfig {
            base_url,
            validate_url,
            default_service: self.default_service.clone(),
            verify_server_certificate: self.verify_server_certificate,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    match value.trim() {
        "" => None,
        v => Some(v.to_string()),
    }
}

/// Joins a url path prefix and a segment with exactly one `/` between them.
pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}
