use crate::attributes::extract_attributes;
use crate::config::join_path;
use crate::redirect::{build_login_redirect, build_logout_redirect};
use crate::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::{xml, CasEndpointConfig, CasError, CasResult, ValidationResult};

use roxmltree::Node;
use std::fmt;
use std::sync::Arc;
use url::form_urlencoded;

const PROXY_TICKET_PREFIX: &str = "PT-";
const BAD_RESPONSE_FORMAT: &str = "Bad response format.";

/// CAS validation endpoint, picked from the ticket prefix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValidateEndpoint {
    ProxyValidate,
    ServiceValidate,
}

impl ValidateEndpoint {
    /// Proxy tickets (`PT-`) go to `proxyValidate`, everything else to
    /// `serviceValidate`.
    pub fn for_ticket(ticket: &str) -> Self {
        if ticket.starts_with(PROXY_TICKET_PREFIX) {
            ValidateEndpoint::ProxyValidate
        } else {
            ValidateEndpoint::ServiceValidate
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            ValidateEndpoint::ProxyValidate => "proxyValidate",
            ValidateEndpoint::ServiceValidate => "serviceValidate",
        }
    }
}

/// One pending ticket validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationRequest {
    ticket: String,
    service_url: String,
    endpoint: ValidateEndpoint,
}

impl ValidationRequest {
    pub fn new(ticket: &str, service_url: &str) -> Self {
        ValidationRequest {
            ticket: ticket.to_string(),
            service_url: service_url.to_string(),
            endpoint: ValidateEndpoint::for_ticket(ticket),
        }
    }

    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn endpoint(&self) -> ValidateEndpoint {
        self.endpoint
    }

    /// Request path below `prefix`, query string included.
    pub fn path(&self, prefix: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("ticket", &self.ticket)
            .append_pair("service", &self.service_url)
            .finish();
        format!("{}?{}", join_path(prefix, self.endpoint.path()), query)
    }

    fn transport_request(&self, config: &CasEndpointConfig) -> TransportRequest {
        let validate_url = config.validate_url();
        let use_tls = validate_url.scheme() == "https";
        TransportRequest {
            host: validate_url.host_str().unwrap_or_default().to_string(),
            port: validate_url
                .port_or_known_default()
                .unwrap_or_else(|| config.port()),
            path: self.path(validate_url.path()),
            use_tls,
            verify_certificate: config.verify_server_certificate(),
        }
    }
}

/// CAS ticket validation client.
///
/// Cheap to clone; clones share the configuration and the transport.
#[derive(Clone)]
pub struct CasClient {
    config: Arc<CasEndpointConfig>,
    transport: Arc<dyn Transport>,
}

impl CasClient {
    // ################################################################################
    // Constructors
    // ################################################################################
    pub fn new(config: CasEndpointConfig) -> CasResult<Self> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    pub fn with_transport(config: CasEndpointConfig, transport: Arc<dyn Transport>) -> Self {
        CasClient {
            config: Arc::new(config),
            transport,
        }
    }

    // ################################################################################
    // Getters
    // ################################################################################
    pub fn config(&self) -> &CasEndpointConfig {
        &self.config
    }

    // ################################################################################
    // Public functions
    // ################################################################################
    pub fn login_url(&self, service_url: &str) -> String {
        build_login_redirect(&self.config, service_url).to_string()
    }

    pub fn logout_url(&self, return_url: &str) -> String {
        build_logout_redirect(&self.config, return_url).to_string()
    }

    /// Validates `ticket` against the CAS server.
    ///
    /// `service` defaults to the configured service url. Fails with
    /// [`CasError::Configuration`] before any network access when neither is
    /// set.
    pub async fn validate(&self, ticket: &str, service: Option<&str>) -> CasResult<ValidationResult> {
        debug!("Validating ticket: {:#?}", ticket);
        let request = self.validation_request(ticket, service)?;
        let transport_request = request.transport_request(&self.config);
        debug!("CAS validation request: {:?}", transport_request);

        let body = self.transport.get(&transport_request).await?;
        parse_validation_response(ticket, &body)
    }

    // ################################################################################
    // Private functions
    // ################################################################################
    pub(self) fn validation_request(
        &self,
        ticket: &str,
        service: Option<&str>,
    ) -> CasResult<ValidationRequest> {
        let service_url = service
            .filter(|s| !s.is_empty())
            .or_else(|| self.config.default_service())
            .ok_or_else(|| {
                CasError::Configuration(String::from("Required CAS option `service` missing."))
            })?;
        Ok(ValidationRequest::new(ticket, service_url))
    }
}

impl fmt::Debug for CasClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CasClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Interprets the XML answer of a `serviceValidate` / `proxyValidate` call.
pub fn parse_validation_response(ticket: &str, body: &str) -> CasResult<ValidationResult> {
    xml::parse_lenient(body, |document| read_service_response(ticket, body, document.root()))
        .unwrap_or_else(|err| {
            warn!("CAS response is not valid XML: {}", err);
            Err(CasError::Protocol(String::from(BAD_RESPONSE_FORMAT)))
        })
}

fn read_service_response(ticket: &str, body: &str, root: Node) -> CasResult<ValidationResult> {
    if let Some(success) = xml::find_descendant(root, "authenticationSuccess") {
        let username = xml::find_descendant(success, "user")
            .map(xml::trimmed_text)
            .ok_or_else(|| CasError::Protocol(String::from("No username?")))?;
        let pgt_iou = xml::find_descendant(success, "proxyGrantingTicket")
            .map(xml::trimmed_text)
            .unwrap_or_default();
        let proxies = success
            .descendants()
            .filter(|n| xml::is_named(*n, "proxies"))
            .map(xml::trimmed_text)
            .collect();
        let attributes = extract_attributes(success);
        info!("Authentication success for {}!", username);
        return Ok(ValidationResult::new(
            &username, attributes, &pgt_iou, ticket, proxies,
        ));
    }

    if let Some(failure) = xml::find_descendant(root, "authenticationFailure") {
        let code = failure.attribute("code").unwrap_or_default().to_string();
        let message = xml::trimmed_text(failure);
        info!("Authentication error! [{}] {}", code, message);
        return Err(CasError::Validation { code, message });
    }

    warn!("Unexpected CAS response ({} bytes)", body.len());
    debug!("Unexpected CAS response body: {}", body);
    Err(CasError::Protocol(String::from(BAD_RESPONSE_FORMAT)))
}

#[cfg(test)]
mod tests;
