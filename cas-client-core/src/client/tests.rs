use super::*;

use crate::AttributeMap;
use async_trait::async_trait;
use std::sync::Mutex;

const CAS_URL: &str = "https://cas.example.org/cas";
const SERVICE_URL: &str = "https://service.example.org/app";

/// Transport answering every request with a canned body.
struct FakeTransport {
    response: CasResult<String>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    fn new(response: CasResult<String>) -> Arc<Self> {
        Arc::new(FakeTransport {
            response,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn answering(body: &str) -> Arc<Self> {
        Self::new(Ok(body.to_string()))
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, request: &TransportRequest) -> CasResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone()
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cas_client(config: CasEndpointConfig, transport: Arc<FakeTransport>) -> CasClient {
    init_logger();
    CasClient::with_transport(config, transport)
}

fn default_config() -> CasEndpointConfig {
    CasEndpointConfig::new(CAS_URL).unwrap()
}

const SUCCESS: &str = "
<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">
    <cas:authenticationSuccess>
        <cas:user>jsmith</cas:user>
        <cas:attributes>
            <cas:givenName>John</cas:givenName>
            <cas:memberOf>staff</cas:memberOf>
            <cas:memberOf>faculty</cas:memberOf>
        </cas:attributes>
        <cas:proxyGrantingTicket>PGTIOU-84678-8a9d2</cas:proxyGrantingTicket>
        <cas:proxies>
            https://proxy1.example.org/
        </cas:proxies>
        <cas:proxies>https://proxy2.example.org/</cas:proxies>
    </cas:authenticationSuccess>
</cas:serviceResponse>";

// ################################################################################
// Endpoint selection
// ################################################################################
#[test]
fn endpoint_depends_on_ticket_prefix() {
    assert_eq!(ValidateEndpoint::for_ticket("PT-123"), ValidateEndpoint::ProxyValidate);
    assert_eq!(ValidateEndpoint::for_ticket("ST-abc"), ValidateEndpoint::ServiceValidate);
    assert_eq!(ValidateEndpoint::for_ticket("pt-123"), ValidateEndpoint::ServiceValidate);
    assert_eq!(ValidateEndpoint::for_ticket("XPT-123"), ValidateEndpoint::ServiceValidate);
    assert_eq!(ValidateEndpoint::for_ticket(""), ValidateEndpoint::ServiceValidate);
}

#[test]
fn should_return_validation_path() {
    let request = ValidationRequest::new("ST-abc", "https://service.example.org/");
    assert_eq!(
        request.path("/"),
        "/serviceValidate?ticket=ST-abc&service=https%3A%2F%2Fservice.example.org%2F"
    );
    let request = ValidationRequest::new("PT-123", "https://service.example.org/");
    assert_eq!(
        request.path("/cas/"),
        "/cas/proxyValidate?ticket=PT-123&service=https%3A%2F%2Fservice.example.org%2F"
    );
    assert_eq!(request.endpoint(), ValidateEndpoint::ProxyValidate);
}

#[test]
fn call_time_service_wins_over_default() {
    let config = CasEndpointConfig::builder(CAS_URL)
        .set_default_service("https://default.example.org")
        .build()
        .unwrap();
    let client = cas_client(config, FakeTransport::answering(""));
    let request = client.validation_request("ST-1", Some(SERVICE_URL)).unwrap();
    assert_eq!(request.service_url(), SERVICE_URL);
    let request = client.validation_request("ST-1", None).unwrap();
    assert_eq!(request.service_url(), "https://default.example.org");
    let request = client.validation_request("ST-1", Some("")).unwrap();
    assert_eq!(request.service_url(), "https://default.example.org");
}

// ################################################################################
// validate
// ################################################################################
#[actix_rt::test]
async fn validate_should_return_result() {
    let transport = FakeTransport::answering(SUCCESS);
    let client = cas_client(default_config(), transport.clone());

    let result = client.validate("ST-abc", Some(SERVICE_URL)).await.unwrap();
    assert_eq!(result.username(), "jsmith");
    assert_eq!(result.ticket(), "ST-abc");
    assert_eq!(result.proxy_granting_ticket_iou(), "PGTIOU-84678-8a9d2");
    assert_eq!(
        result.proxies(),
        &[
            "https://proxy1.example.org/".to_string(),
            "https://proxy2.example.org/".to_string()
        ]
    );
    assert_eq!(result.attributes().first("givenname"), Some("John"));
    assert_eq!(
        result.attributes().get("memberof").unwrap(),
        &["staff".to_string(), "faculty".to_string()]
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        TransportRequest {
            host: String::from("cas.example.org"),
            port: 443,
            path: String::from(
                "/cas/serviceValidate?ticket=ST-abc&service=https%3A%2F%2Fservice.example.org%2Fapp"
            ),
            use_tls: true,
            verify_certificate: true,
        }
    );
}

#[actix_rt::test]
async fn validate_proxy_ticket_targets_proxy_validate() {
    let transport = FakeTransport::answering(SUCCESS);
    let client = cas_client(default_config(), transport.clone());
    client.validate("PT-123", Some(SERVICE_URL)).await.unwrap();
    assert!(transport.requests()[0]
        .path
        .starts_with("/cas/proxyValidate?ticket=PT-123&"));
}

#[actix_rt::test]
async fn validate_uses_validate_url_and_certificate_flag() {
    let config = CasEndpointConfig::builder(CAS_URL)
        .set_validate_url("http://cas-internal:8080/internal/")
        .set_verify_server_certificate(false)
        .set_default_service(SERVICE_URL)
        .build()
        .unwrap();
    let transport = FakeTransport::answering(SUCCESS);
    let client = cas_client(config, transport.clone());
    client.validate("ST-1", None).await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.host, "cas-internal");
    assert_eq!(request.port, 8080);
    assert!(!request.use_tls);
    assert!(!request.verify_certificate);
    assert!(request.path.starts_with("/internal/serviceValidate?ticket=ST-1&service="));
}

#[actix_rt::test]
async fn validate_without_service_fails_before_network_access() {
    let transport = FakeTransport::answering(SUCCESS);
    let client = cas_client(default_config(), transport.clone());
    let err = client.validate("ST-1", None).await.unwrap_err();
    assert_eq!(
        err,
        CasError::Configuration(String::from("Required CAS option `service` missing."))
    );
    assert!(transport.requests().is_empty());
}

#[actix_rt::test]
async fn validate_should_return_validation_error() {
    let transport = FakeTransport::answering(
        "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
         <cas:authenticationFailure code=\"INVALID_TICKET\">Ticket has expired</cas:authenticationFailure>\
         </cas:serviceResponse>",
    );
    let client = cas_client(default_config(), transport);
    let err = client.validate("ST-1", Some(SERVICE_URL)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation failed [INVALID_TICKET]: Ticket has expired"
    );
}

#[actix_rt::test]
async fn validate_should_propagate_transport_error() {
    let transport = FakeTransport::new(Err(CasError::Transport(String::from("connection refused"))));
    let client = cas_client(default_config(), transport);
    let err = client.validate("ST-1", Some(SERVICE_URL)).await.unwrap_err();
    assert_eq!(err, CasError::Transport(String::from("connection refused")));
}

// ################################################################################
// parse_validation_response
// ################################################################################
#[test]
fn should_parse_failure_with_surrounding_whitespace() {
    let resp = "
    <cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">
    <cas:authenticationFailure code=\"INVALID_TICKET\">
        Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized
        </cas:authenticationFailure>
    </cas:serviceResponse>";
    assert_eq!(
        parse_validation_response("ST-1856339-aA5Yuvrxzpv8Tau1cYQ7", resp),
        Err(CasError::Validation {
            code: String::from("INVALID_TICKET"),
            message: String::from("Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized"),
        })
    );
}

#[test]
fn failure_without_code_has_empty_code() {
    let resp = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                <cas:authenticationFailure>nope</cas:authenticationFailure>\
                </cas:serviceResponse>";
    let err = parse_validation_response("ST-1", resp).unwrap_err();
    assert_eq!(err.to_string(), "Validation failed []: nope");
}

#[test]
fn should_parse_minimal_success() {
    let resp = "
    <cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">
    <cas:authenticationSuccess>
        <cas:user>username</cas:user>
    </cas:authenticationSuccess>
    </cas:serviceResponse>";
    assert_eq!(
        parse_validation_response("ST-1", resp),
        Ok(ValidationResult::new(
            "username",
            AttributeMap::new(),
            "",
            "ST-1",
            Vec::new()
        ))
    );
}

#[test]
fn success_without_user_is_a_protocol_error() {
    let resp = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                <cas:authenticationSuccess><cas:attributes/></cas:authenticationSuccess>\
                </cas:serviceResponse>";
    assert_eq!(
        parse_validation_response("ST-1", resp),
        Err(CasError::Protocol(String::from("No username?")))
    );
}

#[test]
fn unknown_envelope_is_a_bad_response_format() {
    let resp = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                <cas:somethingElse/>\
                </cas:serviceResponse>";
    assert_eq!(
        parse_validation_response("ST-1", resp).unwrap_err().to_string(),
        "Bad response format."
    );
}

#[test]
fn failure_without_namespace_declaration() {
    let resp = "<cas:authenticationFailure code=\"INVALID_TICKET\">Ticket has expired</cas:authenticationFailure>";
    assert_eq!(
        parse_validation_response("ST-1", resp).unwrap_err().to_string(),
        "Validation failed [INVALID_TICKET]: Ticket has expired"
    );
}

#[test]
fn success_without_namespace_declaration() {
    let resp = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
    <cas:serviceResponse>
        <cas:authenticationSuccess>
            <cas:user>jsmith</cas:user>
            <cas:attributes><cas:surname>Dupr\u{fffd}</cas:surname></cas:attributes>
        </cas:authenticationSuccess>
    </cas:serviceResponse>";
    let result = parse_validation_response("ST-1", resp).unwrap();
    assert_eq!(result.username(), "jsmith");
    assert_eq!(result.attributes().first("surname"), Some("Dupr\u{fffd}"));
}

#[test]
fn non_xml_body_is_a_bad_response_format() {
    init_logger();
    for resp in &["", "<html><body>502 Bad Gateway", "Internal Server Error"] {
        assert_eq!(
            parse_validation_response("ST-1", resp),
            Err(CasError::Protocol(String::from("Bad response format.")))
        );
    }
}

// ################################################################################
// Redirect urls
// ################################################################################
#[test]
fn should_return_login_and_logout_urls() {
    let client = cas_client(default_config(), FakeTransport::answering(""));
    assert_eq!(
        client.login_url(SERVICE_URL),
        "https://cas.example.org/cas/login?service=https%3A%2F%2Fservice.example.org%2Fapp"
    );
    assert_eq!(
        client.logout_url("https://service.example.org"),
        "https://cas.example.org/cas/logout?service=https%3A%2F%2Fservice.example.org"
    );
}

#[test]
fn new_client_uses_reqwest_transport() {
    let client = CasClient::new(default_config()).unwrap();
    assert_eq!(client.config().base_url().as_str(), CAS_URL);
    assert!(format!("{:?}", client).starts_with("CasClient"));
}
