//! Framework independent part of the CAS client: ticket validation, attribute
//! extraction, login/logout urls and single sign-out parsing.
#[macro_use]
extern crate log;

mod attributes;
mod client;
mod config;
mod error;
mod logout;
mod redirect;
mod result;
mod transport;
mod xml;

pub use crate::attributes::{extract_attributes, AttributeMap};
pub use crate::client::{parse_validation_response, CasClient, ValidateEndpoint, ValidationRequest};
pub use crate::config::{CasEndpointConfig, CasEndpointConfigBuilder};
pub use crate::error::{CasError, CasResult};
pub use crate::logout::{extract_logout_ticket, single_signout_ticket};
pub use crate::redirect::{
    build_login_redirect, build_logout_redirect, current_service_url, redirect_body,
};
pub use crate::result::ValidationResult;
pub use crate::transport::{ReqwestTransport, Transport, TransportRequest, MAX_RESPONSE_BYTES};
