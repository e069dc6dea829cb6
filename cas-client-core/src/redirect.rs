use crate::config::join_path;
use crate::{CasEndpointConfig, CasError, CasResult};

use url::Url;

const LOGIN_PATH: &str = "login";
const LOGOUT_PATH: &str = "logout";

/// CAS login url for `service_url`.
pub fn build_login_redirect(config: &CasEndpointConfig, service_url: &str) -> Url {
    cas_url(config.base_url(), LOGIN_PATH, service_url)
}

/// CAS logout url, sending the user back to `return_url` afterwards.
pub fn build_logout_redirect(config: &CasEndpointConfig, return_url: &str) -> Url {
    cas_url(config.base_url(), LOGOUT_PATH, return_url)
}

fn cas_url(base_url: &Url, suffix: &str, service: &str) -> Url {
    let mut url = base_url.clone();
    url.set_path(&join_path(base_url.path(), suffix));
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut().append_pair("service", service);
    debug!("CAS {} url: {}", suffix, url);
    url
}

/// Url of the current page with the `ticket` parameter removed, usable as the
/// CAS `service`.
pub fn current_service_url(scheme: &str, host: &str, path_and_query: &str) -> CasResult<String> {
    let mut url = Url::parse(&format!("{}://{}{}", scheme, host, path_and_query)).map_err(|err| {
        CasError::Configuration(format!("Cannot build service url for {}: {}", host, err))
    })?;
    let params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "ticket")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }
    Ok(url.to_string())
}

/// Fallback body sent with a redirect, for clients that do not follow it.
pub fn redirect_body(url: &str) -> String {
    let href = url
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!("<a href=\"{}\">Redirecting to CAS</a>", href)
}
