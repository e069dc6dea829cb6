//! Outbound HTTP(S) GET used for ticket validation.

use crate::{CasError, CasResult};

use async_trait::async_trait;
use reqwest::Client;

/// Responses larger than this are aborted instead of buffered.
pub const MAX_RESPONSE_BYTES: usize = 1_000_000;

/// Single GET request against a CAS server.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub host: String,
    pub port: u16,
    /// Path including the query string.
    pub path: String,
    pub use_tls: bool,
    pub verify_certificate: bool,
}

impl TransportRequest {
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

/// Fetches the full text body of a GET request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &TransportRequest) -> CasResult<String>;
}

/// `reqwest` backed transport.
///
/// Holds one connection pool per certificate verification mode.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    verifying: Client,
    insecure: Client,
}

impl ReqwestTransport {
    pub fn new() -> CasResult<Self> {
        Ok(ReqwestTransport {
            verifying: Client::builder().build()?,
            insecure: Client::builder()
                .danger_accept_invalid_certs(true)
                .build()?,
        })
    }

    fn client(&self, verify_certificate: bool) -> &Client {
        if verify_certificate {
            &self.verifying
        } else {
            &self.insecure
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &TransportRequest) -> CasResult<String> {
        let url = request.url();
        debug!("GET {}", url);
        let mut response = self
            .client(request.verify_certificate)
            .get(&url)
            .send()
            .await
            .map_err(|err| {
                error!("Error while requesting ticket validation! Error: {:?}", err);
                CasError::from(err)
            })?;

        // returning early drops `response`, which aborts the connection
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            append_chunk(&mut body, &chunk)?;
        }
        Ok(decode_body(body))
    }
}

/// UTF-8 text of `body`, invalid sequences replaced by U+FFFD.
pub(crate) fn decode_body(body: Vec<u8>) -> String {
    String::from_utf8(body).unwrap_or_else(|err| {
        warn!("CAS response is not valid UTF-8: {}", err);
        String::from_utf8_lossy(err.as_bytes()).into_owned()
    })
}

/// Appends `chunk` to `body`, failing once the body outgrows [`MAX_RESPONSE_BYTES`].
pub(crate) fn append_chunk(body: &mut Vec<u8>, chunk: &[u8]) -> CasResult<()> {
    if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
        warn!(
            "CAS response exceeds {} bytes, aborting connection",
            MAX_RESPONSE_BYTES
        );
        return Err(CasError::Transport(format!(
            "CAS response exceeds {} bytes",
            MAX_RESPONSE_BYTES
        )));
    }
    body.extend_from_slice(chunk);
    Ok(())
}
