//! CAS (Central Authentication Service) client.
//!
//! The framework independent part lives in `cas-client-core` and is
//! re-exported here. Web framework integrations are behind features:
//!
//! - `actix-framework`: middleware and handlers for actix-web, in [`actix`]
//!
//! ```no_run
//! use cas_client::{CasClient, CasEndpointConfig};
//!
//! # async fn run() -> cas_client::CasResult<()> {
//! let config = CasEndpointConfig::builder("https://cas.example.org/cas")
//!     .set_default_service("https://app.example.org/")
//!     .build()?;
//! let client = CasClient::new(config)?;
//! let result = client.validate("ST-1-abc", None).await?;
//! println!("Hello {}", result.username());
//! # Ok(())
//! # }
//! ```

pub use cas_client_core::*;

#[cfg(feature = "actix-framework")]
pub mod actix {
    pub use cas_client_actix::*;
}
