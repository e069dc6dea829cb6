use crate::AttributeMap;

use serde::{Deserialize, Serialize};

/// Outcome of a successful ticket validation
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValidationResult {
    username: String,
    attributes: AttributeMap,
    #[serde(rename = "pgtiou")]
    proxy_granting_ticket_iou: String,
    ticket: String,
    proxies: Vec<String>,
}

impl ValidationResult {
    // ################################################################################
    // Constructor
    // ################################################################################
    //
    /// Returns a new validation result
    ///
    /// # Examples
    ///
    /// ```
    /// use cas_client_core::{AttributeMap, ValidationResult};
    ///
    /// let result = ValidationResult::new("user", AttributeMap::new(), "", "ST-1", Vec::new());
    /// assert_eq!(result.username(), "user");
    /// assert_eq!(result.ticket(), "ST-1");
    /// assert!(result.attributes().is_empty());
    /// ```
    pub fn new(
        username: &str,
        attributes: AttributeMap,
        proxy_granting_ticket_iou: &str,
        ticket: &str,
        proxies: Vec<String>,
    ) -> ValidationResult {
        debug!(
            "New CAS validation result : {{ username: {}, attributes: {:?}, proxies: {:?} }}",
            username, attributes, proxies
        );
        ValidationResult {
            username: username.to_string(),
            attributes,
            proxy_granting_ticket_iou: proxy_granting_ticket_iou.to_string(),
            ticket: ticket.to_string(),
            proxies,
        }
    }

    // ################################################################################
    // Instance functions
    // ################################################################################
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Proxy-granting ticket IOU, empty when the server issued none.
    pub fn proxy_granting_ticket_iou(&self) -> &str {
        &self.proxy_granting_ticket_iou
    }

    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    pub fn proxies(&self) -> &[String] {
        &self.proxies
    }

    /// Converts the result to a JSON string
    ///
    /// # Examples
    /// ```
    /// use cas_client_core::{AttributeMap, ValidationResult};
    ///
    /// let result = ValidationResult::new("user", AttributeMap::new(), "", "ST-1", Vec::new());
    /// assert_eq!(
    ///     result.to_raw().unwrap(),
    ///     "{\"username\":\"user\",\"attributes\":{},\"pgtiou\":\"\",\"ticket\":\"ST-1\",\"proxies\":[]}"
    /// );
    /// ```
    pub fn to_raw(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    // ################################################################################
    // Class functions
    // ################################################################################
    //
    /// Converts a JSON string back to a result
    ///
    /// # Examples
    /// ```
    /// use cas_client_core::{AttributeMap, ValidationResult};
    ///
    /// let mut attributes = AttributeMap::new();
    /// attributes.push("memberof", "staff");
    /// let result = ValidationResult::new("user", attributes, "PGTIOU-1", "ST-1", vec![]);
    /// assert_eq!(ValidationResult::from_raw(&result.to_raw().unwrap()).unwrap(), result);
    /// ```
    pub fn from_raw(raw: &str) -> serde_json::Result<Self> {
        debug!("CAS validation result from raw: {}", raw);
        serde_json::from_str(raw)
    }
}
