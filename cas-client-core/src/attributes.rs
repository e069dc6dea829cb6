//! Extraction of user attributes from a `cas:authenticationSuccess` element.
//!
//! CAS servers disagree on how attributes are encoded. Three encodings are
//! recognised, tried in this order:
//!
//! - "Jasig style", a nested `<cas:attributes>` block:
//!
//! ```xml
//! <cas:authenticationSuccess>
//!     <cas:user>jsmith</cas:user>
//!     <cas:attributes>
//!         <cas:surname>Smith</cas:surname>
//!         <cas:memberOf>CN=Staff,OU=Groups,DC=example,DC=edu</cas:memberOf>
//!         <cas:memberOf>CN=Spanish Department,OU=Departments,DC=example,DC=edu</cas:memberOf>
//!     </cas:attributes>
//! </cas:authenticationSuccess>
//! ```
//!
//! - "RubyCAS style", attributes as flat siblings of `<cas:user>`:
//!
//! ```xml
//! <cas:authenticationSuccess>
//!     <cas:user>jsmith</cas:user>
//!     <cas:surname>Smith</cas:surname>
//!     <cas:givenName>John</cas:givenName>
//! </cas:authenticationSuccess>
//! ```
//!
//! - "Name-Value", `<cas:attribute name=".." value=".."/>` elements:
//!
//! ```xml
//! <cas:authenticationSuccess>
//!     <cas:user>jsmith</cas:user>
//!     <cas:attribute name="surname" value="Smith"/>
//!     <cas:attribute name="givenName" value="John"/>
//! </cas:authenticationSuccess>
//! ```
use crate::xml;

use roxmltree::Node;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::btree_map::{BTreeMap, Iter};

/// Protocol fields of a success envelope, never reported as attributes.
const RESERVED_TAGS: [&str; 3] = ["user", "proxies", "proxygrantingticket"];

/// Attribute name to values, in document order.
///
/// A name present in the map always has at least one value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, Vec<String>>);

/// Names without values are dropped on the way in.
impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut attributes = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        attributes.retain(|_, values| !values.is_empty());
        Ok(AttributeMap(attributes))
    }
}

impl AttributeMap {
    pub fn new() -> Self {
        AttributeMap(BTreeMap::new())
    }

    /// Appends `value` to the values of `name`, creating the entry on first use.
    pub fn push(&mut self, name: &str, value: &str) {
        self.0
            .entry(name.to_string())
            .or_insert_with(Vec::new)
            .push(value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// First value of `name`, for single-valued attributes.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, Vec<String>> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Collects the attributes carried by a success element.
///
/// The nested block wins when present and non-empty, flat siblings are read
/// otherwise. Name-Value elements are only looked at when neither produced
/// anything.
pub fn extract_attributes(success: Node) -> AttributeMap {
    let attributes = match attributes_block(success) {
        Some(block) => jasig_style(block),
        None => rubycas_style(success),
    };
    if !attributes.is_empty() {
        return attributes;
    }
    name_value_style(success)
}

/// Direct `attributes` child holding at least one element.
fn attributes_block<'a, 'input>(success: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    success
        .children()
        .find(|n| xml::is_named(*n, "attributes"))
        .filter(|block| block.children().any(|n| n.is_element()))
}

fn jasig_style(block: Node) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    for node in block.children().filter(|n| n.is_element()) {
        attributes.push(&xml::local_name(node), &xml::trimmed_text(node));
    }
    attributes
}

fn rubycas_style(success: Node) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    for node in success.children().filter(|n| n.is_element()) {
        let name = xml::local_name(node);
        if RESERVED_TAGS.contains(&name.as_str()) {
            continue;
        }
        let value = xml::trimmed_text(node);
        if !value.is_empty() {
            attributes.push(&name, &value);
        }
    }
    attributes
}

fn name_value_style(success: Node) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    for node in success.descendants().filter(|n| xml::is_named(*n, "attribute")) {
        match node.attribute("name") {
            Some(name) => attributes.push(name, node.attribute("value").unwrap_or_default()),
            None => debug!("Skipping CAS attribute element without a name"),
        }
    }
    attributes
}
