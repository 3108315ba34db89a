//! Resource descriptors - the declared target state of one managed entity

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{ResourceKind, Value};

/// Ordered mapping of declared attribute name to desired value
pub type Attributes = IndexMap<String, Value>;

/// Declared target state for one managed entity
///
/// `id` holds the value of the kind's identity attribute and never changes
/// once the descriptor is built. Only attributes present in `attributes`
/// take part in diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    kind: ResourceKind,
    id: String,
    #[serde(default)]
    pub attributes: Attributes,
    /// The resource should not exist
    #[serde(default)]
    pub purged: bool,
    /// Ask the handler to reload the entity after a change
    #[serde(default)]
    pub reload: bool,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            attributes: Attributes::new(),
            purged: false,
            reload: false,
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn purged(mut self) -> Self {
        self.purged = true;
        self
    }

    pub fn with_reload(mut self) -> Self {
        self.reload = true;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reference used in logs and reports, e.g. `file[/tmp/a]`
    pub fn resource_ref(&self) -> String {
        format!("{}[{}]", self.kind, self.id)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn require(&self, name: &str) -> Result<&Value> {
        self.get(name).ok_or_else(|| Error::MissingAttribute {
            attribute: name.to_string(),
        })
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| invalid(name, "expected text"))
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| invalid(name, "expected text")),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| invalid(name, "expected an integer"))
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| invalid(name, "expected a boolean"))
    }

    /// First attribute carrying a deferred value, with its reason
    pub fn deferred_attribute(&self) -> Option<(&str, &str)> {
        self.attributes
            .iter()
            .find_map(|(name, value)| value.deferred_reason().map(|r| (name.as_str(), r)))
    }

    /// Check the descriptor carries its identity value in the right place
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::MissingAttribute {
                attribute: self.kind.identity_attribute().to_string(),
            });
        }
        if let Some(v) = self.get(self.kind.identity_attribute())
            && v.as_str() != Some(self.id.as_str())
        {
            return Err(invalid(
                self.kind.identity_attribute(),
                "identity attribute does not match the descriptor id",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_ref())
    }
}

fn invalid(attribute: &str, message: &str) -> Error {
    Error::InvalidAttribute {
        attribute: attribute.to_string(),
        message: message.to_string(),
    }
}

/// Parse a JSON document holding an array of descriptors
pub fn parse_descriptors(json: &str) -> Result<Vec<ResourceDescriptor>> {
    let descriptors: Vec<ResourceDescriptor> =
        serde_json::from_str(json).map_err(|e| Error::Other(format!("invalid descriptors: {e}")))?;
    for d in &descriptors {
        d.validate()?;
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor_json() {
        let json = r#"[
            {"kind": "file", "id": "/tmp/a",
             "attributes": {"hash": "abc", "permissions": 644, "owner": "root"}},
            {"kind": "service", "id": "nginx", "purged": false, "reload": true,
             "attributes": {"state": "running", "onboot": true}}
        ]"#;
        let descriptors = parse_descriptors(json).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].kind(), ResourceKind::File);
        assert_eq!(descriptors[0].int("permissions").unwrap(), 644);
        assert!(descriptors[1].reload);
        assert!(descriptors[1].bool("onboot").unwrap());

        let names: Vec<_> = descriptors[0].attributes.keys().cloned().collect();
        assert_eq!(names, vec!["hash", "permissions", "owner"]);
    }

    #[test]
    fn test_deferred_attribute_found() {
        let d = ResourceDescriptor::new(ResourceKind::File, "/etc/hosts")
            .with("owner", "root")
            .with("content", Value::deferred("ip of db host"));
        assert_eq!(d.deferred_attribute(), Some(("content", "ip of db host")));
    }

    #[test]
    fn test_identity_mismatch_rejected() {
        let d = ResourceDescriptor::new(ResourceKind::Package, "httpd").with("name", "nginx");
        assert!(d.validate().is_err());
        let d = ResourceDescriptor::new(ResourceKind::Package, "httpd").with("name", "httpd");
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_typed_accessors() {
        let d = ResourceDescriptor::new(ResourceKind::Service, "sshd").with("state", "running");
        assert!(matches!(
            d.int("state"),
            Err(Error::InvalidAttribute { .. })
        ));
        assert!(matches!(
            d.bool("onboot"),
            Err(Error::MissingAttribute { .. })
        ));
        assert_eq!(d.opt_text("missing").unwrap(), None);
        assert_eq!(d.resource_ref(), "service[sshd]");
    }
}
