//! Resolved argument values handed to a task body.

use std::collections::HashMap;
use std::collections::hash_map;

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Argument name to value, after upstream results, parameters and overrides
/// have been applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inputs(HashMap<String, serde_json::Value>);

impl Inputs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
    self.0.get(name)
  }

  /// Fetch and deserialize a required argument.
  pub fn require<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
    let value = self
      .0
      .get(name)
      .with_context(|| format!("missing argument '{}'", name))?;
    serde_json::from_value(value.clone())
      .with_context(|| format!("argument '{}' has an unexpected type: {}", name, value))
  }

  /// Set an argument, returning the previous value.
  pub fn insert(
    &mut self,
    name: impl Into<String>,
    value: serde_json::Value,
  ) -> Option<serde_json::Value> {
    self.0.insert(name.into(), value)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> hash_map::Iter<'_, String, serde_json::Value> {
    self.0.iter()
  }

  pub fn into_inner(self) -> HashMap<String, serde_json::Value> {
    self.0
  }
}

impl From<HashMap<String, serde_json::Value>> for Inputs {
  fn from(map: HashMap<String, serde_json::Value>) -> Self {
    Self(map)
  }
}

impl FromIterator<(String, serde_json::Value)> for Inputs {
  fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a Inputs {
  type Item = (&'a String, &'a serde_json::Value);
  type IntoIter = hash_map::Iter<'a, String, serde_json::Value>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_require_typed() {
    let inputs = Inputs::from_iter([
      ("x".to_string(), json!(5)),
      ("names".to_string(), json!(["a", "b"])),
    ]);

    let x: i64 = inputs.require("x").unwrap();
    let names: Vec<String> = inputs.require("names").unwrap();
    assert_eq!(x, 5);
    assert_eq!(names, vec!["a", "b"]);
  }

  #[test]
  fn test_require_missing() {
    let err = Inputs::new().require::<i64>("x").unwrap_err();
    assert_eq!(err.to_string(), "missing argument 'x'");
  }

  #[test]
  fn test_require_wrong_type() {
    let inputs = Inputs::from_iter([("x".to_string(), json!("five"))]);
    let err = inputs.require::<i64>("x").unwrap_err();
    assert!(err.to_string().contains("argument 'x' has an unexpected type"));
  }

  #[test]
  fn test_insert_replaces() {
    let mut inputs = Inputs::new();
    assert_eq!(inputs.insert("x", json!(1)), None);
    assert_eq!(inputs.insert("x", json!(2)), Some(json!(1)));
    assert_eq!(inputs.get("x"), Some(&json!(2)));
    assert_eq!(inputs.len(), 1);
  }
}
