//! Scope-chain resolution of grading configuration.
//!
//! A grading case resolves its reference, candidate, operation name, and
//! weight by probing a small fixed chain of sources in priority order:
//! local override, then the per-run instance, then the owning container,
//! then an outer composite case. Resolution stops at the first source that
//! has the key at all - a configured zero, empty string, or false is
//! intentionally distinct from "unset" and masks values further out.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::errors::{unspanned, ErrorKind, ErrorReporting, ReportingContext};
use crate::loader::ModuleHandle;
use crate::GraderError;

/// The named attributes a grading case can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Reference,
    Candidate,
    Operation,
    Weight,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Reference => "reference",
            ConfigKey::Candidate => "candidate",
            ConfigKey::Operation => "operation",
            ConfigKey::Weight => "weight",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved configuration value.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    Module(ModuleHandle),
    Text(String),
    Number(f64),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Module(_) => "Module",
            ConfigValue::Text(_) => "Text",
            ConfigValue::Number(_) => "Number",
        }
    }

    pub fn as_module(&self) -> Result<ModuleHandle, GraderError> {
        match self {
            ConfigValue::Module(m) => Ok(m.clone()),
            other => Err(config_context().type_mismatch(
                "Module",
                other.type_name(),
                unspanned(),
            )),
        }
    }

    pub fn as_text(&self) -> Result<&str, GraderError> {
        match self {
            ConfigValue::Text(s) => Ok(s),
            other => Err(config_context().type_mismatch("Text", other.type_name(), unspanned())),
        }
    }

    pub fn as_number(&self) -> Result<f64, GraderError> {
        match self {
            ConfigValue::Number(n) => Ok(*n),
            other => Err(config_context().type_mismatch(
                "Number",
                other.type_name(),
                unspanned(),
            )),
        }
    }
}

/// One layer of the configuration scope chain.
pub trait ConfigSource {
    fn try_get(&self, key: ConfigKey) -> Option<ConfigValue>;
    fn describe(&self) -> String;
}

/// A named bag of configuration values; used for container declarations and
/// per-run instance overrides alike.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayer {
    name: String,
    values: HashMap<ConfigKey, ConfigValue>,
}

impl ConfigLayer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> &mut Self {
        self.values.insert(key, value);
        self
    }

    pub fn with(mut self, key: ConfigKey, value: ConfigValue) -> Self {
        self.values.insert(key, value);
        self
    }
}

impl ConfigSource for ConfigLayer {
    fn try_get(&self, key: ConfigKey) -> Option<ConfigValue> {
        self.values.get(&key).cloned()
    }

    fn describe(&self) -> String {
        if self.name.is_empty() {
            "unnamed layer".to_string()
        } else {
            self.name.clone()
        }
    }
}

/// The per-case configuration chain.
///
/// Container binding happens once, when the case is installed into a
/// grading container. Instance binding happens on every resolution call,
/// because one case declaration may be queried against different per-run
/// instances across repeated runs.
#[derive(Debug)]
pub struct CaseConfig {
    local: ConfigLayer,
    container: OnceCell<Rc<ConfigLayer>>,
    outer: Option<Rc<CaseConfig>>,
}

impl CaseConfig {
    pub fn new() -> Self {
        Self {
            local: ConfigLayer::named("local override"),
            container: OnceCell::new(),
            outer: None,
        }
    }

    /// A case composed inside another case; the outer case's chain is the
    /// last resolution source.
    pub fn wrapping(outer: Rc<CaseConfig>) -> Self {
        Self {
            outer: Some(outer),
            ..Self::new()
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> &mut Self {
        self.local.set(key, value);
        self
    }

    pub fn with(mut self, key: ConfigKey, value: ConfigValue) -> Self {
        self.local.set(key, value);
        self
    }

    /// Bind the owning container. This happens exactly once, at install
    /// time; a second binding is a declaration error.
    pub fn bind_container(&self, container: Rc<ConfigLayer>) -> Result<(), GraderError> {
        self.container.set(container).map_err(|_| {
            config_context().report(
                ErrorKind::DuplicateDeclaration {
                    role: "owning container".to_string(),
                },
                unspanned(),
            )
        })
    }

    pub fn container(&self) -> Option<&Rc<ConfigLayer>> {
        self.container.get()
    }

    /// Probe the chain without failing; `None` means no source has the key.
    pub fn try_resolve(
        &self,
        key: ConfigKey,
        instance: Option<&ConfigLayer>,
    ) -> Option<ConfigValue> {
        if let Some(value) = self.local.try_get(key) {
            return Some(value);
        }
        if let Some(value) = instance.and_then(|layer| layer.try_get(key)) {
            return Some(value);
        }
        if let Some(value) = self.container.get().and_then(|c| c.try_get(key)) {
            return Some(value);
        }
        self.outer
            .as_ref()
            .and_then(|outer| outer.try_resolve(key, None))
    }

    /// Resolve a key or fail with a diagnostic naming every source that was
    /// consulted.
    pub fn resolve(
        &self,
        key: ConfigKey,
        instance: Option<&ConfigLayer>,
    ) -> Result<ConfigValue, GraderError> {
        self.try_resolve(key, instance).ok_or_else(|| {
            config_context().report(
                ErrorKind::ConfigurationMissing {
                    attribute: key.as_str().to_string(),
                    consulted: self.consulted(instance),
                },
                unspanned(),
            )
        })
    }

    fn consulted(&self, instance: Option<&ConfigLayer>) -> String {
        let mut sources = vec![self.local.describe()];
        match instance {
            Some(layer) => sources.push(format!("instance {}", layer.describe())),
            None => sources.push("no bound instance".to_string()),
        }
        match self.container.get() {
            Some(container) => sources.push(format!("container {}", container.describe())),
            None => sources.push("no owning container".to_string()),
        }
        if self.outer.is_some() {
            sources.push("outer case".to_string());
        }
        sources.join(", ")
    }
}

fn config_context() -> ReportingContext {
    ReportingContext::internal("config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closer_scope_masks_farther_scope() {
        let container = Rc::new(
            ConfigLayer::named("container").with(ConfigKey::Operation, ConfigValue::Text("outer_op".into())),
        );
        let config = CaseConfig::new().with(ConfigKey::Operation, ConfigValue::Text("local_op".into()));
        config.bind_container(container).expect("first binding");

        let resolved = config.resolve(ConfigKey::Operation, None).expect("resolves");
        assert_eq!(resolved.as_text().expect("text"), "local_op");
    }

    #[test]
    fn falsy_configured_value_still_wins() {
        let container = Rc::new(
            ConfigLayer::named("container").with(ConfigKey::Weight, ConfigValue::Number(0.7)),
        );
        let config = CaseConfig::new().with(ConfigKey::Weight, ConfigValue::Number(0.0));
        config.bind_container(container).expect("first binding");

        let resolved = config.resolve(ConfigKey::Weight, None).expect("resolves");
        assert_eq!(resolved.as_number().expect("number"), 0.0);
    }
}
