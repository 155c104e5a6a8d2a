//! Core-owned registry of loaded modules.
//!
//! The harness never leans on a host-global symbol table: every loaded unit
//! is keyed here, and the mangling step is what lets a second load of a
//! same-named module coexist with the cache entry of the first.

use std::collections::{HashMap, HashSet};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::errors::{unspanned, ErrorKind, ErrorReporting, ReportingContext};
use crate::loader::loader::ModuleHandle;
use crate::GraderError;

#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleHandle>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ModuleHandle> {
        self.modules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Register a module under a logical name. A same-named entry is
    /// replaced; mangling is what preserves earlier loads.
    pub fn insert(&mut self, name: impl Into<String>, module: ModuleHandle) {
        self.modules.insert(name.into(), module);
    }

    pub fn remove(&mut self, name: &str) -> Option<ModuleHandle> {
        self.modules.remove(name)
    }

    /// The set of currently registered names.
    pub fn names(&self) -> HashSet<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Rename a registered module with a uniqueness suffix so a subsequent
    /// load of the same logical name does not collide with this entry.
    /// Returns the mangled key.
    pub fn mangle(&mut self, name: &str, suffix: Option<&str>) -> Result<String, GraderError> {
        let module = self.modules.remove(name).ok_or_else(|| {
            ReportingContext::internal("registry").report(
                ErrorKind::ModuleNotFound {
                    module: name.to_string(),
                },
                unspanned(),
            )
        })?;

        let token = match suffix {
            Some(s) => s.to_string(),
            None => rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect(),
        };

        let mangled = format!("__{}_{}__", name, token);
        tracing::debug!(module = name, mangled = %mangled, "mangled module registry entry");
        self.modules.insert(mangled.clone(), module);
        Ok(mangled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::loader::loader::Module;
    use crate::runtime::new_scope;
    use std::rc::Rc;

    fn dummy_module(name: &str) -> ModuleHandle {
        Rc::new(Module {
            name: name.to_string(),
            path: std::path::PathBuf::from(format!("{name}.gr")),
            scope: new_scope(),
            source: SourceContext::fallback(name),
        })
    }

    #[test]
    fn mangle_frees_the_original_name() {
        let mut registry = ModuleRegistry::new();
        let module = dummy_module("fib");
        registry.insert("fib", module.clone());

        let mangled = registry.mangle("fib", Some("token")).expect("entry exists");

        assert_eq!(mangled, "__fib_token__");
        assert!(!registry.contains("fib"));
        let recovered = registry.get(&mangled).expect("mangled entry present");
        assert!(Rc::ptr_eq(&recovered, &module));
    }

    #[test]
    fn mangle_of_unknown_name_is_an_error() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.mangle("ghost", None).is_err());
    }
}
