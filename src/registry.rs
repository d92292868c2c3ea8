use std::{
    collections::HashMap,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use crate::{Error, Result, RuleSet};

type Loader = Box<dyn Fn() -> Result<RuleSet> + Send + Sync>;

/// Rule set that is compiled on first use.
struct LazyRuleSet {
    loader: Loader,
    rule_set: OnceLock<Result<Arc<RuleSet>>>,
}

impl LazyRuleSet {
    fn get(&self, service: &str) -> Result<Arc<RuleSet>> {
        self.rule_set
            .get_or_init(|| {
                let result = (self.loader)().map(Arc::new);
                match &result {
                    Ok(_) => log::debug!(target: "endpoint_rules",
                                         service;
                                         "compiled endpoint rule set"),
                    Err(err) => log::warn!(target: "endpoint_rules",
                                           service;
                                           "failed to compile endpoint rule set: {err}"),
                }
                result
            })
            .clone()
    }
}

/// `ProviderRegistry` maps service names to endpoint rule sets.
///
/// Services register a loader; the rule set is compiled the first time it is requested and
/// shared afterwards. A failed compilation is cached too, so a broken rule set is not re-parsed on
/// every request.
#[derive(Default)]
pub struct ProviderRegistry {
    services: RwLock<HashMap<String, Arc<LazyRuleSet>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static ProviderRegistry {
        static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ProviderRegistry::new)
    }

    /// Register `loader` for `service`, replacing a previous registration.
    pub fn register(
        &self,
        service: impl Into<String>,
        loader: impl Fn() -> Result<RuleSet> + Send + Sync + 'static,
    ) {
        // Constructing new value before requesting the lock to minimize lock span.
        let entry = Arc::new(LazyRuleSet {
            loader: Box::new(loader),
            rule_set: OnceLock::new(),
        });

        // Map is never left half-updated, so a poisoned lock is still usable.
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services.insert(service.into(), entry);
    }

    /// Register a rule set JSON document for `service`. The document is parsed on first use.
    pub fn register_json(&self, service: impl Into<String>, json: &'static str) {
        self.register(service, move || RuleSet::from_json(json));
    }

    /// Return rule set for `service`, compiling it if needed.
    ///
    /// Fails with [`Error::CapabilityNotAvailable`] if nothing is registered for `service`.
    pub fn rule_set(&self, service: &str) -> Result<Arc<RuleSet>> {
        let entry = {
            let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
            services.get(service).cloned()
        };

        match entry {
            Some(entry) => entry.get(service),
            None => {
                log::debug!(target: "endpoint_rules",
                            service;
                            "no endpoint rule set registered");
                Err(Error::CapabilityNotAvailable(service.to_owned()))
            }
        }
    }

    /// Return `true` if a loader is registered for `service`.
    pub fn contains(&self, service: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(service)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::ProviderRegistry;
    use crate::{Environment, Error, RuleSet};

    const RULE_SET: &str = r#"{
        "version": "1.0",
        "rules": [{"type": "endpoint", "conditions": [], "endpoint": {"url": "https://example.com"}}]
    }"#;

    #[test]
    fn compiles_once() {
        let registry = ProviderRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            registry.register("example", move || {
                calls.fetch_add(1, Ordering::SeqCst);
                RuleSet::from_json(RULE_SET)
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = registry.rule_set("example").unwrap();
        let second = registry.rule_set("example").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(
            first.resolve(&Environment::new()).unwrap().url(),
            "https://example.com"
        );
    }

    #[test]
    fn missing_service() {
        let registry = ProviderRegistry::new();
        assert!(!registry.contains("s3"));
        assert!(matches!(
            registry.rule_set("s3"),
            Err(Error::CapabilityNotAvailable(service)) if service == "s3"
        ));
    }

    #[test]
    fn broken_rule_set() {
        let registry = ProviderRegistry::new();
        registry.register_json("broken", r#"{"version": "1.0", "rules": [{"type": "nope"}]}"#);
        assert!(registry.contains("broken"));
        assert!(matches!(registry.rule_set("broken"), Err(Error::Json(_))));
    }

    #[test]
    fn can_resolve_from_other_threads() {
        let registry = Arc::new(ProviderRegistry::new());
        registry.register_json("example", RULE_SET);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.rule_set("example").unwrap())
            })
            .collect();
        let rule_sets: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        for rule_set in &rule_sets[1..] {
            assert!(Arc::ptr_eq(&rule_sets[0], rule_set));
        }
    }

    #[test]
    fn global_registry() {
        ProviderRegistry::global().register_json("global-test", RULE_SET);
        assert!(ProviderRegistry::global().rule_set("global-test").is_ok());
    }
}
