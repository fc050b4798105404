use std::collections::BTreeMap;

use crate::kernel::provider::ProviderClass;

/// Service name -> provider able to satisfy it.
///
/// An entry lives until its provider is loaded; loading a provider releases
/// every entry that names it.
#[derive(Debug, Clone, Default)]
pub struct DeferredServices {
    services: BTreeMap<String, ProviderClass>,
}

impl DeferredServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole map.
    pub fn set<I>(&mut self, services: I)
    where
        I: IntoIterator<Item = (String, ProviderClass)>,
    {
        self.services = services.into_iter().collect();
    }

    /// Merge entries in; later entries win.
    pub fn add<I>(&mut self, services: I)
    where
        I: IntoIterator<Item = (String, ProviderClass)>,
    {
        self.services.extend(services);
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn provider_for(&self, service: &str) -> Option<&ProviderClass> {
        self.services.get(service)
    }

    pub fn remove(&mut self, service: &str) -> Option<ProviderClass> {
        self.services.remove(service)
    }

    /// Remove every entry mapped to `provider` and return the released service names.
    pub fn release(&mut self, provider: &str) -> Vec<String> {
        // Collect first, then mutate
        let released: Vec<String> = self
            .services
            .iter()
            .filter(|(_, class)| class.name() == provider)
            .map(|(service, _)| service.clone())
            .collect();
        for service in &released {
            self.services.remove(service);
        }
        released
    }

    /// Distinct providers still waiting to be loaded, in service-name order.
    pub fn pending_providers(&self) -> Vec<ProviderClass> {
        let mut providers: Vec<ProviderClass> = Vec::new();
        for class in self.services.values() {
            if !providers.contains(class) {
                providers.push(class.clone());
            }
        }
        providers
    }

    pub fn services(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }
}
