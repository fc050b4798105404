use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::{ContainerError, Result};

/// A resolved service value.
pub type Service = Rc<dyn Any>;

/// Builds a service; receives the kernel so it can resolve its own dependencies.
pub type Factory = Rc<dyn Fn(&Kernel) -> Result<Service>>;

/// Decorates a freshly resolved service.
pub type Extender = Rc<dyn Fn(Service, &Kernel) -> Result<Service>>;

/// Key used by the typed helpers.
pub fn type_key<T: ?Sized>() -> &'static str {
    type_name::<T>()
}

/// Named values handed to a single resolution, read by the factory through
/// [`Kernel::parameter`].
#[derive(Clone, Default)]
pub struct Parameters {
    values: HashMap<String, Service>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any>(mut self, name: impl Into<String>, value: T) -> Self {
        self.values.insert(name.into(), Rc::new(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<Service> {
        self.values.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_tuple("Parameters").field(&names).finish()
    }
}

#[derive(Clone)]
pub struct Binding {
    factory: Factory,
    shared: bool,
}

impl Binding {
    pub fn is_shared(&self) -> bool {
        self.shared
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("shared", &self.shared).finish()
    }
}

/// Service registry: bindings, shared instances, aliases and extenders.
///
/// All state sits behind `RefCell`s so factories can call back into the
/// kernel while a resolution is in flight. No borrow is held across a
/// factory or extender call.
#[derive(Default)]
pub struct Container {
    bindings: RefCell<HashMap<String, Binding>>,
    instances: RefCell<HashMap<String, Service>>,
    aliases: RefCell<HashMap<String, String>>,
    extenders: RefCell<HashMap<String, Vec<Extender>>>,
    resolved: RefCell<HashMap<String, usize>>,
    // Keys currently being built, outermost first
    building: RefCell<Vec<String>>,
    // One entry per build in flight, parallel to `building`
    parameters: RefCell<Vec<Parameters>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a non-shared binding. Replaces any previous binding for `key`.
    pub fn bind<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any,
        F: Fn(&Kernel) -> Result<T> + 'static,
    {
        self.bind_service(key, Self::wrap(factory), false);
    }

    /// Register a shared binding, built once and cached.
    pub fn singleton<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any,
        F: Fn(&Kernel) -> Result<T> + 'static,
    {
        self.bind_service(key, Self::wrap(factory), true);
    }

    /// Register an already type-erased factory.
    pub fn bind_service(&self, key: impl Into<String>, factory: Factory, shared: bool) {
        let key = key.into();
        // Future lookups must follow the new binding
        self.instances.borrow_mut().remove(&key);
        self.aliases.borrow_mut().remove(&key);
        log::debug!("Binding [{}] (shared: {})", key, shared);
        self.bindings.borrow_mut().insert(key, Binding { factory, shared });
    }

    /// Register a pre-built value as a shared instance.
    pub fn instance<T: Any>(&self, key: impl Into<String>, value: T) -> Service {
        self.instance_service(key, Rc::new(value))
    }

    /// Register a pre-built, already type-erased value as a shared instance.
    pub fn instance_service(&self, key: impl Into<String>, service: Service) -> Service {
        let key = key.into();
        self.aliases.borrow_mut().remove(&key);
        self.instances.borrow_mut().insert(key, service.clone());
        service
    }

    /// Alias `alias` to `key`.
    pub fn alias(&self, key: impl Into<String>, alias: impl Into<String>) -> Result<()> {
        let key = key.into();
        let alias = alias.into();
        if key == alias {
            return Err(ContainerError::AliasToItself { key }.into());
        }
        self.aliases.borrow_mut().insert(alias, key);
        Ok(())
    }

    /// Follow aliases until a key that is not itself an alias.
    pub fn get_alias(&self, key: &str) -> String {
        let aliases = self.aliases.borrow();
        let mut current = key;
        // An alias chain can never be longer than the alias table
        for _ in 0..=aliases.len() {
            match aliases.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        current.to_string()
    }

    pub fn is_alias(&self, key: &str) -> bool {
        self.aliases.borrow().contains_key(key)
    }

    /// Decorate the service bound at `key`. An already resolved shared
    /// instance is decorated immediately.
    pub fn extend_service(&self, key: &str, extender: Extender, kernel: &Kernel) -> Result<()> {
        let key = self.get_alias(key);
        let existing = self.instances.borrow().get(&key).cloned();
        if let Some(instance) = existing {
            let extended = extender(instance, kernel)?;
            self.instances.borrow_mut().insert(key, extended);
            return Ok(());
        }
        self.extenders.borrow_mut().entry(key).or_default().push(extender);
        Ok(())
    }

    pub fn has_binding(&self, key: &str) -> bool {
        self.bindings.borrow().contains_key(key)
    }

    pub fn has_instance(&self, key: &str) -> bool {
        self.instances.borrow().contains_key(key)
    }

    /// Direct binding, instance or alias. Deferred services are the kernel's concern.
    pub fn bound(&self, key: &str) -> bool {
        self.has_binding(key) || self.has_instance(key) || self.is_alias(key)
    }

    pub fn is_shared(&self, key: &str) -> bool {
        self.has_instance(key)
            || self.bindings.borrow().get(key).map(Binding::is_shared).unwrap_or(false)
    }

    /// Whether `key` has been built at least once.
    pub fn resolved(&self, key: &str) -> bool {
        let key = self.get_alias(key);
        self.resolved.borrow().contains_key(&key) || self.has_instance(&key)
    }

    /// How many times the factory behind `key` ran.
    pub fn build_count(&self, key: &str) -> usize {
        self.resolved.borrow().get(&self.get_alias(key)).copied().unwrap_or(0)
    }

    /// Drop a cached shared instance; the binding stays.
    pub fn forget_instance(&self, key: &str) {
        self.instances.borrow_mut().remove(key);
    }

    /// Clear every binding, instance, alias and extender.
    pub fn flush(&self) {
        self.bindings.borrow_mut().clear();
        self.instances.borrow_mut().clear();
        self.aliases.borrow_mut().clear();
        self.extenders.borrow_mut().clear();
        self.resolved.borrow_mut().clear();
    }

    /// Resolve `key`, calling its factory with `kernel` when needed.
    pub fn make_with(&self, key: &str, kernel: &Kernel) -> Result<Service> {
        let key = self.get_alias(key);

        let cached = self.instances.borrow().get(&key).cloned();
        if let Some(instance) = cached {
            return Ok(instance);
        }

        self.build(&key, kernel, Parameters::new())
    }

    /// Build `key` with parameter overrides. A non-empty parameter set always
    /// runs the factory and the result is never cached.
    pub fn make_with_parameters(&self, key: &str, parameters: Parameters, kernel: &Kernel) -> Result<Service> {
        if parameters.is_empty() {
            return self.make_with(key, kernel);
        }
        let key = self.get_alias(key);
        self.build(&key, kernel, parameters)
    }

    /// Parameter override visible to the factory currently running.
    pub fn parameter(&self, name: &str) -> Option<Service> {
        self.parameters.borrow().last().and_then(|parameters| parameters.get(name))
    }

    fn build(&self, key: &str, kernel: &Kernel, parameters: Parameters) -> Result<Service> {
        let key = key.to_string();
        let cacheable = parameters.is_empty();

        let binding = self.bindings.borrow().get(&key).cloned().ok_or_else(|| {
            ContainerError::UnresolvableBinding { key: key.clone() }
        })?;

        if self.building.borrow().contains(&key) {
            let mut chain = self.building.borrow().clone();
            chain.push(key.clone());
            return Err(ContainerError::CircularDependency { key, chain }.into());
        }

        self.building.borrow_mut().push(key.clone());
        self.parameters.borrow_mut().push(parameters);
        let built = (binding.factory)(kernel);
        self.parameters.borrow_mut().pop();
        self.building.borrow_mut().pop();
        let mut object = built?;

        let extenders = self.extenders.borrow().get(&key).cloned().unwrap_or_default();
        for extender in extenders {
            object = extender(object, kernel)?;
        }

        *self.resolved.borrow_mut().entry(key.clone()).or_insert(0) += 1;
        if binding.shared && cacheable {
            self.instances.borrow_mut().insert(key.clone(), object.clone());
        }
        log::debug!("Resolved [{}]", key);
        Ok(object)
    }

    fn wrap<T, F>(factory: F) -> Factory
    where
        T: Any,
        F: Fn(&Kernel) -> Result<T> + 'static,
    {
        Rc::new(move |kernel| factory(kernel).map(|value| Rc::new(value) as Service))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bindings: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        bindings.sort();
        let mut instances: Vec<String> = self.instances.borrow().keys().cloned().collect();
        instances.sort();
        f.debug_struct("Container")
            .field("bindings", &bindings)
            .field("instances", &instances)
            .field("aliases", &self.aliases.borrow())
            .finish()
    }
}

/// Downcast a resolved service, reporting the key on mismatch.
pub fn downcast_service<T: Any>(key: &str, service: Service) -> Result<Rc<T>> {
    service.downcast::<T>().map_err(|_| {
        ContainerError::ServiceTypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        }
        .into()
    })
}
