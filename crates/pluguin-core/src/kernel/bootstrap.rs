use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::kernel::bootstrappers::Bootstrapper;
use crate::kernel::constants;
use crate::kernel::container::{self, Container, Extender, Parameters, Service};
use crate::kernel::deferred::DeferredServices;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::manifest::ProviderRepository;
use crate::kernel::paths::Paths;
use crate::kernel::provider::{ProviderClass, ServiceProvider};
use crate::storage::config::ConfigRepository;
use crate::storage::local::LocalStorageProvider;
use crate::storage::options::OptionStore;
use crate::storage::provider::StorageProvider;

/// Lifecycle callback.
pub type Callback = Rc<dyn Fn(&Kernel) -> Result<()>>;

/// Boot state machine; there is no way back from `Booted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    Unbooted,
    Booting,
    Booted,
}

/// Per-plugin runtime: service registry, providers and lifecycle callbacks.
///
/// Single-threaded by construction: every method takes `&self` and mutates
/// through short-lived `RefCell` borrows, so providers, factories and
/// callbacks can all call back into the kernel.
pub struct Kernel {
    container: Container,
    paths: RefCell<Option<Paths>>,
    state: Cell<KernelState>,
    bootstrapped: Cell<bool>,
    // Registration order
    providers: RefCell<Vec<Rc<dyn ServiceProvider>>>,
    loaded_providers: RefCell<HashSet<String>>,
    booted_providers: RefCell<HashSet<String>>,
    deferred: RefCell<DeferredServices>,
    configured_providers: RefCell<Vec<ProviderClass>>,
    booting_callbacks: RefCell<Vec<Callback>>,
    booted_callbacks: RefCell<Vec<Callback>>,
    terminating_callbacks: RefCell<Vec<Callback>>,
    before_bootstrapping: RefCell<Vec<(String, Callback)>>,
    after_bootstrapping: RefCell<Vec<(String, Callback)>>,
}

impl Kernel {
    /// Create a kernel, optionally rooted at `base_path`.
    pub fn new(base_path: Option<PathBuf>) -> Self {
        let kernel = Kernel {
            container: Container::new(),
            paths: RefCell::new(None),
            state: Cell::new(KernelState::Unbooted),
            bootstrapped: Cell::new(false),
            providers: RefCell::new(Vec::new()),
            loaded_providers: RefCell::new(HashSet::new()),
            booted_providers: RefCell::new(HashSet::new()),
            deferred: RefCell::new(DeferredServices::new()),
            configured_providers: RefCell::new(Vec::new()),
            booting_callbacks: RefCell::new(Vec::new()),
            booted_callbacks: RefCell::new(Vec::new()),
            terminating_callbacks: RefCell::new(Vec::new()),
            before_bootstrapping: RefCell::new(Vec::new()),
            after_bootstrapping: RefCell::new(Vec::new()),
        };
        if let Some(base) = base_path {
            kernel.set_base_path(base);
        }
        kernel
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    // --- Paths ---

    /// Root the kernel at `base` and publish the `path.*` instances.
    pub fn set_base_path(&self, base: impl Into<PathBuf>) {
        let base: PathBuf = base.into();
        let paths = Paths::new(base.to_string_lossy().trim_end_matches(['/', '\\']));
        self.bind_paths(&paths);
        *self.paths.borrow_mut() = Some(paths);
    }

    pub fn paths(&self) -> Option<Paths> {
        self.paths.borrow().clone()
    }

    pub fn base_path(&self) -> Option<PathBuf> {
        self.paths.borrow().as_ref().map(|p| p.base().to_path_buf())
    }

    pub fn use_database_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(paths) = self.paths.borrow_mut().as_mut() {
            paths.set_database(path.clone());
        }
        self.container.instance("path.database", path);
    }

    pub fn use_storage_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(paths) = self.paths.borrow_mut().as_mut() {
            paths.set_storage(path.clone());
        }
        self.container.instance("path.storage", path);
    }

    /// Location of the compiled provider manifest.
    pub fn cached_services_path(&self) -> PathBuf {
        match self.paths.borrow().as_ref() {
            Some(paths) => paths.cached_services(),
            None => PathBuf::from(constants::SERVICES_MANIFEST),
        }
    }

    fn bind_paths(&self, paths: &Paths) {
        for (key, path) in paths.bindings() {
            self.container.instance(key, path);
        }
    }

    // --- Registry facade ---

    pub fn bind<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any,
        F: Fn(&Kernel) -> Result<T> + 'static,
    {
        self.container.bind(key, factory);
    }

    pub fn singleton<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any,
        F: Fn(&Kernel) -> Result<T> + 'static,
    {
        self.container.singleton(key, factory);
    }

    pub fn instance<T: Any>(&self, key: impl Into<String>, value: T) -> Service {
        self.container.instance(key, value)
    }

    pub fn alias(&self, key: impl Into<String>, alias: impl Into<String>) -> Result<()> {
        self.container.alias(key, alias)
    }

    /// Decorate the value bound at `key`; the extender receives the current value.
    pub fn extend<T, F>(&self, key: &str, extender: F) -> Result<()>
    where
        T: Any,
        F: Fn(Rc<T>, &Kernel) -> Result<T> + 'static,
    {
        let owned_key = key.to_string();
        let erased: Extender = Rc::new(move |service: Service, kernel: &Kernel| {
            let typed = container::downcast_service::<T>(&owned_key, service)?;
            extender(typed, kernel).map(|value| Rc::new(value) as Service)
        });
        self.container.extend_service(key, erased, self)
    }

    /// True for direct bindings, instances, aliases and deferred services.
    pub fn bound(&self, key: &str) -> bool {
        self.is_deferred_service(key) || self.container.bound(key)
    }

    /// Resolve `key`, loading its deferred provider first when needed.
    pub fn make(&self, key: &str) -> Result<Service> {
        let key = self.container.get_alias(key);
        self.load_deferred_provider_if_needed(&key)?;
        self.container.make_with(&key, self)
    }

    /// Resolve `key` with parameter overrides the factory can read through
    /// [`parameter`](Kernel::parameter).
    pub fn make_with_parameters(&self, key: &str, parameters: Parameters) -> Result<Service> {
        let key = self.container.get_alias(key);
        self.load_deferred_provider_if_needed(&key)?;
        self.container.make_with_parameters(&key, parameters, self)
    }

    /// Parameter override for the factory currently running, if it has the type `T`.
    pub fn parameter<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        self.container.parameter(name).and_then(|value| value.downcast::<T>().ok())
    }

    /// Resolve `key` and downcast it to `T`.
    pub fn make_as<T: Any>(&self, key: &str) -> Result<Rc<T>> {
        let service = self.make(key)?;
        container::downcast_service::<T>(key, service)
    }

    /// Resolve by type name, building `T::default()` when nothing is bound.
    pub fn resolve<T: Any + Default>(&self) -> Result<Rc<T>> {
        let key = container::type_key::<T>();
        if self.bound(key) {
            return self.make_as::<T>(key);
        }
        log::debug!("Building [{}] implicitly", key);
        Ok(Rc::new(T::default()))
    }

    pub fn resolved(&self, key: &str) -> bool {
        self.container.resolved(key)
    }

    pub fn forget_instance(&self, key: &str) {
        self.container.forget_instance(key);
    }

    /// Drop every binding and instance and all provider bookkeeping.
    pub fn flush(&self) {
        self.container.flush();
        self.providers.borrow_mut().clear();
        self.loaded_providers.borrow_mut().clear();
        self.booted_providers.borrow_mut().clear();
        *self.deferred.borrow_mut() = DeferredServices::new();
        self.booting_callbacks.borrow_mut().clear();
        self.booted_callbacks.borrow_mut().clear();
        self.terminating_callbacks.borrow_mut().clear();
    }

    // --- Shared host services ---

    /// Filesystem shared by the host under `files`.
    pub fn files(&self) -> Result<Rc<dyn StorageProvider>> {
        let files = self.make_as::<Rc<dyn StorageProvider>>("files")?;
        Ok((*files).clone())
    }

    /// Option store shared by the host under `options`.
    pub fn options(&self) -> Result<Rc<dyn OptionStore>> {
        let options = self.make_as::<Rc<dyn OptionStore>>("options")?;
        Ok((*options).clone())
    }

    /// Configuration loaded by [`LoadConfiguration`](crate::kernel::LoadConfiguration).
    pub fn config(&self) -> Result<Rc<ConfigRepository>> {
        self.make_as::<ConfigRepository>("config")
    }

    // --- Providers ---

    /// Register a provider. Without `force`, an already registered provider
    /// with the same name is returned untouched.
    pub fn register(
        &self,
        provider: Rc<dyn ServiceProvider>,
        force: bool,
    ) -> Result<Rc<dyn ServiceProvider>> {
        let name = provider.name().to_string();
        if let Some(registered) = self.get_provider(&name) {
            if !force {
                log::debug!("Provider {} already registered", name);
                return Ok(registered);
            }
            self.providers.borrow_mut().retain(|p| p.name() != name);
            self.booted_providers.borrow_mut().remove(&name);
        }

        provider.register(self)?;

        self.providers.borrow_mut().push(provider.clone());
        self.loaded_providers.borrow_mut().insert(name.clone());
        log::info!("Registered service provider {}", name);

        if self.is_booted() {
            self.boot_provider(&provider)?;
        }
        Ok(provider)
    }

    /// Instantiate and register a provider class, unless it is already loaded.
    pub fn register_class(&self, class: &ProviderClass, force: bool) -> Result<Rc<dyn ServiceProvider>> {
        if !force {
            if let Some(registered) = self.get_provider(class.name()) {
                return Ok(registered);
            }
        }
        self.register(class.instantiate(), force)
    }

    pub fn get_provider(&self, name: &str) -> Option<Rc<dyn ServiceProvider>> {
        self.providers.borrow().iter().find(|p| p.name() == name).cloned()
    }

    pub fn providers(&self) -> Vec<Rc<dyn ServiceProvider>> {
        self.providers.borrow().clone()
    }

    pub fn provider_is_loaded(&self, name: &str) -> bool {
        self.loaded_providers.borrow().contains(name)
    }

    pub fn loaded_providers(&self) -> Vec<String> {
        self.providers.borrow().iter().map(|p| p.name().to_string()).collect()
    }

    /// Providers handed to [`RegisterProviders`](crate::kernel::RegisterProviders).
    pub fn set_configured_providers(&self, providers: Vec<ProviderClass>) {
        *self.configured_providers.borrow_mut() = providers;
    }

    /// Register the configured providers through the cached manifest.
    pub fn register_configured_providers(&self) -> Result<()> {
        let providers = self.configured_providers.borrow().clone();
        let files: Rc<dyn StorageProvider> = if self.container.bound("files") {
            self.files()?
        } else {
            Rc::new(LocalStorageProvider::new(PathBuf::new()))
        };
        let repository = if self.base_path().is_some() {
            ProviderRepository::new(files, self.cached_services_path())
        } else {
            ProviderRepository::uncached(files)
        };
        repository.load(self, &providers)?;
        Ok(())
    }

    // --- Deferred services ---

    pub fn set_deferred_services<I>(&self, services: I)
    where
        I: IntoIterator<Item = (String, ProviderClass)>,
    {
        self.deferred.borrow_mut().set(services);
    }

    pub fn add_deferred_services<I>(&self, services: I)
    where
        I: IntoIterator<Item = (String, ProviderClass)>,
    {
        self.deferred.borrow_mut().add(services);
    }

    pub fn deferred_services(&self) -> DeferredServices {
        self.deferred.borrow().clone()
    }

    pub fn is_deferred_service(&self, service: &str) -> bool {
        self.deferred.borrow().contains(service)
    }

    /// Load every provider still waiting in the deferred map.
    pub fn load_deferred_providers(&self) -> Result<()> {
        let pending = self.deferred.borrow().pending_providers();
        for class in pending {
            self.register_deferred_provider(&class)?;
        }
        Ok(())
    }

    /// Load the provider behind a deferred `service`, if any.
    pub fn load_deferred_provider(&self, service: &str) -> Result<()> {
        let class = self.deferred.borrow().provider_for(service).cloned();
        match class {
            Some(class) => self.register_deferred_provider(&class),
            None => Ok(()),
        }
    }

    fn load_deferred_provider_if_needed(&self, key: &str) -> Result<()> {
        if self.container.has_instance(key) || self.container.has_binding(key) {
            return Ok(());
        }
        self.load_deferred_provider(key)
    }

    fn register_deferred_provider(&self, class: &ProviderClass) -> Result<()> {
        let released = self.deferred.borrow_mut().release(class.name());
        if self.provider_is_loaded(class.name()) {
            return Ok(());
        }
        log::debug!("Loading deferred provider {} for {:?}", class.name(), released);
        // register() boots it straight away when the kernel already booted;
        // otherwise the next boot pass picks it up.
        if let Err(e) = self.register(class.instantiate(), false) {
            if !self.provider_is_loaded(class.name()) {
                // Not registered: keep its services deferred so a later make() retries
                self.deferred
                    .borrow_mut()
                    .add(released.into_iter().map(|service| (service, class.clone())));
            }
            return Err(e);
        }
        Ok(())
    }

    // --- Lifecycle ---

    pub fn state(&self) -> KernelState {
        self.state.get()
    }

    pub fn is_booted(&self) -> bool {
        self.state.get() == KernelState::Booted
    }

    pub fn has_been_bootstrapped(&self) -> bool {
        self.bootstrapped.get()
    }

    /// Boot the kernel: booting callbacks, provider boots, then booted callbacks.
    pub fn boot(&self) -> Result<()> {
        if self.state.get() != KernelState::Unbooted {
            return Ok(());
        }
        log::info!("Booting kernel");
        self.state.set(KernelState::Booting);

        self.fire_callbacks(&self.booting_callbacks)?;

        // Providers registered during the pass are booted too
        let mut index = 0;
        loop {
            let next = self.providers.borrow().get(index).cloned();
            let Some(provider) = next else { break };
            self.boot_provider(&provider)?;
            index += 1;
        }

        self.state.set(KernelState::Booted);
        self.fire_callbacks(&self.booted_callbacks)?;
        log::info!("Kernel booted with {} providers", index);
        Ok(())
    }

    fn boot_provider(&self, provider: &Rc<dyn ServiceProvider>) -> Result<()> {
        let name = provider.name().to_string();
        if !self.booted_providers.borrow_mut().insert(name.clone()) {
            return Ok(());
        }
        log::debug!("Booting provider {}", name);
        provider.boot(self).map_err(|e| Error::KernelLifecycleError {
            phase: KernelLifecyclePhase::Boot,
            message: format!("provider {} failed to boot", name),
            component_name: Some(name),
            source: Some(Box::new(e)),
        })
    }

    pub fn booting<F>(&self, callback: F)
    where
        F: Fn(&Kernel) -> Result<()> + 'static,
    {
        self.booting_callbacks.borrow_mut().push(Rc::new(callback));
    }

    /// Queue a booted callback; fires immediately if the kernel already booted.
    pub fn booted<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&Kernel) -> Result<()> + 'static,
    {
        if self.is_booted() {
            return callback(self);
        }
        self.booted_callbacks.borrow_mut().push(Rc::new(callback));
        Ok(())
    }

    pub fn terminating<F>(&self, callback: F)
    where
        F: Fn(&Kernel) -> Result<()> + 'static,
    {
        self.terminating_callbacks.borrow_mut().push(Rc::new(callback));
    }

    /// Run the terminating callbacks in insertion order; the first failure aborts.
    pub fn terminate(&self) -> Result<()> {
        log::info!("Terminating kernel");
        self.fire_callbacks(&self.terminating_callbacks)
    }

    fn fire_callbacks(&self, callbacks: &RefCell<Vec<Callback>>) -> Result<()> {
        // Index loop: callbacks may queue further callbacks
        let mut index = 0;
        loop {
            let next = callbacks.borrow().get(index).cloned();
            let Some(callback) = next else { break };
            callback(self)?;
            index += 1;
        }
        Ok(())
    }

    // --- Bootstrapping ---

    pub fn before_bootstrapping<F>(&self, bootstrapper: &str, callback: F)
    where
        F: Fn(&Kernel) -> Result<()> + 'static,
    {
        self.before_bootstrapping
            .borrow_mut()
            .push((bootstrapper.to_string(), Rc::new(callback)));
    }

    pub fn after_bootstrapping<F>(&self, bootstrapper: &str, callback: F)
    where
        F: Fn(&Kernel) -> Result<()> + 'static,
    {
        self.after_bootstrapping
            .borrow_mut()
            .push((bootstrapper.to_string(), Rc::new(callback)));
    }

    /// Run `bootstrappers` in order, surrounded by their before/after callbacks.
    pub fn bootstrap_with(&self, bootstrappers: &[Box<dyn Bootstrapper>]) -> Result<()> {
        self.bootstrapped.set(true);
        for bootstrapper in bootstrappers {
            let name = bootstrapper.name();
            self.fire_bootstrapping(&self.before_bootstrapping, name)?;
            bootstrapper.bootstrap(self).map_err(|e| Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Bootstrap,
                component_name: Some(name.to_string()),
                message: format!("bootstrapper {} failed", name),
                source: Some(Box::new(e)),
            })?;
            self.fire_bootstrapping(&self.after_bootstrapping, name)?;
        }
        Ok(())
    }

    fn fire_bootstrapping(&self, callbacks: &RefCell<Vec<(String, Callback)>>, name: &str) -> Result<()> {
        let matching: Vec<Callback> = callbacks
            .borrow()
            .iter()
            .filter(|(target, _)| target == name)
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in matching {
            callback(self)?;
        }
        Ok(())
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("state", &self.state.get())
            .field("paths", &self.paths.borrow())
            .field("providers", &self.loaded_providers())
            .field("deferred", &self.deferred.borrow().services())
            .field("container", &self.container)
            .finish()
    }
}
