use std::any::type_name;
use std::fmt;
use std::rc::Rc;

use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::Result;

/// A unit of related bindings.
///
/// The kernel calls [`register`](ServiceProvider::register) exactly once per
/// provider and [`boot`](ServiceProvider::boot) exactly once after the kernel
/// itself has booted. Providers do not need to guard against repeated calls.
pub trait ServiceProvider {
    /// Identity of the provider. Defaults to the concrete type name, which is
    /// also what [`ProviderClass::of`] uses.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Install bindings into the kernel.
    fn register(&self, kernel: &Kernel) -> Result<()>;

    /// Post-wiring setup; runs once the kernel is booted.
    fn boot(&self, _kernel: &Kernel) -> Result<()> {
        Ok(())
    }

    /// Deferred providers are only instantiated when one of the services in
    /// [`provides`](ServiceProvider::provides) is requested.
    fn is_deferred(&self) -> bool {
        false
    }

    /// Services offered by a deferred provider.
    fn provides(&self) -> Vec<String> {
        Vec::new()
    }
}

type Constructor = Rc<dyn Fn() -> Rc<dyn ServiceProvider>>;

/// A named constructor for a provider, so it can be created on demand.
///
/// The name must match the [`ServiceProvider::name`] of the instances it
/// builds; the kernel uses it to tell whether the provider is loaded.
#[derive(Clone)]
pub struct ProviderClass {
    name: String,
    constructor: Constructor,
}

impl ProviderClass {
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Rc<dyn ServiceProvider> + 'static,
    {
        Self {
            name: name.into(),
            constructor: Rc::new(constructor),
        }
    }

    /// Class for a provider type built through `Default`.
    pub fn of<P>() -> Self
    where
        P: ServiceProvider + Default + 'static,
    {
        Self::new(type_name::<P>(), || Rc::new(P::default()) as Rc<dyn ServiceProvider>)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> Rc<dyn ServiceProvider> {
        (self.constructor)()
    }
}

impl PartialEq for ProviderClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ProviderClass {}

impl fmt::Debug for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderClass").field(&self.name).finish()
    }
}
