use std::cell::Cell;
use std::rc::Rc;

use crate::kernel::bootstrap::Kernel;
use crate::kernel::error::Result;
use crate::kernel::provider::{ProviderClass, ServiceProvider};

#[derive(Debug, Default)]
struct RegisterOnlyProvider;

impl ServiceProvider for RegisterOnlyProvider {
    fn register(&self, kernel: &Kernel) -> Result<()> {
        kernel.singleton("foo", |_: &Kernel| Ok(String::from("foo")));
        Ok(())
    }
}

/// Counts its own register and boot calls.
#[derive(Debug, Default)]
struct CountingProvider {
    registered: Rc<Cell<u32>>,
    booted: Rc<Cell<u32>>,
}

impl ServiceProvider for CountingProvider {
    fn register(&self, kernel: &Kernel) -> Result<()> {
        self.registered.set(self.registered.get() + 1);
        let count = self.registered.get();
        kernel.instance("counting.registered", count);
        Ok(())
    }

    fn boot(&self, _kernel: &Kernel) -> Result<()> {
        self.booted.set(self.booted.get() + 1);
        Ok(())
    }
}

#[test]
fn test_register_only_provider_installs_bindings() -> Result<()> {
    let kernel = Kernel::default();

    kernel.register(Rc::new(RegisterOnlyProvider), false)?;

    assert_eq!(*kernel.make_as::<String>("foo")?, "foo");
    assert!(kernel.provider_is_loaded(crate::kernel::container::type_key::<RegisterOnlyProvider>()));
    Ok(())
}

#[test]
fn test_register_without_force_is_idempotent() -> Result<()> {
    let kernel = Kernel::default();
    let registered = Rc::new(Cell::new(0));
    let first = Rc::new(CountingProvider {
        registered: registered.clone(),
        booted: Rc::new(Cell::new(0)),
    });

    let returned = kernel.register(first.clone(), false)?;
    let again = kernel.register(
        Rc::new(CountingProvider {
            registered: registered.clone(),
            booted: Rc::new(Cell::new(0)),
        }),
        false,
    )?;

    assert_eq!(registered.get(), 1, "second registration must not run register()");
    assert!(Rc::ptr_eq(&returned, &again), "existing provider is returned");
    assert_eq!(kernel.providers().len(), 1);
    Ok(())
}

#[test]
fn test_register_with_force_replaces_provider() -> Result<()> {
    let kernel = Kernel::default();
    let registered = Rc::new(Cell::new(0));
    let make = || {
        Rc::new(CountingProvider {
            registered: registered.clone(),
            booted: Rc::new(Cell::new(0)),
        })
    };

    kernel.register(make(), false)?;
    kernel.register(make(), true)?;

    assert_eq!(registered.get(), 2);
    assert_eq!(kernel.providers().len(), 1);
    assert_eq!(*kernel.make_as::<u32>("counting.registered")?, 2);
    Ok(())
}

#[test]
fn test_register_after_boot_boots_immediately() -> Result<()> {
    let kernel = Kernel::default();
    kernel.boot()?;
    let booted = Rc::new(Cell::new(0));

    kernel.register(
        Rc::new(CountingProvider {
            registered: Rc::new(Cell::new(0)),
            booted: booted.clone(),
        }),
        false,
    )?;

    assert_eq!(booted.get(), 1);
    Ok(())
}

#[test]
fn test_provider_is_booted_once() -> Result<()> {
    let kernel = Kernel::default();
    let booted = Rc::new(Cell::new(0));
    kernel.register(
        Rc::new(CountingProvider {
            registered: Rc::new(Cell::new(0)),
            booted: booted.clone(),
        }),
        false,
    )?;

    kernel.boot()?;
    kernel.boot()?;

    assert_eq!(booted.get(), 1);
    Ok(())
}

#[test]
fn test_register_class_uses_type_name() -> Result<()> {
    let kernel = Kernel::default();
    let class = ProviderClass::of::<RegisterOnlyProvider>();

    let provider = kernel.register_class(&class, false)?;

    assert_eq!(provider.name(), class.name());
    assert!(kernel.get_provider(class.name()).is_some());
    assert_eq!(kernel.loaded_providers(), vec![class.name().to_string()]);
    Ok(())
}

#[test]
fn test_provider_classes_compare_by_name() {
    let first = ProviderClass::of::<RegisterOnlyProvider>();
    let second = ProviderClass::new(first.name().to_string(), || {
        Rc::new(RegisterOnlyProvider) as Rc<dyn ServiceProvider>
    });
    let other = ProviderClass::of::<CountingProvider>();

    assert_eq!(first, second);
    assert_ne!(first, other);
}
