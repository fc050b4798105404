use std::cell::Cell;
use std::rc::Rc;

use crate::kernel::bootstrap::Kernel;
use crate::kernel::container::Parameters;
use crate::kernel::error::{ContainerError, Error};

#[derive(Debug, Default, PartialEq)]
struct Concrete {
    label: String,
}

#[test]
fn test_make_unbound_key_is_unresolvable() {
    let kernel = Kernel::default();

    let result = kernel.make("missing");

    assert!(matches!(
        result,
        Err(Error::Container(ContainerError::UnresolvableBinding { ref key })) if key == "missing"
    ));
    assert!(!kernel.bound("missing"));
}

#[test]
fn test_singleton_returns_identical_instance() {
    let kernel = Kernel::default();
    kernel.singleton("shared", |_: &Kernel| Ok(Concrete { label: "one".into() }));

    assert!(!kernel.resolved("shared"));
    let first = kernel.make_as::<Concrete>("shared").unwrap();
    assert!(kernel.resolved("shared"));
    let second = kernel.make_as::<Concrete>("shared").unwrap();

    assert!(Rc::ptr_eq(&first, &second), "shared binding must resolve to one instance");
    assert_eq!(kernel.container().build_count("shared"), 1);
}

#[test]
fn test_bind_returns_distinct_instances() {
    let kernel = Kernel::default();
    kernel.bind("fresh", |_: &Kernel| Ok(Concrete { label: "new".into() }));

    let first = kernel.make_as::<Concrete>("fresh").unwrap();
    let second = kernel.make_as::<Concrete>("fresh").unwrap();

    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
    assert_eq!(kernel.container().build_count("fresh"), 2);
}

#[test]
fn test_instance_is_immediately_resolvable() {
    let kernel = Kernel::default();
    let stored = kernel.instance("answer", 42u32);

    let resolved = kernel.make("answer").unwrap();

    assert!(Rc::ptr_eq(&stored, &resolved));
    assert_eq!(*kernel.make_as::<u32>("answer").unwrap(), 42);
    assert!(kernel.container().is_shared("answer"));
}

#[test]
fn test_make_as_reports_type_mismatch() {
    let kernel = Kernel::default();
    kernel.instance("number", 7i64);

    let result = kernel.make_as::<String>("number");

    assert!(matches!(
        result,
        Err(Error::Container(ContainerError::ServiceTypeMismatch { ref key, .. })) if key == "number"
    ));
}

#[test]
fn test_rebinding_replaces_future_resolution() {
    let kernel = Kernel::default();
    kernel.singleton("greeting", |_: &Kernel| Ok(String::from("hello")));
    let before = kernel.make_as::<String>("greeting").unwrap();

    kernel.singleton("greeting", |_: &Kernel| Ok(String::from("bonjour")));
    let after = kernel.make_as::<String>("greeting").unwrap();

    // Values already handed out stay valid
    assert_eq!(*before, "hello");
    assert_eq!(*after, "bonjour");
}

#[test]
fn test_forget_instance_rebuilds_shared_binding() {
    let kernel = Kernel::default();
    kernel.singleton("shared", |_: &Kernel| Ok(Concrete::default()));
    let first = kernel.make_as::<Concrete>("shared").unwrap();

    kernel.forget_instance("shared");
    let second = kernel.make_as::<Concrete>("shared").unwrap();

    assert!(!Rc::ptr_eq(&first, &second));
    assert!(kernel.bound("shared"));
}

#[test]
fn test_factories_resolve_dependencies_through_kernel() {
    let kernel = Kernel::default();
    kernel.instance("prefix", String::from("db_"));
    kernel.bind("table", |k: &Kernel| {
        let prefix = k.make_as::<String>("prefix")?;
        Ok(format!("{}losers", prefix))
    });

    assert_eq!(*kernel.make_as::<String>("table").unwrap(), "db_losers");
}

#[test]
fn test_alias_resolves_target() {
    let kernel = Kernel::default();
    kernel.singleton("db.connection", |_: &Kernel| Ok(String::from("conn")));
    kernel.alias("db.connection", "connection").unwrap();

    let via_alias = kernel.make("connection").unwrap();
    let direct = kernel.make("db.connection").unwrap();

    assert!(kernel.bound("connection"));
    assert!(Rc::ptr_eq(&via_alias, &direct));
}

#[test]
fn test_alias_to_itself_is_rejected() {
    let kernel = Kernel::default();
    let result = kernel.alias("same", "same");
    assert!(matches!(result, Err(Error::Container(ContainerError::AliasToItself { .. }))));
}

#[test]
fn test_extend_decorates_resolved_values() {
    let kernel = Kernel::default();
    kernel.bind("foo", |_: &Kernel| Ok(String::from("foo")));
    kernel
        .extend("foo", |value: Rc<String>, _: &Kernel| Ok(format!("{}bar", value)))
        .unwrap();

    assert_eq!(*kernel.make_as::<String>("foo").unwrap(), "foobar");
}

#[test]
fn test_extend_applies_to_existing_shared_instance() {
    let kernel = Kernel::default();
    kernel.instance("counter", 1u32);
    kernel
        .extend("counter", |value: Rc<u32>, _: &Kernel| Ok(*value + 1))
        .unwrap();

    assert_eq!(*kernel.make_as::<u32>("counter").unwrap(), 2);
}

#[test]
fn test_circular_dependency_is_detected() {
    let kernel = Kernel::default();
    kernel.bind("a", |k: &Kernel| k.make_as::<u8>("b").map(|b| *b));
    kernel.bind("b", |k: &Kernel| k.make_as::<u8>("a").map(|a| *a));

    let result = kernel.make("a");

    match result {
        Err(Error::Container(ContainerError::CircularDependency { key, chain })) => {
            assert_eq!(key, "a");
            assert_eq!(chain, vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        }
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
    // The build stack is unwound after the failure
    kernel.bind("a", |_: &Kernel| Ok(1u8));
    assert_eq!(*kernel.make_as::<u8>("b").unwrap(), 1);
}

#[test]
fn test_resolve_builds_default_when_unbound() {
    let kernel = Kernel::default();

    let implicit = kernel.resolve::<Concrete>().unwrap();
    assert_eq!(*implicit, Concrete::default());

    let key = crate::kernel::container::type_key::<Concrete>();
    kernel.instance(key, Concrete { label: "bound".into() });
    assert_eq!(kernel.resolve::<Concrete>().unwrap().label, "bound");
}

#[test]
fn test_failed_factory_is_not_cached() {
    let kernel = Kernel::default();
    let attempts = Rc::new(Cell::new(0));
    let seen = attempts.clone();
    kernel.singleton("flaky", move |_: &Kernel| {
        seen.set(seen.get() + 1);
        if seen.get() == 1 {
            Err(Error::Other("first attempt fails".into()))
        } else {
            Ok(5u8)
        }
    });

    assert!(kernel.make("flaky").is_err());
    assert_eq!(*kernel.make_as::<u8>("flaky").unwrap(), 5);
    assert_eq!(attempts.get(), 2);
}

#[test]
fn test_flush_clears_everything() {
    let kernel = Kernel::default();
    kernel.instance("one", 1u8);
    kernel.bind("two", |_: &Kernel| Ok(2u8));

    kernel.flush();

    assert!(!kernel.bound("one"));
    assert!(!kernel.bound("two"));
}

#[test]
fn test_make_with_parameters_overrides_factory_input() {
    let kernel = Kernel::default();
    kernel.singleton("greeting", |k: &Kernel| {
        let name = k
            .parameter::<String>("name")
            .map(|name| (*name).clone())
            .unwrap_or_else(|| "world".to_string());
        Ok(format!("hello {}", name))
    });

    let custom = kernel
        .make_with_parameters("greeting", Parameters::new().with("name", String::from("losers")))
        .unwrap();
    let plain = kernel.make_as::<String>("greeting").unwrap();

    assert_eq!(*custom.downcast::<String>().unwrap(), "hello losers");
    assert_eq!(*plain, "hello world");
    // The parameterised build is never cached
    assert!(Rc::ptr_eq(&plain, &kernel.make_as::<String>("greeting").unwrap()));
}

#[test]
fn test_parameters_are_not_visible_to_nested_builds() {
    let kernel = Kernel::default();
    kernel.bind("inner", |k: &Kernel| Ok(k.parameter::<u8>("n").is_some()));
    kernel.bind("outer", |k: &Kernel| {
        let inner = k.make_as::<bool>("inner")?;
        Ok((k.parameter::<u8>("n").map(|n| *n), *inner))
    });

    let built = kernel
        .make_with_parameters("outer", Parameters::new().with("n", 3u8))
        .unwrap();

    assert_eq!(*built.downcast::<(Option<u8>, bool)>().unwrap(), (Some(3), false));
    assert!(kernel.parameter::<u8>("n").is_none());
}
