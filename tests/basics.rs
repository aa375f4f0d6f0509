use ferrous_typed_di::{
    into_any, AnyArc, DiError, DiResult, Lifetime, Resolver, ResolverContext, ServiceCollection, ServiceDescriptor,
    ServiceKey, ServiceProviderOptions, ServiceType,
};
use std::sync::{Arc, Mutex};

#[test]
fn test_concrete_singleton() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(42usize);
    sc.add_singleton("hello".to_string());

    let sp = sc.build();

    let num1 = sp.get_required::<usize>();
    let num2 = sp.get_required::<usize>();
    let str1 = sp.get_required::<String>();
    let str2 = sp.get_required::<String>();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2)); // Same instance
    assert!(Arc::ptr_eq(&str1, &str2)); // Same instance
}

#[test]
fn test_factory_with_dependencies() {
    #[derive(Debug)]
    struct Config {
        port: u16,
    }

    #[derive(Debug)]
    struct Server {
        config: Arc<Config>,
        name: String,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton(Config { port: 8080 });
    sc.add_singleton_factory::<Server, _>(|r| {
        Server {
            config: r.get_required::<Config>(),
            name: "MyServer".to_string(),
        }
    });

    let sp = sc.build();
    let server = sp.get_required::<Server>();

    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
}

#[test]
fn test_transient_creates_new_instances() {
    let counter = Arc::new(Mutex::new(0));
    let counter_clone = counter.clone();

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<String, _>(move |_| {
        let mut c = counter_clone.lock().unwrap();
        *c += 1;
        format!("instance-{}", *c)
    });

    let sp = sc.build();

    let a = sp.get_required::<String>();
    let b = sp.get_required::<String>();
    let c = sp.get_required::<String>();

    assert_eq!(*a, "instance-1");
    assert_eq!(*b, "instance-2");
    assert_eq!(*c, "instance-3");

    // All different instances
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&b, &c));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_not_found_error() {
    struct UnregisteredType;

    let sc = ServiceCollection::new();
    let sp = sc.build();

    // Should return error when trying to resolve unregistered type
    let result = sp.get::<UnregisteredType>();
    assert!(result.is_err(), "Expected error when resolving unregistered type");
}

#[test]
fn test_replace_semantics() {
    let mut sc = ServiceCollection::new();

    // Register first value
    sc.add_singleton(1usize);
    // Replace with second value
    sc.add_singleton(2usize);

    let sp = sc.build();
    let value = sp.get_required::<usize>();

    // Should get the last registered value
    assert_eq!(*value, 2);
}

#[test]
fn test_complex_dependency_graph() {
    struct A {
        value: i32,
    }

    struct B {
        a: Arc<A>,
    }

    struct C {
        a: Arc<A>,
        b: Arc<B>,
    }

    let mut sc = ServiceCollection::new();

    sc.add_singleton(A { value: 100 });

    sc.add_singleton_factory::<B, _>(|r| B {
        a: r.get_required::<A>(),
    });

    sc.add_singleton_factory::<C, _>(|r| C {
        a: r.get_required::<A>(),
        b: r.get_required::<B>(),
    });

    let sp = sc.build();
    let c = sp.get_required::<C>();

    assert_eq!(c.a.value, 100);
    assert_eq!(c.b.a.value, 100);
    // A is singleton, so should be same instance
    assert!(Arc::ptr_eq(&c.a, &c.b.a));
}
#[test]
fn test_trait_singleton_and_factory() {
    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct Named(Arc<String>);
    impl Greeter for Named {
        fn greet(&self) -> String {
            format!("hello {}", self.0)
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton("ada".to_string());
    sc.add_singleton_trait::<dyn Greeter>(Arc::new(English));
    sc.add_keyed_transient_trait_factory::<dyn Greeter, _>("named", |r, _| {
        Arc::new(Named(r.get_required::<String>())) as Arc<dyn Greeter>
    });

    let sp = sc.build();
    assert_eq!(sp.get_required_trait::<dyn Greeter>().greet(), "hello");
    assert_eq!(sp.get_keyed_trait_required::<dyn Greeter>("named").greet(), "hello ada");

    let a = sp.get_required_trait::<dyn Greeter>();
    let b = sp.get_required_trait::<dyn Greeter>();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_collection_editing_before_build() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(1u8);
    sc.add_keyed_singleton("x", 2u8);
    sc.add_singleton(3u8);

    let removed = sc.remove_all(&ServiceType::of::<u8>(), None);
    assert_eq!(removed.len(), 2);
    assert_eq!(sc.len(), 1);
    assert!(sc.contains(&ServiceType::of::<u8>(), Some(&ServiceKey::from("x"))));
    assert!(!sc.try_add(ServiceDescriptor::instance(
        ServiceType::of::<u8>(),
        Some("x".into()),
        into_any(9u8)
    )));

    let sp = sc.build();
    assert!(matches!(sp.get::<u8>(), Err(DiError::NotFound(_))));
    assert_eq!(*sp.get_keyed_required::<u8>("x"), 2);
}

#[test]
fn test_validate_on_build_reports_failing_singleton() {
    let mut sc = ServiceCollection::new();
    sc.add(ServiceDescriptor::factory(
        ServiceType::of::<String>(),
        Lifetime::Singleton,
        Arc::new(|r: &ResolverContext<'_>| -> DiResult<AnyArc> {
            let port = r.get::<u16>()?;
            Ok(into_any(format!("0.0.0.0:{}", port)))
        }),
    ));

    let options = ServiceProviderOptions {
        validate_on_build: true,
        ..Default::default()
    };
    match sc.build_with_options(options) {
        Err(DiError::NotFound(name)) => assert_eq!(name, "u16"),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_lazy_build_defers_singleton_failure() {
    let mut sc = ServiceCollection::new();
    sc.add(ServiceDescriptor::factory(
        ServiceType::of::<String>(),
        Lifetime::Singleton,
        Arc::new(|r: &ResolverContext<'_>| -> DiResult<AnyArc> {
            r.get::<u16>().map(|port| into_any(port.to_string()))
        }),
    ));

    let sp = sc.build();
    assert!(sp.get::<String>().is_err());
}
