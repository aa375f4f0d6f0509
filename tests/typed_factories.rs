use ferrous_typed_di::{
    into_any, AnyArc, DiError, DiResult, GenericDefinition, GenericFactoryTable, GenericService, Lifetime, Resolver,
    ResolverContext, ServiceCollection, ServiceKey, ServiceType, TypedFactory,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct RepositoryDef;
impl GenericDefinition for RepositoryDef {
    const INTERFACE: bool = false;
}

struct Repository<T> {
    entity: &'static str,
    id: usize,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: 'static> GenericService for Repository<T> {
    type Definition = RepositoryDef;
    fn type_arguments() -> Vec<ServiceType> {
        vec![ServiceType::of::<T>()]
    }
}

struct User;
struct Order;

fn repository<T: 'static>(entity: &'static str, counter: &Arc<AtomicUsize>) -> Repository<T> {
    Repository {
        entity,
        id: counter.fetch_add(1, Ordering::SeqCst),
        _marker: std::marker::PhantomData,
    }
}

fn table(counter: Arc<AtomicUsize>) -> GenericFactoryTable<RepositoryDef> {
    let users = counter.clone();
    let orders = counter;
    GenericFactoryTable::<RepositoryDef>::new()
        .concrete::<Repository<User>, _>(move |_| repository("user", &users))
        .concrete::<Repository<Order>, _>(move |_| repository("order", &orders))
}

#[test]
fn test_singleton_typed_factory_per_closed_type() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = ServiceCollection::new();
    sc.add_singleton_typed_factory::<RepositoryDef, _>(table(counter.clone()).into_factory());

    let sp = sc.build();
    let users1 = sp.get_generic_required::<Repository<User>>();
    let users2 = sp.get_generic_required::<Repository<User>>();
    let orders = sp.get_generic_required::<Repository<Order>>();

    assert!(Arc::ptr_eq(&users1, &users2));
    assert_eq!(users1.entity, "user");
    assert_eq!(orders.entity, "order");
    assert_ne!(users1.id, orders.id);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(sp.closed_call_site_count(), 2);

    // Singletons built from a scope are the root's singletons
    let scope = sp.create_scope();
    assert!(Arc::ptr_eq(&scope.get_generic_required::<Repository<User>>(), &users1));
}

#[test]
fn test_transient_typed_factory_builds_every_time() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = ServiceCollection::new();
    sc.add_transient_typed_factory::<RepositoryDef, _>(table(counter.clone()).into_factory());

    let sp = sc.build();
    let a = sp.get_generic_required::<Repository<User>>();
    let b = sp.get_generic_required::<Repository<User>>();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    // The closed call site is created once and reused
    assert_eq!(sp.closed_call_site_count(), 1);
}

#[test]
fn test_scoped_typed_factory_per_scope_and_closed_type() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = ServiceCollection::new();
    sc.add_scoped_typed_factory::<RepositoryDef, _>(table(counter).into_factory());

    let sp = sc.build();
    let scope1 = sp.create_scope();
    let scope2 = sp.create_scope();

    let u1a = scope1.get_generic_required::<Repository<User>>();
    let u1b = scope1.get_generic_required::<Repository<User>>();
    let o1 = scope1.get_generic_required::<Repository<Order>>();
    let u2 = scope2.get_generic_required::<Repository<User>>();

    assert!(Arc::ptr_eq(&u1a, &u1b));
    assert!(!Arc::ptr_eq(&u1a, &u2));
    assert_ne!(u1a.id, o1.id);
    assert_eq!(scope1.scoped_instance_count(), 2);

    assert!(matches!(
        sp.get_generic::<Repository<User>>(),
        Err(DiError::WrongLifetime(_))
    ));
}

#[test]
fn test_factory_receives_requested_closed_type() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let record = seen.clone();

    let mut sc = ServiceCollection::new();
    sc.add_transient_typed_factory::<RepositoryDef, _>(
        move |_: &ResolverContext<'_>, requested: &ServiceType| -> DiResult<AnyArc> {
            record.lock().push(requested.type_arguments());
            Err(DiError::NotFound(requested.name()))
        },
    );

    let sp = sc.build();
    assert!(sp.get_generic::<Repository<Order>>().is_err());

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], vec![ServiceType::of::<Order>()]);
}

#[test]
fn test_unknown_closed_type_is_not_found() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_typed_factory::<RepositoryDef, _>(
        GenericFactoryTable::<RepositoryDef>::new()
            .concrete::<Repository<User>, _>(|_| Repository {
                entity: "user",
                id: 0,
                _marker: std::marker::PhantomData,
            })
            .into_factory(),
    );

    let sp = sc.build();
    assert!(sp.get_generic::<Repository<User>>().is_ok());
    match sp.get_generic::<Repository<Order>>() {
        Err(DiError::NotFound(name)) => assert!(name.contains("Repository")),
        _ => panic!("Expected NotFound"),
    }
}

#[test]
fn test_no_typed_factory_is_not_found() {
    let sp = ServiceCollection::new().build();
    assert!(matches!(
        sp.get_generic::<Repository<User>>(),
        Err(DiError::NotFound(_))
    ));
    assert!(matches!(
        sp.get_keyed_generic::<Repository<User>>("eu"),
        Err(DiError::KeyedNotFound { .. })
    ));
}

#[test]
fn test_exact_registration_wins_over_typed_factory() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = ServiceCollection::new();
    sc.add_singleton_typed_factory::<RepositoryDef, _>(table(counter).into_factory());
    sc.add_singleton(Repository::<User> {
        entity: "exact",
        id: 99,
        _marker: std::marker::PhantomData,
    });

    let sp = sc.build();
    assert_eq!(sp.get_generic_required::<Repository<User>>().entity, "exact");
    assert_eq!(sp.get_generic_required::<Repository<Order>>().entity, "order");
}

#[test]
fn test_last_typed_factory_wins() {
    let first: TypedFactory = Arc::new(|_: &ResolverContext<'_>, _: &ServiceType| -> DiResult<AnyArc> {
        Ok(into_any(Repository::<User> {
            entity: "first",
            id: 1,
            _marker: std::marker::PhantomData,
        }))
    });
    let second: TypedFactory = Arc::new(|_: &ResolverContext<'_>, _: &ServiceType| -> DiResult<AnyArc> {
        Ok(into_any(Repository::<User> {
            entity: "second",
            id: 2,
            _marker: std::marker::PhantomData,
        }))
    });

    let mut sc = ServiceCollection::new();
    sc.add_typed_factory(ServiceType::open::<RepositoryDef>(), Lifetime::Singleton, first)
        .unwrap();
    sc.add_typed_factory(ServiceType::open::<RepositoryDef>(), Lifetime::Singleton, second)
        .unwrap();

    let sp = sc.build();
    assert_eq!(sp.get_generic_required::<Repository<User>>().entity, "second");
}

#[test]
fn test_keyed_typed_factory_sees_its_key() {
    let mut sc = ServiceCollection::new();
    for region in ["eu", "us"] {
        sc.add_keyed_singleton_typed_factory::<RepositoryDef, _>(
            region,
            |_: &ResolverContext<'_>, key: &ServiceKey, requested: &ServiceType| -> DiResult<AnyArc> {
                if *requested == ServiceType::of::<Repository<User>>() {
                    let entity = if key.as_str() == Some("eu") { "user-eu" } else { "user-us" };
                    Ok(into_any(Repository::<User> {
                        entity,
                        id: 0,
                        _marker: std::marker::PhantomData,
                    }))
                } else {
                    Err(DiError::NotFound(requested.name()))
                }
            },
        );
    }

    let sp = sc.build();
    let eu = sp.get_keyed_generic_required::<Repository<User>>("eu");
    let us = sp.get_keyed_generic_required::<Repository<User>>("us");
    assert_eq!(eu.entity, "user-eu");
    assert_eq!(us.entity, "user-us");
    assert!(Arc::ptr_eq(&eu, &sp.get_keyed_generic_required::<Repository<User>>("eu")));

    // The unkeyed family was never registered
    assert!(sp.get_generic::<Repository<User>>().is_err());
}

#[test]
fn test_typed_factory_resolves_dependencies() {
    struct Settings {
        prefix: &'static str,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton(Settings { prefix: "tbl_" });
    sc.add_transient_typed_factory::<RepositoryDef, _>(
        GenericFactoryTable::<RepositoryDef>::new()
            .concrete::<Repository<User>, _>(|r| Repository {
                entity: if r.get_required::<Settings>().prefix == "tbl_" { "tbl_user" } else { "user" },
                id: 0,
                _marker: std::marker::PhantomData,
            })
            .into_factory(),
    );

    let sp = sc.build();
    assert_eq!(sp.get_generic_required::<Repository<User>>().entity, "tbl_user");
}

#[test]
fn test_concurrent_singleton_typed_resolution() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sc = ServiceCollection::new();
    sc.add_singleton_typed_factory::<RepositoryDef, _>(table(counter.clone()).into_factory());
    let sp = sc.build();

    let barrier = std::sync::Barrier::new(8);
    let ids: Vec<usize> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sp = &sp;
                let barrier = &barrier;
                s.spawn(move |_| {
                    barrier.wait();
                    sp.get_generic_required::<Repository<User>>().id
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
