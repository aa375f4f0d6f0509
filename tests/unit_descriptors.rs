//! Unit tests for ServiceDescriptor and TypedServiceDescriptor

use ferrous_typed_di::{
    into_any, AnyArc, DiError, DiResult, GenericDefinition, Implementation, Lifetime, ResolverContext,
    ServiceCollection, ServiceDescriptor, ServiceKey, ServiceType, TypedServiceDescriptor,
};
use std::sync::Arc;

struct PoolDef;
impl GenericDefinition for PoolDef {
    const INTERFACE: bool = false;
}

fn name_factory() -> Arc<dyn Fn(&ResolverContext<'_>, &ServiceType) -> DiResult<AnyArc> + Send + Sync> {
    Arc::new(|_: &ResolverContext<'_>, requested: &ServiceType| -> DiResult<AnyArc> { Ok(into_any(requested.name())) })
}

#[test]
fn test_instance_descriptor_is_singleton() {
    let descriptor = ServiceDescriptor::instance(ServiceType::of::<u32>(), None, into_any(7u32));

    assert_eq!(descriptor.lifetime(), Lifetime::Singleton);
    assert!(!descriptor.is_keyed());
    assert!(!descriptor.is_typed());
    assert!(matches!(descriptor.implementation(), Implementation::Instance(_)));
    assert_eq!(descriptor.key().to_string(), "u32");
}

#[test]
fn test_keyed_factory_descriptor_identity() {
    let descriptor = ServiceDescriptor::keyed_factory(
        ServiceType::of::<String>(),
        ServiceKey::from("eu"),
        Lifetime::Scoped,
        Arc::new(|_: &ResolverContext<'_>, key: &ServiceKey| -> DiResult<AnyArc> { Ok(into_any(key.to_string())) }),
    );

    assert!(descriptor.is_keyed());
    assert_eq!(descriptor.service_key(), Some(&ServiceKey::from("eu")));
    assert_eq!(descriptor.lifetime(), Lifetime::Scoped);
    assert_eq!(descriptor.key().to_string(), "alloc::string::String (key: eu)");
}

#[test]
fn test_typed_descriptor_requires_open_generic() {
    let ok = TypedServiceDescriptor::new(ServiceType::open::<PoolDef>(), name_factory(), Lifetime::Singleton);
    assert!(ok.is_ok());

    let closed = TypedServiceDescriptor::new(ServiceType::of::<Vec<u8>>(), name_factory(), Lifetime::Singleton);
    match closed {
        Err(DiError::InvalidDescriptor(msg)) => assert!(msg.contains("open generic")),
        _ => panic!("Expected InvalidDescriptor"),
    }
}

#[test]
fn test_typed_descriptor_factories_by_keyedness() {
    let plain = TypedServiceDescriptor::new(ServiceType::open::<PoolDef>(), name_factory(), Lifetime::Transient)
        .unwrap();
    assert!(plain.typed_factory().is_some());
    assert!(!plain.is_keyed());
    assert!(matches!(plain.typed_keyed_factory(), Err(DiError::NotKeyed(_))));

    let keyed = TypedServiceDescriptor::new_keyed(
        ServiceType::open::<PoolDef>(),
        ServiceKey::Int(1),
        Arc::new(|_: &ResolverContext<'_>, _: &ServiceKey, requested: &ServiceType| -> DiResult<AnyArc> {
            Ok(into_any(requested.name()))
        }),
        Lifetime::Scoped,
    )
    .unwrap();
    assert!(keyed.typed_factory().is_none());
    assert!(keyed.typed_keyed_factory().is_ok());
    assert_eq!(keyed.service_key(), Some(&ServiceKey::Int(1)));
    assert_eq!(keyed.lifetime(), Lifetime::Scoped);
}

#[test]
fn test_typed_descriptor_rejects_instances_and_factories() {
    assert!(matches!(
        TypedServiceDescriptor::from_instance(ServiceType::open::<PoolDef>(), into_any(1u8)),
        Err(DiError::InvalidDescriptor(_))
    ));
    let ctor = Arc::new(|_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(into_any(1u8)) });
    assert!(matches!(
        TypedServiceDescriptor::from_factory(ServiceType::open::<PoolDef>(), ctor, Lifetime::Transient),
        Err(DiError::InvalidDescriptor(_))
    ));
}

#[test]
fn test_typed_descriptor_round_trips_through_service_descriptor() {
    let typed = TypedServiceDescriptor::new(ServiceType::open::<PoolDef>(), name_factory(), Lifetime::Singleton)
        .unwrap();
    let descriptor = ServiceDescriptor::typed(typed);

    assert!(descriptor.is_typed());
    assert_eq!(descriptor.service_type(), ServiceType::open::<PoolDef>());
    assert!(descriptor.as_typed().is_some());

    let back = TypedServiceDescriptor::try_from(descriptor).unwrap();
    assert_eq!(back.lifetime(), Lifetime::Singleton);

    let plain = ServiceDescriptor::instance(ServiceType::of::<u8>(), None, into_any(1u8));
    assert!(TypedServiceDescriptor::try_from(plain).is_err());
}

#[test]
fn test_descriptor_clone_shares_implementation() {
    let descriptor = ServiceDescriptor::instance(ServiceType::of::<u8>(), None, into_any(1u8));
    let cloned = descriptor.clone();

    match (descriptor.implementation(), cloned.implementation()) {
        (Implementation::Instance(a), Implementation::Instance(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("Expected instances"),
    }
}

#[test]
fn test_descriptor_debug_names_implementation() {
    let descriptor = ServiceDescriptor::factory(
        ServiceType::of::<u8>(),
        Lifetime::Transient,
        Arc::new(|_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(into_any(1u8)) }),
    );
    let debug = format!("{:?}", descriptor);
    assert!(debug.contains("Factory"));
    assert!(debug.contains("Transient"));
}

#[test]
fn test_all_lifetimes_recorded_by_sugar() {
    let mut services = ServiceCollection::new();
    services.add_singleton_factory::<u8, _>(|_| 1);
    services.add_scoped_factory::<u16, _>(|_| 2);
    services.add_transient_factory::<u32, _>(|_| 3);

    let lifetimes: Vec<Lifetime> = services.iter().map(|d| d.lifetime()).collect();
    assert_eq!(lifetimes, vec![Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient]);
}
