//! 节点生命周期测试：创建、冲突、失败回滚、延迟 release 与父子约束

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use kobject::{
    KobjAction, KobjError, KobjRef, KobjState, Kset, MemRegistry, RawKobject, Registry,
    kobject_create, kobject_destroy,
};
use test_support::mock::payload::{TRACKED_DIR_KTYPE, TRACKED_KTYPE, Tracked, release_counter};
use test_support::mock::registry::FaultyRegistry;

#[test]
fn test_create_is_immediately_dispatch_ready() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();

    let node =
        kobject_create(&kset, "node", &TRACKED_KTYPE, None, Tracked::new(&releases)).unwrap();
    assert_eq!(node.state(), KobjState::Live);
    assert_eq!(node.kobj_core().kref().count(), 1);
    let handle = registry.lookup("demo/node").unwrap();
    assert_eq!(node.handle(), Some(handle));
    assert_eq!(registry.show(handle, "value").unwrap(), "0\n");
    assert_eq!(registry.children(kset.root()).unwrap(), vec!["node".to_string()]);
}

#[test]
fn test_duplicate_name_conflicts_and_first_survives() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let first_releases = release_counter();
    let second_releases = release_counter();

    let payload = Tracked::with_value(&first_releases, 3);
    let first = kobject_create(&kset, "node", &TRACKED_KTYPE, None, payload).unwrap();
    let before = registry.len();
    let second =
        kobject_create(&kset, "node", &TRACKED_KTYPE, None, Tracked::new(&second_releases));

    assert_eq!(second.err(), Some(KobjError::RegistrationConflict));
    assert_eq!(registry.len(), before);
    assert_eq!(second_releases.load(Ordering::SeqCst), 1);
    assert_eq!(first_releases.load(Ordering::SeqCst), 0);
    assert_eq!(first.state(), KobjState::Live);
    let handle = registry.lookup("demo/node").unwrap();
    assert_eq!(registry.show(handle, "value").unwrap(), "3\n");
}

#[test]
fn test_registry_failure_leaves_no_trace() {
    let registry = FaultyRegistry::shared();
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    registry.fail_register("node", KobjError::OutOfMemory);

    let err = kobject_create(&kset, "node", &TRACKED_KTYPE, None, Tracked::new(&releases)).err();
    assert_eq!(err, Some(KobjError::OutOfMemory));
    assert!(registry.lookup("demo/node").is_none());
    assert_eq!(registry.len(), 1);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(registry.events().is_empty());

    registry.clear_faults();
    kobject_create(&kset, "node", &TRACKED_KTYPE, None, Tracked::new(&releases)).unwrap();
    assert!(registry.lookup("demo/node").is_some());
}

#[test]
fn test_invalid_names_rejected_before_registration() {
    let registry = FaultyRegistry::shared();
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();

    for name in ["", "a/b", ".", ".."] {
        let err = kobject_create(&kset, name, &TRACKED_KTYPE, None, Tracked::new(&releases)).err();
        assert_eq!(err, Some(KobjError::InvalidArgument));
    }
    assert_eq!(registry.register_calls(), 0);
}

#[test]
fn test_destroy_releases_exactly_once() {
    let registry = FaultyRegistry::shared();
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let node =
        kobject_create(&kset, "node", &TRACKED_KTYPE, None, Tracked::new(&releases)).unwrap();
    let handle = node.handle().unwrap();

    kobject_destroy(&kset, &*node).unwrap();
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(node.state(), KobjState::Released);
    assert!(registry.lookup("demo/node").is_none());

    assert_eq!(kobject_destroy(&kset, &*node), Err(KobjError::InvalidState));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(
        registry.events(),
        vec![(handle, KobjAction::Add), (handle, KobjAction::Remove)]
    );
}

#[test]
fn test_release_deferred_while_dispatch_in_flight() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let node =
        kobject_create(&kset, "node", &TRACKED_KTYPE, None, Tracked::new(&releases)).unwrap();

    let erased = registry.node(registry.lookup("demo/node").unwrap()).unwrap();
    let pin = KobjRef::try_get(erased).unwrap();
    kobject_destroy(&kset, &*node).unwrap();

    assert_eq!(releases.load(Ordering::SeqCst), 0);
    assert_eq!(node.state(), KobjState::Dying);
    assert_eq!(pin.name(), "node");

    drop(pin);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(node.state(), KobjState::Released);
}

#[test]
fn test_concurrent_readers_and_destroy() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let payload = Tracked::with_value(&releases, 11);
    let node = kobject_create(&kset, "node", &TRACKED_KTYPE, None, payload).unwrap();
    let handle = node.handle().unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                for _ in 0..2000 {
                    match registry.show(handle, "value") {
                        Ok(text) => assert_eq!(text, "11\n"),
                        Err(err) => assert_eq!(err, KobjError::NotFound),
                    }
                }
            })
        })
        .collect();

    kobject_destroy(&kset, &*node).unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(registry.show(handle, "value"), Err(KobjError::NotFound));
}

#[test]
fn test_child_placement_and_parent_constraints() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();

    let parent =
        kobject_create(&kset, "parent", &TRACKED_DIR_KTYPE, None, Tracked::new(&releases)).unwrap();
    let payload = Tracked::new(&releases);
    let child = kobject_create(&kset, "child", &TRACKED_KTYPE, Some(&*parent), payload).unwrap();
    assert!(registry.lookup("demo/parent/child").is_some());

    // 仍有子节点时不能销毁父节点
    assert_eq!(kobject_destroy(&kset, &*parent), Err(KobjError::InvalidState));
    assert_eq!(parent.state(), KobjState::Live);

    kobject_destroy(&kset, &*child).unwrap();
    kobject_destroy(&kset, &*parent).unwrap();
    assert_eq!(releases.load(Ordering::SeqCst), 2);

    let orphan =
        kobject_create(&kset, "orphan", &TRACKED_KTYPE, Some(&*parent), Tracked::new(&releases));
    assert_eq!(orphan.err(), Some(KobjError::InvalidState));
}

#[test]
fn test_name_may_not_shadow_parent_attribute() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let parent =
        kobject_create(&kset, "parent", &TRACKED_KTYPE, None, Tracked::new(&releases)).unwrap();

    let clash =
        kobject_create(&kset, "value", &TRACKED_KTYPE, Some(&*parent), Tracked::new(&releases));
    assert_eq!(clash.err(), Some(KobjError::RegistrationConflict));
}

#[test]
fn test_root_cannot_be_removed_with_children() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let node =
        kobject_create(&kset, "node", &TRACKED_KTYPE, None, Tracked::new(&releases)).unwrap();

    assert_eq!(kset.unregister(), Err(KobjError::InvalidState));
    assert!(registry.lookup("demo/node").is_some());

    kobject_destroy(&kset, &*node).unwrap();
    kset.unregister().unwrap();
    assert!(registry.is_empty());
}

#[test]
fn test_registry_rechecks_parent_liveness() {
    let registry = Arc::new(MemRegistry::new());
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let parent =
        kobject_create(&kset, "parent", &TRACKED_DIR_KTYPE, None, Tracked::new(&releases)).unwrap();
    let stale = parent.handle().unwrap();
    let erased: Arc<dyn RawKobject> = parent.clone();
    let pin = KobjRef::try_get(erased.clone()).unwrap();

    kobject_destroy(&kset, &*parent).unwrap();
    assert_eq!(parent.state(), KobjState::Dying);

    // 父句柄已被移除
    assert_eq!(
        registry.register("child", stale, erased.clone()),
        Err(KobjError::InvalidState)
    );
    assert_eq!(registry.create_root("other", Some(stale)), Err(KobjError::NotFound));

    // 条目仍在但节点已离开 Live
    let dying = registry.register("dying", kset.root(), erased.clone()).unwrap();
    assert_eq!(
        registry.register("child", dying, erased.clone()),
        Err(KobjError::InvalidState)
    );
    assert_eq!(registry.children(dying).unwrap(), Vec::<String>::new());

    registry.unregister(dying).unwrap();
    drop(pin);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(parent.state(), KobjState::Released);
}
