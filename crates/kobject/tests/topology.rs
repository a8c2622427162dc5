//! 顶层拓扑与动态节点测试

use std::sync::Arc;
use std::sync::atomic::Ordering;

use kobject::{
    KobjError, KobjState, Kset, KsetState, TopologyBuilder, destroy_in_reverse, kobject_create,
    register_child, unregister_child,
};
use test_support::mock::payload::{TRACKED_DIR_KTYPE, TRACKED_KTYPE, Tracked, release_counter};
use test_support::mock::registry::FaultyRegistry;

#[test]
fn test_builder_commit_keeps_creation_order() {
    let registry = FaultyRegistry::shared();
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();

    let mut builder = TopologyBuilder::new(&kset);
    for name in ["first", "second", "third"] {
        builder.add(name, &TRACKED_DIR_KTYPE, Tracked::new(&releases)).unwrap();
    }
    assert_eq!(builder.len(), 3);
    let nodes = builder.commit();
    let names: Vec<_> = nodes.iter().map(|node| node.name().to_string()).collect();
    assert_eq!(names, ["first", "second", "third"]);
    assert_eq!(releases.load(Ordering::SeqCst), 0);

    destroy_in_reverse(&kset, &nodes).unwrap();
    assert_eq!(releases.load(Ordering::SeqCst), 3);
    kset.unregister().unwrap();
}

#[test]
fn test_builder_rolls_back_on_third_failure() {
    let registry = FaultyRegistry::shared();
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    registry.fail_register("third", KobjError::RegistryRejected);

    let result = (|| {
        let mut builder = TopologyBuilder::new(&kset);
        builder.add("first", &TRACKED_DIR_KTYPE, Tracked::new(&releases))?;
        builder.add("second", &TRACKED_DIR_KTYPE, Tracked::new(&releases))?;
        builder.add("third", &TRACKED_DIR_KTYPE, Tracked::new(&releases))?;
        Ok::<_, KobjError>(builder.commit())
    })();

    assert_eq!(result.err(), Some(KobjError::RegistryRejected));
    assert!(registry.lookup("demo/first").is_none());
    assert!(registry.lookup("demo/second").is_none());
    // 两个已回滚的节点加上注册失败的节点
    assert_eq!(releases.load(Ordering::SeqCst), 3);
    assert_eq!(registry.children(kset.root()).unwrap(), Vec::<String>::new());

    // 回滚后同名节点可以重新创建
    registry.clear_faults();
    kobject_create(&kset, "first", &TRACKED_DIR_KTYPE, None, Tracked::new(&releases)).unwrap();
    kobject_create(&kset, "second", &TRACKED_DIR_KTYPE, None, Tracked::new(&releases)).unwrap();
}

#[test]
fn test_register_child_requires_ready_subsystem() {
    let registry = FaultyRegistry::shared();
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let payload = Tracked::new(&releases);
    let devices = kobject_create(&kset, "devices", &TRACKED_DIR_KTYPE, None, payload).unwrap();

    let early = register_child(&kset, &*devices, "disk1", &TRACKED_KTYPE, Tracked::new(&releases));
    assert_eq!(early.err(), Some(KobjError::InvalidState));
    assert!(registry.lookup("demo/devices/disk1").is_none());

    kset.mark_ready().unwrap();
    let disk =
        register_child(&kset, &*devices, "disk1", &TRACKED_KTYPE, Tracked::new(&releases)).unwrap();
    assert!(registry.lookup("demo/devices/disk1").is_some());

    kset.begin_shutdown().unwrap();
    let late = register_child(&kset, &*devices, "disk2", &TRACKED_KTYPE, Tracked::new(&releases));
    assert_eq!(late.err(), Some(KobjError::InvalidState));

    // 关闭期间仍可清理动态节点
    unregister_child(&kset, &*disk).unwrap();
    assert_eq!(disk.state(), KobjState::Released);
}

#[test]
fn test_register_child_rejects_dying_parent() {
    let registry = FaultyRegistry::shared();
    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    let releases = release_counter();
    let payload = Tracked::new(&releases);
    let devices = kobject_create(&kset, "devices", &TRACKED_DIR_KTYPE, None, payload).unwrap();
    kset.mark_ready().unwrap();

    kobject::kobject_destroy(&kset, &*devices).unwrap();
    let child = register_child(&kset, &*devices, "disk1", &TRACKED_KTYPE, Tracked::new(&releases));
    assert_eq!(child.err(), Some(KobjError::InvalidState));
}

#[test]
fn test_kset_creation_failure_is_terminal() {
    let registry = FaultyRegistry::shared();
    registry.fail_next_create_root(KobjError::OutOfMemory);

    let err = Kset::create_and_add("demo", None, registry.clone()).err();
    assert_eq!(err.map(|e| e.to_errno()), Some(-12));
    assert!(registry.is_empty());

    let kset = Kset::create_and_add("demo", None, registry.clone()).unwrap();
    assert_eq!(kset.state(), KsetState::Initializing);
}
