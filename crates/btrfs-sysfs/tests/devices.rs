use std::sync::Arc;

use btrfs_sysfs::{SysfsConfig, init};
use kobject::{KobjError, KobjState, MemRegistry};

fn setup() -> (Arc<MemRegistry>, btrfs_sysfs::BtrfsSysfs) {
    let registry = Arc::new(MemRegistry::new());
    let sysfs = init(registry.clone(), &SysfsConfig::default()).unwrap();
    (registry, sysfs)
}

#[test]
fn test_create_and_kill_device() {
    let (registry, sysfs) = setup();
    let info = registry.lookup("btrfs/info").unwrap();
    assert_eq!(registry.show(info, "num_devices").unwrap(), "0\n");

    let device = sysfs.create_device(b"sda1\0").unwrap();
    assert_eq!(device.name(), "sda1");
    assert_eq!(device.state(), KobjState::Live);
    let handle = registry.lookup("btrfs/devices/sda1").unwrap();
    assert_eq!(registry.show(handle, "label").unwrap(), "sda1\n");
    assert_eq!(registry.show(info, "num_devices").unwrap(), "1\n");
    assert_eq!(sysfs.num_devices(), 1);

    sysfs.kill_device(b"sda1").unwrap();
    assert!(registry.lookup("btrfs/devices/sda1").is_none());
    assert_eq!(device.state(), KobjState::Released);
    assert_eq!(registry.show(info, "num_devices").unwrap(), "0\n");
    assert!(sysfs.device("sda1").is_none());

    sysfs.shutdown().unwrap();
}

#[test]
fn test_duplicate_label_conflicts() {
    let (registry, sysfs) = setup();
    sysfs.create_device(b"sdb").unwrap();

    assert_eq!(sysfs.create_device(b"sdb").err(), Some(KobjError::RegistrationConflict));
    assert_eq!(sysfs.create_device(b"sdb\0tail").err(), Some(KobjError::RegistrationConflict));
    assert_eq!(sysfs.num_devices(), 1);
    let devices = registry.lookup("btrfs/devices").unwrap();
    assert_eq!(registry.children(devices).unwrap(), ["sdb"]);

    sysfs.shutdown().unwrap();
}

#[test]
fn test_invalid_labels_rejected() {
    let (registry, sysfs) = setup();

    let labels: [&[u8]; 4] = [b"", b"\0", b"a/b", &[0xff, 0xfe]];
    for label in labels {
        assert_eq!(sysfs.create_device(label).err(), Some(KobjError::InvalidArgument));
    }
    assert_eq!(sysfs.kill_device(b"missing"), Err(KobjError::NotFound));
    let devices = registry.lookup("btrfs/devices").unwrap();
    assert!(registry.children(devices).unwrap().is_empty());

    sysfs.shutdown().unwrap();
}

#[test]
fn test_label_is_read_only() {
    let (registry, sysfs) = setup();
    sysfs.create_device(b"nvme0n1").unwrap();

    let handle = registry.lookup("btrfs/devices/nvme0n1").unwrap();
    assert_eq!(registry.store(handle, "label", b"other"), Err(KobjError::PermissionDenied));
    assert_eq!(registry.show(handle, "missing"), Err(KobjError::NotFound));

    sysfs.shutdown().unwrap();
}

#[test]
fn test_shutdown_detaches_devices_first() {
    let (registry, sysfs) = setup();
    let labels = ["sdc", "sda", "sdb"];
    let devices: Vec<_> = labels
        .iter()
        .map(|label| sysfs.create_device(label.as_bytes()).unwrap())
        .collect();
    assert_eq!(sysfs.device_labels(), ["sda", "sdb", "sdc"]);

    sysfs.shutdown().unwrap();
    assert!(registry.is_empty());
    for device in &devices {
        assert_eq!(device.state(), KobjState::Released);
    }
}

#[test]
fn test_pinned_device_outlives_kill() {
    let (registry, sysfs) = setup();
    let device = sysfs.create_device(b"sdd").unwrap();
    let handle = registry.lookup("btrfs/devices/sdd").unwrap();
    let pin = kobject::KobjRef::try_get(registry.node(handle).unwrap()).unwrap();

    sysfs.kill_device(b"sdd").unwrap();
    assert!(registry.lookup("btrfs/devices/sdd").is_none());
    assert_eq!(device.state(), KobjState::Dying);
    assert_eq!(device.payload().label(), "sdd");

    drop(pin);
    assert_eq!(device.state(), KobjState::Released);
    sysfs.shutdown().unwrap();
}

#[test]
fn test_device_creation_needs_ready_kset() {
    let (_registry, sysfs) = setup();
    sysfs.kset().begin_shutdown().unwrap();

    assert_eq!(sysfs.create_device(b"late").err(), Some(KobjError::InvalidState));
    assert_eq!(sysfs.num_devices(), 0);
}

#[test]
fn test_shutdown_after_external_begin_shutdown() {
    let (registry, sysfs) = setup();
    let device = sysfs.create_device(b"sda").unwrap();
    sysfs.kset().begin_shutdown().unwrap();

    sysfs.shutdown().unwrap();
    assert!(registry.lookup("btrfs").is_none());
    assert!(registry.lookup("btrfs/devices/sda").is_none());
    assert!(registry.is_empty());
    assert_eq!(device.state(), KobjState::Released);
}
