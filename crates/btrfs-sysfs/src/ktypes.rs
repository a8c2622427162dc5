//! btrfs 各目录的属性与类型描述符

use alloc::sync::Arc;

use kobject::{AttrBuf, Attribute, KobjError, KobjType, Kobject, kobj_attr};

use crate::device::{BtrfsDevice, DeviceTable};

/// `devices` 目录负载
#[derive(Debug)]
pub struct DevicesDir;

/// `health` 目录负载
#[derive(Debug)]
pub struct HealthDir;

/// `info` 目录负载，读取共享设备表
pub struct InfoDir {
    pub(crate) table: Arc<DeviceTable>,
}

// devices 与 health 只有占位属性，读写都返回 UnsupportedOperation
kobj_attr!(static ATTR_DEVICES_DUMMY: DevicesDir = "dummy1", 0o444, None, None);
kobj_attr!(static ATTR_HEALTH_DUMMY: HealthDir = "dummy", 0o444, None, None);

fn show_num_devices(
    kobj: &Kobject<InfoDir>,
    _attr: &Attribute<InfoDir>,
    buf: &mut AttrBuf,
) -> Result<(), KobjError> {
    buf.emit(format_args!("{}\n", kobj.payload().table.len()))
}

kobj_attr!(static ATTR_NUM_DEVICES: InfoDir = "num_devices", 0o444, Some(show_num_devices), None);

fn show_label(
    kobj: &Kobject<BtrfsDevice>,
    _attr: &Attribute<BtrfsDevice>,
    buf: &mut AttrBuf,
) -> Result<(), KobjError> {
    buf.emit(format_args!("{}\n", kobj.payload().label()))
}

kobj_attr!(static ATTR_LABEL: BtrfsDevice = "label", 0o444, Some(show_label), None);

fn release_device(kobj: &Kobject<BtrfsDevice>) {
    log::debug!("btrfs: device '{}' released", kobj.payload().label());
}

static DEVICES_ATTRS: [&Attribute<DevicesDir>; 1] = [&ATTR_DEVICES_DUMMY];
static HEALTH_ATTRS: [&Attribute<HealthDir>; 1] = [&ATTR_HEALTH_DUMMY];
static INFO_ATTRS: [&Attribute<InfoDir>; 1] = [&ATTR_NUM_DEVICES];
static DEVICE_ATTRS: [&Attribute<BtrfsDevice>; 1] = [&ATTR_LABEL];

/// `/sys/fs/btrfs/devices`
pub static BTRFS_KTYPE_DEVICES: KobjType<DevicesDir> = KobjType::new("devices", &DEVICES_ATTRS);
/// `/sys/fs/btrfs/health`
pub static BTRFS_KTYPE_HEALTH: KobjType<HealthDir> = KobjType::new("health", &HEALTH_ATTRS);
/// `/sys/fs/btrfs/info`
pub static BTRFS_KTYPE_INFO: KobjType<InfoDir> = KobjType::new("info", &INFO_ATTRS);
/// `/sys/fs/btrfs/devices/<label>`
pub static BTRFS_KTYPE_DEVICE: KobjType<BtrfsDevice> =
    KobjType::new("device", &DEVICE_ATTRS).with_release(release_device);
