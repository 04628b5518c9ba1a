//! Manager lifecycle tests against the in-process host driver.
//! Run with: cargo test -p vkore --test manager_tests

use std::sync::Arc;

use vkore::prelude::*;
use vkore::{AdoptedHandles, ErrorKind, ManagerState, Ownership};
use vkore_driver::{
    DeviceDesc, HostDeviceSpec, HostDriver, InstanceDesc, ObjectKind, QueueFamilyProperties,
    QueueFlags,
};

const SPIRV: [u32; 5] = [0x0723_0203, 0x0001_0000, 0, 1, 0];

fn host() -> Arc<HostDriver> {
    Arc::new(HostDriver::default())
}

fn assert_clean(driver: &HostDriver) {
    assert_eq!(driver.invalid_destroys(), 0, "double or foreign release");
    assert_eq!(driver.leaked_children(), 0, "device destroyed before its resources");
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_with_device_selects_requested_families() {
    let driver = host();
    let mgr = Manager::with_device(driver.clone(), 0, &[1, 0, 1], &["VK_KHR_shader_non_semantic_info"])
        .unwrap();
    let families: Vec<u32> = mgr.queues().iter().map(|q| q.family_index()).collect();
    assert_eq!(families, vec![1, 0]);
    let ctx = mgr.context().unwrap();
    assert_eq!(ctx.device_ownership(), Ownership::Owned);
    assert_eq!(ctx.instance_ownership(), Ownership::Owned);
}

#[test]
fn test_physical_device_out_of_range_creates_nothing() {
    let driver = host();
    let err = Manager::with_device::<&str>(driver.clone(), 2, &[], &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(
        err,
        VkoreError::PhysicalDeviceOutOfRange { index: 2, available: 1 }
    ));
    assert_eq!(driver.live(ObjectKind::Instance), 0);
    assert_eq!(driver.live(ObjectKind::Device), 0);
}

#[test]
fn test_bad_queue_family_is_configuration_error() {
    let driver = host();
    let err = Manager::with_device::<&str>(driver.clone(), 0, &[9], &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let graphics_only = HostDeviceSpec::new("gfx").with_queue_families(vec![
        QueueFamilyProperties {
            flags: QueueFlags::GRAPHICS,
            queue_count: 1,
            timestamp_valid_bits: 0,
        },
    ]);
    let driver = Arc::new(HostDriver::new(vec![graphics_only]));
    let err = Manager::with_driver(driver.clone()).unwrap_err();
    assert!(matches!(err, VkoreError::NoComputeQueue));
    assert_eq!(driver.live(ObjectKind::Instance), 0);
}

#[test]
fn test_config_from_json() {
    let config = ManagerConfig::from_json(
        r#"{ "queue_family_indices": [1], "manage_resources": false, "session": "batch" }"#,
    )
    .unwrap();
    let mut mgr = Manager::with_config(host(), config).unwrap();
    assert_eq!(mgr.queues()[0].family_index(), 1);
    assert_eq!(mgr.session(), "batch");
    assert!(!mgr.manages_resources());
    let _t = mgr.tensor(&[1.0], TensorType::Host).unwrap();
    assert_eq!(mgr.managed_total(), 0);
}

#[test]
fn test_device_properties_and_listing() {
    let driver = Arc::new(HostDriver::new(vec![
        HostDeviceSpec::new("first"),
        HostDeviceSpec::new("second"),
    ]));
    let mgr = Manager::with_device::<&str>(driver, 1, &[], &[]).unwrap();
    assert_eq!(mgr.device_properties().unwrap().device_name, "second");
    let listed = mgr.list_devices().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].properties.device_name, "first");
    mgr.wait_idle().unwrap();
}

// ============================================================================
// Adopted handles
// ============================================================================

fn adopt(driver: &Arc<HostDriver>) -> AdoptedHandles {
    let instance = driver.create_instance(&InstanceDesc::default()).unwrap();
    let physical_device = driver.enumerate_physical_devices(instance).unwrap()[0];
    let device = driver
        .create_device(
            instance,
            physical_device,
            &DeviceDesc {
                queue_families: vec![0],
                extensions: vec![],
            },
        )
        .unwrap();
    AdoptedHandles {
        instance,
        physical_device,
        device,
        queue_families: vec![0],
    }
}

#[test]
fn test_adopted_handles_survive_destroy() {
    let driver = host();
    let handles = adopt(&driver);

    let mut mgr = Manager::from_handles(driver.clone(), handles.clone()).unwrap();
    assert_eq!(
        mgr.context().unwrap().device_ownership(),
        Ownership::Borrowed
    );
    assert_eq!(driver.outstanding_imports(), 2);
    let t = mgr.tensor(&[1.0, 2.0], TensorType::Device).unwrap();
    mgr.destroy();
    drop(mgr);

    assert!(!t.is_init());
    assert_eq!(driver.outstanding_imports(), 0);
    assert!(driver.is_instance_live(handles.instance));
    assert!(driver.is_device_live(handles.device));
    assert_eq!(driver.live(ObjectKind::Buffer), 0);
    assert!(driver.get_queue(handles.device, 0, 0).is_ok());
    assert_eq!(driver.destroyed(ObjectKind::Device), 0);
    assert_eq!(driver.destroyed(ObjectKind::Instance), 0);
    assert_clean(&driver);

    driver.destroy_device(handles.device);
    driver.destroy_instance(handles.instance);
    assert_clean(&driver);
}

#[test]
fn test_adopted_requires_enabled_family() {
    let driver = host();
    let handles = adopt(&driver);
    let config = ManagerConfig::default().with_queue_families(vec![1]);
    let err =
        Manager::from_handles_with_config(driver.clone(), handles.clone(), config).unwrap_err();
    assert!(matches!(err, VkoreError::QueueFamilyNotEnabled { family: 1 }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(driver.is_device_live(handles.device));
    assert_eq!(driver.outstanding_imports(), 0);
}

#[test]
fn test_adopted_default_uses_enabled_family() {
    let driver = host();
    let instance = driver.create_instance(&InstanceDesc::default()).unwrap();
    let physical_device = driver.enumerate_physical_devices(instance).unwrap()[0];
    let device = driver
        .create_device(
            instance,
            physical_device,
            &DeviceDesc {
                queue_families: vec![1],
                extensions: vec![],
            },
        )
        .unwrap();
    let handles = AdoptedHandles {
        instance,
        physical_device,
        device,
        queue_families: vec![1],
    };

    // Family 0 is the first compute family on the device but was not enabled.
    let mgr = Manager::from_handles(driver.clone(), handles).unwrap();
    assert_eq!(mgr.queues()[0].family_index(), 1);
}

#[test]
fn test_adopted_handles_misdeclared_families() {
    let driver = host();
    let mut handles = adopt(&driver);
    handles.queue_families = vec![0, 1];
    let err = Manager::from_handles(driver.clone(), handles.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(driver.outstanding_imports(), 0);

    handles.queue_families.clear();
    let err = Manager::from_handles(driver.clone(), handles).unwrap_err();
    assert!(matches!(err, VkoreError::InvalidConfig(_)));
}

#[test]
fn test_repeated_adoption_releases_imports() {
    let driver = host();
    let handles = adopt(&driver);
    for _ in 0..3 {
        let mut mgr = Manager::from_handles(driver.clone(), handles.clone()).unwrap();
        drop(mgr.tensor(&[1.0], TensorType::Host).unwrap());
        mgr.destroy();
    }
    assert_eq!(driver.outstanding_imports(), 0);
    assert_clean(&driver);
}

// ============================================================================
// Factory
// ============================================================================

#[test]
fn test_three_tensors_one_algorithm_one_sequence() {
    let driver = host();
    let mut mgr = Manager::with_driver(driver.clone()).unwrap();

    let a = mgr.tensor(&[1.0, 2.0, 3.0], TensorType::Device).unwrap();
    let b = mgr.tensor(&[4.0, 5.0, 6.0], TensorType::Device).unwrap();
    let out = mgr.tensor(&[0.0; 3], TensorType::Device).unwrap();
    let algo = mgr
        .algorithm(
            AlgorithmDesc::new(vec![a.clone(), b.clone(), out.clone()])
                .with_spirv(SPIRV)
                .with_push_constants([2.0f32]),
        )
        .unwrap();
    let seq = mgr.sequence(0, 0).unwrap();

    assert_eq!(algo.workgroup(), Workgroup::new(3, 1, 1));
    assert!(algo.is_init());
    assert!(seq.is_init());
    assert_eq!(mgr.managed_count(ResourceKind::Tensor), 3);
    assert_eq!(mgr.managed_count(ResourceKind::Algorithm), 1);
    assert_eq!(mgr.managed_count(ResourceKind::Sequence), 1);
    assert_eq!(driver.live(ObjectKind::Buffer), 6);

    let staging = b.staging().unwrap();
    let expected: &[u8] = bytemuck::cast_slice(&[4.0f32, 5.0, 6.0]);
    assert_eq!(driver.memory_contents(staging.memory).unwrap(), expected);

    mgr.destroy();
    for t in [&a, &b, &out] {
        assert!(!t.is_init());
    }
    assert!(!algo.is_init());
    assert!(!seq.is_init());
    assert_eq!(driver.live(ObjectKind::Buffer), 0);
    assert_eq!(driver.live(ObjectKind::ShaderModule), 0);
    assert_eq!(driver.live(ObjectKind::CommandPool), 0);
    assert_eq!(driver.live(ObjectKind::Device), 0);
    assert_clean(&driver);
}

#[test]
fn test_explicit_workgroup_is_kept() {
    let mut mgr = Manager::with_driver(host()).unwrap();
    let t = mgr.tensor(&[0.0; 64], TensorType::Storage).unwrap();
    let algo = mgr
        .algorithm(
            AlgorithmDesc::new(vec![t])
                .with_spirv(SPIRV)
                .with_workgroup([8, 8, 1]),
        )
        .unwrap();
    assert_eq!(algo.workgroup().as_array(), [8, 8, 1]);
}

#[test]
fn test_zero_x_workgroup_takes_default() {
    let mut mgr = Manager::with_driver(host()).unwrap();
    let t = mgr.tensor(&[0.0; 16], TensorType::Device).unwrap();
    let algo = mgr
        .algorithm(
            AlgorithmDesc::new(vec![t])
                .with_spirv(SPIRV)
                .with_workgroup([0, 4, 1]),
        )
        .unwrap();
    assert_eq!(algo.workgroup(), Workgroup::new(16, 1, 1));

    let t = mgr.tensor(&[0.0; 16], TensorType::Device).unwrap();
    let err = mgr
        .algorithm(AlgorithmDesc::new(vec![t]).with_workgroup([8, 0, 1]))
        .unwrap_err();
    assert!(matches!(err, VkoreError::InvalidWorkgroup([8, 0, 1])));
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn test_algorithm_without_shader_is_uninitialized() {
    let driver = host();
    let mut mgr = Manager::with_driver(driver.clone()).unwrap();
    let empty = mgr.algorithm(AlgorithmDesc::default()).unwrap();
    assert!(!empty.is_init());
    assert!(empty.workgroup().is_unset());
    assert_eq!(mgr.managed_count(ResourceKind::Algorithm), 1);
    assert_eq!(driver.live(ObjectKind::ShaderModule), 0);
}

#[test]
fn test_typed_tensors() {
    let mut mgr = Manager::with_driver(host()).unwrap();
    let ints = mgr.tensor_t(&[1u32, 2, 3, 4], TensorType::Host).unwrap();
    assert_eq!(ints.data_type(), TensorDataType::UnsignedInt);
    assert_eq!(ints.element_size(), 4);
    let doubles = mgr.tensor_t(&[1.0f64, 2.0], TensorType::Host).unwrap();
    assert_eq!(doubles.data_type(), TensorDataType::Double);
    assert_eq!(doubles.memory_size(), 16);

    let custom = mgr
        .tensor_raw(&[0u8; 12], 4, 3, TensorDataType::Custom, TensorType::Host)
        .unwrap();
    assert_eq!(custom.size(), 4);
}

#[test]
fn test_out_of_memory_is_resource_exhaustion() {
    let driver = Arc::new(HostDriver::new(vec![
        HostDeviceSpec::new("tiny").with_memory_budget(64),
    ]));
    let mut mgr = Manager::with_driver(driver.clone()).unwrap();
    let err = mgr.tensor(&[0.0; 32], TensorType::Device).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
    assert_eq!(mgr.managed_total(), 0);
    assert_eq!(mgr.live_count(), 0);

    // The manager stays usable.
    assert!(mgr.tensor(&[0.0; 4], TensorType::Device).is_ok());
}

#[test]
fn test_sequence_with_timestamps() {
    let driver = host();
    let mut mgr = Manager::with_device::<&str>(driver.clone(), 0, &[0, 1], &[]).unwrap();
    let seq = mgr.sequence(1, 8).unwrap();
    assert_eq!(seq.queue_family_index(), 1);
    assert!(seq.is_profiling());
    assert_eq!(driver.live(ObjectKind::QueryPool), 1);

    let err = mgr.sequence(2, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_destroy_twice_releases_once() {
    let driver = host();
    let mut mgr = Manager::with_driver(driver.clone()).unwrap();
    let t = mgr.tensor(&[1.0], TensorType::Host).unwrap();
    let s = mgr.sequence(0, 0).unwrap();

    mgr.destroy();
    mgr.destroy();
    assert_eq!(mgr.state(), ManagerState::Destroyed);
    drop((t, s));
    drop(mgr);

    assert_eq!(driver.destroyed(ObjectKind::Device), 1);
    assert_eq!(driver.destroyed(ObjectKind::Instance), 1);
    assert_eq!(driver.destroyed(ObjectKind::Buffer), 1);
    assert_eq!(driver.destroyed(ObjectKind::CommandPool), 1);
    assert_clean(&driver);
}

#[test]
fn test_usage_after_destroy() {
    let mut mgr = Manager::with_driver(host()).unwrap();
    mgr.destroy();
    assert!(mgr.is_destroyed());
    assert!(mgr.queues().is_empty());
    let err = mgr.tensor(&[1.0], TensorType::Device).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(mgr.list_devices().is_err());
    assert_eq!(mgr.clear(), 0);
}

#[test]
fn test_unmanaged_resources_defer_device_release() {
    let driver = host();
    let config = ManagerConfig::default().with_manage_resources(false);
    let mut mgr = Manager::with_config(driver.clone(), config).unwrap();
    let seq = mgr.sequence(0, 0).unwrap();
    drop(mgr);

    assert!(seq.is_init());
    assert_eq!(driver.live(ObjectKind::Device), 1);
    drop(seq);
    assert_eq!(driver.live(ObjectKind::Device), 0);
    assert_eq!(driver.live(ObjectKind::Instance), 0);
    assert_clean(&driver);
}
