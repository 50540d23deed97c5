//! # Background Thread Lifecycle
//!
//! The full loop as an application runs it: open, spawn, merge per frame,
//! edit the manifest, stop.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{temp_dir, wait_until, write_manifest, write_vox};
use scenesync::{
    AssetHandle, AssetId, AssetLoader, GpuPrepareStage, HostUploadDevice, ManifestReader,
    OperationThread, SceneGroup, SyncConfig, SyncCoordinator, UploadPool,
};
use scenesync_assets::{Asset, AssetData, AssetResult};

#[test]
fn open_then_follow_manifest_edits() {
    let dir = temp_dir("lifecycle");
    let manifest = dir.join("scene.manifest");
    for name in ["a.vox", "b.vox", "c.vox"] {
        write_vox(&dir.join(name), 2);
    }
    write_manifest(&manifest, &["a.vox", "b.vox"]);

    let config = SyncConfig {
        manifest_path: manifest.clone(),
        upload_threads: 2,
        load_parallelism: 2,
        idle_interval_ms: 2,
        ..SyncConfig::default()
    };
    let pool = Arc::new(UploadPool::with_contexts(2, |_| HostUploadDevice::new()).unwrap());
    let coordinator = SyncCoordinator::from_config(&config, Arc::clone(&pool));
    let merger = coordinator.merger();

    let mut scene = SceneGroup::new();
    assert_eq!(coordinator.open(&mut scene), 2);

    let mut operation = OperationThread::spawn(coordinator).unwrap();
    assert!(operation.is_running());

    write_manifest(&manifest, &["b.vox", "c.vox"]);
    let expected = vec![AssetId::from("b.vox"), AssetId::from("c.vox")];
    assert!(wait_until(|| {
        merger.merge(&mut scene);
        scene.ids() == expected
    }));

    operation.stop();
    assert!(!operation.is_running());

    let stats = merger.stats();
    assert_eq!(stats.staged, stats.applied);
    assert_eq!(stats.detached, 1);

    pool.shutdown();
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn stop_while_blocked_on_merge() {
    let dir = temp_dir("stop_blocked");
    let manifest = dir.join("scene.manifest");
    write_vox(&dir.join("a.vox"), 1);
    write_manifest(&manifest, &["a.vox"]);

    let config = SyncConfig {
        manifest_path: manifest,
        upload_threads: 0,
        ..SyncConfig::default()
    };
    let coordinator = SyncCoordinator::from_config(&config, Arc::new(UploadPool::new()));
    let merger = coordinator.merger();

    let mut operation = OperationThread::spawn(coordinator).unwrap();
    assert!(wait_until(|| merger.stats().staged == 1));

    // Nobody merges; stop must still return
    operation.stop();
    assert!(!operation.is_running());
    assert!(operation.cancellation_handle().is_cancelled());
    assert_eq!(merger.stats().applied, 0);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn drop_stops_idle_loop() {
    let dir = temp_dir("drop_idle");
    let manifest = dir.join("scene.manifest");
    write_manifest(&manifest, &[]);

    let coordinator = SyncCoordinator::from_config(
        &SyncConfig {
            manifest_path: manifest,
            idle_interval_ms: 50,
            ..SyncConfig::default()
        },
        Arc::new(UploadPool::new()),
    );
    let operation = OperationThread::spawn(coordinator).unwrap();
    let cancel = operation.cancellation_handle();

    std::thread::sleep(Duration::from_millis(20));
    drop(operation);
    assert!(cancel.is_cancelled());

    fs::remove_dir_all(&dir).ok();
}

/// Panics on ids starting with "boom".
struct FragileLoader;

impl AssetLoader for FragileLoader {
    fn load(&self, id: &AssetId) -> AssetResult<AssetHandle> {
        assert!(!id.as_str().starts_with("boom"), "decoder bug on {id}");
        Ok(Asset::new_handle(id.clone(), AssetData::Blob(vec![1])))
    }
}

#[test]
fn panicking_loader_keeps_the_loop_alive() {
    let dir = temp_dir("fragile");
    let manifest = dir.join("scene.manifest");
    write_manifest(&manifest, &["boom.bin"]);

    let coordinator = SyncCoordinator::new(
        ManifestReader::new(&manifest),
        FragileLoader,
        GpuPrepareStage::new(Arc::new(UploadPool::new())),
    )
    .with_idle_interval(Duration::from_millis(1));
    let merger = coordinator.merger();
    let mut scene = SceneGroup::new();

    let mut operation = OperationThread::spawn(coordinator).unwrap();
    assert!(wait_until(|| merger.stats().load_failures >= 3));
    assert!(operation.is_running());

    // A healthy entry still gets through on a later cycle
    write_manifest(&manifest, &["boom.bin", "fine.bin"]);
    assert!(wait_until(|| {
        merger.merge(&mut scene);
        scene.contains(&AssetId::from("fine.bin"))
    }));
    assert!(operation.is_running());

    operation.stop();
    fs::remove_dir_all(&dir).ok();
}
