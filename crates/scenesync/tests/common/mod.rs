//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use scenesync::{CycleOutcome, SceneGraph, SceneMerger, SyncCoordinator};

/// Fresh directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("scenesync_it_{tag}_{id}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a manifest listing `files`.
pub fn write_manifest(path: &Path, files: &[&str]) {
    let body: String = files.iter().map(|f| format!("file \"{f}\"\n")).collect();
    fs::write(path, body).unwrap();
}

fn chunk(id: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(id);
    out.extend_from_slice(&u32::try_from(content.len()).unwrap().to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(content);
    out
}

/// Writes a `.vox` model with `count` voxels in a row.
pub fn write_vox(path: &Path, count: u8) {
    let mut size = Vec::new();
    for v in [u32::from(count.max(1)), 1, 1] {
        size.extend_from_slice(&v.to_le_bytes());
    }

    let mut xyzi = Vec::new();
    xyzi.extend_from_slice(&u32::from(count).to_le_bytes());
    for x in 0..count {
        xyzi.extend_from_slice(&[x, 0, 0, 1]);
    }

    let mut children = chunk(b"SIZE", &size);
    children.extend(chunk(b"XYZI", &xyzi));

    let mut out = Vec::new();
    out.extend_from_slice(b"VOX ");
    out.extend_from_slice(&150u32.to_le_bytes());
    out.extend_from_slice(b"MAIN");
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&u32::try_from(children.len()).unwrap().to_le_bytes());
    out.extend(children);
    fs::write(path, out).unwrap();
}

/// Runs one background cycle on another thread while this thread plays the
/// update loop, merging every millisecond until the cycle returns.
pub fn cycle_with_merges<S: SceneGraph>(
    coordinator: &Arc<SyncCoordinator>,
    merger: &SceneMerger,
    scene: &mut S,
) -> CycleOutcome {
    let worker = {
        let coordinator = Arc::clone(coordinator);
        thread::spawn(move || coordinator.cycle())
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while !worker.is_finished() {
        assert!(Instant::now() < deadline, "cycle did not finish");
        merger.merge(scene);
        // Never more than one diff in flight, and nothing applied unstaged
        let stats = merger.stats();
        assert!(stats.unmerged() <= 1);
        assert!(stats.applied <= stats.staged);
        thread::sleep(Duration::from_millis(1));
    }
    worker.join().unwrap()
}

/// Polls `condition` for up to five seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}
