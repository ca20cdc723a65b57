//! Free disk space health check.

use std::path::{Path, PathBuf};

use sysinfo::Disks;

use super::{HealthCheckError, HealthProvider, HealthStatus, Status};

/// Default DOWN threshold: 1 MiB free.
pub const DEFAULT_FREE_BYTES_THRESHOLD: u64 = 1024 * 1024;

/// Reports DOWN when the disk holding `path` has too little free space.
#[derive(Debug, Clone)]
pub struct DiskSpaceHealthProvider {
    path: PathBuf,
    mount_point: PathBuf,
    free_bytes_down_threshold: u64,
}

impl DiskSpaceHealthProvider {
    /// Resolve the disk holding `path`. Returns `None` when no mounted disk
    /// contains it (e.g. no disk information on this platform).
    pub fn for_path(path: impl AsRef<Path>, free_bytes_down_threshold: u64) -> Option<Self> {
        let path = path.as_ref().to_path_buf();
        let mount_point = mount_point_for(&path)?;
        Some(Self {
            path,
            mount_point,
            free_bytes_down_threshold,
        })
    }

    /// Disk holding the current working directory.
    pub fn for_current_dir(free_bytes_down_threshold: u64) -> Option<Self> {
        let cwd = std::env::current_dir().ok()?;
        Self::for_path(cwd, free_bytes_down_threshold)
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

/// Longest mount point that is an ancestor of `path`.
fn mount_point_for(path: &Path) -> Option<PathBuf> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|d| d.mount_point())
        .filter(|mount| path.starts_with(mount))
        .max_by_key(|mount| mount.as_os_str().len())
        .map(Path::to_path_buf)
}

impl HealthProvider for DiskSpaceHealthProvider {
    fn name(&self) -> &str {
        "diskSpace"
    }

    fn health(&self) -> Result<HealthStatus, HealthCheckError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == self.mount_point)
            .ok_or_else(|| {
                HealthCheckError::Unreachable(format!(
                    "no disk mounted at {} (for {})",
                    self.mount_point.display(),
                    self.path.display()
                ))
            })?;

        let free = disk.available_space();
        let status = if free > self.free_bytes_down_threshold {
            Status::Up
        } else {
            Status::Down
        };

        Ok(HealthStatus::new(status)
            .with_detail("total", disk.total_space())
            .with_detail("free", free)
            .with_detail("threshold", self.free_bytes_down_threshold))
    }
}
