//
// mount.rs
// Dicom-Tag-Census
//
// Mounts volume images (.iso) on macOS or Linux and guarantees they are detached again.
//
// Thales Matheus Mendonça Santos - November 2025

use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::MountError;

const VOLUME_EXTENSION: &str = ".iso";
const MOUNT_POINT_NAME: &str = "ISOImage";

/// Volume images are recognised by name only; they are never parsed as images themselves.
pub fn is_volume_image(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.ends_with(VOLUME_EXTENSION))
}

/// Host platforms with a supported mount mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Result<Self, MountError> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Result<Self, MountError> {
        match os {
            "macos" => Ok(Platform::MacOs),
            "linux" => Ok(Platform::Linux),
            other => Err(MountError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Attaches a volume image to a directory and detaches it again.
pub trait VolumeMounter {
    /// Create the transient directory the volume will be attached to.
    fn prepare(&self, image: &Path) -> Result<PathBuf, MountError>;

    fn mount(&self, image: &Path, mount_point: &Path) -> Result<(), MountError>;

    /// Detach whatever is attached at `mount_point` and remove the transient directories.
    fn unmount(&self, mount_point: &Path) -> Result<(), MountError>;
}

/// Mounter that shells out to `hdiutil` (macOS) or `mount -o loop` (Linux).
#[derive(Debug)]
pub struct SystemMounter {
    platform: Platform,
    tool: PathBuf,
    location: PathBuf,
    depth: Cell<usize>,
}

impl SystemMounter {
    pub fn new(platform: Platform, location: impl Into<PathBuf>) -> Self {
        let tool = match platform {
            Platform::MacOs => "hdiutil",
            Platform::Linux => "sudo",
        };
        Self {
            platform,
            tool: PathBuf::from(tool),
            location: location.into(),
            depth: Cell::new(0),
        }
    }

    /// Replace the program invoked for mounting (`hdiutil` on macOS, `sudo` on Linux).
    pub fn with_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.tool = tool.into();
        self
    }

    fn mount_command(&self, image: &Path, mount_point: &Path) -> (&'static str, Command) {
        match self.platform {
            Platform::MacOs => {
                let mut cmd = Command::new(&self.tool);
                cmd.arg("mount").arg("-mountpoint").arg(mount_point).arg(image);
                ("hdiutil", cmd)
            }
            Platform::Linux => {
                let mut cmd = Command::new(&self.tool);
                cmd.arg("mount").arg("-o").arg("loop").arg(image).arg(mount_point);
                ("sudo mount", cmd)
            }
        }
    }

    fn unmount_command(&self, mount_point: &Path) -> (&'static str, Command) {
        match self.platform {
            Platform::MacOs => {
                let mut cmd = Command::new(&self.tool);
                cmd.arg("unmount").arg(mount_point);
                ("hdiutil", cmd)
            }
            Platform::Linux => {
                let mut cmd = Command::new(&self.tool);
                cmd.arg("umount").arg(mount_point);
                ("sudo umount", cmd)
            }
        }
    }
}

impl VolumeMounter for SystemMounter {
    fn prepare(&self, _image: &Path) -> Result<PathBuf, MountError> {
        // Nested volumes each need their own directory under the shared location.
        let depth = self.depth.get();
        let name = if depth == 0 {
            MOUNT_POINT_NAME.to_string()
        } else {
            format!("{}_{}", MOUNT_POINT_NAME, depth)
        };
        let mount_point = self.location.join(name);
        fs::create_dir_all(&mount_point).map_err(|source| MountError::Prepare {
            path: mount_point.clone(),
            source,
        })?;
        self.depth.set(depth + 1);
        Ok(mount_point)
    }

    fn mount(&self, image: &Path, mount_point: &Path) -> Result<(), MountError> {
        let (program, mut cmd) = self.mount_command(image, mount_point);
        debug!("Mounting {:?} at {:?} via {}", image, mount_point, program);
        let output = cmd
            .output()
            .map_err(|source| MountError::Spawn { program, source })?;
        if !output.status.success() {
            return Err(MountError::Command {
                program,
                image: image.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn unmount(&self, mount_point: &Path) -> Result<(), MountError> {
        self.depth.set(self.depth.get().saturating_sub(1));

        let (program, mut cmd) = self.unmount_command(mount_point);
        // Detach is best-effort: failures are only traced and the directories are removed regardless.
        match cmd.output() {
            Ok(output) if !output.status.success() => debug!(
                "{} exited with {} for {:?}: {}",
                program,
                output.status,
                mount_point,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Ok(_) => {}
            Err(err) => debug!("Failed to run {} for {:?}: {}", program, mount_point, err),
        }

        remove_dir_if_present(mount_point)?;
        // The shared location only goes away once the outermost volume is released.
        if self.depth.get() == 0 {
            remove_dir_if_present(&self.location)?;
        }
        Ok(())
    }
}

fn remove_dir_if_present(path: &Path) -> Result<(), MountError> {
    match fs::remove_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MountError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A mounted volume. Dropping the guard unmounts it exactly once.
pub struct MountGuard<'a, M: VolumeMounter + ?Sized> {
    mounter: &'a M,
    root: PathBuf,
}

impl<'a, M: VolumeMounter + ?Sized> MountGuard<'a, M> {
    pub fn mount(mounter: &'a M, image: &Path) -> Result<Self, MountError> {
        let root = mounter.prepare(image)?;
        // Arm the guard before attaching so a half-finished mount is still released.
        let guard = Self { mounter, root };
        mounter.mount(image, &guard.root)?;
        Ok(guard)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl<M: VolumeMounter + ?Sized> Drop for MountGuard<'_, M> {
    fn drop(&mut self) {
        if let Err(err) = self.mounter.unmount(&self.root) {
            debug!("Unmount of {:?} failed: {:#}", self.root, anyhow::Error::new(err));
        }
    }
}
