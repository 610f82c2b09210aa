//! The core's virtual filesystem.
//!
//! The native core finds its ROM by path, so the host must be able to place
//! files where the core looks. [`HostDirFs`] backs the virtual filesystem with a
//! host directory that the runtime preopens at `/` for the core (WASI).

use std::io;
use std::path::{Component, Path, PathBuf};

/// Filesystem operations the ROM loader needs.
///
/// Paths are absolute virtual paths (`/roms/rom.gba`).
pub trait VirtualFs {
    fn exists(&self, path: &str) -> bool;
    fn remove_dir_all(&mut self, path: &str) -> io::Result<()>;
    fn create_dir(&mut self, path: &str) -> io::Result<()>;
    fn write_file(&mut self, path: &str, data: &[u8]) -> io::Result<()>;
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Virtual filesystem rooted at a host directory.
#[derive(Clone, Debug)]
pub struct HostDirFs {
    root: PathBuf,
}

impl HostDirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a virtual path to a host path, refusing anything that escapes the root.
    pub fn host_path(&self, path: &str) -> io::Result<PathBuf> {
        let mut out = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => out.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("virtual path escapes the filesystem root: {path}"),
                    ));
                }
            }
        }
        Ok(out)
    }
}

impl VirtualFs for HostDirFs {
    fn exists(&self, path: &str) -> bool {
        self.host_path(path).is_ok_and(|p| p.exists())
    }

    fn remove_dir_all(&mut self, path: &str) -> io::Result<()> {
        std::fs::remove_dir_all(self.host_path(path)?)
    }

    fn create_dir(&mut self, path: &str) -> io::Result<()> {
        std::fs::create_dir_all(self.host_path(path)?)
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> io::Result<()> {
        std::fs::write(self.host_path(path)?, data)
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.host_path(path)?)
    }
}

/// Check that `name` is a single plain path component.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
