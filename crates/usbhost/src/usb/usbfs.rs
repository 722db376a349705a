//! Linux usbfs backend
//!
//! Device nodes live under `/dev/bus/usb/<bus>/<device>`. Reading a freshly
//! opened node yields the device descriptor followed by every configuration
//! descriptor; interface claims go through `USBDEVFS_*` ioctls.

use super::node::{ControlRequest, DeviceNode, NodeBackend};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default usbfs mount point
pub const DEFAULT_USBFS_ROOT: &str = "/dev/bus/usb";

mod ioctl {
    // USBDEVFS_CLAIMINTERFACE / USBDEVFS_RELEASEINTERFACE take a pointer to
    // the interface number
    nix::ioctl_read!(claim_interface, b'U', 15, u32);
    nix::ioctl_read!(release_interface, b'U', 16, u32);
}

/// usbfs directory tree
#[derive(Debug, Clone)]
pub struct UsbfsBackend {
    root: PathBuf,
}

impl UsbfsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn list_dir(path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => debug!("Ignoring non-UTF-8 entry {:?} in {}", raw, path.display()),
            }
        }
        Ok(names)
    }
}

impl Default for UsbfsBackend {
    fn default() -> Self {
        Self::new(DEFAULT_USBFS_ROOT)
    }
}

impl NodeBackend for UsbfsBackend {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_buses(&self) -> io::Result<Vec<String>> {
        Self::list_dir(&self.root)
    }

    fn list_devices(&self, bus: &str) -> io::Result<Vec<String>> {
        Self::list_dir(&self.root.join(bus))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn DeviceNode>> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Box::new(UsbfsNode { file }))
    }
}

/// Open usbfs node; the descriptor closes when the `File` drops
#[derive(Debug)]
pub struct UsbfsNode {
    file: File,
}

impl DeviceNode for UsbfsNode {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    fn control(&mut self, request: ControlRequest) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        let mut interface = request.interface();
        // SAFETY: fd is owned by self.file and stays open for the call;
        // the kernel reads one u32 through the pointer.
        let result = unsafe {
            match request {
                ControlRequest::ClaimInterface(_) => ioctl::claim_interface(fd, &mut interface),
                ControlRequest::ReleaseInterface(_) => ioctl::release_interface(fd, &mut interface),
            }
        };
        result.map(|_| ()).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_root() {
        assert_eq!(UsbfsBackend::default().root(), Path::new("/dev/bus/usb"));
    }

    #[test]
    fn test_list_and_read_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("001")).unwrap();
        let node_path = dir.path().join("001").join("002");
        File::create(&node_path)
            .unwrap()
            .write_all(&[1, 2, 3, 4])
            .unwrap();

        let backend = UsbfsBackend::new(dir.path());
        assert_eq!(backend.list_buses().unwrap(), vec!["001".to_string()]);
        assert_eq!(backend.list_devices("001").unwrap(), vec!["002".to_string()]);
        assert_eq!(backend.node_path("001", "002"), node_path);

        let mut node = backend.open(&node_path).unwrap();
        assert!(node.raw_fd() >= 0);
        let mut buf = [0u8; 3];
        assert_eq!(node.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        // Only one byte remains: a short read, not an error
        assert_eq!(node.read(&mut buf).unwrap(), 1);
    }

    #[test]
    fn test_control_on_plain_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node");
        File::create(&path).unwrap();

        let backend = UsbfsBackend::new(dir.path());
        let mut node = backend.open(&path).unwrap();
        assert!(node.control(ControlRequest::ClaimInterface(0)).is_err());
    }

    #[test]
    fn test_open_missing_node() {
        let backend = UsbfsBackend::new("/nonexistent-usbfs-root");
        let err = backend
            .open(Path::new("/nonexistent-usbfs-root/001/001"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(backend.list_buses().is_err());
    }
}
