//! Linux inotify implementation of the backend traits.
//!
//! One inotify descriptor carries every watch; an eventfd alongside it lets
//! `interrupt` wake a reader blocked in `poll`, since a stop request must
//! not wait for filesystem activity to be observed.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::EventMask;
use crate::notifier::WatchError;
use crate::types::WatchHandle;

use super::{ChannelError, EventChannel, WatchSource};

/// Inotify-backed watch source and event channel.
pub struct InotifyBackend {
    inotify_fd: libc::c_int,
    wake_fd: libc::c_int,
    closed: AtomicBool,
}

impl InotifyBackend {
    /// Open an inotify instance and its wakeup descriptor.
    pub fn new() -> Result<Self, ChannelError> {
        let inotify_fd = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
        if inotify_fd < 0 {
            return Err(ChannelError::Init {
                source: io::Error::last_os_error(),
            });
        }

        let wake_fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC) };
        if wake_fd < 0 {
            let source = io::Error::last_os_error();
            unsafe { libc::close(inotify_fd) };
            return Err(ChannelError::Init { source });
        }

        Ok(Self {
            inotify_fd,
            wake_fd,
            closed: AtomicBool::new(false),
        })
    }
}

impl WatchSource for InotifyBackend {
    fn add_watch(&self, path: &Path, mask: EventMask) -> Result<WatchHandle, WatchError> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| WatchError::PathNotFound(path.to_path_buf()))?;

        let wd = unsafe { libc::inotify_add_watch(self.inotify_fd, c_path.as_ptr(), mask.bits()) };
        if wd < 0 {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::ENOENT) => WatchError::PathNotFound(path.to_path_buf()),
                Some(libc::EACCES) => WatchError::PermissionDenied(path.to_path_buf()),
                Some(libc::ENOSPC) | Some(libc::EMFILE) | Some(libc::ENFILE) => {
                    WatchError::ResourceLimit
                }
                _ => WatchError::Channel(ChannelError::Io { source: err }),
            });
        }

        Ok(WatchHandle::from_raw(wd))
    }

    fn remove_watch(&self, handle: WatchHandle) -> Result<(), WatchError> {
        let rc = unsafe { libc::inotify_rm_watch(self.inotify_fd, handle.as_raw()) };
        if rc < 0 {
            // EINVAL: the kernel already dropped this descriptor
            return Err(WatchError::UnknownHandle(handle));
        }
        Ok(())
    }
}

impl EventChannel for InotifyBackend {
    fn read_batch(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ChannelError::Closed);
            }

            let mut fds = [
                libc::pollfd {
                    fd: self.inotify_fd,
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.wake_fd,
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];

            let rc = unsafe { libc::poll(fds.as_mut_ptr(), 2, -1) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ChannelError::Io { source: err });
            }

            if fds[1].revents & libc::POLLIN != 0 {
                return Err(ChannelError::Closed);
            }

            if fds[0].revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
                let n = unsafe {
                    libc::read(
                        self.inotify_fd,
                        buf.as_mut_ptr() as *mut libc::c_void,
                        buf.len(),
                    )
                };
                if n < 0 {
                    let err = io::Error::last_os_error();
                    match err.kind() {
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => continue,
                        _ => return Err(ChannelError::Io { source: err }),
                    }
                }
                return Ok(n as usize);
            }
        }
    }

    fn interrupt(&self) {
        let one: u64 = 1;
        unsafe {
            libc::write(
                self.wake_fd,
                &one as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            );
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Wake any reader still parked in poll before the fds go away
            self.interrupt();
            unsafe {
                libc::close(self.inotify_fd);
                libc::close(self.wake_fd);
            }
        }
    }
}

impl Drop for InotifyBackend {
    fn drop(&mut self) {
        self.close();
    }
}
