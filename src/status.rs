//! Native-OS completion status codes and the errno table that feeds them.
//!
//! Named and valued loosely after NTSTATUS. Only the codes this crate
//! actually produces are modelled; the numeric values are internally
//! consistent but not claimed to match any particular ABI.

use nix::errno::Errno;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum NtStatus {
    Success = 0,
    ObjectNameNotFound = -1,
    AccessDenied = -2,
    ObjectNameCollision = -3,
    NotADirectory = -4,
    FileIsADirectory = -5,
    NameTooLong = -6,
    DiskFull = -7,
    MediaWriteProtected = -8,
    InsufficientResources = -9,
    InvalidDeviceRequest = -10,
    InvalidParameter = -11,
    BufferTooSmall = -12,
    Cancelled = -13,
    ObjectNameInvalid = -14,
    NotImplemented = -15,
}

impl NtStatus {
    pub fn is_success(self) -> bool {
        matches!(self, NtStatus::Success)
    }
}

/// errno -> native status. Unknown errno maps to `InvalidDeviceRequest`.
pub fn status_from_errno(errno: i32) -> NtStatus {
    if errno == 0 {
        return NtStatus::Success;
    }

    match Errno::from_i32(errno) {
        Errno::ENOENT => NtStatus::ObjectNameNotFound,
        Errno::EACCES => NtStatus::AccessDenied,
        Errno::EEXIST => NtStatus::ObjectNameCollision,
        Errno::ENOTDIR => NtStatus::NotADirectory,
        Errno::EISDIR => NtStatus::FileIsADirectory,
        Errno::ENAMETOOLONG => NtStatus::NameTooLong,
        Errno::ENOSPC => NtStatus::DiskFull,
        Errno::EROFS => NtStatus::MediaWriteProtected,
        Errno::ENOMEM => NtStatus::InsufficientResources,
        _ => NtStatus::InvalidDeviceRequest,
    }
}

impl From<CoreError> for NtStatus {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidParameter(_) => NtStatus::InvalidParameter,
            CoreError::BufferTooSmall => NtStatus::BufferTooSmall,
            CoreError::Cancelled => NtStatus::Cancelled,
            CoreError::InsufficientResources => NtStatus::InsufficientResources,
            CoreError::Truncated => NtStatus::InvalidParameter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_errno_mapped() {
        assert_eq!(status_from_errno(0), NtStatus::Success);
        assert_eq!(
            status_from_errno(Errno::ENOENT as i32),
            NtStatus::ObjectNameNotFound
        );
        assert_eq!(
            status_from_errno(Errno::EACCES as i32),
            NtStatus::AccessDenied
        );
    }

    #[test]
    fn unknown_errno_falls_back() {
        assert_eq!(status_from_errno(0x4242), NtStatus::InvalidDeviceRequest);
    }
}
