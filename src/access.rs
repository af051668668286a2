//! Pure POSIX-mode-to-native-access-mask translation. No I/O and no
//! dependency on `Context`, so the same inputs always yield the same
//! granted mask.

use crate::collab::AccessMask;

const S_IFDIR: u32 = 0o040000;
const S_ISVTX: u32 = 0o001000;

const OWNER_DEFAULT: AccessMask = AccessMask::from_bits_truncate(
    AccessMask::SYNCHRONIZE.bits()
        | AccessMask::READ_CONTROL.bits()
        | AccessMask::FILE_WRITE_ATTRIBUTES.bits()
        | AccessMask::FILE_READ_ATTRIBUTES.bits()
        | AccessMask::FILE_WRITE_EA.bits()
        | AccessMask::FILE_READ_EA.bits()
        | AccessMask::DELETE.bits()
        | AccessMask::WRITE_DAC.bits()
        | AccessMask::WRITE_OWNER.bits(),
);

const OTHER_DEFAULT: AccessMask = AccessMask::from_bits_truncate(
    AccessMask::SYNCHRONIZE.bits()
        | AccessMask::READ_CONTROL.bits()
        | AccessMask::FILE_WRITE_ATTRIBUTES.bits()
        | AccessMask::FILE_READ_ATTRIBUTES.bits()
        | AccessMask::FILE_WRITE_EA.bits()
        | AccessMask::FILE_READ_EA.bits(),
);

/// The uid/gid/mode of the file a create/open request resolved to, as
/// reported by the `LOOKUP` response's attr payload.
#[derive(Debug, Clone, Copy)]
pub struct FileAttr {
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
}

impl FileAttr {
    pub fn is_directory(&self) -> bool {
        self.mode & S_IFDIR != 0
    }

    fn sticky(&self) -> bool {
        self.mode & S_ISVTX != 0
    }

    fn rwx_for(&self, orig_uid: u32, orig_gid: u32) -> (bool, bool, bool, bool) {
        let is_owner = self.uid == orig_uid;
        let shift = if is_owner {
            6
        } else if self.gid == orig_gid {
            3
        } else {
            0
        };

        let bits = (self.mode >> shift) & 0o7;
        (is_owner, bits & 0o4 != 0, bits & 0o2 != 0, bits & 0o1 != 0)
    }
}

/// The POSIX access this file grants to the calling uid/gid, mapped to
/// native access bits by a fixed table: owner/group/world each get a
/// baseline set of attribute/metadata rights plus their rwx bits mapped
/// onto `FILE_READ_DATA`/`FILE_EXECUTE`/`FILE_WRITE_DATA`.
pub fn file_access(file: FileAttr, orig_uid: u32, orig_gid: u32) -> AccessMask {
    let (is_owner, read, write, exec) = file.rwx_for(orig_uid, orig_gid);
    let mut mask = if is_owner {
        OWNER_DEFAULT
    } else {
        OTHER_DEFAULT
    };

    if read {
        mask |= AccessMask::FILE_READ_DATA;
    }

    if exec {
        mask |= AccessMask::FILE_EXECUTE;
    }

    if write {
        mask |= AccessMask::FILE_WRITE_DATA
            | AccessMask::FILE_WRITE_ATTRIBUTES
            | AccessMask::FILE_APPEND_DATA;

        if file.is_directory() && !file.sticky() && is_owner {
            mask |= AccessMask::FILE_DELETE_CHILD;
        }
    }

    mask
}

/// Intersects (or, under `MAXIMUM_ALLOWED`, unions) `desired` with the
/// file's POSIX-derived access. Returns the granted mask, or `None` if
/// `desired`'s required bits are not covered (the caller should fail the
/// request with `ACCESS_DENIED`).
pub fn access_check(
    file: FileAttr,
    orig_uid: u32,
    orig_gid: u32,
    desired: AccessMask,
) -> Option<AccessMask> {
    let available = file_access(file, orig_uid, orig_gid);

    if desired.contains(AccessMask::MAXIMUM_ALLOWED) {
        return Some(available | (desired - AccessMask::MAXIMUM_ALLOWED));
    }

    let granted = desired & available;
    if granted != desired {
        None
    } else {
        Some(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn attr(mode: u32, uid: u32, gid: u32) -> FileAttr {
        FileAttr { uid, gid, mode }
    }

    #[test]
    fn owner_read_write_grants_data_bits() {
        let file = attr(0o644, 1000, 1000);
        let granted = access_check(file, 1000, 1000, AccessMask::FILE_READ_DATA).unwrap();
        assert!(granted.contains(AccessMask::FILE_READ_DATA));
    }

    #[test]
    fn stranger_denied_on_private_file() {
        let file = attr(0o700, 1000, 1000);
        assert!(access_check(file, 2000, 2000, AccessMask::FILE_READ_DATA).is_none());
    }

    #[test]
    fn maximum_allowed_unions_available_access() {
        let file = attr(0o644, 1000, 1000);
        let granted = access_check(file, 1000, 1000, AccessMask::MAXIMUM_ALLOWED).unwrap();
        assert!(granted.contains(AccessMask::FILE_READ_DATA));
        assert!(granted.contains(AccessMask::FILE_WRITE_DATA));
    }

    proptest! {
        /// `access_check` is a pure function: the same file attributes,
        /// caller identity, and desired access always yield the same
        /// granted mask, no matter how many times it's called.
        #[test]
        fn is_idempotent(
            mode in 0u32..=0o7777,
            file_uid in 0u32..4,
            file_gid in 0u32..4,
            orig_uid in 0u32..4,
            orig_gid in 0u32..4,
            desired in 0u32..=AccessMask::all().bits(),
        ) {
            let file = attr(mode, file_uid, file_gid);
            let desired = AccessMask::from_bits_truncate(desired);

            let a = access_check(file, orig_uid, orig_gid, desired);
            let b = access_check(file, orig_uid, orig_gid, desired);
            prop_assert_eq!(a.map(|m| m.bits()), b.map(|m| m.bits()));
        }
    }

    #[test]
    fn delete_child_only_for_owner_non_sticky_directory() {
        let wanted = AccessMask::FILE_WRITE_DATA | AccessMask::FILE_DELETE_CHILD;

        let dir = attr(S_IFDIR | 0o777, 1000, 1000);
        let granted = access_check(dir, 1000, 1000, wanted).unwrap();
        assert!(granted.contains(AccessMask::FILE_DELETE_CHILD));

        let sticky_dir = attr(S_IFDIR | S_ISVTX | 0o777, 1000, 1000);
        assert!(access_check(sticky_dir, 1000, 1000, wanted).is_none());
    }
}
