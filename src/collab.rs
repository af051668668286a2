//! The native-OS I/O dispatch glue, access-token/SID resolution, and the
//! wide-path↔POSIX-path transliteration utility this crate depends on but
//! doesn't own. Each is a narrow trait so the translator core can be driven
//! and tested without a kernel build.

use bitflags::bitflags;

use crate::error::CoreResult;
use crate::status::NtStatus;

bitflags! {
    /// Native access-right mask (`DesiredAccess`/`GrantedAccess`).
    #[derive(Default)]
    pub struct AccessMask: u32 {
        const FILE_READ_DATA        = 0x0000_0001;
        const FILE_WRITE_DATA       = 0x0000_0002;
        const FILE_APPEND_DATA      = 0x0000_0004;
        const FILE_READ_EA          = 0x0000_0008;
        const FILE_WRITE_EA         = 0x0000_0010;
        const FILE_EXECUTE          = 0x0000_0020;
        const FILE_DELETE_CHILD     = 0x0000_0040;
        const FILE_READ_ATTRIBUTES  = 0x0000_0080;
        const FILE_WRITE_ATTRIBUTES = 0x0000_0100;
        const DELETE                = 0x0001_0000;
        const READ_CONTROL          = 0x0002_0000;
        const WRITE_DAC             = 0x0004_0000;
        const WRITE_OWNER           = 0x0008_0000;
        const SYNCHRONIZE           = 0x0010_0000;
        const MAXIMUM_ALLOWED       = 0x0200_0000;
        const GENERIC_ALL           = 0x1000_0000;

        /// Alias of `FILE_EXECUTE`: the bit consulted for directory
        /// traversal checks, kept as a distinct name for readability at
        /// call sites.
        const FILE_TRAVERSE         = 0x0000_0020;
    }
}

/// High byte of `CreateOptions`: the create-intent disposition. Numeric
/// values match the native ABI this crate stands in for, so the dispatcher
/// in `ops::create` can be driven by raw bytes coming off the wire without
/// a translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Supersede,
    Open,
    Create,
    OpenIf,
    Overwrite,
    OverwriteIf,
}

impl Disposition {
    pub fn from_create_options(create_options: u32) -> Option<Disposition> {
        match (create_options >> 24) & 0xff {
            0 => Some(Disposition::Supersede),
            1 => Some(Disposition::Open),
            2 => Some(Disposition::Create),
            3 => Some(Disposition::OpenIf),
            4 => Some(Disposition::Overwrite),
            5 => Some(Disposition::OverwriteIf),
            _ => None,
        }
    }
}

/// Opaque access-token handle carried by a create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHandle(pub u64);

/// The native `create` request payload.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub path: Vec<u16>,
    pub open_target_directory: bool,
    pub create_options: u32,
    pub named_stream: bool,
    pub user_mode: bool,
    pub has_traverse_privilege: bool,
    pub desired_access: AccessMask,
    pub granted_access: AccessMask,
    pub access_token: Option<TokenHandle>,
}

#[derive(Debug, Clone)]
pub struct CleanupRequest {
    pub handle: u64,
}

#[derive(Debug, Clone)]
pub struct CloseRequest {
    pub handle: u64,
}

/// The essential attributes of a native request.
#[derive(Debug, Clone)]
pub enum NativeRequestKind {
    Create(CreateRequest),
    Cleanup(CleanupRequest),
    Close(CloseRequest),
    /// Any other native request kind: the dispatch table is populated for
    /// it but this crate implements no behavior.
    Other,
}

/// A native request, as delivered by the native-OS dispatch glue.
#[derive(Debug, Clone)]
pub struct NativeRequest {
    pub hint: u64,
    pub kind: NativeRequestKind,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateResponseBody {
    pub granted_access: AccessMask,
}

#[derive(Debug, Clone, Copy)]
pub enum ResponseBody {
    None,
    Create(CreateResponseBody),
}

#[derive(Debug, Clone, Copy)]
pub struct IoStatus {
    pub status: NtStatus,
    pub information: u64,
}

/// The native response, delivered back through `NativeTransport::complete`.
#[derive(Debug, Clone, Copy)]
pub struct NativeResponse {
    pub io_status: IoStatus,
    pub body: ResponseBody,
}

impl NativeResponse {
    pub fn status_only(status: NtStatus) -> Self {
        NativeResponse {
            io_status: IoStatus {
                status,
                information: 0,
            },
            body: ResponseBody::None,
        }
    }

    pub fn create_ok(granted_access: AccessMask) -> Self {
        NativeResponse {
            io_status: IoStatus {
                status: NtStatus::Success,
                information: 0,
            },
            body: ResponseBody::Create(CreateResponseBody { granted_access }),
        }
    }
}

/// The native-OS I/O dispatch glue: delivers native requests into the core
/// and carries native responses back out. Modelled as pull/push rather
/// than a queue the core owns, since the core only ever needs to pull one
/// fresh request per round and that pull may come back empty.
pub trait NativeTransport {
    /// Non-blocking: returns `None` if no request is currently available.
    fn next_request(&self) -> Option<NativeRequest>;

    /// Delivers a completed native response for the request tagged `hint`.
    fn complete(&self, hint: u64, response: NativeResponse);

    /// Stands in for the device/volume reference-counting collaborator:
    /// `transact` consults this before doing any work.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Resolves an access-token handle to the caller's uid/gid/pid, standing in
/// for `ZwOpenProcessTokenEx`/`SeQueryInformationToken`.
pub trait TokenResolver {
    fn resolve(&self, token: TokenHandle) -> CoreResult<(u32, u32, u32)>;
}

/// Translates a native (wide-character) path into the POSIX path the core
/// walks component-by-component; a stable, given contract owned outside
/// this crate.
pub trait PathTranslator {
    fn to_posix(&self, wide_path: &[u16]) -> CoreResult<Vec<u8>>;
}
