//! FUSE-wire-format request/response envelopes exchanged with the user-mode
//! server. Based on libfuse/include/fuse_kernel.h, the same lineage
//! `blown-fuse::proto` documents — but here the core is the *client*: it
//! fills in `ReqHeader` and parses `RspHeader`, the mirror image of a FUSE
//! daemon's role.

use std::ffi::CStr;

use bytemuck_derive::{Pod, Zeroable};
use num_enum::TryFromPrimitive;

use crate::error::CoreError;

/// Inode id of the volume root. Fixed by the protocol.
pub const ROOT_ID: u64 = 1;

/// Lower bound on a single request envelope's length, used to validate
/// `outbound_cap` in `transact`.
pub const Q_MIN: usize = std::mem::size_of::<ReqHeader>() + 256;

/// Lower bound on a response envelope.
pub const RSP_HEADER_SIZE: usize = std::mem::size_of::<RspHeader>();

#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum Opcode {
    Lookup = 1,
    Forget = 2,
    Getattr = 3,
    Open = 14,
    Release = 18,
    Create = 35,
    Unlink = 10,
}

#[derive(Pod, Zeroable, Copy, Clone, Debug)]
#[repr(C)]
pub struct ReqHeader {
    pub len: u32,
    pub opcode: u32,
    pub unique: u64,
    pub nodeid: u64,
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
    pub padding: u32,
}

#[derive(Pod, Zeroable, Copy, Clone, Debug)]
#[repr(C)]
pub struct RspHeader {
    pub len: u32,
    pub error: i32,
    pub unique: u64,
}

/// Attributes carried by a `LOOKUP` response.
#[derive(Pod, Zeroable, Copy, Clone, Debug, Default)]
#[repr(C)]
pub struct Attr {
    pub ino: u64,
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub padding: u32,
}

/// Decoded `LOOKUP` response payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupOut {
    pub attr: Attr,
}

impl ReqHeader {
    pub fn lookup(unique: u64, nodeid: u64, uid: u32, gid: u32, pid: u32, len: u32) -> Self {
        ReqHeader {
            len,
            opcode: Opcode::Lookup as u32,
            unique,
            nodeid,
            uid,
            gid,
            pid,
            padding: 0,
        }
    }
}

/// Parses and validates a response envelope against the buffer it arrived
/// in: the declared length must fall within `[header_size, buf.len()]`.
pub fn parse_response(buf: &[u8]) -> Result<(&RspHeader, &[u8]), CoreError> {
    if buf.len() < RSP_HEADER_SIZE {
        return Err(CoreError::InvalidParameter("response shorter than header"));
    }

    let header: &RspHeader = bytemuck::from_bytes(&buf[..RSP_HEADER_SIZE]);
    let len = header.len as usize;
    if len < RSP_HEADER_SIZE || len > buf.len() {
        return Err(CoreError::InvalidParameter(
            "response length out of bounds",
        ));
    }

    Ok((header, &buf[RSP_HEADER_SIZE..len]))
}

/// Decodes the `LOOKUP` response payload that follows `RspHeader`.
pub fn parse_lookup_out(payload: &[u8]) -> Result<LookupOut, CoreError> {
    if payload.len() < std::mem::size_of::<Attr>() {
        return Err(CoreError::Truncated);
    }

    let attr: &Attr = bytemuck::from_bytes(&payload[..std::mem::size_of::<Attr>()]);
    Ok(LookupOut { attr: *attr })
}

/// Writes a null-terminated path component after the header into `out`,
/// returning the total envelope length.
pub fn write_lookup_request(
    out: &mut [u8],
    unique: u64,
    nodeid: u64,
    uid: u32,
    gid: u32,
    pid: u32,
    name: &CStr,
) -> Result<u32, CoreError> {
    let name_bytes = name.to_bytes_with_nul();
    let header_size = std::mem::size_of::<ReqHeader>();
    let total = header_size + name_bytes.len();

    if out.len() < total {
        return Err(CoreError::BufferTooSmall);
    }

    let header = ReqHeader::lookup(unique, nodeid, uid, gid, pid, total as u32);
    out[..header_size].copy_from_slice(bytemuck::bytes_of(&header));
    out[header_size..total].copy_from_slice(name_bytes);

    Ok(total as u32)
}
