//! End-to-end scenarios driven against `collab::test_support`'s fake
//! collaborators through `Translator::transact` exactly as a real kernel
//! round trip would drive it.

use crate::collab::test_support::{wide, FakePaths, FakeTokens, FakeTransport};
use crate::collab::{
    AccessMask, CreateRequest, NativeRequest, NativeRequestKind, ResponseBody, TokenHandle,
};
use crate::config::Config;
use crate::proto::{self, Opcode, RspHeader};
use crate::status::NtStatus;

use super::Translator;

const FILE_OPEN: u32 = 1 << 24;

fn translator(
    uid: u32,
    gid: u32,
) -> Translator<FakeTransport, FakePaths, FakeTokens> {
    let _ = env_logger::builder().is_test(true).try_init();
    Translator::new(
        FakeTransport::default(),
        FakePaths,
        FakeTokens { uid, gid, pid: 4242 },
        Config::default(),
    )
}

fn create_request(
    hint: u64,
    path: &str,
    disposition: u32,
    user_mode: bool,
    has_traverse_privilege: bool,
    desired_access: AccessMask,
    named_stream: bool,
) -> NativeRequest {
    NativeRequest {
        hint,
        kind: NativeRequestKind::Create(CreateRequest {
            path: wide(path),
            open_target_directory: false,
            create_options: disposition,
            named_stream,
            user_mode,
            has_traverse_privilege,
            desired_access,
            granted_access: AccessMask::empty(),
            access_token: Some(TokenHandle(1)),
        }),
    }
}

fn parse_outbound_unique(buf: &[u8], written: usize) -> u64 {
    let header: &proto::ReqHeader = bytemuck::from_bytes(&buf[..std::mem::size_of::<proto::ReqHeader>()]);
    assert_eq!(header.opcode, Opcode::Lookup as u32);
    assert!(written >= std::mem::size_of::<proto::ReqHeader>());
    header.unique
}

fn lookup_response(unique: u64, errno: i32, ino: u64, uid: u32, gid: u32, mode: u32) -> Vec<u8> {
    let attr = proto::Attr {
        ino,
        size: 0,
        mode,
        uid,
        gid,
        padding: 0,
    };

    let header_size = std::mem::size_of::<RspHeader>();
    let attr_size = std::mem::size_of::<proto::Attr>();
    let mut buf = vec![0u8; header_size + attr_size];

    let header = RspHeader {
        len: buf.len() as u32,
        error: errno,
        unique,
    };

    buf[..header_size].copy_from_slice(bytemuck::bytes_of(&header));
    buf[header_size..].copy_from_slice(bytemuck::bytes_of(&attr));
    buf
}

/// Scenario 1: open existing root. No `LOOKUP` exchange; the native
/// response carries `SUCCESS` and the requested access back immediately.
#[test]
fn open_existing_root() {
    let t = translator(1000, 1000);
    t.transport.push(create_request(
        1,
        "\\",
        FILE_OPEN,
        true,
        false,
        AccessMask::FILE_READ_DATA,
        false,
    ));

    let mut outbound = vec![0u8; proto::Q_MIN];
    let written = t.transact(None, &mut outbound).unwrap();
    assert_eq!(written, 0);

    let response = t.transport.take_completion(1).expect("completed synchronously");
    assert_eq!(response.io_status.status, NtStatus::Success);
    match response.body {
        ResponseBody::Create(body) => {
            assert!(body.granted_access.contains(AccessMask::FILE_READ_DATA));
        }
        _ => panic!("expected a Create response body"),
    }
}

/// Scenario 2: open existing file. One `LOOKUP(nodeid=ROOT, name="a")` is
/// emitted; a clean response completes the translation with `SUCCESS`.
#[test]
fn open_existing_file() {
    let t = translator(1000, 1000);
    t.transport.push(create_request(
        2,
        "\\a",
        FILE_OPEN,
        true,
        true,
        AccessMask::FILE_READ_DATA,
        false,
    ));

    let mut outbound = vec![0u8; proto::Q_MIN];
    let written = t.transact(None, &mut outbound).unwrap();
    assert!(written > 0, "expected a staged LOOKUP request");
    let unique = parse_outbound_unique(&outbound, written);

    let inbound = lookup_response(unique, 0, 42, 1000, 1000, 0o100644);
    let mut outbound2 = vec![0u8; proto::Q_MIN];
    let written2 = t.transact(Some(&inbound), &mut outbound2).unwrap();
    assert_eq!(written2, 0, "no further requests: path has one component");

    let response = t.transport.take_completion(2).expect("completed");
    assert_eq!(response.io_status.status, NtStatus::Success);
    match response.body {
        ResponseBody::Create(body) => {
            assert!(body.granted_access.contains(AccessMask::FILE_READ_DATA));
        }
        _ => panic!("expected a Create response body"),
    }
}

/// Scenario 3: ENOENT. The protocol error maps to `OBJECT_NAME_NOT_FOUND`
/// and no further exchanges happen.
#[test]
fn enoent_maps_to_object_name_not_found() {
    let t = translator(1000, 1000);
    t.transport.push(create_request(
        3,
        "\\a",
        FILE_OPEN,
        true,
        true,
        AccessMask::FILE_READ_DATA,
        false,
    ));

    let mut outbound = vec![0u8; proto::Q_MIN];
    let written = t.transact(None, &mut outbound).unwrap();
    let unique = parse_outbound_unique(&outbound, written);

    let inbound = lookup_response(unique, nix::errno::Errno::ENOENT as i32, 0, 0, 0, 0);
    let mut outbound2 = vec![0u8; proto::Q_MIN];
    t.transact(Some(&inbound), &mut outbound2).unwrap();

    let response = t.transport.take_completion(3).expect("completed");
    assert_eq!(response.io_status.status, NtStatus::ObjectNameNotFound);
}

/// Scenario 4: EACCES via the traverse-privilege access check. `"a"` is a
/// private directory owned by someone else; `"b"` is never looked up.
#[test]
fn eacces_via_traverse_check() {
    let t = translator(1000, 1000);
    t.transport.push(create_request(
        4,
        "\\a\\b",
        FILE_OPEN,
        true,
        true,
        AccessMask::FILE_READ_DATA,
        false,
    ));

    let mut outbound = vec![0u8; proto::Q_MIN];
    let written = t.transact(None, &mut outbound).unwrap();
    let unique = parse_outbound_unique(&outbound, written);

    const S_IFDIR: u32 = 0o040000;
    let inbound = lookup_response(unique, 0, 7, 2000, 2000, S_IFDIR | 0o700);
    let mut outbound2 = vec![0u8; proto::Q_MIN];
    let written2 = t.transact(Some(&inbound), &mut outbound2).unwrap();
    assert_eq!(written2, 0, "\"b\" must never be looked up");

    let response = t.transport.take_completion(4).expect("completed");
    assert_eq!(response.io_status.status, NtStatus::AccessDenied);
}

/// Scenario 5: a response whose `unique` matches no in-flight context is
/// bogus/stale; `transact` succeeds with zero bytes written and the queue
/// is left unchanged.
#[test]
fn stale_response_is_tolerated() {
    let t = translator(1000, 1000);
    let inbound = lookup_response(0xDEAD, 0, 1, 1, 1, 0o644);
    let written = t.transact(Some(&inbound), &mut []).unwrap();
    assert_eq!(written, 0);
}

/// A volume torn down mid-session refuses further rounds with `CANCELLED`
/// rather than touching the queue.
#[test]
fn cancelled_volume_refuses_transact() {
    let t = translator(1000, 1000);
    t.transport.cancel();

    let mut outbound = vec![0u8; proto::Q_MIN];
    let err = t.transact(None, &mut outbound).unwrap_err();
    assert!(matches!(err, crate::error::CoreError::Cancelled));
}

/// Scenario 6: a named-stream create is rejected before any POSIX
/// translation or protocol exchange is attempted.
#[test]
fn named_stream_is_rejected() {
    let t = translator(1000, 1000);
    t.transport.push(create_request(
        6,
        "\\a:stream",
        FILE_OPEN,
        true,
        true,
        AccessMask::FILE_READ_DATA,
        true,
    ));

    let mut outbound = vec![0u8; proto::Q_MIN];
    let written = t.transact(None, &mut outbound).unwrap();
    assert_eq!(written, 0);

    let response = t.transport.take_completion(6).expect("completed synchronously");
    assert_eq!(response.io_status.status, NtStatus::ObjectNameInvalid);
}
