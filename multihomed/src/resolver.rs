//! Interface-name resolution.
//!
//! Address and route handlers only see interface indices; the mapping is
//! keyed by name. The trait seam exists so the reconciler can be driven
//! by recorded event streams in tests, without a kernel behind it.

use std::ffi::CStr;

use nix::libc;

pub trait ResolveLinkName {
    /// The name of the interface with the given index, if it exists.
    fn link_name(&self, index: u32) -> Option<String>;
}

/// Resolves through the kernel via `if_indextoname(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysLinkNames;

impl ResolveLinkName for SysLinkNames {
    fn link_name(&self, index: u32) -> Option<String> {
        let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
        let name = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
        if name.is_null() {
            return None;
        }
        let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
        name.to_str().ok().map(str::to_owned)
    }
}
