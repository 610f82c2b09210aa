//! Marshaling small payloads into the core's linear memory.
//!
//! Every payload lives in a scoped allocation: allocate with the core's `malloc`,
//! write, run the native call, then `free` on every exit path.

use crate::abi::{GuestPtr, Vec3};
use crate::error::{GlueError, GlueResult};

use wasmtime::{Memory, Store, TypedFunc};

/// The core's allocator pair, as resolved from its exports.
#[derive(Clone, Copy)]
pub struct Allocator<'a> {
    pub malloc: Option<&'a TypedFunc<u32, u32>>,
    pub free: Option<&'a TypedFunc<u32, ()>>,
}

impl Allocator<'_> {
    /// Allocate `len` bytes. Returns [`GuestPtr::NULL`] when there is no allocator
    /// or the allocator itself returned null.
    pub fn alloc<T: 'static>(&self, store: &mut Store<T>, len: u32) -> GlueResult<GuestPtr> {
        let Some(malloc) = self.malloc else {
            return Ok(GuestPtr::NULL);
        };
        let ptr = malloc.call(&mut *store, len).map_err(GlueError::Trap)?;
        Ok(GuestPtr(ptr))
    }

    /// Release `ptr`. Null pointers and a missing `free` are ignored; a trapping
    /// `free` is logged, since the caller's result matters more.
    pub fn release<T: 'static>(&self, store: &mut Store<T>, ptr: GuestPtr) {
        if ptr.is_null() {
            return;
        }
        let Some(free) = self.free else {
            return;
        };
        if let Err(e) = free.call(&mut *store, ptr.0) {
            tracing::warn!(ptr = ptr.0, error = %e, "native free trapped");
        }
    }
}

/// Run `f` with `bytes` copied into a fresh allocation.
///
/// `f` receives [`GuestPtr::NULL`] when nothing could be allocated.
pub fn with_bytes<T: 'static, R>(
    store: &mut Store<T>,
    memory: Option<Memory>,
    allocator: Allocator<'_>,
    bytes: &[u8],
    f: impl FnOnce(&mut Store<T>, GuestPtr) -> GlueResult<R>,
) -> GlueResult<R> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| GlueError::Memory(format!("payload of {} bytes too large", bytes.len())))?;
    let ptr = allocator.alloc(store, len)?;

    if !ptr.is_null() {
        let written = match memory {
            Some(memory) => memory
                .write(&mut *store, ptr.0 as usize, bytes)
                .map_err(GlueError::from),
            None => Err(GlueError::Capability("exported linear memory")),
        };
        if let Err(e) = written {
            allocator.release(store, ptr);
            return Err(e);
        }
    }

    let result = f(store, ptr);
    allocator.release(store, ptr);
    result
}

/// Run `f` with `v` marshaled as three little-endian `f32` (x, y, z).
pub fn with_vec3<T: 'static, R>(
    store: &mut Store<T>,
    memory: Option<Memory>,
    allocator: Allocator<'_>,
    v: Vec3,
    f: impl FnOnce(&mut Store<T>, GuestPtr) -> GlueResult<R>,
) -> GlueResult<R> {
    with_bytes(store, memory, allocator, &v.to_le_bytes(), f)
}

/// Run `f` with a fresh allocation of `len` bytes, then read the bytes back.
///
/// `len` must fit in the core's linear memory; nothing is allocated otherwise.
pub fn with_out_buffer<T: 'static, R>(
    store: &mut Store<T>,
    memory: Memory,
    allocator: Allocator<'_>,
    len: u32,
    f: impl FnOnce(&mut Store<T>, GuestPtr) -> GlueResult<R>,
) -> GlueResult<(R, Vec<u8>)> {
    let available = memory.data_size(&*store);
    if len as usize > available {
        return Err(GlueError::Memory(format!(
            "buffer of {len} bytes exceeds linear memory of {available} bytes"
        )));
    }

    let ptr = allocator.alloc(store, len)?;
    if ptr.is_null() {
        return Err(GlueError::Capability("native allocator"));
    }

    let result = f(store, ptr).and_then(|r| {
        let mut out = vec![0u8; len as usize];
        memory.read(&*store, ptr.0 as usize, &mut out)?;
        Ok((r, out))
    });
    allocator.release(store, ptr);
    result
}
