//! Argument/return marshaling storage — the unit of ABI-stable data
//! exchange for one intercepted call.
//!
//! One `InvocationStorage` is allocated at the trampoline entry, carries the
//! packed argument bytes plus the return-value slot through the hook chain,
//! and is destroyed when the call completes (context destruction). Offsets
//! and count are computed once from the compile-time argument type list and
//! never change for the lifetime of the call.
//!
//! # Declared layout
//!
//! The struct crosses the module boundary behind a pointer, so its field
//! offsets are contractual: return-data pointer (0), argument-data pointer
//! (8), offset-table pointer (16), argument count (24). The trailing
//! `ret_size`/`arg_bytes` fields (28, 32) let the owning side deallocate and
//! slot-check; they are part of the same declared layout.

use std::alloc::{alloc, alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::mem;
use std::ptr;

use crate::error::{AbiError, AbiResult};
use crate::marshal::{ArgPack, Marshal};

/// Alignment of the return and argument allocations. Arguments are read and
/// written unaligned within the buffer, so this only has to satisfy the
/// allocator.
const BUF_ALIGN: usize = 16;

/// Raw byte buffer holding one call's marshaled arguments and return slot.
#[repr(C)]
pub struct InvocationStorage {
    /// Return-value slot, zero-initialized; null when the return type is `()`
    ret_data: *mut u8,
    /// Packed argument bytes; null when the total argument size is zero
    arg_data: *mut u8,
    /// Prefix-sum offset table, one entry per argument
    arg_offsets: *mut u32,
    /// Number of marshaled arguments
    arg_count: u32,
    /// Byte width of the return slot
    ret_size: u32,
    /// Total byte width of the argument buffer
    arg_bytes: u32,
}

const _: () = {
    assert!(mem::offset_of!(InvocationStorage, ret_data) == 0);
    assert!(mem::offset_of!(InvocationStorage, arg_data) == 8);
    assert!(mem::offset_of!(InvocationStorage, arg_offsets) == 16);
    assert!(mem::offset_of!(InvocationStorage, arg_count) == 24);
    assert!(mem::offset_of!(InvocationStorage, ret_size) == 28);
    assert!(mem::offset_of!(InvocationStorage, arg_bytes) == 32);
};

/// Write `value`'s bytes at `base + offset`, unaligned. No-op for zero-sized
/// types, whose slots own no bytes.
pub(crate) unsafe fn write_raw<T>(base: *mut u8, offset: u32, value: T) {
    if mem::size_of::<T>() == 0 {
        return;
    }
    base.add(offset as usize).cast::<T>().write_unaligned(value);
}

/// Read a `T` back out of `base + offset`, unaligned. Zero-sized types read
/// no bytes.
pub(crate) unsafe fn read_raw<T>(base: *mut u8, offset: u32) -> T {
    if mem::size_of::<T>() == 0 {
        return mem::zeroed();
    }
    base.add(offset as usize).cast::<T>().read_unaligned()
}

fn offsets_layout(count: u32) -> Layout {
    // count is an arity the binder accepted; it cannot overflow a layout
    Layout::array::<u32>(count as usize).expect("argument count overflows offset table")
}

impl InvocationStorage {
    /// Allocate storage for one call: a zeroed return slot sized to `R`, one
    /// contiguous buffer sized to the sum of `A`'s argument sizes, and the
    /// prefix-sum offset table; then copy each argument's bytes into its
    /// slot, in index order.
    pub(crate) fn for_call<R: Marshal, A: ArgPack>(args: A) -> Self {
        let ret_size = mem::size_of::<R>() as u32;
        let ret_data = if ret_size == 0 {
            ptr::null_mut()
        } else {
            // Zeroed so a chain that never writes the slot still hands a
            // defined value back to the trampoline.
            unsafe {
                let layout = Layout::from_size_align_unchecked(ret_size as usize, BUF_ALIGN);
                let data = alloc_zeroed(layout);
                if data.is_null() {
                    handle_alloc_error(layout);
                }
                data
            }
        };

        let arg_count = A::COUNT;
        let mut arg_bytes = 0u32;
        let arg_offsets = if arg_count == 0 {
            ptr::null_mut()
        } else {
            let layout = offsets_layout(arg_count);
            unsafe {
                let table = alloc(layout) as *mut u32;
                if table.is_null() {
                    handle_alloc_error(layout);
                }
                for (i, size) in A::SIZES.iter().enumerate() {
                    table.add(i).write(arg_bytes);
                    arg_bytes += *size;
                }
                table
            }
        };

        let arg_data = if arg_bytes == 0 {
            ptr::null_mut()
        } else {
            unsafe {
                let layout = Layout::from_size_align_unchecked(arg_bytes as usize, BUF_ALIGN);
                let data = alloc(layout);
                if data.is_null() {
                    handle_alloc_error(layout);
                }
                data
            }
        };

        let storage = InvocationStorage {
            ret_data,
            arg_data,
            arg_offsets,
            arg_count,
            ret_size,
            arg_bytes,
        };
        unsafe { args.pack(storage.arg_data, storage.arg_offsets) };
        storage
    }

    /// Number of arguments marshaled for this call.
    pub fn arg_count(&self) -> u32 {
        self.arg_count
    }

    /// Offset and byte width of one argument slot.
    fn slot(&self, index: u32) -> AbiResult<(u32, u32)> {
        if index >= self.arg_count {
            return Err(AbiError::ArgOutOfRange {
                index,
                count: self.arg_count,
            });
        }
        let start = unsafe { self.arg_offsets.add(index as usize).read() };
        let end = if index + 1 == self.arg_count {
            self.arg_bytes
        } else {
            unsafe { self.arg_offsets.add(index as usize + 1).read() }
        };
        Ok((start, end - start))
    }

    /// Reinterpret the byte range of argument `index` as a `T`.
    pub fn arg<T: Marshal>(&self, index: u32) -> AbiResult<T> {
        let (offset, size) = self.slot(index)?;
        if size as usize != mem::size_of::<T>() {
            return Err(AbiError::ArgSizeMismatch {
                index,
                slot: size,
                requested: mem::size_of::<T>() as u32,
            });
        }
        Ok(unsafe { read_raw(self.arg_data, offset) })
    }

    /// Overwrite the byte range of argument `index` with `value`.
    pub fn set_arg<T: Marshal>(&self, index: u32, value: T) -> AbiResult<()> {
        let (offset, size) = self.slot(index)?;
        if size as usize != mem::size_of::<T>() {
            return Err(AbiError::ArgSizeMismatch {
                index,
                slot: size,
                requested: mem::size_of::<T>() as u32,
            });
        }
        unsafe { write_raw(self.arg_data, offset, value) };
        Ok(())
    }

    /// Read argument `index` without range or size checks.
    ///
    /// # Safety
    /// `index` must be within bounds and `T` must be the exact type the slot
    /// was packed with. The re-specializing thunks satisfy both by
    /// construction — they read with the same type list that built the
    /// buffer.
    pub(crate) unsafe fn arg_unchecked<T: Marshal>(&self, index: u32) -> T {
        read_raw(self.arg_data, self.arg_offsets.add(index as usize).read())
    }

    /// Reinterpret the return slot as a `T`. The `()` path reads no bytes.
    pub fn return_value<T: Marshal>(&self) -> T {
        debug_assert_eq!(mem::size_of::<T>() as u32, self.ret_size);
        unsafe { read_raw(self.ret_data, 0) }
    }

    /// Overwrite the return slot with `value`. The `()` path writes no bytes.
    pub fn set_return<T: Marshal>(&self, value: T) {
        debug_assert_eq!(mem::size_of::<T>() as u32, self.ret_size);
        unsafe { write_raw(self.ret_data, 0, value) };
    }
}

impl Drop for InvocationStorage {
    fn drop(&mut self) {
        unsafe {
            if !self.ret_data.is_null() {
                dealloc(
                    self.ret_data,
                    Layout::from_size_align_unchecked(self.ret_size as usize, BUF_ALIGN),
                );
            }
            if !self.arg_data.is_null() {
                dealloc(
                    self.arg_data,
                    Layout::from_size_align_unchecked(self.arg_bytes as usize, BUF_ALIGN),
                );
            }
            if !self.arg_offsets.is_null() {
                dealloc(self.arg_offsets as *mut u8, offsets_layout(self.arg_count));
            }
        }
    }
}
