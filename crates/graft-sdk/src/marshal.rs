//! Marshaling traits: which types may enter the argument buffer, and how a
//! compile-time argument list packs into and out of it.
//!
//! `ArgPack` is implemented for tuples of up to eight `Marshal` values; each
//! arity is one instantiation of the same impl, so every operation is
//! resolved statically and the packed byte layout is fully determined by the
//! type list.

use crate::context::InvocationContext;

/// Marker for types that may legally cross the marshaling buffer.
///
/// Arguments and return values are copied byte-for-byte into per-call
/// storage, so only plain `Copy + 'static` values qualify: scalars, raw
/// pointers, and the SDK's handle types.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot cross the marshaling buffer",
    note = "marshalable argument and return types are plain `Copy + 'static` values (scalars, raw pointers, handles)"
)]
pub trait Marshal: Copy + 'static {}

impl<T: Copy + 'static> Marshal for T {}

/// A compile-time argument type list, packable into one call's storage and
/// recoverable from it in index order.
///
/// Implemented for tuples `()` through `(A0, ..., A7)`. Variadic native
/// methods are unsupported by design.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a supported hook argument list",
    note = "hook arguments after the context (and receiver, for instance calls) must each be `Marshal`, with at most 8 of them"
)]
pub trait ArgPack: Copy + 'static {
    /// Number of arguments in the list.
    const COUNT: u32;

    /// Byte width of each argument, in declaration order.
    #[doc(hidden)]
    const SIZES: &'static [u32];

    /// Copy each argument's bytes into its slot.
    ///
    /// # Safety
    /// `dst` and `offsets` must come from storage allocated for exactly this
    /// type list.
    #[doc(hidden)]
    unsafe fn pack(self, dst: *mut u8, offsets: *const u32);

    /// Read each argument back out of the context, index order 0..N-1.
    ///
    /// # Safety
    /// The context's storage must have been packed with exactly this type
    /// list.
    #[doc(hidden)]
    unsafe fn unpack(ctx: &InvocationContext) -> Self;
}

/// Apply an impl macro to every supported arity. Shared with the
/// binder and invoker modules so all per-signature machinery covers the same
/// tuple set.
macro_rules! for_each_arity {
    ($m:ident) => {
        $m!();
        $m!(A0 0);
        $m!(A0 0, A1 1);
        $m!(A0 0, A1 1, A2 2);
        $m!(A0 0, A1 1, A2 2, A3 3);
        $m!(A0 0, A1 1, A2 2, A3 3, A4 4);
        $m!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5);
        $m!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6);
        $m!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7);
    };
}
pub(crate) use for_each_arity;

macro_rules! impl_arg_pack {
    ($($A:ident $idx:tt),*) => {
        impl<$($A: Marshal),*> ArgPack for ($($A,)*) {
            const COUNT: u32 = Self::SIZES.len() as u32;
            const SIZES: &'static [u32] = &[$(std::mem::size_of::<$A>() as u32),*];

            unsafe fn pack(self, dst: *mut u8, offsets: *const u32) {
                $(
                    crate::storage::write_raw(dst, offsets.add($idx).read(), self.$idx);
                )*
                let _ = (dst, offsets);
            }

            unsafe fn unpack(ctx: &InvocationContext) -> Self {
                let _ = ctx;
                ($(ctx.arg_unchecked::<$A>($idx),)*)
            }
        }
    };
}
for_each_arity!(impl_arg_pack);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        assert_eq!(<() as ArgPack>::COUNT, 0);
        assert_eq!(<(i32,) as ArgPack>::COUNT, 1);
        assert_eq!(<(i32, u64, u8) as ArgPack>::COUNT, 3);
        assert_eq!(
            <(u8, u8, u8, u8, u8, u8, u8, u8) as ArgPack>::COUNT,
            8
        );
    }

    #[test]
    fn test_sizes_follow_declaration_order() {
        assert_eq!(<(i32, u64, u8) as ArgPack>::SIZES, &[4, 8, 1]);
        assert_eq!(<() as ArgPack>::SIZES, &[] as &[u32]);
    }
}
