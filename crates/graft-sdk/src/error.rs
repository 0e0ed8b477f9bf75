//! Error types for the Graft SDK ABI

/// Result type for ABI calls
pub type AbiResult<T> = Result<T, AbiError>;

/// SDK error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    /// Argument index past the end of the marshaled argument list
    #[error("argument index {index} out of range (call has {count} arguments)")]
    ArgOutOfRange {
        /// Index the callback asked for
        index: u32,
        /// Number of arguments marshaled for this call
        count: u32,
    },

    /// Requested type does not match the byte width recorded at pack time
    #[error("argument {index} holds {slot} bytes, requested type needs {requested}")]
    ArgSizeMismatch {
        /// Index the callback asked for
        index: u32,
        /// Slot width recorded when the call was packed
        slot: u32,
        /// Width of the type the callback requested
        requested: u32,
    },

    /// Registration attempted before `graft_sdk::init`
    #[error("binding environment not initialized; call graft_sdk::init first")]
    NotInitialized,

    /// `graft_sdk::init` called twice
    #[error("binding environment already initialized")]
    AlreadyInitialized,

    /// Host's runtime-handle accessor returned null during `init`
    #[error("host returned a null runtime handle")]
    NullRuntimeHandle,

    /// Namespace/class/method name contains an interior NUL byte
    #[error("name {0:?} contains an interior NUL byte")]
    InvalidName(String),
}
