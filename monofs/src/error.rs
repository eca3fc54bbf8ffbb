/// Everything that can go wrong inside the volume. The mount bridge is
/// free to collapse these onto a single errno; the crate keeps them
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Block allocation failed
    NoSpace,
    /// Inode allocation failed
    NoInodes,
    NotFound,
    NotADirectory,
    DirectoryNotEmpty,
    /// Bad path or bad buffer bounds
    InvalidArgument,
    /// Operation against a freed or out-of-range inode
    InvalidState,
}

pub type Result<T> = core::result::Result<T, Error>;
