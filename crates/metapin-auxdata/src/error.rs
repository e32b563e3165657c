//! Decoder errors.

/// Fatal decoder input errors.
///
/// Running out of auxdata is never an error; see [`crate::Split::Boundary`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuxdataError {
    #[error("Bytecode cannot be empty")]
    EmptyInput,
}
