use num_derive::FromPrimitive;
use solana_program::{decode_error::DecodeError, program_error::ProgramError};
use thiserror::Error;

/// Result of a decoding or arithmetic operation
pub type AoResult<T = ()> = Result<T, AoError>;

/// Errors reported by the decoders. The discriminant doubles as the custom program error code.
#[derive(Clone, Copy, Debug, Error, FromPrimitive, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AoError {
    #[error("The account data is malformed")]
    MalformedAccount,
    #[error("The requested index is out of range")]
    IndexOutOfRange,
    #[error("Numerical overflow")]
    NumericOverflow,
    #[error("The orderbook side has no resting orders")]
    EmptyBook,
    #[error("The operation has no numeric result")]
    NotANumber,
    #[error("The decimal string could not be parsed")]
    InvalidDecimal,
    #[error("There are no more free slots in the slab")]
    SlabOutOfSpace,
    #[error("The event queue is full")]
    EventQueueFull,
}

impl From<AoError> for ProgramError {
    fn from(e: AoError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for AoError {
    fn type_of() -> &'static str {
        "AoError"
    }
}
