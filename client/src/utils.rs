use solana_program::msg;

use crate::error::{AoError, AoResult};

/// Returns `err` when `statement` is false
pub fn assert(statement: bool, err: AoError) -> AoResult {
    if !statement {
        Err(err)
    } else {
        Ok(())
    }
}

/// Fails with `MalformedAccount` when the buffer is too short to hold `what`
pub fn check_buffer_len(buf: &[u8], min_len: usize, what: &str) -> AoResult {
    if buf.len() < min_len {
        msg!(
            "Buffer too short for the {}: expected at least {} bytes, got {}",
            what,
            min_len,
            buf.len()
        );
        return Err(AoError::MalformedAccount);
    }
    Ok(())
}

/// Logs the failed check and returns `MalformedAccount` when `statement` is false
pub(crate) fn check_field(statement: bool, description: &str) -> AoResult {
    if !statement {
        msg!("{}", description);
        return Err(AoError::MalformedAccount);
    }
    Ok(())
}
