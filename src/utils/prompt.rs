use crate::core::retention::Confirmation;
use crate::utils::error::{AisError, Result};
use std::io::{BufRead, Write};

pub const CONFIRMATION_TOKEN: &str = "yes";

/// Writes `question` and reads one line. Only the token confirms, ignoring
/// surrounding whitespace and ASCII case; anything else, including EOF, declines.
pub fn ask_confirmation<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    question: &str,
) -> Result<Confirmation> {
    let io_err = |e: std::io::Error| AisError::ConfirmationError {
        message: e.to_string(),
    };

    write!(writer, "{} ({}/no): ", question, CONFIRMATION_TOKEN).map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    let mut line = String::new();
    let read = reader.read_line(&mut line).map_err(io_err)?;
    if read == 0 {
        tracing::warn!("No confirmation input (EOF), treating as declined");
        return Ok(Confirmation::Declined);
    }

    Ok(Confirmation::from_flag(
        line.trim().eq_ignore_ascii_case(CONFIRMATION_TOKEN),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(input: &str) -> Confirmation {
        let mut out = Vec::new();
        ask_confirmation(&mut Cursor::new(input.as_bytes()), &mut out, "Proceed?").unwrap()
    }

    #[test]
    fn test_only_the_token_confirms() {
        assert_eq!(answer("yes\n"), Confirmation::Confirmed);
        assert_eq!(answer("  yes  \r\n"), Confirmation::Confirmed);
        assert_eq!(answer("YES\n"), Confirmation::Confirmed);
        assert_eq!(answer("Yes\n"), Confirmation::Confirmed);
        assert_eq!(answer("y\n"), Confirmation::Declined);
        assert_eq!(answer("yes please\n"), Confirmation::Declined);
        assert_eq!(answer(""), Confirmation::Declined);
    }

    #[test]
    fn test_prompt_is_written() {
        let mut out = Vec::new();
        ask_confirmation(&mut Cursor::new(b"no\n".as_slice()), &mut out, "Proceed?").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Proceed? (yes/no): ");
    }
}
