use std::io::{self, BufRead};

/// Read a token from `reader`: everything up to and including the first
/// newline, or up to end-of-input when no newline arrives. Nothing is trimmed.
pub fn read_token<R: BufRead>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn keeps_the_newline_delimiter() {
        let token = read_token(Cursor::new(b"s.abc123\n".to_vec())).expect("read");
        assert_eq!(token, b"s.abc123\n");
    }

    #[test]
    fn stops_at_the_first_newline() {
        let token = read_token(Cursor::new(b"first\nsecond\n".to_vec())).expect("read");
        assert_eq!(token, b"first\n");
    }

    #[test]
    fn accepts_input_without_newline() {
        let token = read_token(Cursor::new(b"  padded token  ".to_vec())).expect("read");
        assert_eq!(token, b"  padded token  ");
    }

    #[test]
    fn empty_input_is_an_empty_token() {
        let token = read_token(Cursor::new(Vec::new())).expect("read");
        assert!(token.is_empty());
    }
}
