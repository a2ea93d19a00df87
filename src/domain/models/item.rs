use bytes::Bytes;
use chrono::Utc;

/// A chunk captured from a stream, waiting to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Capture time in Unix milliseconds.
    pub timestamp: i64,
    pub payload: Bytes,
}

impl Item {
    pub fn new(timestamp: i64, payload: Bytes) -> Self {
        Self { timestamp, payload }
    }

    pub fn captured_now(payload: Bytes) -> Self {
        Self::new(Utc::now().timestamp_millis(), payload)
    }

    /// Decodes the payload as chat text, cut to at most `max_length` characters.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected. Returns `None` when nothing
    /// but whitespace is left, since the webhook refuses empty content.
    pub fn message_text(&self, max_length: usize) -> Option<String> {
        let text = String::from_utf8_lossy(&self.payload);
        if text.trim().is_empty() {
            return None;
        }

        match text.char_indices().nth(max_length) {
            Some((cut, _)) => Some(text[..cut].to_string()),
            None => Some(text.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_decoded_verbatim() {
        let item = Item::new(1, Bytes::from_static(b"WARN disk 90%\n"));
        assert_eq!(item.message_text(2000).as_deref(), Some("WARN disk 90%\n"));
    }

    #[test]
    fn long_payload_is_truncated_on_a_character_boundary() {
        let item = Item::new(1, Bytes::from("チューナー".as_bytes().to_vec()));
        assert_eq!(item.message_text(3).as_deref(), Some("チュー"));
    }

    #[test]
    fn blank_payload_has_no_message() {
        let item = Item::new(1, Bytes::from_static(b" \r\n"));
        assert_eq!(item.message_text(2000), None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let item = Item::new(1, Bytes::from_static(b"tuner \xff ok"));
        assert_eq!(item.message_text(2000).as_deref(), Some("tuner \u{fffd} ok"));
    }
}
