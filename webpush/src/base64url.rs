//! Base64url codec without padding, as used throughout the Web Push wire
//! formats (subscription keys, VAPID tokens, JWT segments).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub fn encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_uses_url_safe_alphabet_without_padding() {
        // 0xfb 0xff maps to "-" and "_" in the url-safe alphabet.
        let encoded = encode([0xfb, 0xff, 0x3e]);
        assert_eq!(encoded, "-_8-");
        assert!(!encoded.contains('='));
    }

    #[test]
    fn decode_inverts_encode() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&data)).unwrap(), data);
    }

    #[test]
    fn standard_alphabet_is_rejected() {
        assert!(decode("+/8+").is_err());
    }

    #[test]
    fn padded_input_is_rejected() {
        assert!(decode("AQ==").is_err());
    }

    #[test]
    fn lengths_that_need_padding_still_decode() {
        assert_eq!(decode("AQ").unwrap(), vec![1]);
        assert_eq!(decode("AQI").unwrap(), vec![1, 2]);
    }
}
