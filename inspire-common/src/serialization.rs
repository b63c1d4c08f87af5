use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Payload encoding used on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON (default, easy to inspect with `z_sub`).
    #[default]
    Json,

    /// CBOR, roughly half the size of JSON for tactile frames.
    Cbor,
}

/// Encode a value with the given format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => serde_json::to_vec(value).map_err(Error::from),
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)?;
            Ok(buf)
        }
    }
}

/// Decode a value with the given format.
pub fn decode<T: DeserializeOwned>(data: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => serde_json::from_slice(data).map_err(Error::from),
        Format::Cbor => ciborium::from_reader(data).map_err(|e| Error::Cbor(e.to_string())),
    }
}

/// Guess the format of a payload.
///
/// Every message on the bus is a map, so JSON payloads start with `{`
/// (or `[` for bare arrays). Anything else is treated as CBOR.
pub fn detect_format(data: &[u8]) -> Format {
    match data.first() {
        Some(b'{') | Some(b'[') => Format::Json,
        _ => Format::Cbor,
    }
}

/// Decode a payload, detecting its format first.
pub fn decode_auto<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    decode(data, detect_format(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::HandState;

    fn state() -> HandState {
        HandState {
            timestamp: 1_700_000_000_000,
            pos_act: Some(vec![0, 100, 200, 300, 400, 500]),
            angle_act: Some(vec![1000, 1000, 1000, 1000, 1000, -1]),
            force_act: None,
            current: Some(vec![12, 11, 10, 9, 8, 7]),
            err: Some(vec![0; 6]),
            status: Some(vec![2; 6]),
            temperature: Some(vec![35, 36, 35, 34, 38, 37]),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let encoded = encode(&state(), Format::Json).unwrap();
        let decoded: HandState = decode(&encoded, Format::Json).unwrap();
        assert_eq!(decoded, state());
    }

    #[test]
    fn test_cbor_roundtrip() {
        let encoded = encode(&state(), Format::Cbor).unwrap();
        let decoded: HandState = decode(&encoded, Format::Cbor).unwrap();
        assert_eq!(decoded, state());
    }

    #[test]
    fn test_cbor_is_smaller() {
        let json = encode(&state(), Format::Json).unwrap();
        let cbor = encode(&state(), Format::Cbor).unwrap();
        assert!(cbor.len() < json.len(), "CBOR should be smaller than JSON");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(detect_format(b"{\"mode\": 1}"), Format::Json);
        assert_eq!(detect_format(b"[1, 2, 3]"), Format::Json);
        assert_eq!(detect_format(b"\xa1\x64mode\x01"), Format::Cbor);
    }

    #[test]
    fn test_decode_auto() {
        let cbor = encode(&state(), Format::Cbor).unwrap();
        let decoded: HandState = decode_auto(&cbor).unwrap();
        assert_eq!(decoded.pos_act, state().pos_act);

        let json = encode(&state(), Format::Json).unwrap();
        let decoded: HandState = decode_auto(&json).unwrap();
        assert_eq!(decoded.temperature, state().temperature);
    }
}
