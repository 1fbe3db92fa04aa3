use proptest::prelude::*;

use fairdraw_types::{DrawStatus, HashFunction, PublicKey, Signature, Timestamp, UserId};

fn any_status() -> impl Strategy<Value = DrawStatus> {
    prop_oneof![
        Just(DrawStatus::Pending),
        Just(DrawStatus::Commit),
        Just(DrawStatus::Reveal),
        Just(DrawStatus::Finished),
        Just(DrawStatus::Invalidated),
    ]
}

proptest! {
    /// Any 32 bytes survive the hex form used on the wire.
    #[test]
    fn public_key_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let key = PublicKey(bytes);
        prop_assert_eq!(PublicKey::from_hex(&key.to_hex()).unwrap(), key);
    }

    /// Hex of the wrong length never decodes into a signature.
    #[test]
    fn signature_rejects_wrong_length(bytes in prop::collection::vec(0u8.., 0..128usize)) {
        prop_assume!(bytes.len() != 64);
        prop_assert!(Signature::from_hex(&hex::encode(&bytes)).is_err());
    }

    /// Timestamp ordering matches the underlying millis.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta < tb, a < b);
        prop_assert_eq!(ta.elapsed_since(tb), b.saturating_sub(a));
    }

    /// User ids serialize as bare JSON strings.
    #[test]
    fn user_id_is_transparent(raw in "[a-zA-Z0-9_-]{1,24}") {
        let id = UserId::new(raw.clone());
        prop_assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{raw}\""));
    }

    /// Status names parse back to the same status.
    #[test]
    fn status_name_roundtrip(status in any_status()) {
        prop_assert_eq!(status.as_str().parse::<DrawStatus>().unwrap(), status);
    }
}

#[test]
fn hash_function_wire_names() {
    for hf in HashFunction::ALL {
        let json = serde_json::to_string(&hf).unwrap();
        assert_eq!(json, format!("\"{}\"", hf.as_str()));
        assert_eq!(hf.as_str().parse::<HashFunction>().unwrap(), hf);
    }
}
