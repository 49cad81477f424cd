//! Hashing - SHA-256 fingerprints for rendered bytes and specs
//!
//! Canonical JSON makes a spec's fingerprint independent of field order.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::model::{Format, Language, SlotType, Spec, Theme};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Fingerprint of everything that affects a spec's pixels.
///
/// Ids and timestamps are left out, so two specs that would render the same
/// image share a fingerprint.
pub fn spec_fingerprint(spec: &Spec) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Visible<'a> {
        style_id: &'a str,
        zone_id: &'a str,
        format: Format,
        copy: &'a BTreeMap<SlotType, String>,
        attribution: &'a Option<String>,
        theme: &'a Theme,
        language: Language,
    }
    let canonical = canonical_json(&Visible {
        style_id: &spec.style_id,
        zone_id: &spec.zone_id,
        format: spec.format,
        copy: &spec.copy.texts,
        attribution: &spec.copy.attribution,
        theme: &spec.theme,
        language: spec.language,
    })?;
    Ok(sha256_hex(canonical.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpecCopy;
    use serde_json::json;

    fn spec(id: &str) -> Spec {
        let mut copy = SpecCopy::default();
        copy.texts.insert(SlotType::Headline, "Effortlessly you.".into());
        copy.slot_ids.insert(SlotType::Headline, format!("sl_{}", id));
        Spec {
            id: id.into(),
            image_id: "img_1".into(),
            format: Format::Portrait,
            language: Language::En,
            family_id: "luxury".into(),
            style_id: "luxury_soft_frame".into(),
            zone_id: "B".into(),
            primary_slot_id: format!("sl_{}", id),
            copy,
            theme: Theme {
                font_family: "Playfair Display".into(),
                font_size: 50.0,
                color: "#2B2B2B".into(),
                background: "#FFF".into(),
                radius: 0.0,
                shadow: true,
            },
            canvas: Format::Portrait.dims(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": {"y": 2, "b": 3}, "m": [{"k": 1, "c": 2}]});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":{"b":3,"y":2},"m":[{"c":2,"k":1}],"z":1}"#);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_spec_fingerprint_ignores_ids() {
        let a = spec_fingerprint(&spec("sp_a")).unwrap();
        let b = spec_fingerprint(&spec("sp_b")).unwrap();
        assert_eq!(a, b);

        let mut moved = spec("sp_c");
        moved.zone_id = "A".into();
        assert_ne!(spec_fingerprint(&moved).unwrap(), a);
    }
}
