use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;

/// Serialize `payload` as a single-key JSON object `{name: payload}`.
///
/// This is the shape chia reads for `network_overrides` entries.
pub fn marshal<T>(name: &str, payload: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let mut wrapper = BTreeMap::new();
    wrapper.insert(name, payload);
    Ok(serde_json::to_string(&wrapper)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wraps_payload_under_name() {
        let out = marshal("testnet11", &json!({"address_prefix": "txch"})).expect("marshal");
        assert_eq!(out, r#"{"testnet11":{"address_prefix":"txch"}}"#);
    }

    #[test]
    fn empty_payload_still_wraps() {
        let out = marshal("n", &BTreeMap::<String, u64>::new()).expect("marshal");
        assert_eq!(out, r#"{"n":{}}"#);
    }
}
