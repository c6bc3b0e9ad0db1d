use std::collections::BTreeMap;

/// Merge label or annotation layers; later layers win on key collisions.
pub fn merge_layers<'a, I>(layers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a BTreeMap<String, String>>,
{
    let mut merged = BTreeMap::new();
    for layer in layers {
        merged.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn later_layer_wins() {
        let common = map(&[("app", "chia"), ("tier", "base")]);
        let additional = map(&[("tier", "user")]);
        let child = map(&[("tier", "child"), ("extra", "1")]);
        let merged = merge_layers([&common, &additional, &child]);
        assert_eq!(merged, map(&[("app", "chia"), ("extra", "1"), ("tier", "child")]));
    }

    #[test]
    fn no_layers_is_empty() {
        assert!(merge_layers(std::iter::empty()).is_empty());
    }
}
