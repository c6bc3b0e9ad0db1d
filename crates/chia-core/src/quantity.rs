//! Kubernetes quantity validation and canonical form.
//!
//! The apiserver stores every quantity in canonical form (`0.5` becomes
//! `500m`, `1.5Gi` becomes `1536Mi`). Desired objects carry the same form so
//! a stored object compares equal to the one that was sent.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])?([0-9]+(?:\.[0-9]*)?|\.[0-9]+)([KMGTPE]i|[numkMGTPE]|[eE][+-]?[0-9]+)?$")
        .expect("quantity regex")
});

const DECIMAL_SUFFIXES: [(i32, &str); 10] = [
    (-9, "n"),
    (-6, "u"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
    (15, "P"),
    (18, "E"),
];

const BINARY_SUFFIXES: [&str; 7] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Format {
    DecimalSi,
    BinarySi,
    DecimalExponent,
}

/// Validate a Kubernetes quantity string such as `300Gi` or `1.5e3` and
/// return it in canonical form.
pub fn parse_quantity(field: &str, value: &str) -> Result<Quantity> {
    let trimmed = value.trim();
    if QUANTITY.is_match(trimmed) {
        Ok(canonical_quantity(&Quantity(trimmed.to_string())))
    } else {
        Err(Error::InvalidQuantity {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Canonical form of `value`, or `None` if it is not a quantity or does not
/// fit in 128 bits.
pub fn canonical(value: &str) -> Option<String> {
    let caps = QUANTITY.captures(value.trim())?;
    let negative = caps.get(1).is_some_and(|m| m.as_str() == "-");
    let number = caps.get(2)?.as_str();
    let suffix = caps.get(3).map_or("", |m| m.as_str());

    let (int, frac) = number.split_once('.').unwrap_or((number, ""));
    let mut mantissa: u128 = format!("{int}{frac}").parse().ok()?;
    let mut exp = -i32::try_from(frac.len()).ok()?;

    let format = if let Some(k) = BINARY_SUFFIXES[1..].iter().position(|s| *s == suffix) {
        mantissa = mantissa.checked_mul(1u128 << (10 * (k + 1)))?;
        Format::BinarySi
    } else if let Some((shift, _)) = DECIMAL_SUFFIXES.iter().find(|(_, s)| *s == suffix) {
        exp += shift;
        Format::DecimalSi
    } else {
        exp += suffix[1..].parse::<i32>().ok()?;
        Format::DecimalExponent
    };

    let sign = if negative && mantissa != 0 { "-" } else { "" };
    if format == Format::BinarySi {
        if let Some(bytes) = integer_value(mantissa, exp).filter(|v| *v >= 1024) {
            let mut scaled = bytes;
            let mut index = 0;
            while index + 1 < BINARY_SUFFIXES.len() && scaled % 1024 == 0 {
                scaled /= 1024;
                index += 1;
            }
            return Some(format!("{sign}{scaled}{}", BINARY_SUFFIXES[index]));
        }
    }
    let (mantissa, exp) = decimal_parts(mantissa, exp, format == Format::DecimalExponent)?;
    if mantissa == 0 {
        return Some("0".into());
    }
    let rendered = if format == Format::DecimalExponent {
        if exp == 0 {
            mantissa.to_string()
        } else {
            format!("{mantissa}e{exp}")
        }
    } else {
        let (_, suffix) = DECIMAL_SUFFIXES.iter().find(|(shift, _)| *shift == exp)?;
        format!("{mantissa}{suffix}")
    };
    Some(format!("{sign}{rendered}"))
}

/// `mantissa * 10^exp` when it is a whole number.
fn integer_value(mantissa: u128, exp: i32) -> Option<u128> {
    if exp >= 0 {
        return mantissa.checked_mul(10u128.checked_pow(exp.unsigned_abs())?);
    }
    let divisor = 10u128.checked_pow(exp.unsigned_abs())?;
    (mantissa % divisor == 0).then(|| mantissa / divisor)
}

/// Rounds up to nano precision and picks the largest exponent that is a
/// multiple of three and keeps the mantissa whole.
fn decimal_parts(mut mantissa: u128, mut exp: i32, unbounded: bool) -> Option<(u128, i32)> {
    if mantissa == 0 {
        return Some((0, 0));
    }
    if exp < -9 {
        let divisor = 10u128.checked_pow((-9 - exp).unsigned_abs())?;
        mantissa = mantissa.div_ceil(divisor);
        exp = -9;
    }
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exp += 1;
    }
    let mut target = exp.div_euclid(3) * 3;
    if !unbounded {
        target = target.min(18);
    }
    let mantissa = mantissa.checked_mul(10u128.checked_pow((exp - target).unsigned_abs())?)?;
    Some((mantissa, target))
}

/// `quantity` in canonical form; values that do not parse are kept as written.
pub fn canonical_quantity(quantity: &Quantity) -> Quantity {
    Quantity(canonical(&quantity.0).unwrap_or_else(|| quantity.0.clone()))
}

/// Limits and requests in canonical form.
pub fn canonical_resources(mut resources: ResourceRequirements) -> ResourceRequirements {
    let canonicalize = |map: BTreeMap<String, Quantity>| {
        map.into_iter()
            .map(|(name, q)| {
                let q = canonical_quantity(&q);
                (name, q)
            })
            .collect::<BTreeMap<_, _>>()
    };
    resources.limits = resources.limits.map(canonicalize);
    resources.requests = resources.requests.map(canonicalize);
    resources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_forms() {
        for ok in ["300Gi", "1", "500m", "1.5", "2e3", "+10Mi", ".5Ki", "100k"] {
            assert!(parse_quantity("size", ok).is_ok(), "{ok} should parse");
        }
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "Gi", "10GB", "ten", "1..2", "10 Gi"] {
            let err = parse_quantity("resourceRequest", bad).expect_err(bad);
            assert!(matches!(err, Error::InvalidQuantity { .. }));
        }
    }

    #[test]
    fn canonical_matches_apiserver_storage() {
        let cases = [
            ("0.5", "500m"),
            ("1.5", "1500m"),
            ("1000", "1k"),
            ("500m", "500m"),
            ("100k", "100k"),
            ("300Gi", "300Gi"),
            ("1.5Gi", "1536Mi"),
            ("1024Ki", "1Mi"),
            ("2000Ki", "2000Ki"),
            (".5Ki", "512"),
            ("+10Mi", "10Mi"),
            ("2e3", "2e3"),
            ("1500e0", "1500"),
            ("0", "0"),
            ("-0.25", "-250m"),
            ("0.0000000001", "1n"),
            ("128974848", "128974848"),
        ];
        for (input, want) in cases {
            assert_eq!(canonical(input).as_deref(), Some(want), "{input}");
        }
    }

    #[test]
    fn parse_returns_canonical_form() {
        let q = parse_quantity("resourceRequest", "0.5Ti").unwrap();
        assert_eq!(q.0, "512Gi");
    }

    #[test]
    fn resources_are_canonicalized() {
        let resources = ResourceRequirements {
            requests: Some(BTreeMap::from([("cpu".to_string(), Quantity("0.5".into()))])),
            limits: Some(BTreeMap::from([("memory".to_string(), Quantity("1.5Gi".into()))])),
            ..Default::default()
        };
        let resources = canonical_resources(resources);
        assert_eq!(resources.requests.unwrap()["cpu"].0, "500m");
        assert_eq!(resources.limits.unwrap()["memory"].0, "1536Mi");
    }
}
