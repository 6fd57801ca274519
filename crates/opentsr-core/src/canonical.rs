//! Canonical JSON encoding for deterministic serialization.
//!
//! Rules:
//! - Object keys sorted by their UTF-8 bytes
//! - No insignificant whitespace
//! - Output is pure ASCII: every character outside `0x20..=0x7e` is written
//!   as a lowercase `\uXXXX` escape, using a surrogate pair above the BMP
//! - Floats use the shortest round-trip digits, in fixed notation when the
//!   decimal exponent is in `-4..16` and as `1e-05` / `1.5e+16` otherwise;
//!   integral floats keep a trailing `.0`
//! - Arrays keep their order
//!
//! These are the bytes Python's `json.dumps(v, separators=(",", ":"),
//! sort_keys=True)` produces, so signatures and payload sizes agree with
//! Python producers. The same bytes are used to size payloads, to compute
//! signatures and to persist signals, so two equal values always encode
//! identically.

use serde_json::{Map, Number, Value};

/// Encode a JSON value to its canonical string.
pub fn canonical_json(value: &Value) -> String {
    let mut buf = String::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Encode a JSON value to canonical UTF-8 bytes.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    canonical_json(value).into_bytes()
}

/// Length in bytes of the canonical encoding.
pub fn canonical_len(value: &Value) -> usize {
    canonical_json(value).len()
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s),
        Value::Array(items) => encode_array(buf, items),
        Value::Object(map) => encode_object_canonical(buf, map),
    }
}

fn encode_array(buf: &mut String, items: &[Value]) {
    buf.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_value_to(buf, item);
    }
    buf.push(']');
}

/// Encode an object with its keys sorted.
fn encode_object_canonical(buf: &mut String, map: &Map<String, Value>) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_string(buf, key);
        buf.push(':');
        encode_value_to(buf, value);
    }
    buf.push('}');
}

/// Encode a string literal with ASCII-only output.
fn encode_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            ' '..='~' => buf.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units).iter() {
                    buf.push_str(&format!("\\u{unit:04x}"));
                }
            }
        }
    }
    buf.push('"');
}

fn encode_number(buf: &mut String, n: &Number) {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            encode_float(buf, f);
            return;
        }
    }
    buf.push_str(&n.to_string());
}

/// Shortest round-trip float in `repr` layout.
fn encode_float(buf: &mut String, f: f64) {
    // `{:e}` yields the shortest digits as `[-]d[.ddd]e<exp>`.
    let sci = format!("{f:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    buf.push_str(sign);
    if !(-4..16).contains(&exp) {
        buf.push_str(&digits[..1]);
        if digits.len() > 1 {
            buf.push('.');
            buf.push_str(&digits[1..]);
        }
        let exp_sign = if exp < 0 { '-' } else { '+' };
        buf.push_str(&format!("e{exp_sign}{:02}", exp.unsigned_abs()));
    } else if exp >= 0 {
        let int_len = exp as usize + 1;
        if digits.len() > int_len {
            buf.push_str(&digits[..int_len]);
            buf.push('.');
            buf.push_str(&digits[int_len..]);
        } else {
            buf.push_str(&digits);
            buf.push_str(&"0".repeat(int_len - digits.len()));
            buf.push_str(".0");
        }
    } else {
        buf.push_str("0.");
        buf.push_str(&"0".repeat((-exp - 1) as usize));
        buf.push_str(&digits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_without_whitespace() {
        let value = json!({"b": 1, "a": {"d": [1, 2], "c": null}});
        assert_eq!(canonical_json(&value), r#"{"a":{"c":null,"d":[1,2]},"b":1}"#);
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let mut first = Map::new();
        first.insert("zeta".into(), json!(true));
        first.insert("alpha".into(), json!("x"));

        let mut second = Map::new();
        second.insert("alpha".into(), json!("x"));
        second.insert("zeta".into(), json!(true));

        assert_eq!(
            canonical_json_bytes(&Value::Object(first)),
            canonical_json_bytes(&Value::Object(second))
        );
    }

    #[test]
    fn test_string_escaping() {
        let value = json!("quote\" slash\\ nl\n tab\t bell\u{07}");
        assert_eq!(
            canonical_json(&value),
            r#""quote\" slash\\ nl\n tab\t bell\u0007""#
        );
    }

    #[test]
    fn test_non_ascii_escaped() {
        let value = json!({"city": "Zürich", "emoji": "🛰", "del": "\u{7f}"});
        let encoded = canonical_json(&value);
        assert_eq!(
            encoded,
            r#"{"city":"Z\u00fcrich","del":"\u007f","emoji":"\ud83d\udef0"}"#
        );
        assert!(encoded.is_ascii());
        assert_eq!(canonical_len(&value), encoded.len());
    }

    #[test]
    fn test_non_ascii_keys_escaped_and_sorted() {
        let value = json!({"é": 1, "z": 2});
        assert_eq!(canonical_json(&value), r#"{"z":2,"\u00e9":1}"#);
    }

    #[test]
    fn test_uppercase_sorts_before_lowercase() {
        let value = json!({"b": 0, "B": 0, "@type": 0, "a": 0});
        assert_eq!(canonical_json(&value), r#"{"@type":0,"B":0,"a":0,"b":0}"#);
    }

    #[test]
    fn test_floats_use_shortest_form() {
        let value = json!({"score": 0.5, "one": 1.0, "int": 3});
        assert_eq!(canonical_json(&value), r#"{"int":3,"one":1.0,"score":0.5}"#);
    }

    #[test]
    fn test_float_notation_switches_at_exponent_bounds() {
        let cases = [
            (1e-5, "1e-05"),
            (0.0001, "0.0001"),
            (1.5e-7, "1.5e-07"),
            (1e16, "1e+16"),
            (1e15, "1000000000000000.0"),
            (123.456, "123.456"),
            (-2.5, "-2.5"),
            (-0.0, "-0.0"),
            (0.0, "0.0"),
            (1e100, "1e+100"),
            (1.7976931348623157e308, "1.7976931348623157e+308"),
            (0.1, "0.1"),
        ];
        for (f, expected) in cases {
            assert_eq!(canonical_json(&json!(f)), expected, "{f:e}");
        }
    }

    #[test]
    fn test_integers_unchanged() {
        let value = json!([0, -7, u64::MAX, i64::MIN]);
        assert_eq!(
            canonical_json(&value),
            "[0,-7,18446744073709551615,-9223372036854775808]"
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reversed_insertion_encodes_identically(
                entries in proptest::collection::btree_map("[a-zA-Z@_]{1,8}", any::<i64>(), 0..16)
            ) {
                let mut forward = Map::new();
                for (k, v) in &entries {
                    forward.insert(k.clone(), json!(v));
                }
                let mut backward = Map::new();
                for (k, v) in entries.iter().rev() {
                    backward.insert(k.clone(), json!(v));
                }

                let a = canonical_json(&Value::Object(forward));
                prop_assert_eq!(&a, &canonical_json(&Value::Object(backward)));
                prop_assert_eq!(serde_json::from_str::<Value>(&a).is_ok(), true);
            }

            #[test]
            fn strings_survive_reparsing(s in any::<String>()) {
                let encoded = canonical_json(&json!(s));
                let decoded: Value = serde_json::from_str(&encoded).unwrap();
                prop_assert_eq!(decoded, json!(s));
                prop_assert!(encoded.is_ascii());
            }

            #[test]
            fn floats_survive_reparsing(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
                let encoded = canonical_json(&json!(f));
                let decoded: f64 = serde_json::from_str(&encoded).unwrap();
                prop_assert_eq!(decoded.to_bits(), f.to_bits());
            }
        }
    }
}
