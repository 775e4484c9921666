//! Leaf value type checks.

use crate::schema::LeafType;

/// Check a leaf value against its type. Leafrefs are resolved by the caller.
pub fn check(leaf_type: &LeafType, value: Option<&str>) -> Result<(), String> {
    match leaf_type {
        LeafType::Empty => match value {
            None | Some("") => Ok(()),
            Some(v) => Err(format!("empty leaf cannot carry the value '{}'", v)),
        },
        LeafType::String {
            min_length,
            max_length,
        } => {
            let len = value.unwrap_or_default().chars().count();
            if min_length.is_some_and(|min| len < min) || max_length.is_some_and(|max| len > max) {
                return Err(format!(
                    "length {} is outside {}..{}",
                    len,
                    min_length.unwrap_or(0),
                    max_length.map(|m| m.to_string()).unwrap_or_default()
                ));
            }
            Ok(())
        }
        LeafType::Integer { min, max } => {
            let raw = value.ok_or_else(|| "missing integer value".to_string())?;
            let parsed: i64 = raw
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a valid integer", raw))?;
            if min.is_some_and(|m| parsed < m) || max.is_some_and(|m| parsed > m) {
                return Err(format!("value {} is out of range", parsed));
            }
            Ok(())
        }
        LeafType::Boolean => match value {
            Some("true") | Some("false") => Ok(()),
            other => Err(format!(
                "'{}' is not a valid boolean",
                other.unwrap_or_default()
            )),
        },
        LeafType::Enumeration { values } => {
            let v = value.unwrap_or_default();
            if values.iter().any(|allowed| allowed == v) {
                Ok(())
            } else {
                Err(format!("'{}' is not one of [{}]", v, values.join(", ")))
            }
        }
        LeafType::Leafref { .. } => Ok(()),
    }
}
