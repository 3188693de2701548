//! Route handlers

pub mod analytics;
pub mod goals;
pub mod habits;
pub mod health;
pub mod logs;

use serde::{Deserialize, Deserializer};

/// For `Option<Option<T>>` fields with `#[serde(default)]`: a missing key
/// stays `None`, an explicit `null` becomes `Some(None)`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn missing_null_and_value() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.notes, None);
        let null: Patch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(null.notes, Some(None));
        let set: Patch = serde_json::from_str(r#"{"notes": "hi"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("hi".into())));
    }
}
