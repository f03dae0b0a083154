//! Small shared helpers: deep copies and timestamps.

use crate::error::CacheResult;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Deep-copy a value through its serialized form.
///
/// The returned value shares no mutable state with the input. Recording
/// and entry rewriting go through this so later caller mutations can
/// never reach into buffered or persisted data.
pub fn clone_for_cache<T>(value: &T) -> CacheResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let raw = serde_json::to_value(value)?;
    Ok(serde_json::from_value(raw)?)
}

/// Current UTC time as RFC 3339, the format entry timestamps use.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_types::{Action, ReplayStep};

    #[test]
    fn test_clone_for_cache_is_independent() {
        let mut original = ReplayStep::act(
            "click the banner",
            vec![Action::new("#banner", "click").with_arguments(vec![serde_json::json!("a")])],
        );
        let copy = clone_for_cache(&original).unwrap();
        assert_eq!(copy, original);

        if let ReplayStep::Act { actions, .. } = &mut original {
            actions[0].selector = "#changed".into();
        }
        match &copy {
            ReplayStep::Act { actions, .. } => assert_eq!(actions[0].selector, "#banner"),
            other => panic!("expected act, got {}", other),
        }
    }

    #[test]
    fn test_now_rfc3339_parses_back() {
        let stamp = now_rfc3339();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
