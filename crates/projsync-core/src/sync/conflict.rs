//! Upload conflict detection

use crate::models::SyncMeta;

/// Whether writing `incoming` over `existing` would discard a newer edit from another device.
///
/// True only when both timestamps are known, the stored row is strictly newer, and the stored
/// row was last written by a different device. `fallback_device` stands in for an incoming
/// record that carries no `deviceId` of its own.
pub fn detect_conflict(
    existing: Option<&SyncMeta>,
    incoming: &SyncMeta,
    fallback_device: &str,
) -> bool {
    let Some(existing) = existing else {
        return false;
    };
    let (Some(stored_at), Some(incoming_at)) = (existing.updated_at, incoming.updated_at) else {
        return false;
    };

    let incoming_device = incoming.device_id.as_deref().unwrap_or(fallback_device);
    stored_at > incoming_at && existing.device_id.as_deref() != Some(incoming_device)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(updated_at: Option<i64>, device_id: Option<&str>) -> SyncMeta {
        SyncMeta {
            updated_at,
            device_id: device_id.map(str::to_string),
            ..SyncMeta::new("r1")
        }
    }

    #[test]
    fn new_record_never_conflicts() {
        assert!(!detect_conflict(None, &meta(Some(1), Some("a")), "a"));
    }

    #[test]
    fn newer_row_from_other_device_conflicts() {
        let stored = meta(Some(200), Some("a"));
        assert!(detect_conflict(Some(&stored), &meta(Some(100), Some("b")), "b"));
    }

    #[test]
    fn flipping_either_condition_alone_does_not_conflict() {
        let stored = meta(Some(200), Some("a"));
        // same device, older incoming
        assert!(!detect_conflict(Some(&stored), &meta(Some(100), Some("a")), "a"));
        // other device, newer incoming
        assert!(!detect_conflict(Some(&stored), &meta(Some(300), Some("b")), "b"));
        // other device, equal timestamps
        assert!(!detect_conflict(Some(&stored), &meta(Some(200), Some("b")), "b"));
    }

    #[test]
    fn missing_timestamps_never_conflict() {
        let stored = meta(Some(200), Some("a"));
        assert!(!detect_conflict(Some(&stored), &meta(None, Some("b")), "b"));

        let unstamped = meta(None, Some("a"));
        assert!(!detect_conflict(Some(&unstamped), &meta(Some(1), Some("b")), "b"));
    }

    #[test]
    fn request_device_is_used_when_record_has_none() {
        let stored = meta(Some(200), Some("a"));
        assert!(!detect_conflict(Some(&stored), &meta(Some(100), None), "a"));
        assert!(detect_conflict(Some(&stored), &meta(Some(100), None), "b"));
    }

    #[test]
    fn conflict_matches_rule_over_grid() {
        let devices = [Some("a"), Some("b"), None];
        let times = [None, Some(100), Some(200), Some(300)];

        for stored_device in devices {
            for stored_at in times {
                for incoming_device in devices {
                    for incoming_at in times {
                        let stored = meta(stored_at, stored_device);
                        let incoming = meta(incoming_at, incoming_device);
                        let effective = incoming_device.unwrap_or("c");
                        let expected = match (stored_at, incoming_at) {
                            (Some(s), Some(i)) => s > i && stored_device != Some(effective),
                            _ => false,
                        };
                        assert_eq!(
                            detect_conflict(Some(&stored), &incoming, "c"),
                            expected,
                            "stored={stored:?} incoming={incoming:?}"
                        );
                    }
                }
            }
        }
    }
}
