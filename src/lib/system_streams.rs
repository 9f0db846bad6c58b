//! Stream-name conventions: `$` marks a system stream, `$$` marks the
//! metadata stream of another stream.

pub const ALL_STREAM: &str = "$all";
pub const STREAMS_STREAM: &str = "$streams";
pub const SETTINGS_STREAM: &str = "$settings";
pub const STATS_STREAM_PREFIX: &str = "$stats";
pub const SCAVENGES_STREAM: &str = "$scavenges";
pub const PERSISTENT_SUBSCRIPTION_CONFIG: &str = "$persistentSubscriptionConfig";

const METASTREAM_PREFIX: &str = "$$";

/// Event type written to the log when a stream is deleted.
pub const STREAM_DELETED_EVENT_TYPE: &str = "$streamDeleted";

pub fn is_system_stream(stream_id: &str) -> bool {
    stream_id.starts_with('$')
}

pub fn is_metastream(stream_id: &str) -> bool {
    stream_id.starts_with(METASTREAM_PREFIX)
}

pub fn metastream_of(stream_id: &str) -> String {
    format!("{METASTREAM_PREFIX}{stream_id}")
}

/// Strips the `$$` prefix. Returns `None` when `stream_id` is not a metastream.
pub fn original_stream_of(stream_id: &str) -> Option<&str> {
    stream_id.strip_prefix(METASTREAM_PREFIX)
}

pub fn is_reserved(stream_id: &str) -> bool {
    matches!(
        stream_id,
        ALL_STREAM
            | STREAMS_STREAM
            | SETTINGS_STREAM
            | SCAVENGES_STREAM
            | PERSISTENT_SUBSCRIPTION_CONFIG
    ) || stream_id.starts_with(STATS_STREAM_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classifies_orders_metastream() {
        let meta = metastream_of("orders-1");
        assert_eq!(meta, "$$orders-1");
        assert!(is_system_stream(&meta));
        assert!(is_metastream(&meta));
        assert!(!is_metastream("orders-1"));
        assert!(!is_system_stream("orders-1"));
        assert_eq!(original_stream_of(&meta), Some("orders-1"));
    }

    #[test]
    fn single_dollar_is_system_but_not_meta() {
        assert!(is_system_stream("$settings"));
        assert!(!is_metastream("$settings"));
        assert!(!is_metastream("$"));
        assert!(!is_system_stream(""));
        assert_eq!(original_stream_of("$settings"), None);
    }

    #[test]
    fn reserved_names() {
        for name in [
            "$all",
            "$streams",
            "$settings",
            "$stats-127.0.0.1:2113",
            "$scavenges",
            "$persistentSubscriptionConfig",
        ] {
            assert!(is_reserved(name), "{name} should be reserved");
        }
        assert!(!is_reserved("$$all"));
        assert!(!is_reserved("orders-1"));
    }

    proptest! {
        #[test]
        fn metastream_round_trips(stream in "\\PC{1,32}") {
            let meta = metastream_of(&stream);
            prop_assert!(is_metastream(&meta));
            prop_assert!(is_system_stream(&meta));
            prop_assert_eq!(original_stream_of(&meta), Some(stream.as_str()));
        }
    }
}
