// Property: dedup key stability
//
// For any URL, the dedup key must not change when the URL gains or loses a
// fragment, a trailing slash, tracking parameters, or when its query
// parameters are reordered. Keys for unparsable input must still collide for
// identical input, and canonicalization must be idempotent.

use proptest::prelude::*;
use linkshelf_core::canonical::{canonicalize, dedup_key, validate};
use linkshelf_core::{BookmarkRecord, CheckStatus, Priority};

// Strategy for generating host names
fn arb_host() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{3,10}\\.[a-z]{2,4}",
        "www\\.[a-z]{3,10}\\.[a-z]{2,4}",
        "[a-z]{2,6}\\.[a-z]{3,10}\\.[a-z]{2,4}",
    ]
}

// Strategy for generating URL paths without trailing slash
fn arb_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_-]{1,10}", 0..4).prop_map(|segments| {
        segments.iter().map(|s| format!("/{}", s)).collect::<String>()
    })
}

// Strategy for generating non-tracking query parameters with unique names
fn arb_params() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..4).prop_map(|map| {
        map.into_iter()
            .filter(|(name, _)| !name.starts_with("utm_"))
            .collect()
    })
}

// Strategy for generating tracking parameters
fn arb_tracking_params() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (
            prop_oneof![
                Just("utm_source".to_string()),
                Just("utm_campaign".to_string()),
                Just("gclid".to_string()),
                Just("fbclid".to_string()),
                Just("igshid".to_string()),
                Just("mc_cid".to_string()),
                Just("mc_eid".to_string()),
            ],
            "[a-z0-9]{1,8}",
        ),
        0..3,
    )
}

fn build_url(host: &str, path: &str, params: &[(String, String)]) -> String {
    let mut url = format!("https://{}{}", host, path);
    if !params.is_empty() {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        url.push('?');
        url.push_str(&query.join("&"));
    }
    url
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_fragment_does_not_change_key(
        host in arb_host(),
        path in arb_path(),
        params in arb_params(),
        fragment in "[a-z0-9]{1,10}",
    ) {
        let url = build_url(&host, &path, &params);
        let with_fragment = format!("{}#{}", url, fragment);
        prop_assert_eq!(dedup_key(&url), dedup_key(&with_fragment));
    }

    #[test]
    fn prop_trailing_slash_does_not_change_key(
        host in arb_host(),
        path in arb_path(),
    ) {
        let without = format!("https://{}{}", host, path);
        let with = format!("https://{}{}/", host, path);
        prop_assert_eq!(dedup_key(&without), dedup_key(&with));
    }

    #[test]
    fn prop_tracking_params_do_not_change_key(
        host in arb_host(),
        path in arb_path(),
        params in arb_params(),
        tracking in arb_tracking_params(),
    ) {
        let clean = build_url(&host, &path, &params);
        let mut noisy_params = tracking.clone();
        noisy_params.extend(params.iter().cloned());
        let noisy = build_url(&host, &path, &noisy_params);
        prop_assert_eq!(dedup_key(&clean), dedup_key(&noisy));
    }

    #[test]
    fn prop_param_order_does_not_change_key(
        host in arb_host(),
        path in arb_path(),
        params in arb_params(),
    ) {
        let forward = build_url(&host, &path, &params);
        let mut reversed_params = params.clone();
        reversed_params.reverse();
        let reversed = build_url(&host, &path, &reversed_params);
        prop_assert_eq!(dedup_key(&forward), dedup_key(&reversed));
    }

    #[test]
    fn prop_canonicalize_is_idempotent(
        host in arb_host(),
        path in arb_path(),
        params in arb_params(),
    ) {
        let raw = build_url(&host, &path, &params);
        let once = canonicalize(&raw);
        prop_assert_eq!(canonicalize(&once), once.clone());
        prop_assert_eq!(dedup_key(&once), dedup_key(&raw));
    }

    #[test]
    fn prop_unparsable_input_still_collides(raw in "[a-z]{1,5} [a-z]{1,5}") {
        prop_assert_eq!(dedup_key(&raw), dedup_key(&raw.to_uppercase()));
    }

    #[test]
    fn prop_validate_accepts_generated_hosts(host in arb_host(), path in arb_path()) {
        let input = format!("{}{}", host, path);
        let normalized = validate(&input);
        prop_assert!(normalized.is_ok());
        let normalized = normalized.unwrap();
        prop_assert!(normalized.starts_with("https://"));
        prop_assert_eq!(dedup_key(&normalized), dedup_key(&input));
    }

    #[test]
    fn prop_whitespace_is_always_rejected(
        head in "[a-z]{1,8}",
        tail in "[a-z]{1,8}\\.[a-z]{2,4}",
    ) {
        let input = format!("{} {}", head, tail);
        prop_assert!(validate(&input).is_err());
    }
}

#[test]
fn test_record_defaults_on_deserialize() {
    let json = r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","url":"https://example.com/"}"#;
    let record: BookmarkRecord = serde_json::from_str(json).unwrap();
    assert!(!record.favorite);
    assert!(!record.archived);
    assert_eq!(record.rating, 0);
    assert_eq!(record.priority, Priority::Medium);
    assert_eq!(record.check_status, CheckStatus::Unknown);
    assert!(record.tags.is_empty());
    assert_eq!(record.notes, "");
    assert_eq!(record.open_count, 0);
}

#[test]
fn test_record_round_trips_through_json() {
    let mut record = BookmarkRecord::new("https://www.example.com/a", "Example");
    record.add_tag("Rust");
    record.add_tag("rust");
    record.set_rating(9);
    record.priority = Priority::High;
    record.mark_opened(chrono::Utc::now());

    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"openCount\":1"));
    let restored: BookmarkRecord = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, record);
    assert_eq!(restored.tags, vec!["rust".to_string()]);
    assert_eq!(restored.rating, 5);
    assert_eq!(restored.domain, "EXAMPLE");
}
