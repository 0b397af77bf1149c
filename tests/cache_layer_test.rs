//! Exercises `CacheLayer`'s validation rules and precedence/gating behavior: local
//! overrides beat the blocklist and upstream, and the blocklist only answers when
//! the ad-cache gate is enabled.

use std::fs;

use shieldns::cache::layer::{AddOutcome, CacheLayer};
use shieldns::control::blocklist_manifest::BlocklistManifest;
use shieldns::control::local_overrides::LocalOverrides;

#[test]
fn domain_validation_matches_label_rules() {
    assert!(CacheLayer::is_valid_domain("example.com"));
    assert!(CacheLayer::is_valid_domain("a.b.c"));
    assert!(!CacheLayer::is_valid_domain(""));
    assert!(!CacheLayer::is_valid_domain("-leading.com"));
    assert!(!CacheLayer::is_valid_domain("trailing-.com"));
    assert!(!CacheLayer::is_valid_domain("has_underscore.com"));
    assert!(!CacheLayer::is_valid_domain(&"a".repeat(254)));
    assert!(!CacheLayer::is_valid_domain(&format!("{}.com", "a".repeat(64))));
}

#[test]
fn ipv4_validation_rejects_non_dotted_quads() {
    assert!(CacheLayer::is_valid_ipv4("1.2.3.4"));
    assert!(!CacheLayer::is_valid_ipv4("not-an-ip"));
    assert!(!CacheLayer::is_valid_ipv4("1.2.3.4.5"));
}

#[test]
fn normalize_strips_scheme_path_and_trailing_dot() {
    assert_eq!(
        CacheLayer::normalize("HTTPS://Example.com/some/path"),
        "example.com"
    );
    assert_eq!(CacheLayer::normalize("example.com."), "example.com");
    assert_eq!(CacheLayer::normalize("http://example.com"), "example.com");
}

#[test]
fn add_positive_is_insert_if_absent() {
    let layer = CacheLayer::new();
    assert_eq!(
        layer.add_positive("example.com", "1.2.3.4", 0),
        AddOutcome::Added
    );
    // A second add for the same url is a conflict, not a TTL refresh.
    assert_eq!(
        layer.add_positive("example.com", "5.6.7.8", 0),
        AddOutcome::Conflict
    );
    assert_eq!(layer.get_positive("example.com").unwrap(), "1.2.3.4");
}

#[test]
fn add_positive_rejects_invalid_domain_or_ip() {
    let layer = CacheLayer::new();
    assert_eq!(
        layer.add_positive("not a domain", "1.2.3.4", 0),
        AddOutcome::Conflict
    );
    assert_eq!(
        layer.add_positive("example.com", "not-an-ip", 0),
        AddOutcome::Conflict
    );
}

#[test]
fn add_block_increments_domain_count_only_for_new_entries() {
    let layer = CacheLayer::new();
    layer.add_block("ads.tracker.net", "0.0.0.0");
    assert_eq!(layer.blocklist_domains(), 1);

    // Re-adding the same domain is a no-op count-wise.
    layer.add_block("ads.tracker.net", "0.0.0.0");
    assert_eq!(layer.blocklist_domains(), 1);

    layer.add_block("other.tracker.net", "0.0.0.0");
    assert_eq!(layer.blocklist_domains(), 2);
}

#[test]
fn wipe_blocklist_resets_the_domain_count() {
    let layer = CacheLayer::new();
    layer.add_block("ads.tracker.net", "0.0.0.0");
    layer.wipe_blocklist();
    assert_eq!(layer.blocklist_domains(), 0);
    assert!(layer.get_block("ads.tracker.net").is_none());
}

/// Local-override precedence: even with a matching blocklist entry and no
/// upstream reachable, a local override answers first and never expires.
#[test]
fn local_override_shadows_the_blocklist() {
    let dir = tempfile::tempdir().unwrap();
    let overrides_path = dir.path().join("localDNS.txt");

    let layer = CacheLayer::new();
    layer.add_block("shadowed.test", "0.0.0.0");

    let mut overrides = LocalOverrides::load(&overrides_path).unwrap();
    overrides.add("10.0.0.9", "shadowed.test", "office").unwrap();
    layer.reload_local_overrides(&overrides).unwrap();

    assert_eq!(layer.get_positive("shadowed.test").unwrap(), "10.0.0.9");
    // The override is permanent (expires_at == 0); blocklist_domains is
    // unaffected by the reload.
    assert_eq!(layer.blocklist_domains(), 1);
}

/// With the ad-cache gate disabled, nothing answers from the blocklist. The gate
/// itself lives on `AppContext`; here we confirm the blocklist lookup the gate
/// guards is independent of any cache state.
#[test]
fn blocklist_lookup_is_independent_of_positive_cache() {
    let layer = CacheLayer::new();
    layer.add_block("ads.tracker.net", "0.0.0.0");
    assert!(layer.get_positive("ads.tracker.net").is_none());
    assert_eq!(layer.get_block("ads.tracker.net").unwrap(), "0.0.0.0");
}

#[test]
fn load_blocklists_parses_hosts_style_files_and_repairs_swapped_order() {
    let dir = tempfile::tempdir().unwrap();
    let listdata_dir = dir.path().join("listdata");
    fs::create_dir_all(&listdata_dir).unwrap();
    fs::write(
        listdata_dir.join("hosts.txt"),
        "# comment\n\
         0.0.0.0 ads.example.com\n\
         bare-domain.example.com\n\
         swapped.example.com 0.0.0.0\n\
         \n",
    )
    .unwrap();

    let manifest_path = dir.path().join("lists.txt");
    let mut manifest = BlocklistManifest::load(&manifest_path).unwrap();
    manifest.add("hosts.txt").unwrap();

    let layer = CacheLayer::new();
    layer.load_blocklists(&manifest, &listdata_dir).unwrap();

    assert_eq!(layer.get_block("ads.example.com").unwrap(), "0.0.0.0");
    assert_eq!(layer.get_block("bare-domain.example.com").unwrap(), "0.0.0.0");
    assert_eq!(layer.get_block("swapped.example.com").unwrap(), "0.0.0.0");
    assert_eq!(layer.blocklist_domains(), 3);
}

#[test]
fn load_blocklists_skips_disabled_sources() {
    let dir = tempfile::tempdir().unwrap();
    let listdata_dir = dir.path().join("listdata");
    fs::create_dir_all(&listdata_dir).unwrap();
    fs::write(listdata_dir.join("disabled.txt"), "blocked.example.com\n").unwrap();

    let manifest_path = dir.path().join("lists.txt");
    let mut manifest = BlocklistManifest::load(&manifest_path).unwrap();
    manifest.add("disabled.txt").unwrap();
    manifest
        .set_status(
            "disabled.txt",
            shieldns::control::blocklist_manifest::AdlistStatus::Disabled,
        )
        .unwrap();

    let layer = CacheLayer::new();
    layer.load_blocklists(&manifest, &listdata_dir).unwrap();

    assert!(layer.get_block("blocked.example.com").is_none());
    assert_eq!(layer.blocklist_domains(), 0);
}
