//! Property-based tests for the two invariants that are awkward to pin down with
//! a handful of example-based cases: `KeyedMap`'s load factor holds after *any*
//! sequence of puts, and qname wire encoding round-trips for arbitrary valid
//! domain strings.

use proptest::collection::vec;
use proptest::prelude::*;

use shieldns::cache::keyed_map::{KeyedMap, Record};
use shieldns::dns::buffer::PacketBuffer;

fn domain_label() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,15}".prop_map(|s| s)
}

fn domain_name() -> impl Strategy<Value = String> {
    vec(domain_label(), 1..5).prop_map(|labels| labels.join("."))
}

proptest! {
    /// For any sequence of distinct urls inserted into a fresh map, the load
    /// factor never exceeds 0.75 and every inserted url remains retrievable
    /// with the ip it was last given.
    #[test]
    fn load_factor_holds_for_any_put_sequence(urls in vec(domain_name(), 1..400)) {
        let map = KeyedMap::new();
        let mut distinct: std::collections::HashMap<String, String> = std::collections::HashMap::new();

        for (i, url) in urls.iter().enumerate() {
            let ip = format!("10.0.{}.{}", (i / 256) % 256, i % 256);
            map.put(Record::new(url.clone(), ip.clone(), 0)).unwrap();
            distinct.insert(url.clone(), ip);

            prop_assert!(map.size() as f64 / map.capacity() as f64 <= 0.75);
        }

        prop_assert_eq!(map.size(), distinct.len());
        for (url, ip) in &distinct {
            prop_assert_eq!(&map.get(url).unwrap().ip, ip);
        }
    }

    /// An uncompressed qname written to the wire and read back yields the
    /// original (lowercased) domain string.
    #[test]
    fn qname_write_then_read_round_trips(domain in domain_name()) {
        let mut buf = PacketBuffer::new();
        buf.write_qname(&domain).unwrap();
        buf.seek(0);
        let decoded = buf.read_qname().unwrap();
        prop_assert_eq!(decoded, domain.to_ascii_lowercase());
    }
}
