// ==============================================
// NORMALIZATION CACHE BEHAVIOR (integration)
// ==============================================
//
// End-to-end checks of the public surface. Every scenario that depends on
// how the key index retains slots runs twice: once with the default weak
// key store (slots die with their entry) and once with a strong key store
// (slots only go away when the engine drops them).

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use keyfold::prelude::*;

// ----------------------------------------------
// Fixtures
// ----------------------------------------------

/// Raw keys arrive as numbers or as text; both normalize to a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RawKey {
    Num(u32),
    Text(String),
}

fn text(s: &str) -> RawKey {
    RawKey::Text(s.to_string())
}

#[derive(Debug)]
struct BadNumber(String);

impl fmt::Display for BadNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a number: {:?}", self.0)
    }
}

/// Numeric-string parser that counts how often it runs.
#[derive(Clone, Default)]
struct NumericParser {
    calls: Rc<Cell<usize>>,
}

impl NumericParser {
    fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Normalizer<RawKey> for NumericParser {
    type Error = BadNumber;

    fn normalize(&self, raw: &RawKey) -> Result<RawKey, BadNumber> {
        self.calls.set(self.calls.get() + 1);
        match raw {
            RawKey::Num(n) => Ok(RawKey::Num(*n)),
            RawKey::Text(s) => s
                .trim()
                .parse()
                .map(RawKey::Num)
                .map_err(|_| BadNumber(s.clone())),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Index {
    Weak,
    Strong,
}

const BOTH: [Index; 2] = [Index::Weak, Index::Strong];

fn cache_with<V: 'static>(
    index: Index,
) -> (NormalizingCache<RawKey, V, NumericParser>, NumericParser) {
    let parser = NumericParser::default();
    let builder = NormalizingCache::builder(parser.clone());
    let cache = match index {
        Index::Weak => builder.build(),
        Index::Strong => builder.strong_key_store().build(),
    };
    (cache, parser)
}

// ----------------------------------------------
// Normalization is cached per raw spelling
// ----------------------------------------------

#[test]
fn numeric_and_text_spellings_share_a_value() {
    let (mut cache, parser) = cache_with(Index::Weak);

    cache.set(&RawKey::Num(5), "v5").unwrap();
    assert_eq!(cache.get(&text("5")), Ok("v5"));
    assert_eq!(parser.calls(), 2);

    for _ in 0..5 {
        assert_eq!(cache.get(&text("5")), Ok("v5"));
        assert_eq!(cache.get(&RawKey::Num(5)), Ok("v5"));
    }
    assert_eq!(parser.calls(), 2);
}

#[test]
fn every_variant_sees_the_latest_write() {
    for index in BOTH {
        let (mut cache, parser) = cache_with(index);
        let variants = [text("12"), text(" 12"), text("012"), RawKey::Num(12)];

        for (i, raw) in variants.iter().enumerate() {
            cache.set(raw, i).unwrap();
            for other in &variants[..=i] {
                assert_eq!(cache.get(other), Ok(i), "{index:?} {other:?}");
            }
        }
        // The canonical spelling is indexed when its entry is created.
        assert_eq!(parser.calls(), variants.len() - 1, "{index:?}");
    }
}

#[test]
fn normalization_failure_carries_detail() {
    let (mut cache, _) = cache_with::<u8>(Index::Weak);

    let err = cache.get(&text("twelve")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to normalize key: not a number: \"twelve\""
    );
    assert!(!err.is_not_found());
}

// ----------------------------------------------
// Negative caching
// ----------------------------------------------

#[test]
fn stored_empty_value_differs_from_missing_key() {
    let (mut cache, _) = cache_with::<Option<&str>>(Index::Weak);

    cache.set(&text("1"), None).unwrap();
    assert_eq!(cache.get(&RawKey::Num(1)), Ok(None));
    assert_eq!(cache.get(&RawKey::Num(2)), Err(CacheError::NotFound));
}

#[test]
fn unit_values_are_present() {
    let (mut cache, _) = cache_with::<()>(Index::Strong);
    cache.set(&RawKey::Num(3), ()).unwrap();
    assert_eq!(cache.get(&text("3")), Ok(()));
}

// ----------------------------------------------
// Delete
// ----------------------------------------------

#[test]
fn delete_then_get_is_not_found_and_set_renormalizes() {
    for index in BOTH {
        let (mut cache, parser) = cache_with(index);

        cache.set(&text("4"), "four").unwrap();
        cache.delete(&text("4")).unwrap();
        assert_eq!(cache.get(&text("4")), Err(CacheError::NotFound));
        assert_eq!(parser.calls(), 2, "{index:?}");

        cache.set(&text("4"), "FOUR").unwrap();
        assert_eq!(parser.calls(), 2, "{index:?}");
        assert_eq!(cache.get(&text("4")), Ok("FOUR"));
    }
}

#[test]
fn set_after_delete_runs_normalizer_again() {
    for index in BOTH {
        let (mut cache, parser) = cache_with(index);

        cache.set(&text("4"), 1).unwrap();
        cache.delete(&text("4")).unwrap();
        cache.set(&text("4"), 2).unwrap();
        assert_eq!(parser.calls(), 2, "{index:?}");
        assert_eq!(cache.get(&RawKey::Num(4)), Ok(2));
    }
}

#[test]
fn other_variants_renormalize_exactly_once_after_delete() {
    for index in BOTH {
        let (mut cache, parser) = cache_with(index);
        let others = [text("07"), text(" 7 "), text("+7")];

        cache.set(&text("7"), "seven").unwrap();
        for raw in &others {
            assert_eq!(cache.get(raw), Ok("seven"));
        }
        let before = parser.calls();
        assert_eq!(before, 1 + others.len());

        cache.delete(&text("7")).unwrap();

        for raw in &others {
            assert_eq!(cache.get(raw), Err(CacheError::NotFound), "{index:?}");
            assert_eq!(cache.get(raw), Err(CacheError::NotFound), "{index:?}");
        }
        assert_eq!(parser.calls(), before + others.len(), "{index:?}");
    }
}

#[test]
fn strong_index_repairs_stale_slots_lazily() {
    let (mut cache, _) = cache_with(Index::Strong);

    cache.set(&text("9"), 'x').unwrap();
    cache.get(&text("09")).unwrap();
    cache.get(&text("009")).unwrap();
    cache.delete(&text("9")).unwrap();

    // Both stale slots are still in the index until they are looked up.
    assert_eq!(cache.metrics().key_store_len, 2);
    cache.get(&text("09")).unwrap_err();
    assert_eq!(cache.metrics().stale_slots_repaired, 1);
    cache.get(&text("009")).unwrap_err();
    assert_eq!(cache.metrics().stale_slots_repaired, 2);
}

#[test]
fn weak_index_releases_stale_slots_without_lookups() {
    let (mut cache, _) = cache_with(Index::Weak);

    cache.set(&text("9"), 'x').unwrap();
    cache.get(&text("09")).unwrap();
    cache.get(&text("009")).unwrap();
    cache.delete(&text("9")).unwrap();

    cache.get(&text("09")).unwrap_err();
    cache.get(&text("009")).unwrap_err();
    assert_eq!(cache.metrics().stale_slots_repaired, 0);
}

// ----------------------------------------------
// raw_set
// ----------------------------------------------

#[test]
fn raw_set_never_normalizes() {
    for index in BOTH {
        let (mut cache, parser) = cache_with(index);

        for n in 0..10 {
            cache.raw_set(&RawKey::Num(n), n * 10);
        }
        for n in 0..10 {
            assert_eq!(cache.get(&RawKey::Num(n)), Ok(n * 10));
        }
        assert_eq!(parser.calls(), 0, "{index:?}");

        assert_eq!(cache.get(&text("3")), Ok(30));
        assert_eq!(parser.calls(), 1, "{index:?}");
    }
}

// ----------------------------------------------
// Out-of-band removal
// ----------------------------------------------

#[test]
fn value_store_removal_reads_as_not_found() {
    for index in BOTH {
        let (mut cache, _) = cache_with(index);

        cache.set(&text("2"), "two").unwrap();
        cache.get(&text("02")).unwrap();
        assert!(cache.value_store_mut().delete(&RawKey::Num(2)));

        assert_eq!(cache.get(&text("02")), Err(CacheError::NotFound), "{index:?}");
        assert_eq!(cache.get(&text("2")), Err(CacheError::NotFound), "{index:?}");
    }
}

#[test]
fn key_store_removal_renormalizes_only_that_spelling() {
    for index in BOTH {
        let (mut cache, parser) = cache_with(index);

        cache.set(&text("5"), "five").unwrap();
        cache.get(&text("05")).unwrap();
        cache.get(&RawKey::Num(5)).unwrap();
        assert_eq!(parser.calls(), 2);

        assert!(cache.key_store_mut().delete(&text("05")));
        assert_eq!(cache.get(&text("05")), Ok("five"), "{index:?}");
        assert_eq!(parser.calls(), 3, "{index:?}");

        assert_eq!(cache.get(&text("5")), Ok("five"));
        assert_eq!(cache.get(&RawKey::Num(5)), Ok("five"));
        assert_eq!(parser.calls(), 3, "{index:?}");
    }
}

#[test]
fn lru_value_store_evictions_self_heal() {
    let parser = NumericParser::default();
    let mut cache = NormalizingCache::builder(parser.clone())
        .strong_key_store()
        .value_store_capacity(3)
        .build();

    for n in 0..10u32 {
        cache.set(&text(&format!("0{n}")), n).unwrap();
    }

    // Only the three most recent survive.
    for n in 0..7u32 {
        assert_eq!(cache.get(&text(&format!("0{n}"))), Err(CacheError::NotFound));
    }
    assert!(cache.metrics().evictions_detected >= 7);
    assert_eq!(cache.value_store().len(), 3);
}

// ----------------------------------------------
// flush_all
// ----------------------------------------------

#[test]
fn flush_all_resets_values_and_normalizations() {
    for index in BOTH {
        let (mut cache, parser) = cache_with(index);

        cache.set(&text("1"), 'a').unwrap();
        cache.set(&text("2"), 'b').unwrap();
        cache.raw_set(&RawKey::Num(3), 'c');
        assert_eq!(parser.calls(), 2);

        cache.flush_all();

        assert_eq!(cache.get(&text("1")), Err(CacheError::NotFound));
        assert_eq!(cache.get(&text("2")), Err(CacheError::NotFound));
        assert_eq!(cache.get(&RawKey::Num(3)), Err(CacheError::NotFound));
        assert_eq!(parser.calls(), 5, "{index:?}");
    }
}

// ----------------------------------------------
// Metrics
// ----------------------------------------------

#[test]
fn metrics_track_index_activity() {
    let (mut cache, _) = cache_with(Index::Weak);

    cache.set(&text("1"), 1).unwrap();
    cache.get(&text("01")).unwrap();
    cache.get(&text("01")).unwrap();
    cache.get(&text("x")).unwrap_err();

    let metrics = cache.metrics();
    assert_eq!(metrics.normalizer_calls, 3);
    assert_eq!(metrics.normalize_failures, 1);
    assert_eq!(metrics.index_misses, 3);
    assert_eq!(metrics.index_hits, 1);
    assert_eq!(metrics.entries_created, 1);
    assert_eq!(metrics.variants_linked, 1);
    // "1", "01" and the canonical Num(1).
    assert_eq!(metrics.key_store_len, 3);
    assert_eq!(metrics.value_store_len, 1);
    assert!((metrics.index_hit_ratio() - 0.25).abs() < f64::EPSILON);
}

// ----------------------------------------------
// Crate root surface
// ----------------------------------------------

#[test]
fn crate_root_exposes_cache_and_error() {
    let mut cache: keyfold::NormalizingCache<RawKey, u8, _> =
        keyfold::NormalizingCache::new(NumericParser::default());
    assert_eq!(cache.get(&RawKey::Num(1)), Err(keyfold::CacheError::NotFound));
}
