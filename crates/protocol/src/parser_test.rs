//! Tests for the beacon parser

use std::sync::Arc;

use proptest::prelude::*;
use proptest::sample::Index;

use crate::error::RejectReason;
use crate::parser::{BeaconParser, ParseMode};

const VALID: &str = "TAG,fa451f0755d8,197,20251003140059.456";

// =============================================================================
// Strict mode
// =============================================================================

#[test]
fn test_strict_accepts_valid_line() {
    let parser = BeaconParser::strict();
    let beacon = parser.parse(VALID).expect("valid beacon");

    assert_eq!(beacon.tag_id, "fa451f0755d8");
    assert_eq!(beacon.cnt, 197);
    assert_eq!(beacon.timestamp, "20251003140059.456");
    assert_eq!(beacon.raw, VALID);
}

#[test]
fn test_strict_accepts_uppercase_hex() {
    let parser = BeaconParser::strict();
    assert!(parser.parse("TAG,FA451F07,0,20250101000000.000").is_ok());
}

#[test]
fn test_strict_accepts_max_counter() {
    let parser = BeaconParser::strict();
    let beacon = parser
        .parse("TAG,fa451f0755d8,18446744073709551615,20251003140059.456")
        .expect("u64::MAX fits");
    assert_eq!(beacon.cnt, u64::MAX);
}

#[test]
fn test_surrounding_whitespace_is_trimmed() {
    let parser = BeaconParser::strict();
    let beacon = parser
        .parse("  TAG,fa451f0755d8,197,20251003140059.456\r\n")
        .expect("whitespace trimmed");
    assert_eq!(beacon.raw, VALID);
}

#[test]
fn test_malformed_lines() {
    let parser = BeaconParser::strict();
    for line in [
        "",
        "   ",
        "INVALID",
        "TAG",
        "TAG,fa451f0755d8,197",
        "TAG,fa451f0755d8,197,20251003140059.456,extra",
        "TAG,,197,20251003140059.456",
        "TAG,fa451f0755d8,,20251003140059.456",
        "BEACON,fa451f0755d8,197,20251003140059.456",
        "tag,fa451f0755d8,197,20251003140059.456",
    ] {
        assert_eq!(
            parser.parse(line),
            Err(RejectReason::Malformed),
            "line {line:?}"
        );
    }
}

#[test]
fn test_invalid_counter() {
    let parser = BeaconParser::strict();
    for cnt in ["abc", "-5", "1.5", "+3", "18446744073709551616", "１２"] {
        let line = format!("TAG,fa451f0755d8,{cnt},20251003140059.456");
        assert_eq!(
            parser.parse(&line),
            Err(RejectReason::InvalidCounter),
            "counter {cnt:?}"
        );
    }
}

#[test]
fn test_invalid_tag_id_strict() {
    let parser = BeaconParser::strict();
    for id in [
        "invalid_tag",
        "TAG001",
        "fa451f0",
        "fa451f0755d8fa451",
        "zz451f0755d8",
    ] {
        let line = format!("TAG,{id},197,20251003140059.456");
        assert_eq!(
            parser.parse(&line),
            Err(RejectReason::InvalidTagId),
            "id {id:?}"
        );
    }
}

#[test]
fn test_first_calendar_year_accepted() {
    let parser = BeaconParser::strict();
    let beacon = parser
        .parse("TAG,fa451f0755d8,1,00010101000000.000")
        .expect("year 0001 is valid");
    assert_eq!(beacon.timestamp, "00010101000000.000");
}

#[test]
fn test_invalid_timestamp_strict() {
    let parser = BeaconParser::strict();
    for ts in [
        "invalid_timestamp",
        "20251003140059",
        "20251003140059.45",
        "2025-10-03T14:00:59",
        "20251301140059.456",
        "20250230140059.456",
        "20251003250059.456",
        "20251003146059.456",
        "00001003140059.456",
    ] {
        let line = format!("TAG,fa451f0755d8,197,{ts}");
        assert_eq!(
            parser.parse(&line),
            Err(RejectReason::InvalidTimestamp),
            "timestamp {ts:?}"
        );
    }
}

#[test]
fn test_leap_day_accepted() {
    let parser = BeaconParser::strict();
    assert!(parser.parse("TAG,fa451f0755d8,1,20240229235959.999").is_ok());
    assert_eq!(
        parser.parse("TAG,fa451f0755d8,1,20230229235959.999"),
        Err(RejectReason::InvalidTimestamp)
    );
}

#[test]
fn test_counter_checked_before_tag_id_and_timestamp() {
    let parser = BeaconParser::strict();
    assert_eq!(
        parser.parse("TAG,not-hex,abc,garbage"),
        Err(RejectReason::InvalidCounter)
    );
    assert_eq!(
        parser.parse("TAG,not-hex,1,garbage"),
        Err(RejectReason::InvalidTagId)
    );
}

// =============================================================================
// Permissive mode
// =============================================================================

#[test]
fn test_permissive_accepts_alphanumeric_id_and_free_timestamp() {
    let parser = BeaconParser::permissive();
    let beacon = parser.parse("TAG,TAG001,5,yesterday").expect("permissive");
    assert_eq!(beacon.tag_id, "TAG001");
    assert_eq!(beacon.timestamp, "yesterday");
}

#[test]
fn test_permissive_still_checks_id_length_and_charset() {
    let parser = BeaconParser::permissive();
    assert_eq!(
        parser.parse("TAG,abc,5,now"),
        Err(RejectReason::InvalidTagId)
    );
    assert_eq!(
        parser.parse("TAG,tag_01,5,now"),
        Err(RejectReason::InvalidTagId)
    );
    let long = "a".repeat(33);
    assert_eq!(
        parser.parse(&format!("TAG,{long},5,now")),
        Err(RejectReason::InvalidTagId)
    );
}

#[test]
fn test_permissive_still_checks_counter() {
    let parser = BeaconParser::permissive();
    assert_eq!(
        parser.parse("TAG,TAG001,x,now"),
        Err(RejectReason::InvalidCounter)
    );
}

#[test]
fn test_mode_accessor() {
    assert_eq!(BeaconParser::strict().mode(), ParseMode::Strict);
    assert_eq!(BeaconParser::permissive().mode(), ParseMode::Permissive);
    assert_eq!(BeaconParser::default().mode(), ParseMode::Strict);
}

#[test]
fn test_parse_mode_from_str() {
    assert_eq!("strict".parse::<ParseMode>().ok(), Some(ParseMode::Strict));
    assert_eq!(
        "Permissive".parse::<ParseMode>().ok(),
        Some(ParseMode::Permissive)
    );
    assert!("lenient".parse::<ParseMode>().is_err());
}

// =============================================================================
// Statistics
// =============================================================================

#[test]
fn test_stats_start_at_zero() {
    let stats = BeaconParser::strict().stats();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.success_rate, 0.0);
}

#[test]
fn test_stats_count_each_reason() {
    let parser = BeaconParser::strict();
    let _ = parser.parse(VALID);
    let _ = parser.parse(VALID);
    let _ = parser.parse("INVALID");
    let _ = parser.parse("TAG,fa451f0755d8,abc,20251003140059.456");
    let _ = parser.parse("TAG,invalid_tag,197,20251003140059.456");
    let _ = parser.parse("TAG,fa451f0755d8,197,invalid_timestamp");

    let stats = parser.stats();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.invalid_counter, 1);
    assert_eq!(stats.invalid_tag_id, 1);
    assert_eq!(stats.invalid_timestamp, 1);
    assert!((stats.success_rate - 2.0 / 6.0).abs() < f64::EPSILON);
}

#[test]
fn test_reset_stats() {
    let parser = BeaconParser::strict();
    let _ = parser.parse(VALID);
    let _ = parser.parse("INVALID");
    parser.reset_stats();

    let stats = parser.stats();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.successful, 0);
    assert_eq!(stats.malformed, 0);
}

#[test]
fn test_parse_batch_splits_accepted_and_rejected() {
    let parser = BeaconParser::strict();
    let (accepted, rejected) = parser.parse_batch([
        VALID,
        "INVALID",
        "TAG,abcdef12,1,20250101000000.000",
    ]);

    assert_eq!(accepted.len(), 2);
    assert_eq!(accepted[1].tag_id, "abcdef12");
    assert_eq!(rejected, vec!["INVALID".to_string()]);
    assert_eq!(parser.stats().total, 3);
}

#[test]
fn test_shared_across_threads() {
    let parser = Arc::new(BeaconParser::strict());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let parser = Arc::clone(&parser);
            std::thread::spawn(move || {
                for i in 0..250 {
                    let line = if i % 2 == 0 { VALID } else { "INVALID" };
                    let _ = parser.parse(line);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let stats = parser.stats();
    assert_eq!(stats.total, 1000);
    assert_eq!(stats.successful, 500);
    assert_eq!(stats.malformed, 500);
}

// =============================================================================
// Properties
// =============================================================================

fn strict_timestamp_strategy() -> impl Strategy<Value = String> {
    (
        1970u32..2100,
        1u32..=12,
        1u32..=28,
        0u32..24,
        0u32..60,
        0u32..60,
        0u32..1000,
    )
        .prop_map(|(y, mo, d, h, mi, s, ms)| {
            format!("{y:04}{mo:02}{d:02}{h:02}{mi:02}{s:02}.{ms:03}")
        })
}

/// Valid strict beacon fields: id, counter, timestamp
fn beacon_fields_strategy() -> BoxedStrategy<[String; 3]> {
    ("[a-f0-9]{8,16}", any::<u64>(), strict_timestamp_strategy())
        .prop_map(|(id, cnt, ts)| [id, cnt.to_string(), ts])
        .boxed()
}

fn join_fields(fields: &[String]) -> String {
    format!("TAG,{}", fields.join(","))
}

/// A valid beacon broken in one place, with the reason it must be rejected for
fn mutated_beacon_strategy() -> impl Strategy<Value = (String, RejectReason)> {
    let fields = beacon_fields_strategy();

    prop_oneof![
        // Field dropped
        (fields.clone(), 0usize..3).prop_map(|(f, i)| {
            let mut kept = f.to_vec();
            kept.remove(i);
            (join_fields(&kept), RejectReason::Malformed)
        }),
        // Field duplicated
        (fields.clone(), 0usize..3).prop_map(|(f, i)| {
            let mut doubled = f.to_vec();
            doubled.insert(i, f[i].clone());
            (join_fields(&doubled), RejectReason::Malformed)
        }),
        // Comma inside the id
        (fields.clone(), any::<Index>()).prop_map(|(mut f, at)| {
            let pos = at.index(f[0].len() + 1);
            f[0].insert(pos, ',');
            (join_fields(&f), RejectReason::Malformed)
        }),
        // Non-hex character inside the id
        (fields.clone(), any::<Index>(), "[g-zG-Z_]").prop_map(|(mut f, at, ch)| {
            let pos = at.index(f[0].len() + 1);
            f[0].insert_str(pos, &ch);
            (join_fields(&f), RejectReason::InvalidTagId)
        }),
        // Non-digit inside the counter
        (fields.clone(), any::<Index>(), "[a-zA-Z_+-]").prop_map(|(mut f, at, ch)| {
            let pos = at.index(f[1].len() + 1);
            f[1].insert_str(pos, &ch);
            (join_fields(&f), RejectReason::InvalidCounter)
        }),
        // Timestamp cut short
        (fields.clone(), 1usize..18).prop_map(|(mut f, keep)| {
            f[2].truncate(keep);
            (join_fields(&f), RejectReason::InvalidTimestamp)
        }),
        // Millis cut short
        (fields, 1usize..=2).prop_map(|(mut f, cut)| {
            let keep = f[2].len() - cut;
            f[2].truncate(keep);
            (join_fields(&f), RejectReason::InvalidTimestamp)
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn strict_accepts_every_well_formed_line(
        id in "[a-fA-F0-9]{8,16}",
        cnt in any::<u64>(),
        ts in strict_timestamp_strategy(),
    ) {
        let parser = BeaconParser::strict();
        let line = format!("TAG,{id},{cnt},{ts}");
        let beacon = parser.parse(&line).unwrap_or_else(|e| panic!("{line}: {e}"));
        prop_assert_eq!(&beacon.tag_id, &id);
        prop_assert_eq!(beacon.cnt, cnt);
        prop_assert_eq!(&beacon.timestamp, &ts);
        prop_assert_eq!(beacon.to_line(), line);
    }

    #[test]
    fn every_line_is_counted_exactly_once(lines in prop::collection::vec(any::<String>(), 0..20)) {
        let parser = BeaconParser::permissive();
        for line in &lines {
            let _ = parser.parse(line);
        }
        let stats = parser.stats();
        prop_assert_eq!(stats.total, lines.len() as u64);
        prop_assert_eq!(stats.successful + stats.failed, stats.total);
    }

    #[test]
    fn mutated_beacons_are_rejected_with_reason((line, expected) in mutated_beacon_strategy()) {
        let parser = BeaconParser::strict();
        prop_assert_eq!(parser.parse(&line), Err(expected), "line {:?}", line);
        prop_assert_eq!(parser.stats().successful, 0);
    }

    #[test]
    fn lines_without_prefix_are_malformed(line in "[a-zA-Z0-9 ,.]{0,48}") {
        prop_assume!(!line.trim().starts_with("TAG,"));
        let parser = BeaconParser::strict();
        prop_assert_eq!(parser.parse(&line), Err(RejectReason::Malformed));
    }
}
