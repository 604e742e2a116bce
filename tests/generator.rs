//! Integration tests for the workload generator: counts, framing, cancel
//! lag and price bounds over full generated runs.

use std::collections::HashMap;

use fix_flyweight::codec::encoder::verify_framing;
use fix_flyweight::config::GeneratorConfig;
use fix_flyweight::consumer::reference::{FieldAccess, ParsedMessage};
use fix_flyweight::generator::{GenerationResult, WorkloadGenerator, CANCEL_WINDOW, SYMBOLS};
use fix_flyweight::queue::MessageQueue;

fn generate(seed: u64, count: u64) -> (GenerationResult, Vec<ParsedMessage>, Vec<Vec<u8>>) {
    let mut generator =
        WorkloadGenerator::new(GeneratorConfig::new("SENDER", "TARGET").with_seed(seed)).unwrap();
    let mut raw = Vec::new();
    let result = generator.generate(count, &mut raw).unwrap();
    let parsed = raw
        .iter()
        .map(|m| ParsedMessage::parse(m).expect("generated message parses"))
        .collect();
    (result, parsed, raw)
}

#[test]
fn test_counts_are_consistent() {
    for (seed, count) in [(1, 1), (2, 99), (3, 100), (4, 101), (5, 2_500)] {
        let (result, parsed, _) = generate(seed, count);
        assert_eq!(result.nos_count + result.cancel_count, result.total_messages);
        assert!(result.total_messages >= count);
        assert_eq!(result.first_phase_messages, count);
        assert_eq!(parsed.len() as u64, result.total_messages);
    }
}

#[test]
fn test_every_message_is_framed() {
    let (_, _, raw) = generate(7, 3_000);
    for msg in &raw {
        assert!(msg.starts_with(b"8=FIX.4.4\x019="));
        assert_eq!(msg.last(), Some(&0x01));

        let pos = msg.windows(4).rposition(|w| w == b"\x0110=").unwrap() + 1;
        let sum = msg[..pos].iter().map(|&b| u32::from(b)).sum::<u32>() % 256;
        let stated: u32 = std::str::from_utf8(&msg[pos + 3..pos + 6])
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(stated, sum);
        assert!(verify_framing(msg));
    }
}

#[test]
fn test_every_open_canceled_once_within_window() {
    let (result, parsed, _) = generate(42, 10_000);

    let mut opened_at: HashMap<i64, u64> = HashMap::new();
    let mut canceled_at: HashMap<i64, u64> = HashMap::new();
    for (index, msg) in parsed.iter().enumerate() {
        match msg.msg_type() {
            Some(b'D') => {
                let id = msg.field_i64(11).unwrap();
                assert!(opened_at.insert(id, index as u64).is_none(), "duplicate open {id}");
            }
            Some(b'F') => {
                let orig = msg.field_i64(41).unwrap();
                assert!(opened_at.contains_key(&orig), "cancel before open {orig}");
                assert!(canceled_at.insert(orig, index as u64).is_none(), "double cancel {orig}");
            }
            other => panic!("unexpected msg type {other:?}"),
        }
    }

    assert_eq!(opened_at.len() as u64, result.nos_count);
    assert_eq!(canceled_at.len() as u64, result.cancel_count);

    for (id, &open) in &opened_at {
        let cancel = canceled_at[id];
        assert!(cancel > open);
        if open + CANCEL_WINDOW < result.first_phase_messages {
            assert!(
                cancel - open <= CANCEL_WINDOW,
                "order {id} opened at {open} canceled at {cancel}"
            );
        }
    }
}

#[test]
fn test_identifiers_are_sequential() {
    let (_, parsed, _) = generate(9, 500);
    let opens: Vec<i64> = parsed
        .iter()
        .filter(|m| m.msg_type() == Some(b'D'))
        .map(|m| m.field_i64(11).unwrap())
        .collect();
    let cancels: Vec<i64> = parsed
        .iter()
        .filter(|m| m.msg_type() == Some(b'F'))
        .map(|m| m.field_i64(11).unwrap())
        .collect();

    assert!(opens.iter().copied().eq(1..=opens.len() as i64));
    assert!(cancels.iter().copied().eq(1..=cancels.len() as i64));
}

#[test]
fn test_prices_stay_near_symbol_base() {
    let (_, parsed, _) = generate(123, 5_000);
    let mut ranges: HashMap<String, (i64, i64)> = HashMap::new();

    for msg in parsed.iter().filter(|m| m.msg_type() == Some(b'D')) {
        let symbol = msg.field_str(55).unwrap().to_owned();
        assert!(SYMBOLS.contains(&symbol.as_str()));
        let cents = fix_flyweight::codec::price::decode(msg.field_str(44).unwrap().as_bytes());
        assert!((10_000 - 10..=29_999 + 10).contains(&cents));

        let qty = msg.field_i64(38).unwrap();
        assert!(qty % 100 == 0 && (100..=1_000).contains(&qty));

        let entry = ranges.entry(symbol).or_insert((cents, cents));
        entry.0 = entry.0.min(cents);
        entry.1 = entry.1.max(cents);
    }

    for (symbol, (lo, hi)) in ranges {
        assert!(hi - lo <= 20, "{symbol} spans {lo}..{hi}");
    }
}

#[test]
fn test_same_seed_same_workload() {
    // SendingTime, TransactTime and the framing derived from them vary by clock.
    fn stable_fields(msgs: &[ParsedMessage]) -> Vec<Vec<(u32, String)>> {
        msgs.iter()
            .map(|m| {
                m.fields()
                    .iter()
                    .filter(|(tag, _)| !matches!(tag, 9 | 10 | 52 | 60))
                    .cloned()
                    .collect()
            })
            .collect()
    }

    let (a_result, a, _) = generate(2024, 1_500);
    let (b_result, b, _) = generate(2024, 1_500);
    assert_eq!(a_result, b_result);
    assert_eq!(stable_fields(&a), stable_fields(&b));

    let (_, c, _) = generate(2025, 1_500);
    assert_ne!(stable_fields(&a), stable_fields(&c));
}

#[test]
fn test_generate_into_queue() {
    let dir = tempfile::tempdir().unwrap();
    let queue = MessageQueue::open(dir.path().join("fix.q")).unwrap();
    let mut writer = queue.writer().unwrap();
    let result = WorkloadGenerator::new(GeneratorConfig::default().with_seed(5))
        .unwrap()
        .generate(800, &mut writer)
        .unwrap();
    writer.flush().unwrap();

    assert_eq!(queue.len().unwrap(), result.total_messages);
}
