use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use txt_history_analytics::decoder;
use txt_history_analytics::models::utc_to_apple_timestamp;
use txt_history_analytics::{Analyzer, MessageNormalizer, RawMessageRecord};

const LINES: &[&str] = &[
    "are we still on for dinner tonight?",
    "yes!! can't wait 😍",
    "running 10 min late, traffic is awful",
    "no worries babe, grabbing us a table",
    "that movie was so good 😂😂",
    "love you, sleep well ❤️",
];

fn sample_rows(count: usize) -> Vec<RawMessageRecord> {
    let base = Utc.with_ymd_and_hms(2023, 1, 2, 8, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let at = base + Duration::minutes(i as i64 * 53);
            RawMessageRecord::with_text(utc_to_apple_timestamp(at), i % 2 == 0, LINES[i % LINES.len()])
        })
        .collect()
}

fn typedstream_payload(text: &str) -> Vec<u8> {
    let mut payload = b"\x04\x0bstreamtyped\x81\xe8\x03\x84\x01@\x84\x84\x84\x12NSAttributedString\x00\x84\x84\x08NSObject\x00\x85\x92\x84\x84\x84\x08NSString\x01\x94\x84\x01+".to_vec();
    payload.push(u8::try_from(text.len()).unwrap());
    payload.extend_from_slice(text.as_bytes());
    payload.extend_from_slice(b"\x86\x84\x02iI\x01\x05\x92\x84\x84\x84\x0cNSDictionary\x00\x94\x84\x01i\x01\x92\x84\x96\x96\x1d__kIMMessagePartAttributeName\x86");
    payload
}

fn bench_decode(c: &mut Criterion) {
    let payload = typedstream_payload("See you at the station at six");
    c.bench_function("decode_typedstream", |b| b.iter(|| decoder::decode(black_box(&payload))));
}

fn bench_analysis(c: &mut Criterion) {
    let (messages, _) = MessageNormalizer::default().normalize_batch(&sample_rows(5_000));
    let now = messages.last().map_or_else(Utc::now, |m| m.instant);
    let analyzer = Analyzer::default();

    c.bench_function("normalize_5k", |b| {
        let rows = sample_rows(5_000);
        let normalizer = MessageNormalizer::default();
        b.iter(|| normalizer.normalize_batch(black_box(&rows)));
    });
    c.bench_function("analyze_5k", |b| b.iter(|| analyzer.analyze(black_box(&messages), now)));
}

criterion_group!(benches, bench_decode, bench_analysis);
criterion_main!(benches);
