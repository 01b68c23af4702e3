use std::hint::black_box;

use chrono::{TimeZone, Utc};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use deferlink::{DeviceSignals, DynamicValue, MatchResponse, evaluate_match, generate};
use serde_json::json;

fn sample_body(metadata_keys: usize) -> Vec<u8> {
    let metadata: serde_json::Map<String, serde_json::Value> = (0..metadata_keys)
        .map(|i| {
            let value = match i % 4 {
                0 => json!(format!("value-{i}")),
                1 => json!(i),
                2 => json!({"nested": [i, true, null]}),
                _ => json!(i as f64 * 0.5),
            };
            (format!("key_{i}"), value)
        })
        .collect();
    serde_json::to_vec(&json!({
        "match": {
            "confidence_score": 0.92,
            "ttl_seconds": 3600,
            "deeplink": {
                "id": "m1",
                "target_url": "https://example.com/product/42",
                "metadata": metadata,
                "campaign_id": "spring",
                "matched_at": "2024-01-01T00:00:00Z",
                "expires_at": "2024-01-01T01:00:00Z",
                "attribution": {"campaign": "spring", "source": "newsletter", "medium": "email"}
            }
        }
    }))
    .unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_match_response");
    for keys in [0usize, 16, 256] {
        let body = sample_body(keys);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_function(format!("metadata_{keys}"), |b| {
            b.iter(|| {
                let resp: MatchResponse = serde_json::from_slice(black_box(&body)).unwrap();
                black_box(resp)
            })
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let resp: MatchResponse = serde_json::from_slice(&sample_body(16)).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
    c.bench_function("evaluate_match", |b| {
        b.iter(|| black_box(evaluate_match(black_box(&resp), 0.8, now)))
    });
}

fn bench_dynamic(c: &mut Criterion) {
    let raw = String::from_utf8(sample_body(256)).unwrap();
    c.bench_function("dynamic_value_parse", |b| {
        b.iter(|| {
            let value: DynamicValue = serde_json::from_str(black_box(&raw)).unwrap();
            black_box(value)
        })
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let now = Utc::now();
    let signals = DeviceSignals {
        platform: "android".into(),
        device_model: "Pixel 8".into(),
        os_version: "14".into(),
        screen_width: 411.4,
        screen_height: 914.3,
        screen_scale: 2.625,
        timezone: "America/New_York".into(),
        installed_at: now,
        last_opened_at: now,
        ..Default::default()
    };
    c.bench_function("fingerprint_generate", |b| {
        b.iter(|| black_box(generate(black_box(&signals))))
    });
}

criterion_group!(benches, bench_decode, bench_evaluate, bench_dynamic, bench_fingerprint);
criterion_main!(benches);
