use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use tandem::signaling::Envelope;

const OFFER: &str = r#"{"type":"createOffer","sdp":{"type":"offer","sdp":"v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\na=group:BUNDLE 0 1\r\n"},"target":"receiver"}"#;
const CANDIDATE: &str = r#"{"type":"iceCandidate","candidate":{"candidate":"candidate:842163049 1 udp 1677729535 203.0.113.7 46154 typ srflx","sdpMid":"0","sdpMLineIndex":0}}"#;
const TRANSCRIPTION: &str =
    r#"{"type":"transcription","text":"nice to meet you","isFinal":true,"target":"receiver"}"#;
const PREDICTION: &str =
    r#"{"type":"signPrediction","label":"hello","confidence":0.93,"target":"receiver"}"#;

/// parse + classify for each envelope kind
fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");

    for (name, raw) in [
        ("offer", OFFER),
        ("ice_candidate", CANDIDATE),
        ("transcription", TRANSCRIPTION),
        ("sign_prediction", PREDICTION),
    ] {
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                let envelope = Envelope::parse(black_box(raw)).unwrap();
                black_box(envelope.route())
            })
        });
    }

    group.finish();
}

/// malformed frames are rejected on the hot path too
fn bench_malformed(c: &mut Criterion) {
    c.bench_function("malformed", |b| {
        b.iter(|| black_box(Envelope::parse(black_box("{not json")).is_err()))
    });
}

criterion_group!(benches, bench_routing, bench_malformed);
criterion_main!(benches);
