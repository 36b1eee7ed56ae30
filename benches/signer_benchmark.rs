use criterion::{criterion_group, criterion_main, Criterion};
use spotify_session::services::{RefreshClaims, Signer};
use std::hint::black_box;
use std::time::Duration;

fn benchmark_signer(c: &mut Criterion) {
    let signer = Signer::new(b"benchmark_refresh_key_32_bytes!!");
    let claims = RefreshClaims {
        user_id: "spotify-user".to_string(),
        token_version: 3,
        refresh_token: "AQD0-spotify-refresh-token-value".to_string(),
    };
    let token = signer
        .sign(&claims, Duration::from_secs(7 * 24 * 60 * 60))
        .expect("Failed to sign");
    let forged = Signer::new(b"some_other_key_entirely_32_bytes")
        .sign(&claims, Duration::from_secs(60))
        .expect("Failed to sign");

    let mut group = c.benchmark_group("refresh_token");

    group.bench_function("sign", |b| {
        b.iter(|| signer.sign(black_box(&claims), Duration::from_secs(60)))
    });

    group.bench_function("verify_valid", |b| {
        b.iter(|| signer.verify::<RefreshClaims>(black_box(&token)))
    });

    group.bench_function("verify_wrong_key", |b| {
        b.iter(|| signer.verify::<RefreshClaims>(black_box(&forged)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_signer);
criterion_main!(benches);
