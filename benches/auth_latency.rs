use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode};
use mehm_gateway_hub::bench_support::AuthBenchFixture;
use mehm_gateway_hub::mehm_gateway_http::auth::IdentityCache;
use tokio::runtime::Runtime;

fn bench_credential_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("credential_resolution");
    group
        .sample_size(1000)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3))
        .sampling_mode(SamplingMode::Auto);

    for user_count in [1usize, 1_000] {
        let fixture = AuthBenchFixture::new(user_count);

        group.bench_function(BenchmarkId::new("cache_hit", user_count), |b| {
            b.iter(|| {
                let identity = fixture
                    .cache
                    .get(fixture.random_token())
                    .expect("cached identity");
                black_box(identity)
            });
        });

        group.bench_function(BenchmarkId::new("token_verify", user_count), |b| {
            b.iter(|| {
                let verified = fixture
                    .codec
                    .verify(fixture.random_token())
                    .expect("valid token");
                black_box(verified)
            });
        });
    }

    let fixture = Arc::new(AuthBenchFixture::new(1_000));
    let runtime = Runtime::new().expect("tokio runtime");
    group.bench_function("concurrent_cache_hits", |b| {
        b.to_async(&runtime).iter(|| async {
            let tasks = (0..100).map(|_| {
                let fixture = Arc::clone(&fixture);
                tokio::spawn(async move {
                    fixture
                        .cache
                        .get(fixture.random_token())
                        .expect("cached identity concurrent")
                })
            });
            for task in tasks {
                task.await.expect("join handle");
            }
        });
    });

    group.finish();
}

criterion_group!(auth_latency, bench_credential_resolution);
criterion_main!(auth_latency);
