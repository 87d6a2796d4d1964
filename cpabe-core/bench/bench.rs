use criterion::measurement::Measurement;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, Criterion};

#[cfg(feature = "bench-internals")]
use cpabe_core::bench::reconstruction_coefficients;

#[cfg(feature = "bench-internals")]
use cpabe_core::CurveScalar;

use cpabe_core::{
    decrypt, encrypt, hash_to_g2, keygen, setup, AccessStructure, DefaultDeserialize,
    DefaultSerialize, Parameters,
};

const POLICY: &str = "dept:HR AND (role:manager OR role:admin) AND site:berlin";

fn bench_hash_to_g2<'a, M: Measurement>(group: &mut BenchmarkGroup<'a, M>) {
    group.bench_function("hash_to_g2", |b| b.iter(|| hash_to_g2("role:manager")));
}

#[cfg(feature = "bench-internals")]
fn bench_reconstruction_coefficients<'a, M: Measurement>(group: &mut BenchmarkGroup<'a, M>) {
    // A chain of eight AND gates: row i is `e_i - e_(i+1)`, the last row is `e_7`.
    let size = 8;
    let matrix: Vec<Vec<CurveScalar>> = (0..size)
        .map(|i| {
            (0..size)
                .map(|j| match j {
                    j if j == i => CurveScalar::one(),
                    j if j == i + 1 => -&CurveScalar::one(),
                    _ => CurveScalar::zero(),
                })
                .collect()
        })
        .collect();
    let rows: Vec<&[CurveScalar]> = matrix.iter().map(|row| row.as_slice()).collect();
    group.bench_function("reconstruction_coefficients", |b| {
        b.iter(|| reconstruction_coefficients(&rows, size))
    });

    let clauses: Vec<String> = (0..size).map(|i| format!("attr{}", i)).collect();
    let structure = AccessStructure::from_policy(&clauses.join(" AND ")).unwrap();
    group.bench_function("AccessStructure::reconstruction_coefficients", |b| {
        b.iter(|| structure.reconstruction_coefficients(|_| true))
    });
}

fn bench_abe<'a, M: Measurement>(group: &mut BenchmarkGroup<'a, M>) {
    let params = Parameters::new();
    let attributes = ["dept:HR", "role:manager", "site:berlin"];
    let policy = AccessStructure::from_policy(POLICY).unwrap();
    let plaintext = b"peace at dawn";

    // Setup

    group.bench_function("setup", |b| b.iter(|| setup(&params)));

    // Key generation

    let (mpk, msk) = setup(&params).unwrap();
    group.bench_function("keygen", |b| {
        b.iter(|| keygen(&params, &msk, &mpk, &attributes))
    });

    // Encryption

    group.bench_function("encrypt", |b| {
        b.iter(|| encrypt(&mpk, &policy, &plaintext[..]))
    });

    // Decryption

    let key = keygen(&params, &msk, &mpk, &attributes).unwrap();
    let ciphertext = encrypt(&mpk, &policy, plaintext).unwrap();
    group.bench_function("decrypt", |b| b.iter(|| decrypt(&mpk, &key, &ciphertext)));

    // Serialization

    let bytes = ciphertext.to_bytes().unwrap();
    group.bench_function("Ciphertext::to_bytes", |b| b.iter(|| ciphertext.to_bytes()));
    group.bench_function("Ciphertext::from_bytes", |b| {
        b.iter(|| cpabe_core::Ciphertext::from_bytes(&bytes))
    });
}

#[cfg(feature = "bench-internals")]
fn group_internals(c: &mut Criterion) {
    let mut group = c.benchmark_group("internals");
    bench_hash_to_g2(&mut group);
    bench_reconstruction_coefficients(&mut group);
    group.finish();
}

#[cfg(not(feature = "bench-internals"))]
fn group_internals(c: &mut Criterion) {
    let mut group = c.benchmark_group("internals");
    bench_hash_to_g2(&mut group);
    group.finish();
}

fn group_abe(c: &mut Criterion) {
    let mut group = c.benchmark_group("ABE API");
    bench_abe(&mut group);
    group.finish();
}

criterion_group!(benches, group_internals, group_abe);

criterion_main!(benches);
