use criterion::{Criterion, black_box, criterion_group, criterion_main};
use roast_scan::generator::canonical_payload;
use roast_scan::resolve;
use serde_json::json;

fn bench_resolve_structured(c: &mut Criterion) {
    let text = r#"{"name":"Colombia Huila","batchNumber":"B-2024-0093","id":93,"weightKg":60,"origin":{"farm":"La Esperanza","altitude":1750}}"#;
    c.bench_function("resolve_structured", |b| b.iter(|| resolve(black_box(text))));
}

fn bench_resolve_barcode(c: &mut Criterion) {
    c.bench_function("resolve_barcode_numeric", |b| {
        b.iter(|| resolve(black_box("012345678905")))
    });
    c.bench_function("resolve_barcode_text", |b| {
        b.iter(|| resolve(black_box("LOT-2024-0093/SACK-17")))
    });
}

fn bench_canonical_payload(c: &mut Criterion) {
    let record = json!({
        "name": "Colombia Huila",
        "batchNumber": "B-2024-0093",
        "id": 93,
        "notes": "washed, 72h ferment",
    });
    c.bench_function("canonical_payload", |b| {
        b.iter(|| canonical_payload(black_box(&record)))
    });
}

criterion_group!(
    benches,
    bench_resolve_structured,
    bench_resolve_barcode,
    bench_canonical_payload
);
criterion_main!(benches);
