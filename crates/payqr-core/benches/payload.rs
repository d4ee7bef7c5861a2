//! Benchmarks for payload building and QR rendering

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use payqr_core::crc::crc16_ccitt_false;
use payqr_core::{build_payload, parse_decoded_text, PaymentDetails, PaymentQrConfig, QrCodeWriter, QrSymbolWriter};

fn upi_config() -> PaymentQrConfig {
    PaymentQrConfig::upi(
        PaymentDetails::new("merchant@bank", "Test Shop", "12.50")
            .with_country("IN")
            .with_currency("INR"),
    )
}

fn paynow_config() -> PaymentQrConfig {
    PaymentQrConfig::paynow(
        PaymentDetails::new("201912345A", "ACME Trading Pte Ltd", "25.50")
            .with_country("SG")
            .with_currency("SGD"),
        Some(false),
    )
}

fn benchmark_payload(c: &mut Criterion) {
    let upi = upi_config();
    let paynow = paynow_config();

    c.bench_function("build_payload_upi", |b| {
        b.iter(|| build_payload(black_box(&upi), Some("INV-1")))
    });

    c.bench_function("build_payload_paynow", |b| {
        b.iter(|| build_payload(black_box(&paynow), None))
    });

    let payload = build_payload(&upi, None).unwrap_or_default();
    c.bench_function("crc16_payload", |b| {
        b.iter(|| crc16_ccitt_false(black_box(payload.as_bytes())))
    });
}

fn benchmark_parse_and_render(c: &mut Criterion) {
    let link = "upi://pay?pa=merchant@bank&pn=Test%20Shop&am=12.50&tr=INV-1&cu=INR";
    c.bench_function("parse_upi_link", |b| {
        b.iter(|| parse_decoded_text(black_box(link)))
    });

    let writer = QrCodeWriter::default();
    let payload = build_payload(&paynow_config(), None).unwrap_or_default();
    c.bench_function("render_png", |b| {
        b.iter(|| writer.write(black_box(&payload)))
    });
}

criterion_group!(benches, benchmark_payload, benchmark_parse_and_render);
criterion_main!(benches);
