//! Generator of degraded payment QR images, read back through the reader
//!
//! Usage: cargo run -p payqr-core --example gen_dataset

use anyhow::Context;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use payqr_core::{
    build_payload, PaymentDetails, PaymentQrConfig, QrCodeWriter, QrSymbolReader, RenderConfig,
    SymbolReader,
};
use rand::Rng;
use std::fs;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let output_dir = Path::new("generated_dataset");
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)?;

    let upi = PaymentQrConfig::upi(
        PaymentDetails::new("merchant@bank", "Test Shop", "12.50")
            .with_country("IN")
            .with_currency("INR"),
    );
    let paynow = PaymentQrConfig::paynow(
        PaymentDetails::new("201912345A", "ACME Trading Pte Ltd", "25.50")
            .with_country("SG")
            .with_currency("SGD"),
        Some(false),
    );

    let payloads = vec![
        ("upi", build_payload(&upi, Some("INV-1"))?),
        ("paynow", build_payload(&paynow, None)?),
        ("upi_link", "upi://pay?pa=merchant@bank&pn=Test%20Shop&am=12.50".to_string()),
    ];

    let writer = QrCodeWriter::new(RenderConfig {
        margin: 4,
        scale: 8,
        ..Default::default()
    });
    let reader = SymbolReader::default();
    let mut rng = rand::thread_rng();

    let mut total = 0;
    let mut read_back = 0;

    for (name, payload) in &payloads {
        let clean = writer.to_image(payload)?;

        let mut variants: Vec<(String, GrayImage)> = vec![
            ("clean".into(), clean.clone()),
            ("blur_2.0".into(), gaussian_blur_f32(&clean, 2.0)),
        ];

        for angle in [15.0f32, 30.0, 45.0] {
            let rotated = rotate_about_center(
                &clean,
                angle.to_radians(),
                Interpolation::Bilinear,
                image::Luma([255]),
            );
            variants.push((format!("rot_{}", angle), rotated));
        }

        // salt & pepper
        let mut noisy = clean.clone();
        for p in noisy.pixels_mut() {
            if rng.gen::<f64>() < 0.05 {
                p.0[0] = if rng.gen() { 0 } else { 255 };
            }
        }
        variants.push(("noise".into(), noisy));

        // map 0..255 to 100..150
        let mut low_contrast = clean.clone();
        for p in low_contrast.pixels_mut() {
            p.0[0] = (100.0 + (p.0[0] as f32 / 255.0) * 50.0) as u8;
        }
        variants.push(("low_contrast".into(), low_contrast));

        for (variant, img) in variants {
            let file = output_dir.join(format!("{}_{}.png", name, variant));
            img.save(&file).with_context(|| format!("saving {}", file.display()))?;
            total += 1;

            match reader.read(&img) {
                Ok(text) if &text == payload => {
                    read_back += 1;
                    println!("ok      {}", file.display());
                }
                Ok(text) => println!("MISREAD {}: {}", file.display(), text),
                Err(e) => println!("FAILED  {}: {}", file.display(), e),
            }
        }
    }

    println!("Generated {} images, {} read back correctly.", total, read_back);
    Ok(())
}
