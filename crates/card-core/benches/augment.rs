//! Benchmarks for the augmentation pipeline

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use card_core::{Augmentor, AugmentorConfig, FieldBox};
use image::{Rgb, RgbImage};

fn create_test_card(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);

    // Text-like horizontal stripes to keep the warp work realistic
    for y in 0..height {
        for x in 0..width {
            let value = if (y / 12) % 2 == 0 { 40 } else { 230 };
            img.put_pixel(x, y, Rgb([value, value, value]));
        }
    }

    img
}

fn card_boxes() -> Vec<FieldBox> {
    (0..12)
        .map(|i| {
            let y = 15.0 + i as f32 * 26.0;
            FieldBox {
                class_id: i,
                class_name: format!("Field{:02}", i),
                bbox: [120.0, y, 480.0, y + 20.0],
                text: "1 2345 67890 12 3".to_string(),
            }
        })
        .collect()
}

fn benchmark_augment(c: &mut Criterion) {
    let image = create_test_card(600, 350);
    let boxes = card_boxes();

    c.bench_function("augment_600x350_n3", |b| {
        let config = AugmentorConfig {
            image_size: (600, 350),
            num_augmentations: 3,
        };
        let mut augmentor = Augmentor::with_seed(config, 42);
        b.iter(|| augmentor.augment(black_box(&image), black_box(&boxes)))
    });

    c.bench_function("augment_600x350_n10", |b| {
        let config = AugmentorConfig {
            image_size: (600, 350),
            num_augmentations: 10,
        };
        let mut augmentor = Augmentor::with_seed(config, 42);
        b.iter(|| augmentor.augment(black_box(&image), black_box(&boxes)))
    });
}

criterion_group!(benches, benchmark_augment);
criterion_main!(benches);
