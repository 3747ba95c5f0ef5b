//! Integration tests for the dataset pipeline

use card_core::{
    validate_thai_id, AnnotatedDir, Augmentor, AugmentorConfig, CardLabel, DatasetBuilder,
    FieldBox, FieldExtractor, LanguageFields, RecordGenerator, RecordSources,
};
use image::{Rgb, RgbImage};
use std::fs;

fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

fn make_box(class_id: u32, name: &str, bbox: [f32; 4], text: &str) -> FieldBox {
    FieldBox {
        class_id,
        class_name: name.to_string(),
        bbox,
        text: text.to_string(),
    }
}

/// Single box, N=5: between 0 and 5 valid variants, box constraints hold
#[test]
fn test_single_box_scenario() {
    init_logging();

    let config = AugmentorConfig {
        image_size: (600, 350),
        num_augmentations: 5,
    };
    let mut augmentor = Augmentor::with_seed(config, 2024);

    let image = RgbImage::from_pixel(600, 350, Rgb([220, 225, 230]));
    let boxes = vec![make_box(0, "Address", [100.0, 100.0, 200.0, 150.0], "TEST")];

    let variants = augmentor.augment(&image, &boxes);
    assert!(variants.len() <= 5);

    for variant in &variants {
        assert_eq!(variant.boxes.len(), 1);
        let b = &variant.boxes[0];
        assert_eq!(b.text, "TEST");
        assert_eq!(b.class_name, "Address");
        assert_eq!(b.class_id, 0);

        let (w, h) = (variant.width() as f32, variant.height() as f32);
        let [x1, y1, x2, y2] = b.bbox;
        assert!(x1 >= 0.0 && y1 >= 0.0 && x2 <= w && y2 <= h);
        assert!(x2 - x1 >= 5.0 && y2 - y1 >= 5.0);
        let aspect = (x2 - x1) / (y2 - y1).max(1.0);
        assert!((0.03..=30.0).contains(&aspect));
    }
}

/// 12 boxes with one at the image edge; rejection is
/// all-or-nothing, a partial 11-box output must never appear
#[test]
fn test_edge_box_all_or_nothing() {
    init_logging();

    let config = AugmentorConfig {
        image_size: (600, 350),
        num_augmentations: 8,
    };
    let mut augmentor = Augmentor::with_seed(config, 5);

    let image = RgbImage::from_pixel(600, 350, Rgb([220, 225, 230]));
    let mut boxes: Vec<FieldBox> = (0..11)
        .map(|i| {
            let y = 20.0 + i as f32 * 25.0;
            make_box(i, &format!("Field{:02}", i), [150.0, y, 450.0, y + 20.0], "txt")
        })
        .collect();
    // Рамка вплотную к краю кадра
    boxes.push(make_box(11, "EdgeField", [1.0, 1.0, 150.0, 30.0], "edge"));

    let variants = augmentor.augment(&image, &boxes);
    for variant in &variants {
        assert_eq!(variant.boxes.len(), 12, "partial box set must never be accepted");
    }
}

/// Non-geometric metadata is identical across all variants of one source
#[test]
fn test_metadata_idempotent_across_variants() {
    let config = AugmentorConfig {
        image_size: (600, 350),
        num_augmentations: 6,
    };
    let mut augmentor = Augmentor::with_seed(config, 77);

    let image = RgbImage::from_pixel(600, 350, Rgb([220, 225, 230]));
    let boxes = vec![
        make_box(0, "FullNameTH", [150.0, 80.0, 500.0, 120.0], "นาย สมชาย ใจดี"),
        make_box(1, "Religion", [150.0, 200.0, 300.0, 230.0], "พุทธ"),
    ];

    let variants = augmentor.augment(&image, &boxes);
    for variant in &variants {
        for (src, out) in boxes.iter().zip(&variant.boxes) {
            assert_eq!(src.class_id, out.class_id);
            assert_eq!(src.class_name, out.class_name);
            assert_eq!(src.text, out.text);
        }
    }
}

/// Checksum property: every generated ID validates
#[test]
fn test_generated_ids_validate() {
    let mut generator = RecordGenerator::with_seed(test_sources(), 31);
    for _ in 0..200 {
        let id = generator.generate_thai_id(false);
        assert!(validate_thai_id(&id));
    }
    // Formatted form validates too (spaces are tolerated)
    let id = generator.generate_thai_id(true);
    assert!(validate_thai_id(&id));
}

fn test_sources() -> RecordSources {
    use card_core::record::NameEntry;

    RecordSources {
        male_names: vec![NameEntry {
            th: "สมชาย".into(),
            en: "Somchai".into(),
        }],
        female_names: vec![NameEntry {
            th: "สมหญิง".into(),
            en: "Somying".into(),
        }],
        family_names: vec![NameEntry {
            th: "ใจดี".into(),
            en: "Jaidee".into(),
        }],
        provinces: Vec::new(),
        streets: Default::default(),
    }
}

/// Batch pipeline over the directory layout: base cards (written manually,
/// no font assets needed) -> augmentation -> field cropping
#[test]
fn test_batch_pipeline_end_to_end() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let builder = DatasetBuilder::new(dir.path());
    builder.prepare_dirs().unwrap();

    // Две базовые карты с метками
    for i in 0..2 {
        let image = RgbImage::from_pixel(600, 350, Rgb([210, 215, 220]));
        let name = format!("card_{:04}", i);
        image
            .save(builder.base_dir().join(format!("{}.jpg", name)))
            .unwrap();

        let label = CardLabel {
            image_size: None,
            boxes: vec![
                make_box(0, "Address", [100.0, 100.0, 300.0, 160.0], "addr"),
                make_box(1, "Religion", [100.0, 200.0, 250.0, 240.0], "พุทธ"),
            ],
        };
        label
            .save(
                &builder
                    .base_dir()
                    .join("labels")
                    .join(format!("{}.json", name)),
            )
            .unwrap();
    }

    // Третья карта без метки — должна быть молча пропущена
    let orphan = RgbImage::from_pixel(600, 350, Rgb([210, 215, 220]));
    orphan.save(builder.base_dir().join("card_9999.jpg")).unwrap();

    let config = AugmentorConfig {
        image_size: (600, 350),
        num_augmentations: 3,
    };
    let mut augmentor = Augmentor::with_seed(config, 11);
    let augmented = builder.augment_cards(&mut augmentor).unwrap();
    assert!(augmented <= 2 * 3);

    // Sidecar аугментированных вариантов содержит image_size
    let labels_dir = builder.augmented_dir().join("labels_bbox");
    let mut sidecars: Vec<_> = fs::read_dir(&labels_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    sidecars.sort();
    assert_eq!(sidecars.len(), augmented);
    for sidecar in &sidecars {
        let label = CardLabel::load(sidecar).unwrap();
        let size = label.image_size.expect("augmented label carries image_size");
        assert_eq!((size.width, size.height), (600, 350));
        assert_eq!(label.boxes.len(), 2);
    }

    // Нарезка базовых + аугментированных
    let selected = LanguageFields::All.field_names();
    let count = builder.crop_fields(&selected, true).unwrap();
    // По 2 поля с каждой карты (2 базовые + augmented)
    assert_eq!(count, (2 + augmented) * 2);

    let labels = fs::read_to_string(builder.final_dir().join("labels.txt")).unwrap();
    assert_eq!(labels.lines().count(), count);
    for line in labels.lines() {
        let (filename, _text) = line.split_once(' ').unwrap();
        assert!(builder.final_dir().join("images").join(filename).exists());
    }
}

/// Rescaling law: off-size accepted candidate is rescaled by per-axis factors
#[test]
fn test_rescaling_law() {
    use card_core::AnnotatedImage;

    let config = AugmentorConfig {
        image_size: (600, 350),
        num_augmentations: 1,
    };
    let augmentor = Augmentor::with_seed(config, 0);

    let variant = AnnotatedImage::new(
        RgbImage::from_pixel(200, 100, Rgb([0, 0, 0])),
        vec![make_box(0, "Address", [20.0, 10.0, 120.0, 60.0], "x")],
    );

    let normalized = augmentor.normalize_resolution(variant);
    assert_eq!((normalized.width(), normalized.height()), (600, 350));
    // scale_x = 3.0, scale_y = 3.5
    assert_eq!(normalized.boxes[0].bbox, [60.0, 35.0, 360.0, 210.0]);
}

/// Degenerate crops are skipped silently by the extractor
#[test]
fn test_extractor_skips_collapsed_boxes() {
    let extractor = FieldExtractor::new(vec!["Address".to_string()]);
    let image = RgbImage::from_pixel(50, 50, Rgb([100, 100, 100]));
    let boxes = vec![make_box(0, "Address", [60.0, 60.0, 90.0, 90.0], "gone")];

    assert!(extractor.extract(&image, &boxes).is_empty());
}

/// Base dirs and augmented dirs use their own image/label sub-layout
#[test]
fn test_annotated_dir_layouts() {
    let root = std::path::Path::new("/data/out");
    let base = AnnotatedDir::base(&root.join("base"));
    assert_eq!(base.images, root.join("base"));
    assert_eq!(base.labels, root.join("base/labels"));

    let aug = AnnotatedDir::augmented(&root.join("augmented_cards"));
    assert_eq!(aug.images, root.join("augmented_cards/images"));
    assert_eq!(aug.labels, root.join("augmented_cards/labels_bbox"));
}
