//! Нарезка полей в плоский датасет
//!
//! Вырезает выбранные поля из карт (базовых и аугментированных) в
//! отдельные файлы и пишет общий список меток `labels.txt`:
//! одна строка `<файл> <текст>` на вырезку.

use image::imageops;
use image::RgbImage;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::{CardLabel, FieldBox};
use crate::DatasetError;

/// Каталог с изображениями и подкаталогом меток
#[derive(Debug, Clone)]
pub struct AnnotatedDir {
    pub images: PathBuf,
    pub labels: PathBuf,
}

impl AnnotatedDir {
    /// Базовые карты: изображения в корне, метки в labels/
    pub fn base(root: &Path) -> Self {
        Self {
            images: root.to_path_buf(),
            labels: root.join("labels"),
        }
    }

    /// Аугментированные карты: images/ + labels_bbox/
    pub fn augmented(root: &Path) -> Self {
        Self {
            images: root.join("images"),
            labels: root.join("labels_bbox"),
        }
    }
}

/// Экстрактор полей
pub struct FieldExtractor {
    selected_fields: Vec<String>,
}

impl FieldExtractor {
    pub fn new(selected_fields: Vec<String>) -> Self {
        Self { selected_fields }
    }

    /// Вырезки выбранных полей одного изображения
    ///
    /// Рамка ограничивается кадром; вырожденная после ограничения
    /// вырезка молча пропускается.
    pub fn extract(&self, image: &RgbImage, boxes: &[FieldBox]) -> Vec<(RgbImage, String)> {
        let mut crops = Vec::new();

        for field_box in boxes {
            if !self.selected_fields.iter().any(|f| f == &field_box.class_name) {
                continue;
            }

            let x1 = (field_box.bbox[0] as i64).max(0) as u32;
            let y1 = (field_box.bbox[1] as i64).max(0) as u32;
            let x2 = (field_box.bbox[2] as i64).min(image.width() as i64).max(0) as u32;
            let y2 = (field_box.bbox[3] as i64).min(image.height() as i64).max(0) as u32;

            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            let crop = imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image();
            crops.push((crop, field_box.text.clone()));
        }

        crops
    }

    /// Нарезка всех карт из перечисленных каталогов в плоский датасет
    ///
    /// Пары изображение+метка собираются по совпадению имени файла;
    /// карты без метки пропускаются. Возвращает число вырезок.
    pub fn process_dirs(
        &self,
        source_dirs: &[AnnotatedDir],
        output_dir: &Path,
    ) -> Result<usize, DatasetError> {
        let images_dir = output_dir.join("images");
        fs::create_dir_all(&images_dir)?;

        let mut pairs: Vec<(PathBuf, PathBuf)> = Vec::new();
        for dir in source_dirs {
            let mut entries: Vec<PathBuf> = match fs::read_dir(&dir.images) {
                Ok(read) => read
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jpg"))
                    .collect(),
                Err(e) => {
                    warn!("Cannot read directory {:?}: {}, skipping", dir.images, e);
                    continue;
                }
            };
            entries.sort();

            for img_path in entries {
                let stem = match img_path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) => stem.to_string(),
                    None => continue,
                };
                let label_path = dir.labels.join(format!("{}.json", stem));
                if label_path.exists() {
                    pairs.push((img_path, label_path));
                }
            }
        }

        let mut field_counter = 0usize;
        let mut label_lines: Vec<String> = Vec::new();

        for (img_path, label_path) in pairs {
            let image = match image::open(&img_path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    warn!("Cannot load image {:?}: {}, skipping", img_path, e);
                    continue;
                }
            };
            let label = match CardLabel::load(&label_path) {
                Ok(label) => label,
                Err(e) => {
                    warn!("Cannot parse label {:?}: {}, skipping", label_path, e);
                    continue;
                }
            };

            for (crop, text) in self.extract(&image, &label.boxes) {
                let filename = format!("field_{:05}.jpg", field_counter);
                crop.save(images_dir.join(&filename))?;
                label_lines.push(format!("{} {}", filename, text));
                field_counter += 1;
            }
        }

        // Список меток пишется один раз после всех вырезок
        fs::write(output_dir.join("labels.txt"), label_lines.join("\n"))?;

        Ok(field_counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn field_box(name: &str, bbox: [f32; 4], text: &str) -> FieldBox {
        FieldBox {
            class_id: 0,
            class_name: name.to_string(),
            bbox,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_extract_selected_only() {
        let extractor = FieldExtractor::new(vec!["Address".to_string()]);
        let image = RgbImage::from_pixel(100, 80, Rgb([128, 128, 128]));
        let boxes = vec![
            field_box("Address", [10.0, 10.0, 60.0, 40.0], "addr"),
            field_box("Religion", [10.0, 50.0, 60.0, 70.0], "rel"),
        ];

        let crops = extractor.extract(&image, &boxes);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].0.dimensions(), (50, 30));
        assert_eq!(crops[0].1, "addr");
    }

    #[test]
    fn test_extract_clips_to_bounds() {
        let extractor = FieldExtractor::new(vec!["Address".to_string()]);
        let image = RgbImage::from_pixel(100, 80, Rgb([128, 128, 128]));
        let boxes = vec![field_box("Address", [-10.0, -5.0, 150.0, 90.0], "big")];

        let crops = extractor.extract(&image, &boxes);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].0.dimensions(), (100, 80));
    }

    #[test]
    fn test_extract_skips_degenerate() {
        let extractor = FieldExtractor::new(vec!["Address".to_string()]);
        let image = RgbImage::from_pixel(100, 80, Rgb([128, 128, 128]));
        // Полностью за кадром и нулевая площадь
        let boxes = vec![
            field_box("Address", [200.0, 200.0, 300.0, 250.0], "outside"),
            field_box("Address", [10.0, 10.0, 10.0, 40.0], "zero"),
        ];

        let crops = extractor.extract(&image, &boxes);
        assert!(crops.is_empty());
    }

    #[test]
    fn test_process_dirs_writes_flat_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        fs::create_dir_all(base.join("labels")).unwrap();

        let image = RgbImage::from_pixel(100, 80, Rgb([200, 200, 200]));
        image.save(base.join("card_0000.jpg")).unwrap();

        let label = CardLabel {
            image_size: None,
            boxes: vec![
                field_box("Address", [10.0, 10.0, 60.0, 40.0], "addr text"),
                field_box("Religion", [10.0, 50.0, 60.0, 70.0], "rel"),
            ],
        };
        label.save(&base.join("labels").join("card_0000.json")).unwrap();

        let out = dir.path().join("final");
        let extractor =
            FieldExtractor::new(vec!["Address".to_string(), "Religion".to_string()]);
        let count = extractor
            .process_dirs(&[AnnotatedDir::base(&base)], &out)
            .unwrap();

        assert_eq!(count, 2);
        assert!(out.join("images").join("field_00000.jpg").exists());
        assert!(out.join("images").join("field_00001.jpg").exists());

        let labels = fs::read_to_string(out.join("labels.txt")).unwrap();
        let lines: Vec<&str> = labels.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "field_00000.jpg addr text");
        assert_eq!(lines[1], "field_00001.jpg rel");
    }

    #[test]
    fn test_process_dirs_skips_missing_labels() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        fs::create_dir_all(base.join("labels")).unwrap();

        let image = RgbImage::from_pixel(100, 80, Rgb([200, 200, 200]));
        image.save(base.join("card_0000.jpg")).unwrap();
        // Метки нет — карта пропускается без ошибки

        let out = dir.path().join("final");
        let extractor = FieldExtractor::new(vec!["Address".to_string()]);
        let count = extractor
            .process_dirs(&[AnnotatedDir::base(&base)], &out)
            .unwrap();
        assert_eq!(count, 0);
    }
}
