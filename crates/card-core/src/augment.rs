//! Движок аугментации карт
//!
//! Берёт отрендеренную карту с рамками полей и порождает до N
//! геометрически/фотометрически искажённых вариантов. Рамки проходят
//! через те же матрицы, что и пиксели; кандидаты с невалидными рамками
//! отбрасываются целиком и повторяются в пределах бюджета 3N попыток.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use log::{debug, warn};
use nalgebra::Point2;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::{AnnotatedImage, CardLabel, FieldBox};
use crate::geometry;
use crate::DatasetError;

/// Минимальная сторона валидной рамки, px
const MIN_BOX_SIZE: f32 = 5.0;
/// Допустимое соотношение сторон рамки
const ASPECT_RATIO_RANGE: (f32, f32) = (0.03, 30.0);
/// Минимальная видимая площадь рамки после геометрии, px²
const MIN_VISIBLE_AREA: f32 = 50.0;
/// Минимальная видимая доля рамки относительно площади до трансформа
const MIN_VISIBILITY: f32 = 0.3;

/// Конфигурация движка
#[derive(Debug, Clone, Copy)]
pub struct AugmentorConfig {
    /// Каноничный размер выхода (ширина, высота)
    pub image_size: (u32, u32),
    /// Целевое число вариантов на исходное изображение
    pub num_augmentations: usize,
}

impl Default for AugmentorConfig {
    fn default() -> Self {
        Self {
            image_size: (600, 350),
            num_augmentations: 10,
        }
    }
}

/// Этап конвейера: закрытый набор, собирается один раз при создании движка
#[derive(Debug, Clone, Copy)]
enum Stage {
    /// Детерминированное уменьшение до 0.97 канонического размера
    Resize { width: u32, height: u32 },
    /// Паддинг до канонического размера фоновым цветом (по центру)
    PadToSize { width: u32, height: u32 },
    /// Малый поворот вокруг центра
    Rotate { limit_deg: f32, prob: f32 },
    /// Перспективное искажение с сохранением размера кадра
    Perspective { scale: (f32, f32), prob: f32 },
    /// Яркость/контраст
    BrightnessContrast { limit: f32, prob: f32 },
    /// Независимый сдвиг цветовых каналов
    ColorShift { limit: i32, prob: f32 },
    /// Аддитивный гауссов шум по каналам (sigma в долях диапазона)
    GaussNoise { std_range: (f32, f32), prob: f32 },
}

/// Движок аугментации
pub struct Augmentor {
    config: AugmentorConfig,
    stages: Vec<Stage>,
    /// Фоновый цвет паддинга и заливки, выбирается один раз на движок
    background: Rgb<u8>,
    rng: StdRng,
}

impl Augmentor {
    /// Движок с энтропийным зерном
    pub fn new(config: AugmentorConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Движок с фиксированным зерном (для воспроизводимых тестов)
    pub fn with_seed(config: AugmentorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: AugmentorConfig, mut rng: StdRng) -> Self {
        // Светлый тон фона, имитирующий поверхность под картой
        let background = Rgb([
            rng.gen_range(200..=255),
            rng.gen_range(200..=255),
            rng.gen_range(200..=255),
        ]);
        let stages = build_stages(config.image_size);
        Self {
            config,
            stages,
            background,
            rng,
        }
    }

    /// Каноничный размер выхода
    pub fn image_size(&self) -> (u32, u32) {
        self.config.image_size
    }

    /// До N валидных вариантов исходного изображения
    ///
    /// Бюджет — 3N попыток; меньше N на выходе — штатный исход, не ошибка.
    /// Метаданные рамок (class_id, class_name, text) копируются без изменений.
    pub fn augment(&mut self, image: &RgbImage, boxes: &[FieldBox]) -> Vec<AnnotatedImage> {
        let target = self.config.num_augmentations;
        let max_attempts = target * 3;
        let bboxes: Vec<[f32; 4]> = boxes.iter().map(|b| b.bbox).collect();

        let mut variants = Vec::new();
        let mut attempts = 0;

        while variants.len() < target && attempts < max_attempts {
            attempts += 1;

            let (candidate, candidate_boxes) = match self.apply_pipeline(image, &bboxes) {
                Some(result) => result,
                None => {
                    debug!("attempt {}: degenerate transform, retrying", attempts);
                    continue;
                }
            };

            // Геометрия выбросила рамку целиком — кандидат не годится
            if candidate_boxes.len() != bboxes.len() {
                debug!(
                    "attempt {}: box count {} != {}, rejected",
                    attempts,
                    candidate_boxes.len(),
                    bboxes.len()
                );
                continue;
            }

            let width = candidate.width() as f32;
            let height = candidate.height() as f32;
            let invalid = candidate_boxes
                .iter()
                .find_map(|bbox| validate_bbox(bbox, width, height).err());

            if let Some(reason) = invalid {
                debug!("attempt {}: {}, rejected", attempts, reason);
                continue;
            }

            // Кандидат принят: собираем новую аннотацию с исходными метаданными
            let out_boxes = boxes
                .iter()
                .zip(candidate_boxes)
                .map(|(src, bbox)| FieldBox {
                    class_id: src.class_id,
                    class_name: src.class_name.clone(),
                    bbox,
                    text: src.text.clone(),
                })
                .collect();
            variants.push(AnnotatedImage::new(candidate, out_boxes));
        }

        debug!(
            "accepted {}/{} variants in {} attempts",
            variants.len(),
            target,
            attempts
        );
        variants
    }

    /// Один проход конвейера: пиксели и рамки через одни и те же матрицы
    ///
    /// `None` — вырожденный трансформ; попытка считается израсходованной.
    fn apply_pipeline(
        &mut self,
        source: &RgbImage,
        bboxes: &[[f32; 4]],
    ) -> Option<(RgbImage, Vec<[f32; 4]>)> {
        // Рабочая копия: исходный буфер не изменяется никогда
        let mut img = source.clone();
        let mut boxes: Vec<[f32; 4]> = bboxes.to_vec();
        // Площади на входе конвейера — база для фильтра видимости
        let entry_areas: Vec<f32> = boxes
            .iter()
            .map(|b| ((b[2] - b[0]).max(0.0)) * ((b[3] - b[1]).max(0.0)))
            .collect();

        for stage in self.stages.clone() {
            match stage {
                Stage::Resize { width, height } => {
                    let sx = width as f32 / img.width() as f32;
                    let sy = height as f32 / img.height() as f32;
                    img = imageops::resize(&img, width, height, FilterType::Triangle);
                    for b in &mut boxes {
                        b[0] *= sx;
                        b[1] *= sy;
                        b[2] *= sx;
                        b[3] *= sy;
                    }
                }
                Stage::PadToSize { width, height } => {
                    if img.width() >= width && img.height() >= height {
                        continue;
                    }
                    let dx = (width.saturating_sub(img.width()) / 2) as f32;
                    let dy = (height.saturating_sub(img.height()) / 2) as f32;
                    let mut canvas = RgbImage::from_pixel(width, height, self.background);
                    imageops::overlay(&mut canvas, &img, dx as i64, dy as i64);
                    img = canvas;
                    for b in &mut boxes {
                        b[0] += dx;
                        b[1] += dy;
                        b[2] += dx;
                        b[3] += dy;
                    }
                }
                Stage::Rotate { limit_deg, prob } => {
                    if !self.triggered(prob) {
                        continue;
                    }
                    let angle = self.rng.gen_range(-limit_deg..=limit_deg).to_radians();
                    let cx = img.width() as f32 / 2.0;
                    let cy = img.height() as f32 / 2.0;
                    let matrix = geometry::rotation_about_center(angle, cx, cy);
                    img = geometry::warp_image(
                        &img,
                        &matrix,
                        img.width(),
                        img.height(),
                        self.background,
                    );
                    for b in &mut boxes {
                        *b = geometry::transform_bbox(&matrix, *b)?;
                    }
                }
                Stage::Perspective { scale, prob } => {
                    if !self.triggered(prob) {
                        continue;
                    }
                    let w = img.width() as f32;
                    let h = img.height() as f32;
                    let s = self.rng.gen_range(scale.0..=scale.1);
                    let src = [
                        Point2::new(0.0, 0.0),
                        Point2::new(w, 0.0),
                        Point2::new(w, h),
                        Point2::new(0.0, h),
                    ];
                    let mut dst = src;
                    for corner in &mut dst {
                        corner.x += self.rng.gen_range(-s * w..=s * w);
                        corner.y += self.rng.gen_range(-s * h..=s * h);
                    }
                    // Вырожденная гомография (4 почти коллинеарные точки) -> отказ попытки
                    let matrix = geometry::find_homography(src, dst)?;
                    img = geometry::warp_image(
                        &img,
                        &matrix,
                        img.width(),
                        img.height(),
                        self.background,
                    );
                    for b in &mut boxes {
                        *b = geometry::transform_bbox(&matrix, *b)?;
                    }
                }
                Stage::BrightnessContrast { limit, prob } => {
                    if !self.triggered(prob) {
                        continue;
                    }
                    let alpha = 1.0 + self.rng.gen_range(-limit..=limit);
                    let beta = self.rng.gen_range(-limit..=limit) * 255.0;
                    for pixel in img.pixels_mut() {
                        for c in 0..3 {
                            let v = pixel.0[c] as f32 * alpha + beta;
                            pixel.0[c] = v.round().clamp(0.0, 255.0) as u8;
                        }
                    }
                }
                Stage::ColorShift { limit, prob } => {
                    if !self.triggered(prob) {
                        continue;
                    }
                    let shifts = [
                        self.rng.gen_range(-limit..=limit),
                        self.rng.gen_range(-limit..=limit),
                        self.rng.gen_range(-limit..=limit),
                    ];
                    for pixel in img.pixels_mut() {
                        for c in 0..3 {
                            let v = pixel.0[c] as i32 + shifts[c];
                            pixel.0[c] = v.clamp(0, 255) as u8;
                        }
                    }
                }
                Stage::GaussNoise { std_range, prob } => {
                    if !self.triggered(prob) {
                        continue;
                    }
                    let sigma = self.rng.gen_range(std_range.0..=std_range.1) * 255.0;
                    let normal = Normal::new(0.0f32, sigma).ok()?;
                    for pixel in img.pixels_mut() {
                        for c in 0..3 {
                            let v = pixel.0[c] as f32 + normal.sample(&mut self.rng);
                            pixel.0[c] = v.round().clamp(0.0, 255.0) as u8;
                        }
                    }
                }
            }
        }

        // Контракт геометрической фильтрации: рамка с малой видимой
        // площадью выбрасывается до явных проверок валидации
        let width = img.width() as f32;
        let height = img.height() as f32;
        let boxes = boxes
            .into_iter()
            .zip(entry_areas)
            .filter(|(b, entry_area)| {
                let x1 = b[0].clamp(0.0, width);
                let y1 = b[1].clamp(0.0, height);
                let x2 = b[2].clamp(0.0, width);
                let y2 = b[3].clamp(0.0, height);
                let visible = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
                visible >= MIN_VISIBLE_AREA && visible >= MIN_VISIBILITY * entry_area
            })
            .map(|(b, _)| b)
            .collect();

        Some((img, boxes))
    }

    fn triggered(&mut self, prob: f32) -> bool {
        self.rng.gen::<f32>() < prob
    }

    /// Приведение принятого варианта к каноничному размеру
    ///
    /// По построению конвейера размер уже каноничный; проверка защитная.
    /// Рамки масштабируются независимыми коэффициентами по осям.
    pub fn normalize_resolution(&self, variant: AnnotatedImage) -> AnnotatedImage {
        let (target_w, target_h) = self.config.image_size;
        if variant.width() == target_w && variant.height() == target_h {
            return variant;
        }

        let scale_x = target_w as f32 / variant.width() as f32;
        let scale_y = target_h as f32 / variant.height() as f32;
        let image = imageops::resize(&variant.image, target_w, target_h, FilterType::Triangle);
        let boxes = variant
            .boxes
            .into_iter()
            .map(|mut b| {
                b.bbox = [
                    b.bbox[0] * scale_x,
                    b.bbox[1] * scale_y,
                    b.bbox[2] * scale_x,
                    b.bbox[3] * scale_y,
                ];
                b
            })
            .collect();
        AnnotatedImage::new(image, boxes)
    }

    /// Сохранение варианта: JPEG + sidecar-метка с размером изображения
    pub fn save_variant(
        &self,
        variant: AnnotatedImage,
        output_name: &str,
        images_dir: &Path,
        labels_dir: &Path,
    ) -> Result<(), DatasetError> {
        let variant = self.normalize_resolution(variant);

        let image_path = images_dir.join(format!("{}.jpg", output_name));
        variant.image.save(&image_path)?;

        let label_path = labels_dir.join(format!("{}.json", output_name));
        variant.to_label().save(&label_path)?;
        Ok(())
    }

    /// Пакетная аугментация: по файлу на исходную карту
    ///
    /// Нечитаемое изображение или отсутствующая метка — предупреждение и
    /// пропуск; отказ на одной карте не прерывает остальных. Возвращает
    /// число записанных вариантов.
    pub fn process_files(
        &mut self,
        image_files: &[PathBuf],
        output_dir: &Path,
    ) -> Result<usize, DatasetError> {
        let images_dir = output_dir.join("images");
        let labels_dir = output_dir.join("labels_bbox");
        fs::create_dir_all(&images_dir)?;
        fs::create_dir_all(&labels_dir)?;

        let mut total = 0;

        for img_path in image_files {
            let image = match image::open(img_path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    warn!("Cannot load image {:?}: {}, skipping", img_path, e);
                    continue;
                }
            };

            let stem = match img_path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => {
                    warn!("Unusable file name {:?}, skipping", img_path);
                    continue;
                }
            };

            let label_path = img_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("labels")
                .join(format!("{}.json", stem));
            if !label_path.exists() {
                warn!("Label not found for {:?}, skipping", img_path);
                continue;
            }
            let label = match CardLabel::load(&label_path) {
                Ok(label) => label,
                Err(e) => {
                    warn!("Cannot parse label {:?}: {}, skipping", label_path, e);
                    continue;
                }
            };

            // Входная нормализация: изображение и рамки в каноничный масштаб
            let (image, boxes) = self.normalize_input(image, label.boxes);

            let variants = self.augment(&image, &boxes);
            for (idx, variant) in variants.into_iter().enumerate() {
                let output_name = format!("{}_aug_{:03}", stem, idx);
                self.save_variant(variant, &output_name, &images_dir, &labels_dir)?;
                total += 1;
            }
        }

        Ok(total)
    }

    /// Масштабирование входа к каноничному размеру вместе с рамками
    fn normalize_input(
        &self,
        image: RgbImage,
        boxes: Vec<FieldBox>,
    ) -> (RgbImage, Vec<FieldBox>) {
        let (target_w, target_h) = self.config.image_size;
        if image.width() == target_w && image.height() == target_h {
            return (image, boxes);
        }

        let scale_x = target_w as f32 / image.width() as f32;
        let scale_y = target_h as f32 / image.height() as f32;
        let image = imageops::resize(&image, target_w, target_h, FilterType::Triangle);
        let boxes = boxes
            .into_iter()
            .map(|mut b| {
                b.bbox = [
                    b.bbox[0] * scale_x,
                    b.bbox[1] * scale_y,
                    b.bbox[2] * scale_x,
                    b.bbox[3] * scale_y,
                ];
                b
            })
            .collect();
        (image, boxes)
    }
}

/// Конвейер в порядке применения; вероятности и параметры фиксированы
fn build_stages(image_size: (u32, u32)) -> Vec<Stage> {
    let (width, height) = image_size;
    vec![
        Stage::Resize {
            width: (width as f32 * 0.97) as u32,
            height: (height as f32 * 0.97) as u32,
        },
        Stage::PadToSize { width, height },
        Stage::Rotate {
            limit_deg: 1.0,
            prob: 0.5,
        },
        Stage::Perspective {
            scale: (0.01, 0.02),
            prob: 0.3,
        },
        Stage::BrightnessContrast {
            limit: 0.2,
            prob: 0.5,
        },
        Stage::ColorShift {
            limit: 15,
            prob: 0.3,
        },
        Stage::GaussNoise {
            std_range: (0.1, 0.2),
            prob: 0.5,
        },
    ]
}

/// Явная проверка рамки кандидата
///
/// Проверяется неотсечённый прямоугольник: размер, соотношение сторон,
/// попадание всех углов в кадр.
fn validate_bbox(bbox: &[f32; 4], img_width: f32, img_height: f32) -> Result<(), String> {
    let [x1, y1, x2, y2] = *bbox;
    let width = x2 - x1;
    let height = y2 - y1;

    if width < MIN_BOX_SIZE || height < MIN_BOX_SIZE {
        return Err(format!("box too small: {:.1}x{:.1}", width, height));
    }

    let aspect_ratio = width / height.max(1.0);
    if aspect_ratio < ASPECT_RATIO_RANGE.0 || aspect_ratio > ASPECT_RATIO_RANGE.1 {
        return Err(format!("bad aspect ratio: {:.2}", aspect_ratio));
    }

    if x1 < 0.0 || y1 < 0.0 || x2 > img_width || y2 > img_height {
        return Err("box out of bounds".to_string());
    }

    Ok(())
}
