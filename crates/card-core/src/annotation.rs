//! Аннотации полей карты
//!
//! Структуры разметки: рамка поля, sidecar-файл меток (JSON)
//! и изображение с привязанными рамками.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::DatasetError;

/// Рамка одного поля карты
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldBox {
    /// Индекс поля в статической раскладке
    pub class_id: u32,
    /// Имя поля (например "Address"), уникально в пределах изображения
    pub class_name: String,
    /// Прямоугольник [x1, y1, x2, y2] в пикселях, x1 < x2, y1 < y2
    pub bbox: [f32; 4],
    /// Эталонный текст поля (может быть пустым)
    #[serde(default)]
    pub text: String,
}

impl FieldBox {
    /// Ширина рамки
    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    /// Высота рамки
    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }

    /// Площадь рамки
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

/// Размер изображения в sidecar-файле
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Содержимое sidecar-файла меток
///
/// `image_size` присутствует только у аугментированных вариантов;
/// базовые изображения его не пишут.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardLabel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
    pub boxes: Vec<FieldBox>,
}

impl CardLabel {
    /// Чтение sidecar-файла
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Запись sidecar-файла (pretty JSON, как в базовой разметке)
    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Изображение карты с привязанными рамками полей
///
/// Создаётся один раз и после записи на диск не изменяется:
/// каждый трансформ порождает новый экземпляр.
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub image: RgbImage,
    pub boxes: Vec<FieldBox>,
}

impl AnnotatedImage {
    pub fn new(image: RgbImage, boxes: Vec<FieldBox>) -> Self {
        Self { image, boxes }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Sidecar-метка для аугментированного варианта (с размером изображения)
    pub fn to_label(&self) -> CardLabel {
        CardLabel {
            image_size: Some(ImageSize {
                width: self.width(),
                height: self.height(),
            }),
            boxes: self.boxes.clone(),
        }
    }
}
