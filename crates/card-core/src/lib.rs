//! Card Core - Генератор синтетического OCR-датасета тайских ID-карт
//!
//! Библиотека для сборки размеченного датасета с поддержкой:
//! - Генерации правдоподобных персональных записей (имена, даты, адреса,
//!   номер карты с контрольной цифрой)
//! - Рендера записей на шаблон карты по статической раскладке полей
//! - Аугментации с согласованным переносом рамок (поворот, перспектива,
//!   яркость/контраст, сдвиг каналов, шум)
//! - Нарезки полей в плоский датасет `изображение + текст`

pub mod annotation;
pub mod augment;
pub mod constants;
pub mod dataset;
pub mod extract;
pub mod geometry;
pub mod layout;
pub mod record;
pub mod render;

pub use annotation::{AnnotatedImage, CardLabel, FieldBox, ImageSize};
pub use augment::{Augmentor, AugmentorConfig};
pub use dataset::{DatasetBuilder, LanguageFields};
pub use extract::{AnnotatedDir, FieldExtractor};
pub use layout::{FieldDef, FieldLayout};
pub use record::{validate_thai_id, Gender, MaritalStatus, Record, RecordGenerator, RecordSources};
pub use render::{CardRenderer, FontSet};

use thiserror::Error;

/// Основные ошибки модуля
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid layout: {0}")]
    Layout(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Font error: {0}")]
    Font(String),
}
