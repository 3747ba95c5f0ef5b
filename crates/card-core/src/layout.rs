//! Конфигурация раскладки полей
//!
//! JSON-документ `roi_extract.front`: список полей с именем и рамкой.
//! Читается один раз при старте; порядок полей задаёт `class_id`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::DatasetError;

/// Описание одного поля раскладки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Имя поля (ключ записи)
    pub name: String,
    /// Рамка [x1, y1, x2, y2] в пикселях шаблона
    pub point: [f32; 4],
}

/// Секция roi_extract конфигурационного файла
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoiExtract {
    front: Vec<FieldDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayoutDocument {
    roi_extract: RoiExtract,
}

/// Статическая раскладка полей лицевой стороны карты
#[derive(Debug, Clone)]
pub struct FieldLayout {
    fields: Vec<FieldDef>,
}

impl FieldLayout {
    /// Раскладка из готового списка полей
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Чтение раскладки из JSON-файла конфигурации
    pub fn from_file(path: &Path) -> Result<Self, DatasetError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Разбор раскладки из JSON-строки
    pub fn from_json(data: &str) -> Result<Self, DatasetError> {
        let doc: LayoutDocument = serde_json::from_str(data)?;
        if doc.roi_extract.front.is_empty() {
            return Err(DatasetError::Layout("roi_extract.front is empty".to_string()));
        }
        for field in &doc.roi_extract.front {
            let [x1, y1, x2, y2] = field.point;
            if x1 >= x2 || y1 >= y2 {
                return Err(DatasetError::Layout(format!(
                    "invalid box for field '{}': [{}, {}, {}, {}]",
                    field.name, x1, y1, x2, y2
                )));
            }
        }
        Ok(Self::new(doc.roi_extract.front))
    }

    /// Поля в порядке раскладки (порядок задаёт class_id)
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "roi_extract": {
            "front": [
                {"name": "Identification_Number", "point": [250, 30, 520, 70]},
                {"name": "FullNameTH", "point": [150, 80, 500, 120]}
            ]
        }
    }"#;

    #[test]
    fn test_parse_layout() {
        let layout = FieldLayout::from_json(SAMPLE).unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.fields()[0].name, "Identification_Number");
        assert_eq!(layout.fields()[1].point, [150.0, 80.0, 500.0, 120.0]);
    }

    #[test]
    fn test_reject_empty_front() {
        let err = FieldLayout::from_json(r#"{"roi_extract": {"front": []}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_reject_degenerate_box() {
        let bad = r#"{"roi_extract": {"front": [{"name": "X", "point": [10, 10, 10, 40]}]}}"#;
        assert!(FieldLayout::from_json(bad).is_err());
    }
}
