//! Сборка датасета конец-в-конец
//!
//! Последовательный пакетный конвейер:
//! записи -> рендер базовых карт -> аугментация -> нарезка полей.
//! Раскладка каталогов:
//! - base/{*.jpg, labels/*.json}
//! - augmented_cards/{images/*.jpg, labels_bbox/*.json}
//! - final_dataset/{images/*.jpg, labels.txt}

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::CardLabel;
use crate::augment::Augmentor;
use crate::extract::{AnnotatedDir, FieldExtractor};
use crate::record::{Gender, MaritalStatus, RecordGenerator};
use crate::render::CardRenderer;
use crate::DatasetError;

/// Тайскоязычные поля карты
pub const TH_FIELDS: [&str; 6] = [
    "FullNameTH",
    "BirthdayTH",
    "Religion",
    "Address",
    "DateOfIssueTH",
    "DateOfExpiryTH",
];

/// Англоязычные поля карты
pub const EN_FIELDS: [&str; 6] = [
    "Identification_Number",
    "NameEN",
    "LastNameEN",
    "BirthdayEN",
    "DateOfIssueEN",
    "DateOfExpiryEN",
];

/// Языковая группа полей для финального датасета
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageFields {
    Thai,
    English,
    #[default]
    All,
}

impl LanguageFields {
    /// Имена полей группы
    pub fn field_names(&self) -> Vec<String> {
        let fields: Vec<&str> = match self {
            LanguageFields::Thai => TH_FIELDS.to_vec(),
            LanguageFields::English => EN_FIELDS.to_vec(),
            LanguageFields::All => TH_FIELDS.iter().chain(EN_FIELDS.iter()).copied().collect(),
        };
        fields.into_iter().map(String::from).collect()
    }
}

/// Сборщик датасета
pub struct DatasetBuilder {
    output: PathBuf,
}

impl DatasetBuilder {
    pub fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.output.join("base")
    }

    pub fn augmented_dir(&self) -> PathBuf {
        self.output.join("augmented_cards")
    }

    pub fn final_dir(&self) -> PathBuf {
        self.output.join("final_dataset")
    }

    /// Создание всей раскладки каталогов
    pub fn prepare_dirs(&self) -> Result<(), DatasetError> {
        fs::create_dir_all(self.base_dir().join("labels"))?;
        fs::create_dir_all(self.augmented_dir().join("images"))?;
        fs::create_dir_all(self.augmented_dir().join("labels_bbox"))?;
        fs::create_dir_all(self.final_dir().join("images"))?;
        Ok(())
    }

    /// Базовые карты: `num_images` записей через рендерер
    ///
    /// Каждая карта пишется как `card_NNNN.jpg` + метка без image_size.
    /// `progress` вызывается после каждой карты (для индикатора).
    pub fn generate_base(
        &self,
        generator: &mut RecordGenerator,
        renderer: &CardRenderer,
        num_images: usize,
        mut progress: impl FnMut(),
    ) -> Result<usize, DatasetError> {
        let base_dir = self.base_dir();
        let labels_dir = base_dir.join("labels");
        fs::create_dir_all(&labels_dir)?;

        for i in 0..num_images {
            let record = generator.generate(Gender::Random, MaritalStatus::Random, (18, 85));
            let annotated = renderer.render(&record);

            let name = format!("card_{:04}", i);
            annotated.image.save(base_dir.join(format!("{}.jpg", name)))?;

            // Базовая метка не содержит image_size
            let label = CardLabel {
                image_size: None,
                boxes: annotated.boxes,
            };
            label.save(&labels_dir.join(format!("{}.json", name)))?;
            progress();
        }

        info!("Generated {} base images", num_images);
        Ok(num_images)
    }

    /// Аугментация всех базовых карт
    pub fn augment_cards(&self, augmentor: &mut Augmentor) -> Result<usize, DatasetError> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.base_dir())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jpg"))
            .collect();
        files.sort();

        let total = augmentor.process_files(&files, &self.augmented_dir())?;
        info!("Generated {} augmented images", total);
        Ok(total)
    }

    /// Нарезка полей в финальный датасет
    ///
    /// `include_augmented` добавляет к базовым картам аугментированные.
    pub fn crop_fields(
        &self,
        selected_fields: &[String],
        include_augmented: bool,
    ) -> Result<usize, DatasetError> {
        let mut sources = vec![AnnotatedDir::base(&self.base_dir())];
        if include_augmented {
            sources.push(AnnotatedDir::augmented(&self.augmented_dir()));
        }

        let extractor = FieldExtractor::new(selected_fields.to_vec());
        let count = extractor.process_dirs(&sources, &self.final_dir())?;
        info!("Cropped {} field images", count);
        Ok(count)
    }
}
