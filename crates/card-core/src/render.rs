//! Рендер карты по шаблону
//!
//! Накладывает строки записи на шаблонное изображение по статической
//! раскладке полей. Поле Address переносится на несколько строк
//! с отступом первой строки. Выход — изображение с авторитетными
//! рамками (рамка, текст, имя поля).

use ab_glyph::{FontVec, PxScale};
use image::RgbImage;
use imageproc::drawing::{draw_text_mut, text_size};
use log::warn;
use std::fs;
use std::path::Path;

use crate::annotation::{AnnotatedImage, FieldBox};
use crate::constants;
use crate::layout::FieldLayout;
use crate::record::Record;
use crate::DatasetError;

/// Горизонтальный отступ текста от края рамки
const TEXT_INSET: i32 = 3;
/// Отступ первой строки адреса
const ADDRESS_FIRST_LINE_INDENT: i32 = 33;
/// Межстрочный интервал адреса
const ADDRESS_LINE_SPACING: f32 = 2.2;

/// Пара шрифтов: тайские и английские поля
pub struct FontSet {
    thai: FontVec,
    english: FontVec,
}

impl FontSet {
    /// Загрузка шрифтов из списков кандидатов; берётся первый читаемый
    pub fn load(thai_paths: &[&Path], english_paths: &[&Path]) -> Result<Self, DatasetError> {
        let thai = load_first_font(thai_paths)?;
        let english = load_first_font(english_paths)?;
        Ok(Self { thai, english })
    }

    /// Один шрифт на обе группы полей
    pub fn single(path: &Path) -> Result<Self, DatasetError> {
        Self::load(&[path], &[path])
    }

    fn for_field(&self, field_name: &str) -> &FontVec {
        if constants::is_thai_field(field_name) {
            &self.thai
        } else {
            &self.english
        }
    }
}

fn load_first_font(paths: &[&Path]) -> Result<FontVec, DatasetError> {
    for path in paths {
        match fs::read(path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => return Ok(font),
                Err(e) => warn!("Invalid font {:?}: {}", path, e),
            },
            Err(e) => warn!("Cannot read font {:?}: {}", path, e),
        }
    }
    Err(DatasetError::Font(format!(
        "no loadable font among {:?}",
        paths
    )))
}

/// Рендерер карты
pub struct CardRenderer {
    layout: FieldLayout,
    fonts: FontSet,
    template: RgbImage,
}

impl CardRenderer {
    pub fn new(layout: FieldLayout, fonts: FontSet, template: RgbImage) -> Self {
        Self {
            layout,
            fonts,
            template,
        }
    }

    /// Шаблон из файла
    pub fn load_template(path: &Path) -> Result<RgbImage, DatasetError> {
        Ok(image::open(path)?.to_rgb8())
    }

    /// Синтетический шаблон: однотонная светлая подложка
    ///
    /// Позволяет запускать генерацию без бинарных ассетов в репозитории.
    pub fn blank_template(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([214, 223, 228]))
    }

    /// Размер шаблона
    pub fn template_size(&self) -> (u32, u32) {
        (self.template.width(), self.template.height())
    }

    /// Рендер записи: копия шаблона с текстом + авторитетные рамки
    ///
    /// Шаблон не изменяется; каждая карта рисуется на свежей копии.
    pub fn render(&self, record: &Record) -> AnnotatedImage {
        let mut image = self.template.clone();

        for field in self.layout.fields() {
            // Исходный рендерер подставляет "TEST" для отсутствующих полей
            let text = record
                .get(&field.name)
                .cloned()
                .unwrap_or_else(|| "TEST".to_string());
            let [x1, y1, x2, _y2] = field.point;
            let font = self.fonts.for_field(&field.name);
            let scale = PxScale::from(constants::font_size(&field.name));
            let color = constants::font_color(&field.name);

            if field.name == "Address" {
                let box_width = (x2 - x1) as i32;
                self.draw_multiline(
                    &mut image,
                    &text,
                    font,
                    scale,
                    color,
                    x1 as i32 + TEXT_INSET,
                    y1 as i32,
                    box_width - 2 * TEXT_INSET,
                );
            } else {
                draw_text_mut(
                    &mut image,
                    color,
                    x1 as i32 + TEXT_INSET,
                    y1 as i32,
                    scale,
                    font,
                    &text,
                );
            }
        }

        AnnotatedImage::new(image, build_boxes(&self.layout, record))
    }

    /// Многострочный текст с отступом первой строки
    fn draw_multiline(
        &self,
        image: &mut RgbImage,
        text: &str,
        font: &FontVec,
        scale: PxScale,
        color: image::Rgb<u8>,
        x: i32,
        y: i32,
        max_width: i32,
    ) {
        let measure = |s: &str| text_size(scale, font, s).0 as i32;
        let lines = wrap_text(text, max_width, measure);

        let line_height = (text_size(scale, font, "A").1 as f32 * ADDRESS_LINE_SPACING) as i32;
        let mut current_y = y;

        for (idx, line) in lines.iter().enumerate() {
            let indent = if idx == 0 { ADDRESS_FIRST_LINE_INDENT } else { 0 };
            draw_text_mut(image, color, x + indent, current_y, scale, font, line);
            current_y += line_height;
        }
    }
}

/// Рамки полей для записи: порядок раскладки задаёт class_id
///
/// Текст рамки — значение записи; отсутствующее поле даёт пустую строку
/// (в отличие от рендера, который подставляет "TEST").
pub fn build_boxes(layout: &FieldLayout, record: &Record) -> Vec<FieldBox> {
    layout
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| FieldBox {
            class_id: idx as u32,
            class_name: field.name.clone(),
            bbox: field.point,
            text: record.get(&field.name).cloned().unwrap_or_default(),
        })
        .collect()
}

/// Перенос текста по словам под заданную ширину
///
/// `measure` возвращает ширину строки в пикселях; слово, не влезающее
/// целиком, начинает новую строку (без разрыва внутри слова).
pub fn wrap_text(text: &str, max_width: i32, measure: impl Fn(&str) -> i32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line: Vec<&str> = Vec::new();

    for word in text.split(' ') {
        let mut test_line = current_line.clone();
        test_line.push(word);
        let candidate = test_line.join(" ");

        if measure(&candidate) <= max_width {
            current_line.push(word);
        } else {
            if !current_line.is_empty() {
                lines.push(current_line.join(" "));
            }
            current_line = vec![word];
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line.join(" "));
    }

    lines
}
