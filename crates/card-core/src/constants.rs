//! Константы тайской ID-карты
//!
//! Таблицы месяцев, префиксов имён, шрифтов и религий.
//! Закрытые наборы, известные на этапе компиляции.

use image::Rgb;

/// Сокращённые тайские месяцы (индекс 1-12)
pub const THAI_MONTHS: [&str; 12] = [
    "ม.ค.", "ก.พ.", "มี.ค.", "เม.ย.", "พ.ค.", "มิ.ย.",
    "ก.ค.", "ส.ค.", "ก.ย.", "ต.ค.", "พ.ย.", "ธ.ค.",
];

/// Полные тайские месяцы (индекс 1-12)
pub const THAI_MONTHS_FULL: [&str; 12] = [
    "มกราคม", "กุมภาพันธ์", "มีนาคม", "เมษายน", "พฤษภาคม", "มิถุนายน",
    "กรกฎาคม", "สิงหาคม", "กันยายน", "ตุลาคม", "พฤศจิกายน", "ธันวาคม",
];

/// Сокращённые английские месяцы (индекс 1-12)
pub const ENGLISH_MONTHS: [&str; 12] = [
    "Jan.", "Feb.", "Mar.", "Apr.", "May", "Jun.",
    "Jul.", "Aug.", "Sep.", "Oct.", "Nov.", "Dec.",
];

/// Префикс имени (тайский + английский вариант)
#[derive(Debug, Clone, Copy)]
pub struct TitlePrefix {
    pub th: &'static str,
    pub en: &'static str,
}

/// นาย — господин
pub const TITLE_MALE: TitlePrefix = TitlePrefix { th: "นาย", en: "Mr." };
/// นางสาว — незамужняя женщина
pub const TITLE_FEMALE_SINGLE: TitlePrefix = TitlePrefix { th: "นางสาว", en: "Miss" };
/// นาง — замужняя женщина
pub const TITLE_FEMALE_MARRIED: TitlePrefix = TitlePrefix { th: "นาง", en: "Mrs." };

/// Религии с весами (доли населения Таиланда)
pub const RELIGIONS: [(&str, f32); 5] = [
    ("พุทธ", 94.0),
    ("อิสลาม", 5.0),
    ("คริสต์", 0.7),
    ("ฮินดู", 0.2),
    ("ซิกข์", 0.1),
];

/// Размер шрифта для поля карты
pub fn font_size(field_name: &str) -> f32 {
    match field_name {
        "Identification_Number" => 36.0,
        "FullNameTH" => 38.0,
        "NameEN" | "LastNameEN" | "Religion" => 30.0,
        "BirthdayTH" | "BirthdayEN" => 32.0,
        "Address" | "DateOfIssueTH" | "DateOfExpiryTH" => 26.0,
        "DateOfIssueEN" | "DateOfExpiryEN" => 24.0,
        _ => 24.0,
    }
}

/// Цвет текста для поля карты (английские поля и религия — синие)
pub fn font_color(field_name: &str) -> Rgb<u8> {
    match field_name {
        "NameEN" | "LastNameEN" | "BirthdayEN" | "DateOfIssueEN" | "DateOfExpiryEN"
        | "Religion" => Rgb([45, 28, 150]),
        _ => Rgb([0, 0, 0]),
    }
}

/// Тайскоязычные поля карты (остальные — английские)
pub fn is_thai_field(field_name: &str) -> bool {
    matches!(
        field_name,
        "FullNameTH" | "BirthdayTH" | "Religion" | "Address" | "DateOfIssueTH" | "DateOfExpiryTH"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_tables() {
        assert_eq!(THAI_MONTHS.len(), 12);
        assert_eq!(THAI_MONTHS[0], "ม.ค.");
        assert_eq!(ENGLISH_MONTHS[4], "May");
        assert_eq!(THAI_MONTHS_FULL[11], "ธันวาคม");
    }

    #[test]
    fn test_font_lookup() {
        assert_eq!(font_size("FullNameTH"), 38.0);
        assert_eq!(font_size("Unknown_Field"), 24.0);
        assert_eq!(font_color("NameEN"), Rgb([45, 28, 150]));
        assert_eq!(font_color("FullNameTH"), Rgb([0, 0, 0]));
        assert!(is_thai_field("Address"));
        assert!(!is_thai_field("NameEN"));
    }
}
