//! Генератор синтетических персональных записей
//!
//! Правдоподобные (но вымышленные) данные тайской ID-карты:
//! - имена из корпусов с тайско-латинской парой
//! - даты рождения/выдачи/окончания с буддийским календарём
//! - номер карты с контрольной цифрой
//! - адрес из корпуса провинций/районов
//! - религия по весам населения

use chrono::{Datelike, Duration, Local, NaiveDate};
use log::warn;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::constants;
use crate::DatasetError;

/// Пол владельца карты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    /// Случайный выбор при генерации
    #[default]
    Random,
}

/// Семейное положение (влияет на женский префикс นางสาว/นาง)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaritalStatus {
    Single,
    Married,
    #[default]
    Random,
}

/// Имя из корпуса: тайское написание + латинизация
///
/// Латинизация берётся из второй колонки файла корпуса; при её
/// отсутствии используется тайская форма — так же ведёт себя
/// исходный генератор при неудачной транслитерации.
#[derive(Debug, Clone, PartialEq)]
pub struct NameEntry {
    pub th: String,
    pub en: String,
}

impl NameEntry {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match line.split_once('\t') {
            Some((th, en)) => Some(Self {
                th: th.trim().to_string(),
                en: capitalize(en.trim()),
            }),
            None => Some(Self {
                th: line.to_string(),
                en: line.to_string(),
            }),
        }
    }
}

/// Подрайон (ตำบล/แขวง)
#[derive(Debug, Clone, Deserialize)]
pub struct SubDistrict {
    pub name_th: String,
}

/// Район (อำเภอ/เขต)
#[derive(Debug, Clone, Deserialize)]
pub struct District {
    pub name_th: String,
    #[serde(default)]
    pub sub_districts: Vec<SubDistrict>,
}

/// Провинция с районами
#[derive(Debug, Clone, Deserialize)]
pub struct Province {
    pub name_th: String,
    #[serde(default)]
    pub districts: Vec<District>,
}

/// Улицы одной провинции
#[derive(Debug, Clone, Deserialize)]
struct ProvinceStreets {
    #[serde(default)]
    all_streets: Vec<String>,
}

/// Сгенерированная запись: имя поля -> строка
///
/// Отображаемые поля идут под именами раскладки; служебные значения
/// (для проверок) — с префиксом `_`.
pub type Record = HashMap<String, String>;

/// Корпуса данных для генератора
#[derive(Debug, Clone, Default)]
pub struct RecordSources {
    pub male_names: Vec<NameEntry>,
    pub female_names: Vec<NameEntry>,
    pub family_names: Vec<NameEntry>,
    pub provinces: Vec<Province>,
    pub streets: HashMap<String, Vec<String>>,
}

impl RecordSources {
    /// Чтение корпусов из файлов
    ///
    /// Файлы имён: одно имя на строку, опционально `тай<TAB>латиница`.
    /// Провинции: JSON-список с districts/sub_districts.
    /// Отсутствие корпуса улиц или провинций — не ошибка.
    pub fn from_files(
        male_names: &Path,
        female_names: &Path,
        family_names: &Path,
        provinces: &Path,
        streets: Option<&Path>,
    ) -> Result<Self, DatasetError> {
        let male_names = load_names(male_names)?;
        let female_names = load_names(female_names)?;
        let family_names = load_names(family_names)?;

        let provinces: Vec<Province> = match fs::read_to_string(provinces) {
            Ok(data) => serde_json::from_str(&data)?,
            Err(e) => {
                warn!("Could not load address data from {:?}: {}", provinces, e);
                Vec::new()
            }
        };

        let streets = match streets {
            Some(path) => match fs::read_to_string(path) {
                Ok(data) => {
                    let raw: HashMap<String, ProvinceStreets> = serde_json::from_str(&data)?;
                    raw.into_iter().map(|(k, v)| (k, v.all_streets)).collect()
                }
                Err(e) => {
                    warn!("Could not load streets data from {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        Ok(Self {
            male_names,
            female_names,
            family_names,
            provinces,
            streets,
        })
    }
}

fn load_names(path: &Path) -> Result<Vec<NameEntry>, DatasetError> {
    let data = fs::read_to_string(path)?;
    let names: Vec<NameEntry> = data.lines().filter_map(NameEntry::parse).collect();
    if names.is_empty() {
        return Err(DatasetError::Corpus(format!("empty name corpus: {:?}", path)));
    }
    Ok(names)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Генератор записей
pub struct RecordGenerator {
    sources: RecordSources,
    today: NaiveDate,
    rng: StdRng,
}

impl RecordGenerator {
    /// Генератор с энтропийным зерном
    pub fn new(sources: RecordSources) -> Self {
        Self::with_rng(sources, StdRng::from_entropy())
    }

    /// Генератор с фиксированным зерном (для воспроизводимых тестов)
    pub fn with_seed(sources: RecordSources, seed: u64) -> Self {
        Self::with_rng(sources, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sources: RecordSources, rng: StdRng) -> Self {
        Self {
            sources,
            today: Local::now().date_naive(),
            rng,
        }
    }

    /// Полная запись карты
    pub fn generate(
        &mut self,
        gender: Gender,
        marital_status: MaritalStatus,
        age_range: (u32, u32),
    ) -> Record {
        let mut record = Record::new();
        self.generate_name(&mut record, gender, marital_status);
        self.generate_dates(&mut record, age_range);
        self.generate_address(&mut record);

        let id_number = self.generate_thai_id(true);
        record.insert("_id_number_raw".into(), id_number.replace(' ', ""));
        record.insert("Identification_Number".into(), id_number);
        record.insert("Religion".into(), self.generate_religion());
        record
    }

    /// Имя с префиксом: นาย / นางสาว / นาง + Mr. / Miss / Mrs.
    fn generate_name(
        &mut self,
        record: &mut Record,
        gender: Gender,
        marital_status: MaritalStatus,
    ) {
        let gender = match gender {
            Gender::Random => {
                if self.rng.gen() {
                    Gender::Male
                } else {
                    Gender::Female
                }
            }
            g => g,
        };

        let (first, prefix) = if gender == Gender::Male {
            let first = self
                .sources
                .male_names
                .choose(&mut self.rng)
                .cloned()
                .unwrap_or_else(empty_name);
            (first, constants::TITLE_MALE)
        } else {
            let first = self
                .sources
                .female_names
                .choose(&mut self.rng)
                .cloned()
                .unwrap_or_else(empty_name);
            let marital = match marital_status {
                MaritalStatus::Random => {
                    if self.rng.gen() {
                        MaritalStatus::Single
                    } else {
                        MaritalStatus::Married
                    }
                }
                m => m,
            };
            let prefix = if marital == MaritalStatus::Married {
                constants::TITLE_FEMALE_MARRIED
            } else {
                constants::TITLE_FEMALE_SINGLE
            };
            (first, prefix)
        };

        let last = self
            .sources
            .family_names
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(empty_name);

        record.insert(
            "FullNameTH".into(),
            format!("{} {} {}", prefix.th, first.th, last.th),
        );
        record.insert("NameEN".into(), format!("{} {}", prefix.en, first.en));
        record.insert("LastNameEN".into(), last.en.clone());
        record.insert("_first_name_th".into(), first.th);
        record.insert("_last_name_th".into(), last.th);
        record.insert("_first_name_en".into(), first.en);
        record.insert("_last_name_en".into(), last.en);
        record.insert(
            "_gender".into(),
            if gender == Gender::Male { "male" } else { "female" }.into(),
        );
    }

    /// Даты рождения/выдачи/окончания
    ///
    /// Выдача не раньше 18 лет и не дальше 10 лет назад;
    /// окончание = выдача + 10 лет.
    fn generate_dates(&mut self, record: &mut Record, age_range: (u32, u32)) {
        let (min_age, max_age) = age_range;
        let year_days = 365.25;

        let max_birth = self.today - Duration::days((min_age as f64 * year_days) as i64);
        let min_birth = self.today - Duration::days((max_age as f64 * year_days) as i64);
        let birth = self.random_date_between(min_birth, max_birth);

        let earliest_issue = birth + Duration::days((18.0 * year_days) as i64);
        let latest_issue = self.today;
        let earliest_possible = self.today - Duration::days((10.0 * year_days) as i64);

        let actual_earliest = earliest_issue.max(earliest_possible);
        let issue = if actual_earliest > latest_issue {
            latest_issue
        } else {
            self.random_date_between(actual_earliest, latest_issue)
        };

        let expiry = add_years(issue, 10);
        let age = (self.today - birth).num_days() / 365;

        record.insert("BirthdayTH".into(), format_thai_date(birth));
        record.insert("BirthdayEN".into(), format_english_date(birth));
        record.insert("DateOfIssueTH".into(), format_thai_date(issue));
        record.insert("DateOfIssueEN".into(), format_english_date(issue));
        record.insert("DateOfExpiryTH".into(), format_thai_date(expiry));
        record.insert("DateOfExpiryEN".into(), format_english_date(expiry));
        record.insert("_birth_date".into(), birth.to_string());
        record.insert("_issue_date".into(), issue.to_string());
        record.insert("_expiry_date".into(), expiry.to_string());
        record.insert("_age".into(), age.to_string());
    }

    fn random_date_between(&mut self, start: NaiveDate, end: NaiveDate) -> NaiveDate {
        let days = (end - start).num_days().max(0);
        start + Duration::days(self.rng.gen_range(0..=days))
    }

    /// Номер карты: 12 случайных цифр + контрольная
    ///
    /// Контрольная цифра: (11 - Σ dᵢ·(13-i) mod 11) mod 10.
    /// В отображаемой форме группы 1-4-5-2-1.
    pub fn generate_thai_id(&mut self, formatted: bool) -> String {
        let mut digits: Vec<u32> = Vec::with_capacity(13);
        digits.push(self.rng.gen_range(1..=9));
        for _ in 0..11 {
            digits.push(self.rng.gen_range(0..=9));
        }

        let total: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| d * (13 - i as u32))
            .sum();
        let checksum = (11 - (total % 11)) % 10;
        digits.push(checksum);

        let id: String = digits.iter().map(|d| d.to_string()).collect();
        if formatted {
            format!(
                "{} {} {} {} {}",
                &id[0..1],
                &id[1..5],
                &id[5..10],
                &id[10..12],
                &id[12..13]
            )
        } else {
            id
        }
    }

    /// Религия по весам населения
    pub fn generate_religion(&mut self) -> String {
        let weights: Vec<f32> = constants::RELIGIONS.iter().map(|r| r.1).collect();
        // Веса статичны и положительны
        let dist = WeightedIndex::new(&weights).expect("static religion weights");
        constants::RELIGIONS[dist.sample(&mut self.rng)].0.to_string()
    }

    /// Адрес: номер дома, улица, подрайон, район, провинция
    ///
    /// Бангкок использует แขวง/เขต, остальные провинции — ต./อ./จ.
    fn generate_address(&mut self, record: &mut Record) {
        if self.sources.provinces.is_empty() {
            record.insert(
                "Address".into(),
                "บ้านเลขที่ 123 ถนนสุขุมวิท แขวงคลองเตย เขตคลองเตย กรุงเทพมหานคร".into(),
            );
            return;
        }

        let province = self
            .sources
            .provinces
            .choose(&mut self.rng)
            .cloned()
            .expect("non-empty province list");
        let province_name = province.name_th.clone();

        let (district_name, sub_district_name) = match province.districts.choose(&mut self.rng) {
            Some(district) => {
                let sub = district
                    .sub_districts
                    .choose(&mut self.rng)
                    .map(|s| s.name_th.clone())
                    .unwrap_or_default();
                (district.name_th.clone(), sub)
            }
            None => (String::new(), String::new()),
        };

        let house_number = self.generate_house_number();

        let street = match self.sources.streets.get(&province_name) {
            Some(streets) => match streets.choose(&mut self.rng) {
                Some(s) => {
                    let s = s.replace("ซอย", "ซ.").replace("ถนน", "ถ.");
                    format!(" {}", s)
                }
                None => String::new(),
            },
            None => String::new(),
        };

        let is_bangkok = province_name == "กรุงเทพมหานคร";
        let address = if is_bangkok {
            let district_prefix = if district_name.starts_with("เขต") { "" } else { "เขต" };
            format!(
                "{}{} แขวง{} {}{} {}",
                house_number, street, sub_district_name, district_prefix, district_name,
                province_name
            )
        } else {
            let tambon = if sub_district_name.is_empty() {
                String::new()
            } else {
                format!(" ต.{}", sub_district_name)
            };
            let amphoe = if district_name.is_empty() {
                String::new()
            } else {
                format!(" อ.{}", district_name)
            };
            format!("{}{}{}{} จ.{}", house_number, street, tambon, amphoe, province_name)
        };

        record.insert("Address".into(), address.trim().to_string());
        record.insert("_province".into(), province_name);
        record.insert("_district".into(), district_name);
        record.insert("_sub_district".into(), sub_district_name);
        record.insert("_house_number".into(), house_number);
    }

    /// Номер дома: 123, 123/45 или 12/3
    fn generate_house_number(&mut self) -> String {
        match self.rng.gen_range(0..3) {
            0 => self.rng.gen_range(1..=999).to_string(),
            1 => format!("{}/{}", self.rng.gen_range(1..=999), self.rng.gen_range(1..=99)),
            _ => format!("{}/{}", self.rng.gen_range(1..=99), self.rng.gen_range(1..=9)),
        }
    }
}

fn empty_name() -> NameEntry {
    NameEntry {
        th: String::new(),
        en: String::new(),
    }
}

/// Проверка контрольной цифры номера карты
///
/// Принимает номер с пробелами или дефисами.
pub fn validate_thai_id(id_number: &str) -> bool {
    let clean: String = id_number
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    if clean.len() != 13 || !clean.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<u32> = clean.chars().filter_map(|c| c.to_digit(10)).collect();
    let total: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (13 - i as u32))
        .sum();
    let expected = (11 - (total % 11)) % 10;
    digits[12] == expected
}

/// Тайская дата: день, сокращённый месяц, буддийский год (+543)
fn format_thai_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        constants::THAI_MONTHS[date.month0() as usize],
        date.year() + 543
    )
}

/// Английская дата: день, сокращённый месяц, григорианский год
fn format_english_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        constants::ENGLISH_MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Прибавление лет с ограничением 29 февраля -> 28 февраля
fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year() + years, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(date.year() + years, date.month(), date.day() - 1))
        .unwrap_or(date)
}
