//! Layer 2: EXIF metadata analysis.
//!
//! Reads the handful of tags that carry authenticity signals (camera make and
//! model, software, timestamps) and scores them with fixed rules. Missing or
//! unreadable metadata is never an error; it is itself a signal.

use crate::domain::model::{Assessment, ExifAnalysis, ExifStatus};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::Path;

/// Tag name → text value for every primary-IFD tag.
pub type ExifFields = BTreeMap<String, String>;

/// 已知修圖軟體（高風險）
pub const EDITING_SOFTWARE: &[&str] = &[
    "photoshop",
    "gimp",
    "paint.net",
    "affinity",
    "lightroom",
    "snapseed",
    "pixlr",
    "photoscape",
    "fotor",
];

/// 手機品牌（正常來源）
pub const MOBILE_BRANDS: &[&str] = &[
    "iphone", "samsung", "google", "huawei", "xiaomi", "oppo", "vivo", "oneplus", "motorola",
    "nokia",
];

/// 相機韌體會寫入的軟體字串
const SAFE_SOFTWARE_PATTERNS: &[&str] = &[
    "ios", "android", "firmware", "camera", "iphone", "samsung", "google", "huawei",
];

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// 規則用到的標籤固定命名，其餘標籤沿用 kamadak-exif 的名稱
const TAG_NAMES: &[(u16, &str)] = &[
    (0x000B, "ProcessingSoftware"),
    (0x010F, "Make"),
    (0x0110, "Model"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013C, "HostComputer"),
    (0x9003, "DateTimeOriginal"),
    (0x9004, "DateTimeDigitized"),
];

pub fn extract_exif<P: AsRef<Path>>(path: P) -> ExifFields {
    let path = path.as_ref();
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!("Error opening {} for EXIF: {}", path.display(), e);
            return ExifFields::new();
        }
    };

    let mut reader = std::io::BufReader::new(file);
    read_fields(&mut reader, &path.display().to_string())
}

/// 已在記憶體中的上傳檔案直接解析，不再讀檔
pub fn extract_exif_from_bytes(data: &[u8]) -> ExifFields {
    let mut reader = std::io::Cursor::new(data);
    read_fields(&mut reader, "upload")
}

fn read_fields<R: std::io::BufRead + std::io::Seek>(reader: &mut R, source: &str) -> ExifFields {
    match exif::Reader::new().read_from_container(reader) {
        Ok(exif) => fields_from_exif(&exif),
        Err(e) => {
            tracing::debug!("No EXIF in {}: {}", source, e);
            ExifFields::new()
        }
    }
}

fn fields_from_exif(exif: &exif::Exif) -> ExifFields {
    let mut fields = ExifFields::new();

    for field in exif.fields() {
        if field.ifd_num != exif::In::PRIMARY {
            continue;
        }
        let name = TAG_NAMES
            .iter()
            .find(|(number, _)| *number == field.tag.number())
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| field.tag.to_string());

        let value = match &field.value {
            exif::Value::Ascii(parts) => parts
                .iter()
                .map(|p| {
                    String::from_utf8_lossy(p)
                        .trim_end_matches('\0')
                        .trim()
                        .to_string()
                })
                .find(|s| !s.is_empty())
                .unwrap_or_default(),
            _ => field.display_value().to_string(),
        };

        fields.entry(name).or_insert(value);
    }

    fields
}

fn find_in_fields<'a>(
    fields: &'a ExifFields,
    names: &[&str],
    needles: &[&str],
) -> Option<&'a String> {
    names.iter().filter_map(|name| fields.get(*name)).find(|value| {
        let lower = value.to_lowercase();
        needles.iter().any(|needle| lower.contains(needle))
    })
}

/// 是否經過已知修圖軟體處理，回傳原始軟體字串
pub fn check_editing_software(fields: &ExifFields) -> Option<String> {
    find_in_fields(
        fields,
        &["Software", "ProcessingSoftware", "HostComputer"],
        EDITING_SOFTWARE,
    )
    .cloned()
}

/// 是否為手機拍攝，回傳型號
pub fn check_mobile_camera(fields: &ExifFields) -> Option<String> {
    find_in_fields(fields, &["Model", "Make"], MOBILE_BRANDS).cloned()
}

/// 任何不在白名單內的軟體字串都算可疑
pub fn check_any_software(fields: &ExifFields) -> Option<String> {
    ["Software", "ProcessingSoftware"]
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| {
            let lower = value.to_lowercase();
            let is_safe = SAFE_SOFTWARE_PATTERNS.iter().any(|safe| lower.contains(safe));
            !is_safe && lower.chars().count() > 2
        })
        .cloned()
}

pub fn photo_age_days(fields: &ExifFields, now: NaiveDateTime) -> Option<i64> {
    ["DateTime", "DateTimeOriginal", "DateTimeDigitized"]
        .iter()
        .filter_map(|name| fields.get(*name))
        .find_map(|value| match NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT) {
            Ok(taken) => Some((now - taken).num_days()),
            Err(e) => {
                tracing::warn!("Could not parse EXIF datetime {}: {}", value, e);
                None
            }
        })
}

pub fn check_inconsistencies(fields: &ExifFields) -> Vec<String> {
    let mut flags = Vec::new();

    if fields.contains_key("Software") && !fields.contains_key("Model") {
        flags.push("software_without_camera_model".to_string());
    }

    let camera_data_missing = !fields.contains_key("Make") || !fields.contains_key("Model");
    if camera_data_missing && fields.contains_key("DateTime") {
        flags.push("incomplete_camera_data".to_string());
    }

    if let (Some(original), Some(digitized)) =
        (fields.get("DateTimeOriginal"), fields.get("DateTimeDigitized"))
    {
        if original != digitized {
            flags.push("inconsistent_timestamps".to_string());
        }
    }

    flags
}

/// 完整 Layer 2 評分；分數不封頂，封頂只在綜合分數做
pub fn analyze(fields: &ExifFields, now: NaiveDateTime, max_photo_age_days: i64) -> ExifAnalysis {
    let mut risk_score = 0.0;
    let mut flags = Vec::new();

    let exif_exists = !fields.is_empty();
    let exif_status = if exif_exists {
        ExifStatus::Present
    } else {
        risk_score += 0.4;
        flags.push("no_exif_data".to_string());
        ExifStatus::Missing
    };

    let known_editor = check_editing_software(fields);
    if known_editor.is_some() {
        risk_score += 0.5;
        flags.push("known_editing_software".to_string());
    }

    let camera_model = check_mobile_camera(fields);
    let is_mobile = camera_model.is_some();

    let unknown_software = check_any_software(fields);
    let mut editing_software = known_editor.clone();
    if known_editor.is_none() {
        if let Some(software) = &unknown_software {
            editing_software = Some(software.clone());
            if is_mobile {
                // 手機拍攝後又經軟體處理
                risk_score += 0.6;
                flags.push("post_capture_editing_detected".to_string());
            } else {
                risk_score += 0.3;
                flags.push("unknown_software_detected".to_string());
            }
        }
    }

    let inconsistencies = check_inconsistencies(fields);
    let has_inconsistencies = !inconsistencies.is_empty();
    if has_inconsistencies {
        risk_score += 0.25;
        flags.extend(inconsistencies);
    }

    if exif_exists && !is_mobile {
        flags.push("not_mobile_camera".to_string());
    }

    let photo_age = photo_age_days(fields, now);
    if photo_age.is_some_and(|age| age > max_photo_age_days) {
        risk_score += 0.1;
        flags.push("old_photo".to_string());
    }

    if exif_exists && !fields.contains_key("DateTime") {
        risk_score += 0.2;
        flags.push("missing_datetime".to_string());
    }

    ExifAnalysis {
        exif_status,
        has_editing_software: known_editor.is_some() || unknown_software.is_some(),
        editing_software,
        is_mobile_camera: is_mobile,
        camera_model: if exif_exists { camera_model } else { None },
        photo_age_days: photo_age,
        has_inconsistencies,
        flags,
        risk_score,
        assessment: Assessment::from_score(risk_score),
    }
}

pub fn analyze_bytes(data: &[u8], now: NaiveDateTime, max_photo_age_days: i64) -> ExifAnalysis {
    let fields = extract_exif_from_bytes(data);
    tracing::debug!("EXIF fields: {:?}", fields);
    analyze(&fields, now, max_photo_age_days)
}
