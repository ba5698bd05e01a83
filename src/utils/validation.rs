use crate::utils::error::{ReceiptError, Result};
use std::collections::HashSet;
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ReceiptError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ReceiptError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ReceiptError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 檢查上傳檔案的副檔名（不分大小寫）
pub fn validate_file_extension(path: &Path, allowed_extensions: &[String]) -> Result<String> {
    let allowed_set: HashSet<String> = allowed_extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ReceiptError::FileRejected {
            path: path.display().to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        })?;

    if !allowed_set.contains(&extension) {
        let mut allowed: Vec<&String> = allowed_set.iter().collect();
        allowed.sort();
        return Err(ReceiptError::FileRejected {
            path: path.display().to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }

    Ok(extension)
}

pub fn validate_file_size(path: &Path, size: u64, max_size: u64) -> Result<()> {
    if size == 0 {
        return Err(ReceiptError::FileRejected {
            path: path.display().to_string(),
            reason: "File is empty".to_string(),
        });
    }
    if size > max_size {
        return Err(ReceiptError::FileRejected {
            path: path.display().to_string(),
            reason: format!("File is {} bytes, limit is {} bytes", size, max_size),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReceiptError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ReceiptError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// IBAN 只做形狀檢查：國碼 + 兩位檢查碼 + 英數字，長度 15..=34
pub fn validate_iban(field_name: &str, iban: &str) -> Result<()> {
    let compact: String = iban.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = compact.as_bytes();
    let shape_ok = (15..=34).contains(&bytes.len())
        && bytes[..2].iter().all(|b| b.is_ascii_uppercase())
        && bytes[2..4].iter().all(|b| b.is_ascii_digit())
        && bytes[4..].iter().all(|b| b.is_ascii_alphanumeric());

    if !shape_ok {
        return Err(ReceiptError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: iban.to_string(),
            reason: "IBAN must be a country code, two check digits and 11-30 alphanumerics"
                .to_string(),
        });
    }
    Ok(())
}

pub fn validate_email(field_name: &str, email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(ReceiptError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: email.to_string(),
            reason: "Not a valid email address".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("limits.max_file_size", 5, 1).is_ok());
        assert!(validate_positive_number("limits.max_file_size", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        let allowed = vec!["jpg".to_string(), ".png".to_string()];
        assert_eq!(
            validate_file_extension(Path::new("ticket.JPG"), &allowed).unwrap(),
            "jpg"
        );
        assert_eq!(
            validate_file_extension(Path::new("ticket.png"), &allowed).unwrap(),
            "png"
        );
        assert!(validate_file_extension(Path::new("ticket.gif"), &allowed).is_err());
        assert!(validate_file_extension(Path::new("ticket"), &allowed).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        let path = Path::new("r.jpg");
        assert!(validate_file_size(path, 10, 100).is_ok());
        assert!(validate_file_size(path, 0, 100).is_err());
        assert!(validate_file_size(path, 101, 100).is_err());
    }

    #[test]
    fn test_validate_iban_and_email() {
        assert!(validate_iban("iban", "RO49 AAAA 1B31 0075 9384 0000").is_ok());
        assert!(validate_iban("iban", "12345").is_err());
        assert!(validate_iban("iban", "ro49AAAA1B31007593840000").is_err());

        assert!(validate_email("email", "ana@student.upt.ro").is_ok());
        assert!(validate_email("email", "ana.student.upt.ro").is_err());
        assert!(validate_email("email", "@upt.ro").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("thresholds.ocr_confidence", 0.6, 0.0, 1.0).is_ok());
        assert!(validate_range("thresholds.ocr_confidence", 1.2, 0.0, 1.0).is_err());
    }
}
