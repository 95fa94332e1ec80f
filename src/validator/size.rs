// Compose byte-size notation ("512m", "1.5GB", "1048576")

use super::ValidationError;

/// Parse a compose size string into bytes. A bare number is bytes.
pub fn parse_size(raw: &str) -> Result<u64, ValidationError> {
    let s = raw.trim().to_lowercase();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let invalid = || ValidationError::InvalidSize(raw.to_string());

    let value: f64 = number.parse().map_err(|_| invalid())?;
    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" => 1 << 10,
        "m" | "mb" => 1 << 20,
        "g" | "gb" => 1 << 30,
        "t" | "tb" => 1 << 40,
        _ => return Err(invalid()),
    };
    Ok((value * multiplier as f64) as u64)
}
