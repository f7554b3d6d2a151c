use super::GradientError;

/// Parses a `#rrggbb` (or bare `rrggbb`) triplet into normalized RGB.
pub fn parse_hex_color(input: &str) -> Result<[f32; 3], GradientError> {
    let invalid = || GradientError::InvalidColor(input.to_string());
    let digits = input.trim().strip_prefix('#').unwrap_or(input.trim());
    if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let packed = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
    Ok([
        ((packed >> 16) & 0xff) as f32 / 255.0,
        ((packed >> 8) & 0xff) as f32 / 255.0,
        (packed & 0xff) as f32 / 255.0,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_hash() {
        assert_eq!(parse_hex_color("#ff0000").unwrap(), [1.0, 0.0, 0.0]);
        assert_eq!(parse_hex_color("00FF00").unwrap(), [0.0, 1.0, 0.0]);
        let sky = parse_hex_color("#38bdf8").unwrap();
        assert!((sky[0] - 56.0 / 255.0).abs() < f32::EPSILON);
        assert!((sky[2] - 248.0 / 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_malformed_triplets() {
        for input in ["", "#fff", "#12345g", "#1234567", "+12345"] {
            assert!(
                matches!(parse_hex_color(input), Err(GradientError::InvalidColor(_))),
                "accepted {input:?}"
            );
        }
    }
}
