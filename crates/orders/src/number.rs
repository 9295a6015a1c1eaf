use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a human-readable order number: `ORD-YYYYMMDDHHMMSS-NNN`.
///
/// The timestamp keeps numbers roughly sortable; the three-digit suffix
/// disambiguates orders placed within the same second. The suffix is drawn
/// from a v7 uuid's random tail, so callers that hit a uniqueness conflict
/// can simply draw again.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let bytes = Uuid::now_v7().into_bytes();
    let suffix = u16::from_be_bytes([bytes[14], bytes[15]]) % 1000;
    format!("ORD-{}-{:03}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn has_the_documented_shape() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let number = generate_order_number(now);
        assert!(number.starts_with("ORD-20250314092653-"));
        assert_eq!(number.len(), "ORD-20250314092653-".len() + 3);
        assert!(number.rsplit('-').next().unwrap().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn suffix_varies_between_draws() {
        let now = Utc::now();
        let numbers: std::collections::HashSet<String> =
            (0..64).map(|_| generate_order_number(now)).collect();
        // 64 draws over 1000 suffixes collide sometimes, but never all of them.
        assert!(numbers.len() > 1);
    }
}
