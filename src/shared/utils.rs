use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_conn(database_url: &str) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

/// Normalizes a phone number for sender matching: digits only, last ten.
///
/// WhatsApp delivers numbers like `905551234567` while stored profiles may
/// carry formatting (`+90 555 123 45 67`); comparing the last ten digits
/// makes both sides line up.
pub fn phone_suffix(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let start = digits.len().saturating_sub(10);
    digits[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_strips_formatting() {
        assert_eq!(phone_suffix("+90 555 123 45 67"), "5551234567");
        assert_eq!(phone_suffix("905551234567"), "5551234567");
    }

    #[test]
    fn formatted_and_bare_numbers_share_a_suffix() {
        assert_eq!(
            phone_suffix("+90 555 123 45 67"),
            phone_suffix("905551234567")
        );
    }

    #[test]
    fn short_numbers_are_kept_whole() {
        assert_eq!(phone_suffix("12345"), "12345");
        assert_eq!(phone_suffix(""), "");
    }
}
