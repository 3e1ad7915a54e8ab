use std::env;
use tracing::warn;

/// Offset applied uniformly to all civil-date interpretation.
/// The marketplace operates in a single civil timezone; per-user
/// timezones are out of scope.
pub const DEFAULT_CIVIL_UTC_OFFSET_MINUTES: i32 = 480; // UTC+8

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub civil_utc_offset_minutes: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            civil_utc_offset_minutes: parse_civil_offset(
                env::var("CIVIL_UTC_OFFSET_MINUTES").ok().as_deref(),
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

/// A civil offset must stay within a day; `FixedOffset` rejects
/// anything at or beyond 24 hours either side of UTC.
const MAX_CIVIL_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

fn parse_civil_offset(raw: Option<&str>) -> i32 {
    match raw.map(str::parse::<i32>) {
        None => DEFAULT_CIVIL_UTC_OFFSET_MINUTES,
        Some(Ok(minutes)) if minutes.abs() <= MAX_CIVIL_UTC_OFFSET_MINUTES => minutes,
        Some(_) => {
            warn!(
                "CIVIL_UTC_OFFSET_MINUTES invalid or out of range, using default {}",
                DEFAULT_CIVIL_UTC_OFFSET_MINUTES
            );
            DEFAULT_CIVIL_UTC_OFFSET_MINUTES
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_offset_falls_back_when_unset() {
        assert_eq!(parse_civil_offset(None), DEFAULT_CIVIL_UTC_OFFSET_MINUTES);
    }

    #[test]
    fn civil_offset_accepts_in_range_values() {
        assert_eq!(parse_civil_offset(Some("-300")), -300);
        assert_eq!(parse_civil_offset(Some("0")), 0);
        assert_eq!(parse_civil_offset(Some("1439")), 1439);
    }

    #[test]
    fn civil_offset_rejects_out_of_range_and_garbage() {
        assert_eq!(
            parse_civil_offset(Some("1440")),
            DEFAULT_CIVIL_UTC_OFFSET_MINUTES
        );
        assert_eq!(
            parse_civil_offset(Some("-100000")),
            DEFAULT_CIVIL_UTC_OFFSET_MINUTES
        );
        assert_eq!(
            parse_civil_offset(Some("eight hours")),
            DEFAULT_CIVIL_UTC_OFFSET_MINUTES
        );
    }
}
