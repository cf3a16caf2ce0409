//! Tracing setup and log-safe redaction helpers.
//!
//! Booking records carry attendee emails and, in the config layer, an
//! Exchange service-account password. Neither should ever reach a log line
//! unredacted, so every module that logs a `Booking` or `Settings` goes
//! through `redact_email`/`redact_secret` first rather than deriving `Debug`
//! on the raw fields.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. `json` selects structured
/// output for production, human-readable for local development.
pub fn init_logger(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// Redact an email address to its first two local-part characters plus
/// domain, e.g. `jo***@example.edu`. Never logs the full address.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if local.len() > 2 => {
            format!("{}***@{}", &local[..2], domain)
        }
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}

/// Redact a list of emails for inclusion in a log line.
pub fn redact_emails(emails: &[String]) -> Vec<String> {
    emails.iter().map(|e| redact_email(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_long_local_part() {
        assert_eq!(redact_email("student@university.edu"), "st***@university.edu");
    }

    #[test]
    fn redacts_short_local_part() {
        assert_eq!(redact_email("a@university.edu"), "***@university.edu");
    }

    #[test]
    fn redacts_malformed_address() {
        assert_eq!(redact_email("not-an-email"), "***");
    }
}
