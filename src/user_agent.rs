//! User-Agent string sent with checksum and snapshot requests.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/twentywordmagic/twmtg";

/// Default User-Agent (identifies the tool and crate version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("twmtg/{version} (card-snapshot-sync; +{PROJECT_UA_URL})")
}
