//! Format version helpers
//!
//! Versions are stored as a single `u16` where the two lowest decimal digits
//! are the minor part: `103` is version 1.03.

/// Format a stored version number as `"major.minor"`
pub fn version_string(version: u16) -> String {
    format!("{}.{:02}", version / 100, version % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        assert_eq!(version_string(103), "1.03");
        assert_eq!(version_string(7), "0.07");
        assert_eq!(version_string(0), "0.00");
        assert_eq!(version_string(250), "2.50");
        assert_eq!(version_string(u16::MAX), "655.35");
    }
}
