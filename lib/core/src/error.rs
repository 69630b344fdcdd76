//! Error handling foundation for the jobdesk platform.
//!
//! Domain crates keep their own error enums (node-level, graph-level,
//! record-level) and hand them across crate boundaries wrapped in a
//! rootcause `Report`, so callers get the typed context plus a location.

use rootcause::Report;

/// Result alias whose error side is a `Report` carrying context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct MissingField(&'static str);

    impl fmt::Display for MissingField {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "missing field '{}'", self.0)
        }
    }

    impl std::error::Error for MissingField {}

    fn require(present: bool) -> Result<u8, MissingField> {
        if !present {
            return Err(MissingField("name").into());
        }
        Ok(1)
    }

    #[test]
    fn ok_passes_through() {
        assert_eq!(require(true).expect("should be ok"), 1);
    }

    #[test]
    fn report_keeps_context_message() {
        let err = require(false).unwrap_err();
        assert!(err.to_string().contains("missing field 'name'"));
    }
}
