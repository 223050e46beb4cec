//! Telemetry feasibility tables.
//!
//! A fixed table of (category, product) pairs that real telemetry pipelines
//! can actually serve, plus the field allow-list for Windows
//! process-creation events. Shared with the huntability scorer.

use crate::rule::Logsource;

/// Coherent (category, product) combinations.
pub(crate) const KNOWN_COMBINATIONS: &[(&str, &str)] = &[
    ("process_creation", "windows"),
    ("process_creation", "linux"),
    ("process_creation", "macos"),
    ("process_access", "windows"),
    ("process_termination", "windows"),
    ("registry_access", "windows"),
    ("registry_event", "windows"),
    ("registry_set", "windows"),
    ("registry_add", "windows"),
    ("registry_delete", "windows"),
    ("file_event", "windows"),
    ("file_event", "linux"),
    ("file_event", "macos"),
    ("file_change", "windows"),
    ("file_delete", "windows"),
    ("image_load", "windows"),
    ("driver_load", "windows"),
    ("network_connection", "windows"),
    ("network_connection", "linux"),
    ("network_connection", "macos"),
    ("dns_query", "windows"),
    ("pipe_created", "windows"),
    ("wmi_event", "windows"),
    ("ps_script", "windows"),
    ("ps_module", "windows"),
    ("ps_classic_start", "windows"),
    ("create_remote_thread", "windows"),
    ("create_stream_hash", "windows"),
    ("authentication", "windows"),
    ("authentication", "linux"),
];

/// Fields emitted by Windows process-creation telemetry.
pub(crate) const PROCESS_CREATION_FIELDS: &[&str] = &[
    "Image",
    "ParentImage",
    "CommandLine",
    "ParentCommandLine",
    "ProcessId",
    "ParentProcessId",
    "IntegrityLevel",
    "Hashes",
    "CurrentDirectory",
    "User",
    "LogonId",
];

/// How a rule's logsource relates to the feasibility table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TelemetryFit {
    /// Category and product form a known-coherent pair.
    Known,
    /// Both present but the pair is not in the table; the category itself is
    /// known under some other product, so the pair is incoherent.
    Incoherent,
    /// Both present but the category is foreign to the table entirely.
    UnknownCategory,
    /// Category or product (or both) missing.
    Incomplete,
}

pub(crate) fn classify_logsource(logsource: &Logsource) -> TelemetryFit {
    let (Some(category), Some(product)) = (&logsource.category, &logsource.product) else {
        return TelemetryFit::Incomplete;
    };
    let category = category.to_lowercase();
    let product = product.to_lowercase();

    if KNOWN_COMBINATIONS
        .iter()
        .any(|(c, p)| *c == category && *p == product)
    {
        return TelemetryFit::Known;
    }
    if KNOWN_COMBINATIONS.iter().any(|(c, _)| *c == category) {
        return TelemetryFit::Incoherent;
    }
    TelemetryFit::UnknownCategory
}

pub(crate) fn is_windows_process_creation(logsource: &Logsource) -> bool {
    logsource
        .category
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("process_creation"))
        && logsource
            .product
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("windows"))
}

pub(crate) fn is_allowed_process_creation_field(base_field: &str) -> bool {
    PROCESS_CREATION_FIELDS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(base_field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logsource(category: Option<&str>, product: Option<&str>) -> Logsource {
        Logsource {
            category: category.map(str::to_string),
            product: product.map(str::to_string),
            service: None,
        }
    }

    #[test]
    fn test_known_combination() {
        let ls = logsource(Some("process_creation"), Some("windows"));
        assert_eq!(classify_logsource(&ls), TelemetryFit::Known);
    }

    #[test]
    fn test_incoherent_combination() {
        let ls = logsource(Some("registry_access"), Some("linux"));
        assert_eq!(classify_logsource(&ls), TelemetryFit::Incoherent);
    }

    #[test]
    fn test_unknown_category_is_not_incoherent() {
        let ls = logsource(Some("custom_appliance_log"), Some("windows"));
        assert_eq!(classify_logsource(&ls), TelemetryFit::UnknownCategory);
    }

    #[test]
    fn test_missing_parts_are_incomplete() {
        assert_eq!(
            classify_logsource(&logsource(Some("process_creation"), None)),
            TelemetryFit::Incomplete
        );
        assert_eq!(
            classify_logsource(&logsource(None, None)),
            TelemetryFit::Incomplete
        );
    }

    #[test]
    fn test_process_creation_field_allowlist() {
        assert!(is_allowed_process_creation_field("CommandLine"));
        assert!(is_allowed_process_creation_field("parentimage"));
        assert!(!is_allowed_process_creation_field("DestinationIp"));
    }
}
