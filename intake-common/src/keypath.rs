//! Compound field name parsing
//!
//! Field names mix bracket and dot conventions (`documents[idProof]`,
//! `marketing.budget`, `targetClasses[0]`). Both decompose into the same
//! ordered segment list.

/// Split a compound field name into its path segments
///
/// `[`, `]` and `.` are all boundaries; empty segments produced by adjacent
/// delimiters are dropped. Numeric segments stay strings.
pub fn parse_key_path(name: &str) -> Vec<String> {
    name.split(&['[', ']', '.'][..])
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize an uploaded file's field name into its document slot key
///
/// `documents[idProof]`, `documents.idProof` and `idProof` all map to
/// `idProof`. A name with no usable segment is returned unchanged.
pub fn document_slot_key(field_name: &str) -> String {
    parse_key_path(field_name)
        .pop()
        .unwrap_or_else(|| field_name.to_string())
}
