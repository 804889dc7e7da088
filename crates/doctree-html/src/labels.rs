//! Human-readable labels for bibliographic fields.
//!
//! Locale-aware label lookup is an external concern; this table covers
//! the English defaults the writer needs for docinfo rendering.

/// Display label for a docinfo field name.
///
/// Unknown names are returned unchanged so custom fields still render.
pub fn label(name: &str) -> &str {
    match name {
        "author" => "Author",
        "authors" => "Authors",
        "organization" => "Organization",
        "address" => "Address",
        "contact" => "Contact",
        "version" => "Version",
        "revision" => "Revision",
        "status" => "Status",
        "date" => "Date",
        "copyright" => "Copyright",
        "dedication" => "Dedication",
        "abstract" => "Abstract",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(label("author"), "Author");
        assert_eq!(label("copyright"), "Copyright");
    }

    #[test]
    fn test_unknown_label_passes_through() {
        assert_eq!(label("custom-field"), "custom-field");
    }
}
