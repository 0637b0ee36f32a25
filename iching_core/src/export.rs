//! Markdown export of past readings.

use crate::types::Reading;

/// Render readings as a Markdown document, oldest first
pub fn export_markdown(readings: &[Reading]) -> String {
    let mut out = String::from("# I Ching Journal\n\n");

    if readings.is_empty() {
        out.push_str("_No readings yet._\n");
        return out;
    }

    for reading in readings {
        out.push_str(&format!("## {}\n\n", reading.question));
        out.push_str(&format!(
            "*{}* · lines `{}`\n\n",
            reading.cast_at.format("%Y-%m-%d %H:%M UTC"),
            reading.cast
        ));
        out.push_str(&format!("**Hexagram {}**\n\n", reading.primary.title()));
        out.push_str(&format!("> {}\n\n", reading.primary.judgment_en));

        let changing = reading.changing_line_texts();
        if !changing.is_empty() {
            out.push_str("**Changing lines**\n\n");
            for (position, text) in changing {
                out.push_str(&format!("- Line {}: {}\n", position + 1, text.line_en));
            }
            out.push('\n');
        }

        if let Some(secondary) = &reading.secondary {
            out.push_str(&format!("**Evolving into {}**\n\n", secondary.title()));
        }

        if let Some(interpretation) = &reading.interpretation {
            out.push_str("### Interpretation\n\n");
            out.push_str(interpretation.trim());
            out.push_str("\n\n");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ReferenceTable;
    use crate::types::Cast;
    use chrono::{TimeZone, Utc};

    fn reading(question: &str, lines: &str) -> Reading {
        let cast: Cast = lines.parse().unwrap();
        let when = Utc.with_ymd_and_hms(2024, 6, 21, 7, 5, 0).unwrap();
        Reading::from_cast(question, cast, ReferenceTable::bundled().unwrap(), when).unwrap()
    }

    #[test]
    fn test_export_empty() {
        let md = export_markdown(&[]);
        assert!(md.starts_with("# I Ching Journal"));
        assert!(md.contains("No readings yet"));
    }

    #[test]
    fn test_export_reading_with_changes() {
        let mut r = reading("Where next?", "6,7,8,7,8,7");
        r.attach_interpretation("Cross carefully.").unwrap();
        let md = export_markdown(&[r]);

        assert!(md.contains("## Where next?"));
        assert!(md.contains("2024-06-21 07:05 UTC"));
        assert!(md.contains("`6,7,8,7,8,7`"));
        assert!(md.contains("Hexagram 64. Before Completion"));
        assert!(md.contains("- Line 1:"));
        assert!(md.contains("Evolving into 38. Opposition"));
        assert!(md.contains("Cross carefully."));
    }

    #[test]
    fn test_export_stable_reading_has_no_change_sections() {
        let md = export_markdown(&[reading("Still?", "7,7,7,7,7,7")]);
        assert!(md.contains("Hexagram 1. The Creative"));
        assert!(!md.contains("Changing lines"));
        assert!(!md.contains("Evolving into"));
        assert!(!md.contains("### Interpretation"));
    }
}
