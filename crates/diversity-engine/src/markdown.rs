//! The four-section report body.

use phrase_store::Section;
use serde::{Deserialize, Serialize};

pub const WORKED_WELL: &str = "What Worked Well";
pub const CRITICAL_ISSUES: &str = "Critical Issues";
pub const MINOR_FRICTION: &str = "Minor Friction";
pub const SUGGESTED_IMPROVEMENTS: &str = "Suggested Improvements";

/// Placeholder bullet for an empty section.
pub const NONE_OBSERVED: &str = "None observed.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Heading {
    Worked,
    Critical,
    Friction,
    Improvements,
}

fn heading(line: &str) -> Option<Heading> {
    let trimmed = line.trim();
    let is_heading = trimmed.starts_with('#')
        || (trimmed.starts_with("**") && trimmed.ends_with("**") && trimmed.len() > 4);
    if !is_heading {
        return None;
    }
    let title = trimmed
        .trim_matches(|ch: char| ch == '#' || ch == '*' || ch == ':' || ch.is_whitespace())
        .to_ascii_lowercase();
    if title.contains("worked") || title.contains("went well") {
        Some(Heading::Worked)
    } else if title.contains("critical") {
        Some(Heading::Critical)
    } else if title.contains("friction") {
        Some(Heading::Friction)
    } else if title.contains("improvement") || title.contains("recommendation") {
        Some(Heading::Improvements)
    } else {
        None
    }
}

fn bullet(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped = if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("• "))
    {
        rest
    } else {
        let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
        match trimmed[digits..].strip_prefix(". ").or_else(|| trimmed[digits..].strip_prefix(") ")) {
            Some(rest) if digits > 0 => rest,
            _ => trimmed,
        }
    };
    let text = stripped.trim();
    if text.is_empty() || text.eq_ignore_ascii_case(NONE_OBSERVED) || text.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(text.to_string())
    }
}

/// Bullets of one report, grouped by section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSections {
    pub worked_well: Vec<String>,
    pub critical_issues: Vec<String>,
    pub minor_friction: Vec<String>,
    pub improvements: Vec<String>,
}

impl ReportSections {
    /// Parse a markdown body. Text before the first known heading and under
    /// unknown headings is dropped.
    pub fn parse(markdown: &str) -> Self {
        let mut sections = Self::default();
        let mut current: Option<Heading> = None;
        for line in markdown.lines() {
            if let Some(found) = heading(line) {
                current = Some(found);
                continue;
            }
            if line.trim_start().starts_with('#') {
                current = None;
                continue;
            }
            let (Some(target), Some(text)) = (current, bullet(line)) else {
                continue;
            };
            let list = match target {
                Heading::Worked => &mut sections.worked_well,
                Heading::Critical => &mut sections.critical_issues,
                Heading::Friction => &mut sections.minor_friction,
                Heading::Improvements => &mut sections.improvements,
            };
            list.push(text);
        }
        sections
    }

    /// Fixed section order, one blank line between sections.
    pub fn render(&self) -> String {
        let blocks = [
            (WORKED_WELL, &self.worked_well),
            (CRITICAL_ISSUES, &self.critical_issues),
            (MINOR_FRICTION, &self.minor_friction),
            (SUGGESTED_IMPROVEMENTS, &self.improvements),
        ];
        let mut out = String::new();
        for (idx, (title, bullets)) in blocks.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            out.push_str("## ");
            out.push_str(title);
            out.push('\n');
            if bullets.is_empty() {
                out.push_str("- ");
                out.push_str(NONE_OBSERVED);
                out.push('\n');
            }
            for item in bullets.iter() {
                out.push_str("- ");
                out.push_str(item);
                out.push('\n');
            }
        }
        out
    }

    pub fn section(&self, section: Section) -> &[String] {
        match section {
            Section::WorkedWell => &self.worked_well,
            Section::MinorFriction => &self.minor_friction,
            Section::Improvements => &self.improvements,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<String> {
        match section {
            Section::WorkedWell => &mut self.worked_well,
            Section::MinorFriction => &mut self.minor_friction,
            Section::Improvements => &mut self.improvements,
        }
    }

    /// Bullets of the deduplicated sections, one per line.
    pub fn variable_text(&self) -> String {
        Section::ALL
            .iter()
            .flat_map(|section| self.section(*section).iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether any deduplicated section carries content.
    pub fn has_variable_content(&self) -> bool {
        !(self.worked_well.is_empty() && self.minor_friction.is_empty() && self.improvements.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Intro text\n\
        ## What Worked Well\n\
        - Search surfaced ramen fast\n\
        * Photos loaded quickly\n\
        \n\
        ### Critical Issues:\n\
        1. Allergen info missing on specials\n\
        ## Minor Friction\n\
        - None observed.\n\
        **Suggested Improvements**\n\
        - Add an allergen legend\n\
        ## Appendix\n\
        - ignored\n";

    #[test]
    fn parses_loose_markdown() {
        let sections = ReportSections::parse(SAMPLE);
        assert_eq!(
            sections.worked_well,
            vec!["Search surfaced ramen fast", "Photos loaded quickly"]
        );
        assert_eq!(sections.critical_issues, vec!["Allergen info missing on specials"]);
        assert!(sections.minor_friction.is_empty());
        assert_eq!(sections.improvements, vec!["Add an allergen legend"]);
    }

    #[test]
    fn renders_fixed_order_with_single_blank_lines() {
        let sections = ReportSections {
            worked_well: vec!["Fast search".into()],
            improvements: vec!["Pin the cart".into()],
            ..ReportSections::default()
        };
        let rendered = sections.render();
        assert_eq!(
            rendered,
            "## What Worked Well\n- Fast search\n\n\
             ## Critical Issues\n- None observed.\n\n\
             ## Minor Friction\n- None observed.\n\n\
             ## Suggested Improvements\n- Pin the cart\n"
        );
        assert!(!rendered.contains("\n\n\n"));
        assert_eq!(ReportSections::parse(&rendered), sections);
    }
}
