use crate::api::Draft;

const BULLET_MARKER: &str = "- ";
const QUOTE_MARKER: &str = "> ";

/// Render a draft as shareable Markdown-flavoured text.
///
/// Heading from the title, then the lede, the bullets, the quote (only when
/// non-empty) and the attribution lines, separated by blank lines. Empty
/// bullet or attribution lists drop their section.
pub fn render_text(draft: &Draft) -> String {
    let mut sections = vec![format!("# {}", draft.title), draft.lede.clone()];

    if !draft.bullets.is_empty() {
        sections.push(
            draft
                .bullets
                .iter()
                .map(|bullet| format!("{BULLET_MARKER}{bullet}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    if !draft.quote.is_empty() {
        sections.push(
            draft
                .quote
                .lines()
                .map(|line| format!("{QUOTE_MARKER}{line}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    if !draft.attribution.is_empty() {
        sections.push(draft.attribution.join("\n"));
    }

    let mut text = sections.join("\n\n");
    text.push('\n');
    text
}
