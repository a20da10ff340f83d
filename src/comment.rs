use crate::analyzer::Analysis;
use crate::error::{Error, Result};

const PLACEHOLDERS: &[&str] = &["{problem}", "{solution}", "{steps}"];

/// Render the final issue comment from a template and an analysis.
///
/// Pure substitution: `{problem}`, `{solution}`, and `{steps}` must all be
/// present in the template; a missing placeholder is a configuration error
/// surfaced to the caller. Steps render as a 1-indexed numbered list, one
/// per line.
pub fn render_comment(template: &str, analysis: &Analysis) -> Result<String> {
    for placeholder in PLACEHOLDERS {
        if !template.contains(placeholder) {
            return Err(Error::Template(format!(
                "comment template is missing the {placeholder} placeholder"
            )));
        }
    }

    let steps = analysis
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(template
        .replace("{problem}", &analysis.problem_statement)
        .replace("{solution}", &analysis.proposed_solution)
        .replace("{steps}", &steps))
}
