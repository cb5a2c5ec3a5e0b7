//! Natural-language prompt construction for generation jobs.

use crate::position::Position;

/// Descriptive fields of a haircut or beard style used in the prompt.
#[derive(Debug, Clone, Default)]
pub struct StyleFragment {
    pub name: String,
    pub description: Option<String>,
}

/// Fallback subject when neither a haircut nor a beard is selected.
const DEFAULT_SUBJECT: &str = "a fresh, well-groomed look";

/// Build the job prompt from the optional haircut and beard selections.
///
/// Empty names and descriptions are dropped rather than left as blanks.
pub fn build_prompt(haircut: Option<&StyleFragment>, beard: Option<&StyleFragment>) -> String {
    let mut parts: Vec<String> = Vec::new();

    for (label, style) in [("haircut", haircut), ("beard", beard)] {
        let Some(style) = style else { continue };
        let name = style.name.trim();
        if !name.is_empty() {
            parts.push(format!("{label}: {name}"));
        }
        if let Some(description) = style.description.as_deref().map(str::trim) {
            if !description.is_empty() {
                parts.push(description.to_string());
            }
        }
    }

    let subject = if parts.is_empty() {
        DEFAULT_SUBJECT.to_string()
    } else {
        parts.join(", ")
    };

    format!(
        "A professional barber shop portrait showcasing {subject}. Professional studio \
         lighting, sharp focus, pristine barbershop background, high quality professional \
         photography."
    )
}

/// Append the view qualifier for one reference position.
pub fn position_prompt(prompt: &str, position: Position) -> String {
    format!("{prompt} This is for the {position} view of the face.")
}
