use crate::matcher::Outcome;

pub const SAVED: &str = "Image saved.";
pub const NOTHING_TO_COMPARE: &str = "There are no stored images to compare against.";

/// Text sent back to the user for a comparison outcome.
pub fn render(outcome: &Outcome) -> String {
    match outcome {
        Outcome::NoReferences => NOTHING_TO_COMPARE.to_string(),
        Outcome::Decided { decision, .. } if decision.is_match => {
            format!("The images matched! Match rate: {}%", decision.percent_text)
        }
        Outcome::Decided { decision, .. } => {
            format!(
                "The images did not match. Match rate: {}%",
                decision.percent_text
            )
        }
    }
}
