/// Prepended to the prompt when portrait enhancement is on.
pub const PORTRAIT_PREFIX: &str = "adult, face portrait photograph, ";

/// Appended to the prompt when portrait enhancement is on.
pub const PORTRAIT_SUFFIX: &str = ", 8k, realistic";

/// Wrap a prompt in the portrait template.
pub fn enhance_portrait(prompt: &str) -> String {
    format!("{}{}{}", PORTRAIT_PREFIX, prompt, PORTRAIT_SUFFIX)
}

/// The prompt actually sent for a cycle. Always derived from the base
/// prompt, so repeated cycles never stack the template.
pub fn effective_prompt(prompt: &str, portrait_enhancer: bool) -> String {
    if portrait_enhancer {
        enhance_portrait(prompt)
    } else {
        prompt.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_wrapping() {
        assert_eq!(
            effective_prompt("a fox", true),
            "adult, face portrait photograph, a fox, 8k, realistic"
        );
    }

    #[test]
    fn test_disabled_is_identity() {
        assert_eq!(effective_prompt("a fox", false), "a fox");
    }

    #[test]
    fn test_not_cumulative() {
        let once = effective_prompt("a fox", true);
        let again = effective_prompt("a fox", true);
        assert_eq!(once, again);
        assert_eq!(once.matches(PORTRAIT_PREFIX).count(), 1);
    }

    #[test]
    fn test_empty_prompt() {
        assert_eq!(
            enhance_portrait(""),
            "adult, face portrait photograph, , 8k, realistic"
        );
    }
}
