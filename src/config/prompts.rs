//! System message presets

/// Default system message
pub const DEFAULT_SYSTEM_MESSAGE: &str = r#"You are a helpful AI assistant. When responding to queries:
1. ALWAYS use available tools when possible
2. Do NOT provide direct answers if a tool can handle the query
3. Be clear and concise
4. For calculations, use the calculator tool
5. For essay writing, use the wikipedia tool
6. Return ONLY tool responses without additional explanation"#;

const SCIENTIFIC: &str = r#"You are a scientific expert. When explaining formulas:
1. Break down each component of the formula
2. Explain what each variable represents
3. Provide real-world examples
4. Include practical applications
5. Mention any important assumptions or limitations"#;

const CODE: &str = r#"You are a Python programming expert. When generating code:
1. Include all necessary imports
2. Add clear docstrings and comments
3. Handle edge cases and errors
4. Follow PEP 8 style guidelines
5. Provide example usage"#;

const COMPARISON: &str = r#"You are a data analyst. When comparing data:
1. Highlight key differences and similarities
2. Use percentages and relative measures
3. Explain trends and patterns
4. Provide context for the comparison
5. Draw meaningful conclusions"#;

const FINANCIAL: &str = r#"You are a financial analyst. When analyzing financial data:
1. Focus on key performance metrics
2. Explain market trends
3. Consider risk factors
4. Provide historical context
5. Note any important disclaimers"#;

const SEARCH: &str = r#"You are a research assistant. When presenting search results:
1. Organize information clearly
2. Cite sources when available
3. Highlight key findings
4. Provide relevant context
5. Note any data limitations"#;

const VISUALIZATION: &str = r#"You are a data visualization expert. When creating visualizations:
1. Choose the most appropriate chart type
2. Ensure clear data representation
3. Add proper labels and titles
4. Use effective color schemes
5. Consider data relationships"#;

/// Named presets accepted by `--system-message`
pub const SYSTEM_MESSAGES: &[(&str, &str)] = &[
    ("default", DEFAULT_SYSTEM_MESSAGE),
    ("scientific", SCIENTIFIC),
    ("code", CODE),
    ("comparison", COMPARISON),
    ("financial", FINANCIAL),
    ("search", SEARCH),
    ("visualization", VISUALIZATION),
];

/// Look up a preset by name (case-insensitive)
pub fn preset(name: &str) -> Option<&'static str> {
    let name = name.trim();
    SYSTEM_MESSAGES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, text)| *text)
}

/// Resolve a preset name or literal text into a system message.
///
/// `None` or blank input yields the default preset.
pub fn resolve_system_message(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") => DEFAULT_SYSTEM_MESSAGE.to_string(),
        Some(v) => preset(v).map(str::to_string).unwrap_or_else(|| v.to_string()),
    }
}

/// Names of all presets
pub fn preset_names() -> Vec<&'static str> {
    SYSTEM_MESSAGES.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_preset_and_literal() {
        assert_eq!(resolve_system_message(None), DEFAULT_SYSTEM_MESSAGE);
        assert_eq!(resolve_system_message(Some("  ")), DEFAULT_SYSTEM_MESSAGE);
        assert!(resolve_system_message(Some("Scientific")).starts_with("You are a scientific expert"));
        assert_eq!(resolve_system_message(Some("Answer in French.")), "Answer in French.");
    }

    #[test]
    fn test_preset_names() {
        let names = preset_names();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"visualization"));
    }
}
