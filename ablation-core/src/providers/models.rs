//! Model pricing metadata.

/// Known (input, output) pricing in USD per million tokens.
///
/// Accepts provider-prefixed names such as `openai/gpt-4o` or
/// `openrouter/anthropic/claude-sonnet-4`; only the last path segment is matched.
pub fn model_pricing(model: &str) -> Option<(f64, f64)> {
    let normalized = model.rsplit('/').next().unwrap_or(model).to_lowercase();

    // More specific prefixes before less specific ones
    const TABLE: &[(&str, (f64, f64))] = &[
        ("gpt-5-nano", (0.05, 0.40)),
        ("gpt-5-mini", (0.25, 2.00)),
        ("gpt-5", (1.25, 10.00)),
        ("gpt-4.1-nano", (0.10, 0.40)),
        ("gpt-4.1-mini", (0.40, 1.60)),
        ("gpt-4.1", (2.00, 8.00)),
        ("gpt-4o-mini", (0.15, 0.60)),
        ("gpt-4o", (2.50, 10.0)),
        ("gpt-4-turbo", (10.0, 30.0)),
        ("o4-mini", (1.10, 4.40)),
        ("o3-mini", (1.10, 4.40)),
        ("o3", (2.00, 8.00)),
        ("o1-mini", (3.0, 12.0)),
        ("o1", (15.0, 60.0)),
        ("claude-opus-4", (15.0, 75.0)),
        ("claude-sonnet-4", (3.0, 15.0)),
        ("claude-3-7-sonnet", (3.0, 15.0)),
        ("claude-3-5-haiku", (0.80, 4.0)),
        ("gemini-2.5-pro", (1.25, 10.0)),
        ("gemini-2.5-flash", (0.30, 2.50)),
        ("deepseek-r1", (0.55, 2.19)),
        ("deepseek-chat", (0.27, 1.10)),
    ];

    TABLE
        .iter()
        .find(|(prefix, _)| normalized.starts_with(prefix))
        .map(|(_, pricing)| *pricing)
}
