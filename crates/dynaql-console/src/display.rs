use serde_json::Value;

/// Output mode for rendering command results.
pub enum OutputMode {
    /// One JSON document per line.
    Compact,
    /// Indented JSON.
    Pretty,
}

/// Render a command result to stdout in the given mode.
pub fn render(output: &Value, mode: &OutputMode) {
    match mode {
        OutputMode::Compact => println!("{output}"),
        OutputMode::Pretty => match serde_json::to_string_pretty(output) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{output}"),
        },
    }
}
