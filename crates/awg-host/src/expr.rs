//! Number-list parsing for the CLI.
//!
//! Accepts a comma- or whitespace-separated list of numbers
//! (`"0,1e-6,2e-6"`) or a `linspace(start, stop, count)` form for evenly
//! spaced points.

/// Parse a value-list expression.
pub fn parse_values(input: &str) -> Result<Vec<f64>, String> {
    let trimmed = input.trim();
    if let Some(rest) = trimmed.strip_prefix("linspace") {
        return parse_linspace(rest);
    }
    let values: Result<Vec<f64>, String> = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            piece
                .parse::<f64>()
                .map_err(|_| format!("not a number: {piece:?}"))
        })
        .collect();
    let values = values?;
    if values.is_empty() {
        return Err("empty value list".to_string());
    }
    Ok(values)
}

fn parse_linspace(rest: &str) -> Result<Vec<f64>, String> {
    let inner = rest
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| "linspace needs the form linspace(start, stop, count)".to_string())?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("linspace takes 3 arguments, got {}", parts.len()));
    }
    let start: f64 = parts[0]
        .parse()
        .map_err(|_| format!("not a number: {:?}", parts[0]))?;
    let stop: f64 = parts[1]
        .parse()
        .map_err(|_| format!("not a number: {:?}", parts[1]))?;
    let count: usize = parts[2]
        .parse()
        .map_err(|_| format!("not a count: {:?}", parts[2]))?;
    if count < 2 {
        return Err("linspace needs at least 2 points".to_string());
    }
    let step = (stop - start) / (count - 1) as f64;
    Ok((0..count).map(|i| start + step * i as f64).collect())
}
