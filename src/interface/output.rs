//! Stdout helpers shared by the command handlers.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Compact JSON with object keys sorted.
pub fn json_line<T: Serialize>(value: &T) -> Result<String> {
    // Round-tripping through `Value` sorts keys: its map is ordered.
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&value)?)
}

pub fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    writeln!(out, "{}", json_line(value)?)?;
    Ok(())
}

pub fn write_line(out: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(out, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Unsorted {
        zeta: i64,
        alpha: Option<String>,
        mid: Vec<u8>,
    }

    #[test]
    fn test_json_line_sorts_keys() {
        let line = json_line(&Unsorted {
            zeta: 1,
            alpha: None,
            mid: vec![2],
        })
        .unwrap();
        assert_eq!(line, r#"{"alpha":null,"mid":[2],"zeta":1}"#);
    }
}
