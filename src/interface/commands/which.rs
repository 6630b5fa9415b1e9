//! Handles `swarm which`. Runs before the config is loaded, so it works on a fresh machine.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use crate::infrastructure::bin_detect::resolve_swarm_binary;
use crate::interface::cli::WhichArgs;
use crate::interface::commands::ExitError;
use crate::interface::output::{write_json, write_line};
use crate::strings::messages;

#[derive(Debug, Serialize)]
struct WhichOutput {
    path: Option<String>,
}

pub fn handle_which(args: &WhichArgs, out: &mut dyn Write) -> Result<()> {
    report_binary(resolve_swarm_binary(), args.json, out)
}

fn report_binary(found: Option<PathBuf>, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        write_json(
            out,
            &WhichOutput {
                path: found.as_ref().map(|p| p.display().to_string()),
            },
        )?;
    }
    let Some(path) = found else {
        return Err(ExitError::new(1, messages::NO_SWARM_BINARY).into());
    };
    if !json {
        write_line(out, &path.display().to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::commands::testing::output;

    #[test]
    fn test_report_found_binary() {
        let mut out = Vec::new();
        report_binary(Some(PathBuf::from("/usr/bin/takopiswarm")), false, &mut out).unwrap();
        assert_eq!(output(out), "/usr/bin/takopiswarm\n");

        let mut out = Vec::new();
        report_binary(Some(PathBuf::from("/usr/bin/takopi")), true, &mut out).unwrap();
        assert_eq!(output(out), "{\"path\":\"/usr/bin/takopi\"}\n");
    }

    #[test]
    fn test_report_missing_binary() {
        let mut out = Vec::new();
        let err = report_binary(None, true, &mut out).unwrap_err();
        assert_eq!(err.downcast_ref::<ExitError>().unwrap().code, 1);
        assert_eq!(output(out), "{\"path\":null}\n");
    }
}
