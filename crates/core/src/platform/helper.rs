use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::logger;
use crate::settings::ExternalCommand;
use crate::sleep;
use crate::types::*;
use super::Platform;

/// Bridges to an external vision/input helper, one process per call.
///
/// Protocol: the configured program and args, followed by a verb and its
/// operands. Exit status 0 means success. `search` prints `x y` on stdout
/// when the template was found and nothing otherwise.
pub struct HelperPlatform {
    command: ExternalCommand,
    jitter: bool,
}

impl HelperPlatform {
    pub fn new(command: ExternalCommand, jitter: bool) -> Self {
        Self { command, jitter }
    }

    fn run(&self, verb: &str, operands: &[String]) -> Result<(bool, String)> {
        let output = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(verb)
            .args(operands)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawning helper {} {}", self.command.program, verb))?;

        if !output.stderr.is_empty() {
            logger::warn_p("helper", String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok((output.status.success(), String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn run_ok(&self, verb: &str, operands: &[String]) -> Result<bool> {
        self.run(verb, operands).map(|(ok, _)| ok)
    }
}

/// Parse the helper's `x y` answer. Blank output means "not found".
pub(crate) fn parse_location(stdout: &str) -> Result<Option<Point>> {
    let line = stdout.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        bail!("malformed helper location '{}'", line);
    };
    let x = x.parse::<i32>().map_err(|e| anyhow!("bad x '{}': {}", x, e))?;
    let y = y.parse::<i32>().map_err(|e| anyhow!("bad y '{}': {}", y, e))?;
    Ok(Some(Point::new(x, y)))
}

impl Platform for HelperPlatform {
    fn search_image(&mut self, template: &Template) -> Result<Option<Point>> {
        let operands = [template.path.to_string_lossy().into_owned(), format!("{:.3}", template.confidence)];
        let (ok, stdout) = self.run("search", &operands)?;
        if !ok {
            bail!("helper search failed for {}", template.name());
        }
        parse_location(&stdout)
    }

    fn click(&mut self, at: Point) -> Result<bool> {
        self.run_ok("click", &[at.x.to_string(), at.y.to_string()])
    }

    fn drag(&mut self, from: Point, by: Offset, secs: f64) -> Result<bool> {
        self.run_ok("drag", &[
            from.x.to_string(),
            from.y.to_string(),
            by.dx.to_string(),
            by.dy.to_string(),
            format!("{:.2}", secs),
        ])
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        if !self.run_ok("key", &[key.to_string()])? {
            bail!("helper could not press '{}'", key);
        }
        Ok(())
    }

    fn kill_client(&mut self, confidence: f64) -> Result<bool> {
        self.run_ok("kill", &[format!("{:.3}", confidence)])
    }

    fn relaunch_client(&mut self, icon: &Template) -> Result<bool> {
        self.run_ok("relaunch", &[icon.path.to_string_lossy().into_owned(), format!("{:.3}", icon.confidence)])
    }

    fn sleep(&mut self, secs: f64) {
        if self.jitter {
            sleep::sleep_jitter(secs);
        } else {
            sleep::sleep_secs(secs);
        }
    }
}
