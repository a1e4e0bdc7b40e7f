//! Render command - turn a plan file template into a plan file

use std::collections::HashMap;
use std::path::Path;

use console::style;
use minijinja::{Environment, context};

use crate::error::{CliError, Result};

/// Run the render command
pub fn run(file: &Path, output: &Path) -> Result<()> {
    let source = std::fs::read_to_string(file)?;

    let mut env = Environment::new();
    env.add_template("plan", &source)
        .map_err(|err| CliError::template(err.to_string()))?;
    let template = env
        .get_template("plan")
        .map_err(|err| CliError::template(err.to_string()))?;

    // Templates see the process environment under `env`
    let vars: HashMap<String, String> = std::env::vars().collect();
    let rendered = template
        .render(context! { env => vars })
        .map_err(|err| CliError::template(err.to_string()))?;

    std::fs::write(output, rendered)?;

    println!(
        "{} Rendered {} -> {}",
        style("✓").green().bold(),
        style(file.display()).cyan(),
        style(output.display()).cyan()
    );

    Ok(())
}
