use std::path::Path;

use anyhow::Result;

use crate::diagram::{cicd_lambda, RenderFormat};

/// Execute the `diagram` command.
pub fn execute(output: &Path, render: Option<RenderFormat>) -> Result<()> {
    let graph = cicd_lambda();
    let dot_path = graph.write_dot(output)?;
    println!("Wrote {}", dot_path.display());

    if let Some(format) = render {
        let image = graph.render(&dot_path, output, format)?;
        println!("Wrote {}", image.display());
    }
    Ok(())
}
