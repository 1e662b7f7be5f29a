use std::io::Write;
use std::path::Path;

use anyhow::{Context, bail};
use press_core::PressConfig;

pub fn init(path: &Path, force: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let content = PressConfig::default().to_toml_string()?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    writeln!(out, "✓ Generated {}", path.display())?;
    Ok(())
}

pub fn show(config: &PressConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    write!(out, "{}", config.to_toml_string()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_defaults_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("press.toml");
        init(&path, false, &mut Vec::new()).unwrap();
        assert_eq!(PressConfig::from_file(&path).unwrap(), PressConfig::default());

        assert!(init(&path, false, &mut Vec::new()).is_err());
        init(&path, true, &mut Vec::new()).unwrap();
    }
}
