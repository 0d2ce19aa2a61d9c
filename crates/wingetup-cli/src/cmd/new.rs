//! New command

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use wingetup_schema::package_id::CHECKVER_SUFFIX;
use wingetup_schema::{CheckverConfig, PackageId};

/// Prompt for a legacy package config on stdin and save it to `dir`.
pub fn new(dir: &Path) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let Some(config) = prompt_config(&mut input, &mut out)? else {
        println!("  not saved");
        return Ok(());
    };

    let path = save(&config, dir)?;
    println!("  saved {}", path.display());
    println!("  next: wingetup check {}", path.display());
    Ok(())
}

struct Prompter<'a, R, W> {
    input: &'a mut R,
    out: &'a mut W,
}

impl<R: BufRead, W: Write> Prompter<'_, R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.out, "{question}: ")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed");
        }
        Ok(line.trim().to_string())
    }

    fn ask_or(&mut self, question: &str, default: &str) -> Result<String> {
        let answer = self.ask(&format!("{question} [{default}]"))?;
        Ok(if answer.is_empty() { default.to_string() } else { answer })
    }

    fn ask_optional(&mut self, question: &str) -> Result<Option<String>> {
        Ok(Some(self.ask(question)?).filter(|a| !a.is_empty()))
    }
}

/// Ask for every field of a web-checked package config.
///
/// Returns `None` when the preview is not confirmed.
pub fn prompt_config<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Option<CheckverConfig>> {
    let mut p = Prompter { input, out };

    let publisher = p.ask("Publisher (e.g. Contoso)")?;
    let app = p.ask("Application (e.g. App)")?;
    let id = PackageId::new(&format!("{publisher}.{app}"))
        .with_context(|| format!("invalid package identifier {publisher}.{app}"))?;
    writeln!(p.out, "Package identifier: {id}")?;

    let check_url = p.ask("Check URL (page that shows the version)")?;
    let pattern = p.ask("Installer URL pattern (use {version})")?;
    let architecture = p.ask_or("Architecture (x64, x86, arm64)", "x64")?;
    let installer_type = p.ask_or("Installer type (msi, exe, msix, appx)", "msi")?;
    let product_code = p.ask_or("Product code", "{PRODUCTCODE}")?;
    let package_name = p.ask_or("Display name", &app)?;
    let short_description = p.ask("Short description")?;
    let description = p.ask_optional("Description")?;
    let license = p.ask_or("License", "Proprietary")?;
    let release_notes_url = p.ask_optional("Release notes URL")?;
    let tags = p
        .ask("Tags (comma-separated)")?
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect();

    let config = CheckverConfig {
        package_identifier: Some(id),
        check_url: Some(check_url),
        installer_url_pattern: Some(pattern),
        architecture: Some(architecture),
        installer_type: Some(installer_type),
        product_code: Some(product_code),
        publisher: Some(publisher),
        package_name: Some(package_name),
        license: Some(license),
        short_description: Some(short_description),
        description,
        release_notes_url,
        tags,
        ..CheckverConfig::default()
    };

    writeln!(p.out, "\n{}", serde_yaml::to_string(&config)?)?;
    let confirm = p.ask("Save this config? [Y/n]")?.to_lowercase();
    Ok(matches!(confirm.as_str(), "" | "y" | "yes").then_some(config))
}

/// Write `config` to `<dir>/<PackageId>.checkver.yaml`.
pub fn save(config: &CheckverConfig, dir: &Path) -> Result<PathBuf> {
    let id = config.id()?;
    let path = dir.join(format!("{id}{CHECKVER_SUFFIX}"));
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(&path, serde_yaml::to_string(config)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
