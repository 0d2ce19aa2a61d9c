use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};
use wingetup_schema::version;

use super::{Discovered, DiscoveryError, VersionSource};
use crate::process::{CommandError, Tool};

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a PowerShell script and extracts the version from its output.
#[derive(Debug)]
pub struct ScriptSource {
    script: String,
    regex: Regex,
    replace: Option<String>,
    shell: String,
}

impl ScriptSource {
    /// # Errors
    ///
    /// Returns an error if `regex` does not compile.
    pub fn new(script: String, regex: &str, replace: Option<String>) -> Result<Self, DiscoveryError> {
        Ok(Self {
            script,
            regex: Regex::new(regex)?,
            replace,
            shell: "pwsh".to_string(),
        })
    }

    /// Use a different interpreter (anything accepting `-Command <script>`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[async_trait]
impl VersionSource for ScriptSource {
    fn kind(&self) -> &'static str {
        "script"
    }

    async fn discover(&self) -> Result<Option<Discovered>, DiscoveryError> {
        let tool = Tool::new(&self.shell).timeout(SCRIPT_TIMEOUT);
        let output = match tool.execute(&["-Command", &self.script]).await {
            Ok(out) => out,
            Err(e @ CommandError::NotFound(_)) => return Err(e.into()),
            Err(e) => {
                warn!("script failed: {e}");
                return Ok(None);
            }
        };

        let output = output.trim();
        if output.is_empty() {
            warn!("script returned no output");
            return Ok(None);
        }
        debug!("script output: {output}");

        let found = extract_version(output, &self.regex, self.replace.as_deref());
        if found.is_none() {
            warn!("regex '{}' did not match script output", self.regex);
        }
        Ok(found)
    }
}

/// Apply `regex` to script output.
///
/// With `replace`, every `${N}` token becomes capture group `N`; otherwise
/// group 1 is the version. The result is normalized, and the raw text is kept
/// as `versionOriginal` when normalizing changed it. Named groups become
/// metadata.
pub fn extract_version(output: &str, regex: &Regex, replace: Option<&str>) -> Option<Discovered> {
    let caps = regex.captures(output)?;

    let raw = match replace {
        Some(template) => {
            let mut v = template.to_string();
            for i in 1..caps.len() {
                let group = caps.get(i).map_or("", |m| m.as_str());
                v = v.replace(&format!("${{{i}}}"), group);
            }
            v
        }
        None => caps.get(1).or_else(|| caps.get(0))?.as_str().to_string(),
    };

    let normalized = version::normalize(&raw);
    let mut found = Discovered::new(normalized.clone());

    for name in regex.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            found.metadata.insert(name.to_string(), m.as_str().to_string());
        }
    }
    if normalized != raw {
        info!("normalized version {raw} -> {normalized}");
        found.metadata.insert("versionOriginal".to_string(), raw);
    }

    Some(found)
}
