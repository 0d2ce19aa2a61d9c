//! Placeholder substitution for installer and release notes URLs.
//!
//! Templates use `{name}` placeholders. `{version}` and `{versionShort}` are
//! always available; every metadata value captured during discovery (named
//! regex groups, release data) is available under its own name. `{{` and `}}`
//! produce literal braces.

use std::collections::BTreeMap;

use thiserror::Error;
use wingetup_schema::{Arch, CheckverConfig, UrlTemplate, version};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' in '{template}'")]
    Unknown { name: String, template: String },

    #[error("unbalanced braces in '{0}'")]
    Unbalanced(String),

    #[error("no installerUrlTemplate or installerUrlPattern configured")]
    Missing,
}

/// Substitute `{name}` placeholders from `vars`.
///
/// # Errors
///
/// Returns an error for placeholders missing from `vars` and for unbalanced
/// braces.
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(TemplateError::Unbalanced(template.to_string()));
                        }
                        Some(ch) => name.push(ch),
                    }
                }
                let value = vars.get(&name).ok_or_else(|| TemplateError::Unknown {
                    name: name.clone(),
                    template: template.to_string(),
                })?;
                out.push_str(value);
            }
            '}' => return Err(TemplateError::Unbalanced(template.to_string())),
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Variables available to installer URL templates.
///
/// Metadata wins when it shadows `version` or `versionShort`.
pub fn installer_vars(
    version: &str,
    metadata: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::from([
        ("version".to_string(), version.to_string()),
        ("versionShort".to_string(), version::short(version).to_string()),
    ]);
    vars.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    vars
}

/// Rendered installer URL(s) for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerUrls {
    /// One installer for every architecture
    Single(String),
    /// One installer per architecture
    PerArch(BTreeMap<Arch, String>),
}

impl InstallerUrls {
    /// The URL reported as `installerUrl` (first architecture for multi-arch).
    pub fn primary(&self) -> &str {
        match self {
            Self::Single(url) => url,
            Self::PerArch(map) => map.values().next().map_or("", String::as_str),
        }
    }

    /// All URLs, keyed by architecture when known.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (Option<Arch>, &str)> + '_> {
        match self {
            Self::Single(url) => Box::new(std::iter::once((None, url.as_str()))),
            Self::PerArch(map) => Box::new(map.iter().map(|(a, u)| (Some(*a), u.as_str()))),
        }
    }

    pub fn per_arch(&self) -> Option<&BTreeMap<Arch, String>> {
        match self {
            Self::Single(_) => None,
            Self::PerArch(map) => Some(map),
        }
    }
}

/// Build installer URLs from `installerUrlTemplate`, falling back to the
/// legacy `installerUrlPattern` (which only knows `{version}`).
///
/// # Errors
///
/// Returns an error when neither field is configured or a template
/// references an unknown placeholder.
pub fn installer_urls(
    config: &CheckverConfig,
    version: &str,
    metadata: &BTreeMap<String, String>,
) -> Result<InstallerUrls, TemplateError> {
    let vars = installer_vars(version, metadata);

    match (&config.installer_url_template, &config.installer_url_pattern) {
        (Some(UrlTemplate::Single(t)), _) => Ok(InstallerUrls::Single(render(t, &vars)?)),
        (Some(UrlTemplate::PerArch(map)), _) => {
            let mut urls = BTreeMap::new();
            for (arch, t) in map {
                urls.insert(*arch, render(t, &vars)?);
            }
            Ok(InstallerUrls::PerArch(urls))
        }
        (None, Some(pattern)) => {
            let vars = BTreeMap::from([("version".to_string(), version.to_string())]);
            Ok(InstallerUrls::Single(render(pattern, &vars)?))
        }
        (None, None) => Err(TemplateError::Missing),
    }
}

/// Release notes and their URL for a release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub notes: Option<String>,
    pub url: Option<String>,
}

impl ReleaseInfo {
    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.url.is_none()
    }
}

/// Resolve release notes: discovered metadata first, static config second.
///
/// A notes URL containing `{` is rendered with the installer variables.
///
/// # Errors
///
/// Returns an error if the notes URL references an unknown placeholder.
pub fn release_info(
    config: &CheckverConfig,
    version: &str,
    metadata: &BTreeMap<String, String>,
) -> Result<ReleaseInfo, TemplateError> {
    let non_empty = |v: Option<&String>| v.filter(|s| !s.is_empty()).cloned();

    let notes = non_empty(metadata.get("releasenotes")).or_else(|| non_empty(config.release_notes.as_ref()));
    let mut url =
        non_empty(metadata.get("releasenotesurl")).or_else(|| non_empty(config.release_notes_url.as_ref()));

    if let Some(u) = url.as_deref().filter(|u| u.contains('{')) {
        url = Some(render(u, &installer_vars(version, metadata))?);
    }

    Ok(ReleaseInfo { notes, url })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn config(yaml: &str) -> CheckverConfig {
        CheckverConfig::parse(yaml, None).unwrap()
    }

    #[test]
    fn renders_version_and_metadata() {
        let vars = installer_vars("2.4.4.0", &meta(&[("build", "1234")]));
        assert_eq!(
            render("https://x/{versionShort}/app-{version}-{build}.msi", &vars).unwrap(),
            "https://x/2.4.4/app-2.4.4.0-1234.msi"
        );
    }

    #[test]
    fn escapes_and_errors() {
        let vars = installer_vars("1.0", &BTreeMap::new());
        assert_eq!(render("{{literal}} {version}", &vars).unwrap(), "{literal} 1.0");
        assert!(matches!(
            render("https://x/{missing}", &vars),
            Err(TemplateError::Unknown { name, .. }) if name == "missing"
        ));
        assert!(matches!(
            render("https://x/{version", &vars),
            Err(TemplateError::Unbalanced(_))
        ));
        assert!(matches!(
            render("https://x/}", &vars),
            Err(TemplateError::Unbalanced(_))
        ));
    }

    #[test]
    fn metadata_overrides_builtins() {
        let vars = installer_vars("7.3.0", &meta(&[("version", "7.03.0")]));
        assert_eq!(vars["version"], "7.03.0");
        assert_eq!(vars["versionShort"], "7.3");
    }

    #[test]
    fn builds_per_arch_urls() {
        let cfg = config(
            r"
packageIdentifier: UniKey.UniKey
installerUrlTemplate:
  x86: https://unikey.org/unikey{rcversion}-{versionShort}-win32.zip
  x64: https://unikey.org/unikey{rcversion}-{versionShort}-win64.zip
",
        );
        let urls = installer_urls(&cfg, "4.6.250531", &meta(&[("rcversion", "46RC2")])).unwrap();
        assert_eq!(urls.primary(), "https://unikey.org/unikey46RC2-4.6.250531-win64.zip");
        let map = urls.per_arch().unwrap();
        assert_eq!(map[&Arch::X86], "https://unikey.org/unikey46RC2-4.6.250531-win32.zip");
        assert_eq!(urls.iter().count(), 2);
    }

    #[test]
    fn legacy_pattern_and_missing_template() {
        let cfg = config(
            "packageIdentifier: VNGCorp.Zalo\ninstallerUrlPattern: https://z/ZaloSetup-{version}.exe\n",
        );
        assert_eq!(
            installer_urls(&cfg, "25.8.3", &BTreeMap::new()).unwrap(),
            InstallerUrls::Single("https://z/ZaloSetup-25.8.3.exe".to_string())
        );

        let cfg = config("packageIdentifier: A.B\n");
        assert_eq!(
            installer_urls(&cfg, "1.0", &BTreeMap::new()),
            Err(TemplateError::Missing)
        );
    }

    #[test]
    fn release_info_prefers_metadata() {
        let cfg = config(
            r"
packageIdentifier: A.B
releaseNotes: static notes
releaseNotesUrl: https://example.com/changelog/{versionShort}
",
        );
        let info = release_info(&cfg, "1.2.0", &BTreeMap::new()).unwrap();
        assert_eq!(info.notes.as_deref(), Some("static notes"));
        assert_eq!(info.url.as_deref(), Some("https://example.com/changelog/1.2"));

        let discovered = meta(&[
            ("releasenotes", "from github"),
            ("releasenotesurl", "https://github.com/a/b/releases/tag/v1.2.0"),
        ]);
        let info = release_info(&cfg, "1.2.0", &discovered).unwrap();
        assert_eq!(info.notes.as_deref(), Some("from github"));
        assert_eq!(
            info.url.as_deref(),
            Some("https://github.com/a/b/releases/tag/v1.2.0")
        );

        let bare = config("packageIdentifier: A.B\n");
        assert!(release_info(&bare, "1.0", &BTreeMap::new()).unwrap().is_empty());
    }
}
