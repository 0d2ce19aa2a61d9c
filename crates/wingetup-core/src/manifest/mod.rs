//! Text-level editing of WinGet manifests.
//!
//! Upstream manifests are edited line by line rather than parsed and
//! re-serialized, so comments, key order and quoting survive untouched
//! except where a value is deliberately rewritten.

mod arch;
mod dedupe;
pub mod generate;
mod validate;

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use thiserror::Error;
use tracing::{debug, info, warn};
use wingetup_schema::{Arch, CheckverError, InstallerSha256};

pub use arch::{add_missing_architectures, manifest_architectures};
pub use dedupe::{collapse_blank_lines, remove_duplicate_fields};
pub use validate::validate;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] CheckverError),
}

static ARCH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s*Architecture:\s*(\w+)").expect("static regex"));
static PACKAGE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PackageVersion:\s*([\d.]+)").expect("static regex"));
static SINGLE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"InstallerUrl:\s*https?://\S+").expect("static regex"));
static SINGLE_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"InstallerSha256:\s*[A-Fa-f0-9]+").expect("static regex"));
static SIGNATURE_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SignatureSha256:\s*[A-Fa-f0-9]+").expect("static regex"));

/// Architecture named by a `- Architecture: <arch>` line.
pub(crate) fn line_arch(line: &str) -> Option<Arch> {
    ARCH_LINE
        .captures(line)
        .and_then(|c| c[1].parse::<Arch>().ok())
}

pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Is `line` the key `field` (optionally as a list item)?
fn is_field(line: &str, field: &str) -> bool {
    let t = line.trim_start();
    let t = t.strip_prefix("- ").unwrap_or(t);
    t.strip_prefix(field).is_some_and(|rest| rest.starts_with(':'))
}

/// MSI product codes found while hashing installers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCodes {
    /// Code for single-installer packages; used at the top level and in
    /// `AppsAndFeaturesEntries`.
    pub default: Option<String>,
    /// Per-architecture codes for multi-arch packages.
    pub by_arch: BTreeMap<Arch, String>,
}

impl ProductCodes {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_arch.is_empty()
    }

    fn for_arch(&self, arch: Option<Arch>) -> Option<&str> {
        arch.and_then(|a| self.by_arch.get(&a))
            .or(self.default.as_ref())
            .map(String::as_str)
    }
}

/// Values to write into a manifest copied from the previous version.
#[derive(Debug, Clone, Default)]
pub struct ManifestUpdate {
    /// New `PackageVersion`.
    pub version: String,
    /// Single-installer URL.
    pub installer_url: Option<String>,
    /// Single-installer digest.
    pub installer_sha256: Option<InstallerSha256>,
    /// Per-architecture URLs; takes precedence over `installer_url`.
    pub arch_urls: BTreeMap<Arch, String>,
    /// Per-architecture digests; takes precedence over `installer_sha256`.
    pub arch_hashes: BTreeMap<Arch, InstallerSha256>,
    pub signature_sha256: Option<InstallerSha256>,
    pub product_codes: ProductCodes,
    pub release_notes: Option<String>,
    pub release_notes_url: Option<String>,
    /// `YYYY-MM-DD` written to existing `ReleaseDate` fields.
    pub release_date: String,
}

impl ManifestUpdate {
    /// An update to `version` dated today.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }
}

/// Apply `update` to the text of one manifest file.
///
/// Fields are only ever rewritten, never introduced: a manifest without a
/// `ReleaseNotes` key will not gain one.
pub fn update_content(content: &str, update: &ManifestUpdate) -> String {
    let mut content = replace_version(content, &update.version);

    if !update.arch_urls.is_empty() {
        content = rewrite_per_arch(&content, "InstallerUrl", &update.arch_urls);
    } else if let Some(url) = &update.installer_url {
        content = SINGLE_URL
            .replace_all(&content, NoExpand(&format!("InstallerUrl: {url}")))
            .into_owned();
    }

    if !update.arch_hashes.is_empty() {
        let hashes = update
            .arch_hashes
            .iter()
            .map(|(a, h)| (*a, h.to_string()))
            .collect();
        content = rewrite_per_arch(&content, "InstallerSha256", &hashes);
    } else if let Some(sha) = &update.installer_sha256 {
        content = SINGLE_SHA
            .replace_all(&content, NoExpand(&format!("InstallerSha256: {sha}")))
            .into_owned();
    }

    if let Some(sig) = &update.signature_sha256 {
        content = SIGNATURE_SHA
            .replace_all(&content, NoExpand(&format!("SignatureSha256: {sig}")))
            .into_owned();
    }

    if !update.product_codes.is_empty() {
        content = rewrite_product_codes(&content, &update.product_codes);
    }

    if !update.release_date.is_empty() {
        content = rewrite_first(&content, "ReleaseDate", &update.release_date);
    }

    if let Some(notes) = &update.release_notes {
        content = rewrite_release_notes(&content, notes);
    }

    if let Some(url) = &update.release_notes_url {
        content = rewrite_first(&content, "ReleaseNotesUrl", url);
    }

    remove_duplicate_fields(&content)
}

/// Replace every occurrence of the old `PackageVersion`, plus the short
/// forms when both versions end in `.0`.
fn replace_version(content: &str, version: &str) -> String {
    let Some(old) = PACKAGE_VERSION
        .captures(content)
        .map(|c| c[1].to_string())
    else {
        return content.to_string();
    };
    if old == version {
        return content.to_string();
    }

    let mut forms = vec![(old.clone(), version.to_string())];
    if let (Some(old_short), Some(new_short)) = (old.strip_suffix(".0"), version.strip_suffix(".0")) {
        forms.push((old_short.to_string(), new_short.to_string()));
    }

    // One pass over the original text, longest form first, so replaced
    // text is never matched again.
    let pattern = forms
        .iter()
        .map(|(o, _)| regex::escape(o))
        .collect::<Vec<_>>()
        .join("|");
    let Ok(re) = Regex::new(&pattern) else {
        return content.to_string();
    };

    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    let mut count = 0;
    for m in re.find_iter(content) {
        let digit_before = content[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit());
        let mut after = content[m.end()..].chars();
        let digit_after = match after.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => after.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        };
        if digit_before || digit_after {
            continue;
        }

        let replacement = forms
            .iter()
            .find(|(o, _)| o == m.as_str())
            .map_or(version, |(_, n)| n.as_str());
        out.push_str(&content[last..m.start()]);
        out.push_str(replacement);
        last = m.end();
        count += 1;
    }
    out.push_str(&content[last..]);

    info!("replaced {count} occurrences of {old} with {version}");
    out
}

/// Rewrite the first `field` inside each `- Architecture` block listed in
/// `values`; later copies of the field in the same block are dropped.
fn rewrite_per_arch(content: &str, field: &str, values: &BTreeMap<Arch, String>) -> String {
    let mut out = Vec::new();
    let mut current: Option<Arch> = None;
    let mut updated = HashSet::new();
    let needle = format!("{field}:");

    for line in content.split('\n') {
        if ARCH_LINE.is_match(line) {
            current = line_arch(line);
        }

        if line.contains(&needle) {
            if let Some((arch, value)) = current.and_then(|a| values.get(&a).map(|v| (a, v))) {
                if updated.insert(arch) {
                    debug!("updated {arch} {field}");
                    out.push(format!("{}{field}: {value}", " ".repeat(indent_of(line))));
                } else {
                    warn!("removed duplicate {field} for {arch}");
                }
                continue;
            }
        }
        out.push(line.to_string());
    }

    collapse_blank_lines(&out.join("\n"))
}

/// Rewrite `ProductCode` values by context: per architecture inside
/// `Installers`, in `AppsAndFeaturesEntries`, and at the top level.
fn rewrite_product_codes(content: &str, codes: &ProductCodes) -> String {
    let mut out = Vec::new();
    let mut in_installers = false;
    let mut in_apps = false;
    let mut current: Option<Arch> = None;
    let mut updated: HashSet<String> = HashSet::new();

    for line in content.split('\n') {
        let trimmed = line.trim();

        if trimmed == "Installers:" && indent_of(line) == 0 {
            in_installers = true;
            in_apps = false;
            current = None;
        } else if trimmed.starts_with("AppsAndFeaturesEntries:") {
            in_apps = true;
        } else if in_installers && ARCH_LINE.is_match(line) {
            current = line_arch(line);
            in_apps = false;
        } else if !trimmed.is_empty()
            && !trimmed.starts_with('#')
            && indent_of(line) == 0
            && !trimmed.starts_with('-')
        {
            in_installers = false;
            in_apps = false;
            current = None;
        }

        if is_field(line, "ProductCode") {
            let (context, code) = if in_apps {
                (
                    format!("apps:{current:?}"),
                    codes.for_arch(current),
                )
            } else if in_installers {
                (format!("installer:{current:?}"), codes.for_arch(current))
            } else {
                ("top".to_string(), codes.default.as_deref())
            };

            if let Some(code) = code {
                if updated.insert(context.clone()) {
                    let dash = if trimmed.starts_with("- ") { "- " } else { "" };
                    out.push(format!(
                        "{}{dash}ProductCode: '{code}'",
                        " ".repeat(indent_of(line))
                    ));
                    debug!("updated ProductCode ({context})");
                } else {
                    warn!("removed duplicate ProductCode ({context})");
                }
                continue;
            }
        }

        out.push(line.to_string());
    }

    out.join("\n")
}

/// Rewrite the first `field: ...` line to `field: value` and drop later ones.
/// Content without the field is returned unchanged.
fn rewrite_first(content: &str, field: &str, value: &str) -> String {
    let mut seen = false;
    let mut out = Vec::new();

    for line in content.split('\n') {
        if is_field(line, field) {
            if seen {
                warn!("removed duplicate {field}");
                continue;
            }
            seen = true;
            let indent = &line[..indent_of(line)];
            let dash = if line.trim_start().starts_with("- ") { "- " } else { "" };
            out.push(format!("{indent}{dash}{field}: {value}"));
            continue;
        }
        out.push(line.to_string());
    }

    if seen {
        debug!("updated {field}");
    }
    out.join("\n")
}

/// Replace the existing `ReleaseNotes` value (single line or block scalar)
/// with a `|-` block holding `notes`.
fn rewrite_release_notes(content: &str, notes: &str) -> String {
    let notes = notes.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = content.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut seen = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if !is_field(line, "ReleaseNotes") {
            out.push(line.to_string());
            continue;
        }

        let indent = indent_of(line);
        let value = line.split_once(':').map_or("", |(_, v)| v.trim());
        if value.starts_with('|') || value.starts_with('>') {
            // Skip the old block body.
            while i < lines.len() && (lines[i].trim().is_empty() || indent_of(lines[i]) > indent) {
                if lines[i].trim().is_empty()
                    && lines[i + 1..]
                        .iter()
                        .find(|l| !l.trim().is_empty())
                        .is_none_or(|l| indent_of(l) <= indent)
                {
                    break;
                }
                i += 1;
            }
        }

        if seen {
            warn!("removed duplicate ReleaseNotes");
            continue;
        }
        seen = true;

        let pad = " ".repeat(indent);
        let body_pad = " ".repeat(indent + 2);
        out.push(format!("{pad}ReleaseNotes: |-"));
        for note_line in notes.trim_end().split('\n') {
            if note_line.trim().is_empty() {
                out.push(String::new());
            } else {
                out.push(format!("{body_pad}{note_line}"));
            }
        }
    }

    if seen {
        info!("updated ReleaseNotes");
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA_A: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const SHA_B: &str = "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";

    fn sha(s: &str) -> InstallerSha256 {
        InstallerSha256::new(s).unwrap()
    }

    fn update(version: &str) -> ManifestUpdate {
        ManifestUpdate {
            version: version.to_string(),
            release_date: "2025-10-19".to_string(),
            ..ManifestUpdate::default()
        }
    }

    const MULTI: &str = "\
# Created with WinGet Updater
PackageIdentifier: UniKey.UniKey
PackageVersion: 4.6.230919
InstallerType: zip
NestedInstallerType: portable
Installers:
- Architecture: x64
  InstallerUrl: https://unikey.org/unikey46RC2-230919-win64.zip
  InstallerSha256: 1111111111111111111111111111111111111111111111111111111111111111
- Architecture: x86
  InstallerUrl: https://unikey.org/unikey46RC2-230919-win32.zip
  InstallerSha256: 2222222222222222222222222222222222222222222222222222222222222222
  InstallerSha256: 2222222222222222222222222222222222222222222222222222222222222222
ManifestType: installer
ManifestVersion: 1.6.0
";

    #[test]
    fn replaces_version_everywhere() {
        let content = "PackageVersion: 1.0.0\nInstallerUrl: https://x/1.0.0/app-1.0.0.msi\nManifestVersion: 1.6.0\n";
        let out = update_content(content, &update("1.1.0"));
        assert_eq!(
            out,
            "PackageVersion: 1.1.0\nInstallerUrl: https://x/1.1.0/app-1.1.0.msi\nManifestVersion: 1.6.0\n"
        );

        let out = update_content(MULTI, &update("4.6.250531"));
        assert!(out.contains("PackageVersion: 4.6.250531"));
        assert!(!out.contains("4.6.230919"));
    }

    #[test]
    fn version_replacement_respects_digit_boundaries() {
        let content = "PackageVersion: 1.2\nTags:\n- v11.2\n- 1.2.3\n";
        let out = update_content(content, &update("1.3"));
        assert_eq!(out, "PackageVersion: 1.3\nTags:\n- v11.2\n- 1.2.3\n");
    }

    #[test]
    fn short_versions_follow_when_both_end_in_zero() {
        let content = "PackageVersion: 2.3.12.0\nInstallerUrl: https://x/v2.3.12/app.msi\n";
        let out = update_content(content, &update("2.4.4.0"));
        assert!(out.contains("PackageVersion: 2.4.4.0"));
        assert!(out.contains("https://x/v2.4.4/app.msi"));
    }

    #[test]
    fn rewrites_per_arch_urls_and_hashes() {
        let mut u = update("4.6.250531");
        u.arch_urls = BTreeMap::from([
            (Arch::X64, "https://new/win64.zip".to_string()),
            (Arch::X86, "https://new/win32.zip".to_string()),
        ]);
        u.arch_hashes = BTreeMap::from([(Arch::X64, sha(SHA_A)), (Arch::X86, sha(SHA_B))]);

        let out = update_content(MULTI, &u);
        assert!(out.contains("- Architecture: x64\n  InstallerUrl: https://new/win64.zip\n  InstallerSha256: AAAA"));
        assert!(out.contains("- Architecture: x86\n  InstallerUrl: https://new/win32.zip\n  InstallerSha256: BBBB"));
        assert_eq!(out.matches("InstallerSha256:").count(), 2);
        assert!(out.starts_with("# Created with WinGet Updater\n"));
    }

    #[test]
    fn rewrites_single_installer_fields() {
        let content = "\
PackageIdentifier: Contoso.App
PackageVersion: 1.0.0
Installers:
- Architecture: x64
  InstallerUrl: https://contoso.com/app-1.0.0.msix
  InstallerSha256: abcdef0123
  SignatureSha256: 0123abcdef
ManifestType: installer
";
        let mut u = update("1.1.0");
        u.installer_url = Some("https://contoso.com/download/app.msix".to_string());
        u.installer_sha256 = Some(sha(SHA_A));
        u.signature_sha256 = Some(sha(SHA_B));

        let out = update_content(content, &u);
        assert!(out.contains("  InstallerUrl: https://contoso.com/download/app.msix\n"));
        assert!(out.contains(&format!("  InstallerSha256: {SHA_A}\n")));
        assert!(out.contains(&format!("  SignatureSha256: {SHA_B}\n")));
    }

    #[test]
    fn rewrites_product_codes_by_context() {
        let content = "\
PackageIdentifier: Contoso.App
PackageVersion: 1.0.0
ProductCode: '{OLD-TOP}'
AppsAndFeaturesEntries:
- ProductCode: '{OLD-APPS}'
  UpgradeCode: '{UPGRADE}'
Installers:
- Architecture: x64
  InstallerUrl: https://contoso.com/x64.msi
  ProductCode: '{OLD-X64}'
- Architecture: x86
  InstallerUrl: https://contoso.com/x86.msi
  ProductCode: '{OLD-X86}'
  ProductCode: '{OLD-X86-DUP}'
ManifestType: installer
";
        let mut u = update("1.0.0");
        u.product_codes = ProductCodes {
            default: Some("{NEW-DEFAULT}".to_string()),
            by_arch: BTreeMap::from([(Arch::X86, "{NEW-X86}".to_string())]),
        };

        let out = update_content(content, &u);
        assert!(out.contains("\nProductCode: '{NEW-DEFAULT}'\n"));
        assert!(out.contains("\n- ProductCode: '{NEW-DEFAULT}'\n  UpgradeCode: '{UPGRADE}'"));
        assert!(out.contains("x64.msi\n  ProductCode: '{NEW-DEFAULT}'"));
        assert!(out.contains("x86.msi\n  ProductCode: '{NEW-X86}'\nManifestType"));
        assert!(!out.contains("OLD"));
    }

    #[test]
    fn updates_release_date_only_when_present() {
        let with_date = "PackageVersion: 1.0\nReleaseDate: 2024-01-02\nReleaseDate: 2024-01-03\n";
        let out = update_content(with_date, &update("1.1"));
        assert_eq!(out, "PackageVersion: 1.1\nReleaseDate: 2025-10-19\n");

        let without = "PackageVersion: 1.0\nManifestType: installer\n";
        assert!(!update_content(without, &update("1.1")).contains("ReleaseDate"));
    }

    #[test]
    fn replaces_release_notes_block_and_url() {
        let content = "\
PackageIdentifier: Contoso.App
PackageVersion: 1.0
ReleaseNotes: |-
  Old line one
  Old line two
ReleaseNotesUrl: https://contoso.com/notes/1.0
ManifestType: defaultLocale
";
        let mut u = update("1.1");
        u.release_notes = Some("- Fixed: crash\r\n- Added: dark mode".to_string());
        u.release_notes_url = Some("https://contoso.com/notes/1.1".to_string());

        let out = update_content(content, &u);
        assert_eq!(
            out,
            "\
PackageIdentifier: Contoso.App
PackageVersion: 1.1
ReleaseNotes: |-
  - Fixed: crash
  - Added: dark mode
ReleaseNotesUrl: https://contoso.com/notes/1.1
ManifestType: defaultLocale
"
        );
    }

    #[test]
    fn single_line_release_notes_become_a_block() {
        let content = "PackageVersion: 1.0\nReleaseNotes: old\nManifestType: defaultLocale\n";
        let mut u = update("1.1");
        u.release_notes = Some("Note: first\nNote: second".to_string());

        let out = update_content(content, &u);
        assert!(out.contains("ReleaseNotes: |-\n  Note: first\n  Note: second\nManifestType"));
    }

    #[test]
    fn release_notes_are_not_added_when_absent() {
        let content = "PackageVersion: 1.0\nManifestType: defaultLocale\n";
        let mut u = update("1.1");
        u.release_notes = Some("new".to_string());
        u.release_notes_url = Some("https://x".to_string());

        let out = update_content(content, &u);
        assert!(!out.contains("ReleaseNotes"));
    }

    #[test]
    fn keeps_every_nested_installer_file() {
        let content = "\
PackageVersion: 2.0
InstallerType: zip
Installers:
- Architecture: x64
  NestedInstallerType: portable
  NestedInstallerFiles:
  - RelativeFilePath: app-2.0/a.exe
  - RelativeFilePath: app-2.0/b.exe
  InstallerUrl: https://x/app-2.0.zip
  InstallerSha256: 1111111111111111111111111111111111111111111111111111111111111111
ManifestType: installer
";
        let mut u = update("2.1");
        u.arch_hashes = BTreeMap::from([(Arch::X64, sha(SHA_A))]);

        let out = update_content(content, &u);
        assert!(out.contains("  - RelativeFilePath: app-2.1/a.exe\n  - RelativeFilePath: app-2.1/b.exe\n"));
        assert!(out.contains(&format!("InstallerSha256: {SHA_A}")));
    }
}
