use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};
use wingetup_schema::{Arch, InstallerSha256};

use super::{indent_of, line_arch};

/// Architectures with an installer entry in the manifest.
pub fn manifest_architectures(content: &str) -> BTreeSet<Arch> {
    content.lines().filter_map(line_arch).collect()
}

/// Append installer entries for architectures that have a URL and digest
/// but no block yet.
///
/// New entries are inserted before the last `ManifestType:` line and copy
/// the nested-installer settings of the last existing entry. A manifest
/// with no installer entry is returned unchanged.
pub fn add_missing_architectures(
    content: &str,
    hashes: &BTreeMap<Arch, InstallerSha256>,
    urls: &BTreeMap<Arch, String>,
) -> String {
    let existing = manifest_architectures(content);
    let missing: Vec<(Arch, &String, &InstallerSha256)> = hashes
        .iter()
        .filter(|(arch, _)| !existing.contains(*arch))
        .filter_map(|(arch, hash)| urls.get(arch).map(|url| (*arch, url, hash)))
        .collect();

    if missing.is_empty() {
        return content.to_string();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let Some(template) = last_installer_block(&lines) else {
        warn!("no installer entry to copy; not adding {} architectures", missing.len());
        return content.to_string();
    };
    let nested = nested_settings(template);

    let mut block = Vec::new();
    for (arch, url, hash) in &missing {
        info!("adding {arch} installer entry");
        block.push(format!("- Architecture: {arch}"));
        block.extend(nested.iter().map(ToString::to_string));
        block.push(format!("  InstallerUrl: {url}"));
        block.push(format!("  InstallerSha256: {hash}"));
    }

    let insert_at = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("ManifestType:"))
        .unwrap_or_else(|| {
            // Before the final newline.
            if lines.last().is_some_and(|l| l.is_empty()) {
                lines.len() - 1
            } else {
                lines.len()
            }
        });

    let mut out: Vec<String> = lines[..insert_at].iter().map(ToString::to_string).collect();
    out.extend(block);
    out.extend(lines[insert_at..].iter().map(ToString::to_string));
    out.join("\n")
}

/// Lines of the last `- Architecture:` entry, including its header.
fn last_installer_block<'a>(lines: &'a [&'a str]) -> Option<&'a [&'a str]> {
    let start = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("- Architecture:"))?;
    let header_indent = indent_of(lines[start]);
    let end = lines[start + 1..]
        .iter()
        .position(|l| {
            let t = l.trim_start();
            !t.is_empty() && (indent_of(l) <= header_indent)
        })
        .map_or(lines.len(), |p| start + 1 + p);
    Some(&lines[start..end])
}

/// `NestedInstallerType` and the indented lines that follow it, stopping at
/// the entry's own URL or digest.
fn nested_settings<'a>(block: &[&'a str]) -> Vec<&'a str> {
    let Some(start) = block
        .iter()
        .position(|l| l.trim_start().starts_with("NestedInstallerType:"))
    else {
        return Vec::new();
    };

    block[start..]
        .iter()
        .take_while(|l| {
            let t = l.trim_start();
            !t.starts_with("InstallerUrl:") && !t.starts_with("InstallerSha256:")
        })
        .filter(|l| l.starts_with("  "))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha(c: char) -> InstallerSha256 {
        InstallerSha256::new(&c.to_string().repeat(64)).unwrap()
    }

    const TWO_ARCH: &str = "\
PackageIdentifier: UniKey.UniKey
PackageVersion: 4.6.250531
Installers:
- Architecture: x64
  InstallerUrl: https://unikey.org/win64.zip
  InstallerSha256: 1111111111111111111111111111111111111111111111111111111111111111
- Architecture: x86
  NestedInstallerType: portable
  NestedInstallerFiles:
  - RelativeFilePath: UniKeyNT.exe
  InstallerUrl: https://unikey.org/win32.zip
  InstallerSha256: 2222222222222222222222222222222222222222222222222222222222222222
ManifestType: installer
ManifestVersion: 1.6.0
";

    #[test]
    fn lists_architectures() {
        let archs: Vec<Arch> = manifest_architectures(TWO_ARCH).into_iter().collect();
        assert_eq!(archs, vec![Arch::X64, Arch::X86]);
    }

    #[test]
    fn appends_missing_arch_with_nested_settings() {
        let hashes = BTreeMap::from([(Arch::X64, sha('A')), (Arch::Arm64, sha('C'))]);
        let urls = BTreeMap::from([
            (Arch::X64, "https://unikey.org/win64.zip".to_string()),
            (Arch::Arm64, "https://unikey.org/arm64.zip".to_string()),
        ]);

        let out = add_missing_architectures(TWO_ARCH, &hashes, &urls);
        let expected_block = format!(
            "\
- Architecture: arm64
  NestedInstallerType: portable
  NestedInstallerFiles:
  - RelativeFilePath: UniKeyNT.exe
  InstallerUrl: https://unikey.org/arm64.zip
  InstallerSha256: {}
ManifestType: installer
",
            "C".repeat(64)
        );
        assert!(out.contains(&expected_block), "{out}");
        assert_eq!(out.matches("- Architecture: x64").count(), 1);
    }

    #[test]
    fn missing_url_or_no_entries_is_unchanged() {
        let hashes = BTreeMap::from([(Arch::Arm64, sha('C'))]);
        assert_eq!(add_missing_architectures(TWO_ARCH, &hashes, &BTreeMap::new()), TWO_ARCH);

        let urls = BTreeMap::from([(Arch::Arm64, "https://x/arm64.zip".to_string())]);
        let bare = "PackageIdentifier: A.B\nManifestType: installer\n";
        assert_eq!(add_missing_architectures(bare, &hashes, &urls), bare);
    }

    #[test]
    fn appends_at_end_without_manifest_type() {
        let content = "Installers:\n- Architecture: x64\n  InstallerUrl: https://x/64.msi\n";
        let hashes = BTreeMap::from([(Arch::X86, sha('B'))]);
        let urls = BTreeMap::from([(Arch::X86, "https://x/86.msi".to_string())]);
        let out = add_missing_architectures(content, &hashes, &urls);
        assert!(out.ends_with(&format!(
            "- Architecture: x86\n  InstallerUrl: https://x/86.msi\n  InstallerSha256: {}\n",
            "B".repeat(64)
        )));
    }
}
