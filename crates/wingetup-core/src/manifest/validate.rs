use std::collections::BTreeMap;

use super::ManifestError;

/// Check that `content` parses as YAML.
///
/// Returns warnings for top-level keys that appear more than once; the
/// parser would reject those too, so they are reported first with a
/// clearer message.
///
/// # Errors
///
/// Returns the parser error when the document is not valid YAML.
pub fn validate(content: &str) -> Result<Vec<String>, ManifestError> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for line in content.lines() {
        if line.starts_with([' ', '\t', '-', '#']) {
            continue;
        }
        if let Some((key, _)) = line.split_once(':') {
            *counts.entry(key.trim()).or_default() += 1;
        }
    }

    let warnings: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(key, n)| format!("duplicate field '{key}' ({n} occurrences)"))
        .collect();

    if warnings.is_empty() {
        serde_yaml::from_str::<serde_yaml::Value>(content)?;
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_manifest() {
        let content = "PackageIdentifier: A.B\nInstallers:\n- Architecture: x64\n  InstallerUrl: https://x\nManifestType: installer\n";
        assert!(validate(content).unwrap().is_empty());
    }

    #[test]
    fn reports_duplicate_top_level_keys() {
        let content = "PackageVersion: 1.0\nPackageVersion: 1.1\n";
        let warnings = validate(content).unwrap();
        assert_eq!(warnings, vec!["duplicate field 'PackageVersion' (2 occurrences)"]);
    }

    #[test]
    fn rejects_invalid_yaml() {
        assert!(matches!(
            validate("Installers:\n- Architecture: [x64\n"),
            Err(ManifestError::Yaml(_))
        ));
    }
}
