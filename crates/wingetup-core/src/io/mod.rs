//! IO modules - side effects (network, filesystem, installer inspection)

pub mod download;
pub mod hash;
pub mod msi;
pub mod msix;

/// Installer format, guessed from the download URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerKind {
    Msi,
    Msix,
    Zip,
    Exe,
}

impl InstallerKind {
    pub fn from_url(url: &str) -> Self {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_ascii_lowercase();

        if path.ends_with(".msi") {
            Self::Msi
        } else if path.ends_with(".msix")
            || path.ends_with(".msixbundle")
            || path.ends_with(".appx")
            || path.ends_with(".appxbundle")
        {
            Self::Msix
        } else if path.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Exe
        }
    }

    /// Suffix for the temporary download file.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Msi => ".msi",
            Self::Msix => ".msix",
            Self::Zip => ".zip",
            Self::Exe => ".exe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kind_from_url() {
        assert_eq!(InstallerKind::from_url("https://x/App-1.0-x64.MSI"), InstallerKind::Msi);
        assert_eq!(InstallerKind::from_url("https://x/App.msixbundle"), InstallerKind::Msix);
        assert_eq!(InstallerKind::from_url("https://x/app.zip?dl=1"), InstallerKind::Zip);
        assert_eq!(InstallerKind::from_url("https://x/download"), InstallerKind::Exe);
        assert_eq!(InstallerKind::Msix.suffix(), ".msix");
    }
}
