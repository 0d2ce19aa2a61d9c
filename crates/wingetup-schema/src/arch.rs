//! Installer architectures.

/// Installer architecture as spelled in `WinGet` manifests.
///
/// Deserialization goes through [`FromStr`](std::str::FromStr), so configs
/// may use any accepted alias in any case (`X64`, `amd64`).
///
/// # Example
///
/// ```
/// use wingetup_schema::Arch;
///
/// let arch: Arch = "amd64".parse().unwrap();
/// assert_eq!(arch, Arch::X64);
/// assert_eq!(arch.as_str(), "x64");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Arch {
    /// 64-bit Intel/AMD
    X64,
    /// 32-bit Intel/AMD
    X86,
    /// 64-bit ARM
    Arm64,
    /// 32-bit ARM
    Arm,
    /// Architecture independent
    Neutral,
}

impl Arch {
    /// All architectures in manifest order.
    pub const ALL: [Arch; 5] = [
        Self::X64,
        Self::X86,
        Self::Arm64,
        Self::Arm,
        Self::Neutral,
    ];

    /// Manifest spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x64" | "amd64" | "x86_64" | "win64" => Ok(Self::X64),
            "x86" | "i386" | "i686" | "win32" => Ok(Self::X86),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "arm" => Ok(Self::Arm),
            "neutral" => Ok(Self::Neutral),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

impl TryFrom<String> for Arch {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("AMD64".parse::<Arch>().unwrap(), Arch::X64);
        assert_eq!("win32".parse::<Arch>().unwrap(), Arch::X86);
        assert_eq!("aarch64".parse::<Arch>().unwrap(), Arch::Arm64);
        assert!("sparc".parse::<Arch>().is_err());
    }

    #[test]
    fn deserializes_aliases_in_any_case() {
        let archs: Vec<Arch> = serde_json::from_str(r#"["X64", "amd64", "ARM64", "x86"]"#).unwrap();
        assert_eq!(archs, [Arch::X64, Arch::X64, Arch::Arm64, Arch::X86]);
        assert!(serde_json::from_str::<Arch>(r#""sparc""#).is_err());
        assert_eq!(serde_json::to_string(&Arch::Arm64).unwrap(), r#""arm64""#);
    }

    #[test]
    fn round_trips_through_display() {
        for arch in Arch::ALL {
            assert_eq!(arch.to_string().parse::<Arch>().unwrap(), arch);
        }
    }
}
