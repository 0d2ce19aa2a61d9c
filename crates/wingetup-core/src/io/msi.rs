//! MSI ProductCode extraction via `msiinfo` (msitools).

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::process::{CommandError, Tool};

/// Read the `ProductCode` property of an MSI.
///
/// Any failure, including `msiinfo` being absent, is logged and yields `None`.
pub async fn product_code(msi: &Path) -> Option<String> {
    let path = msi.to_string_lossy();
    let tool = Tool::new("msiinfo").timeout(Duration::from_secs(10));

    match tool.execute(&["export", &path, "Property"]).await {
        Ok(out) => {
            let code = parse_product_code(&out);
            match &code {
                Some(c) => info!("ProductCode: {c}"),
                None => warn!("no ProductCode in {}", msi.display()),
            }
            code
        }
        Err(CommandError::NotFound(_)) => {
            warn!("msiinfo not installed (apt-get install msitools); skipping ProductCode");
            None
        }
        Err(e) => {
            warn!("could not extract ProductCode: {e}");
            None
        }
    }
}

/// Find `ProductCode\t{GUID}` in `msiinfo export ... Property` output.
pub fn parse_product_code(property_table: &str) -> Option<String> {
    property_table
        .lines()
        .filter(|l| l.starts_with("ProductCode"))
        .find_map(|l| l.split('\t').nth(1))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string)
}
