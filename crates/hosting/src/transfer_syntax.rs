//! DICOM transfer syntaxes and their UUID form
//!
//! Transfer syntaxes are negotiated by UUID on the hosting interface. The UID
//! is kept verbatim; the UUID is derived from it with a fixed mapping:
//! `2.25.<n>` UIDs (ITU-T X.667) map to the UUID whose value is `n`, every
//! other UID maps to the RFC 4122 name-based (SHA-1) UUID of the UID string in
//! the OID namespace.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HostingError, Result};

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";
pub const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";

/// Root arc of UUID-derived OIDs
const UUID_ARC: &str = "2.25.";

/// A DICOM transfer syntax identified by its UID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransferSyntax {
    uid: String,
}

impl TransferSyntax {
    /// Parse and validate a transfer syntax UID
    ///
    /// Trailing NUL and space padding, as found in DICOM UI elements, is
    /// stripped before validation.
    pub fn new(uid: impl AsRef<str>) -> Result<Self> {
        let uid = uid.as_ref().trim_end_matches(['\0', ' ']);
        validate_uid(uid)?;
        Ok(Self {
            uid: uid.to_string(),
        })
    }

    pub fn explicit_vr_little_endian() -> Self {
        Self {
            uid: EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
        }
    }

    pub fn implicit_vr_little_endian() -> Self {
        Self {
            uid: IMPLICIT_VR_LITTLE_ENDIAN.to_string(),
        }
    }

    /// The UID exactly as given
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// UUID used for this transfer syntax on the hosting interface
    pub fn uuid(&self) -> Uuid {
        uid_to_uuid(&self.uid)
    }

    /// Human readable name for well-known transfer syntaxes
    pub fn name(&self) -> Option<&'static str> {
        match self.uid.as_str() {
            IMPLICIT_VR_LITTLE_ENDIAN => Some("Implicit VR Little Endian"),
            EXPLICIT_VR_LITTLE_ENDIAN => Some("Explicit VR Little Endian"),
            DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN => Some("Deflated Explicit VR Little Endian"),
            EXPLICIT_VR_BIG_ENDIAN => Some("Explicit VR Big Endian"),
            JPEG_BASELINE => Some("JPEG Baseline (Process 1)"),
            _ => None,
        }
    }
}

/// Map a DICOM UID onto the UUID used by the hosting interface
pub fn uid_to_uuid(uid: &str) -> Uuid {
    if let Some(value) = uid.strip_prefix(UUID_ARC) {
        if let Ok(n) = value.parse::<u128>() {
            return Uuid::from_u128(n);
        }
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, uid.as_bytes())
}

/// Express a UUID as a DICOM UID under the `2.25` arc
pub fn uuid_to_uid(uuid: &Uuid) -> String {
    format!("{}{}", UUID_ARC, uuid.as_u128())
}

fn validate_uid(uid: &str) -> Result<()> {
    if uid.is_empty() || uid.len() > 64 {
        return Err(HostingError::InvalidUid(format!(
            "UID must be 1-64 characters: '{}'",
            uid
        )));
    }
    for component in uid.split('.') {
        let valid = !component.is_empty()
            && component.bytes().all(|b| b.is_ascii_digit())
            && (component == "0" || !component.starts_with('0'));
        if !valid {
            return Err(HostingError::InvalidUid(format!(
                "Malformed UID component '{}' in '{}'",
                component, uid
            )));
        }
    }
    Ok(())
}

impl TryFrom<String> for TransferSyntax {
    type Error = HostingError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TransferSyntax> for String {
    fn from(value: TransferSyntax) -> Self {
        value.uid
    }
}

impl std::fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uid)
    }
}

impl std::str::FromStr for TransferSyntax {
    type Err = HostingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
