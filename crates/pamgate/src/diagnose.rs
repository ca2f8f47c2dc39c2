//! Shadow database readability self-test.
//!
//! PAM can only verify local credentials when the process can read the
//! shadow password database; a gateway that cannot read it fails every
//! login with an opaque PAM error. This check turns that condition into an
//! actionable message for an administrator.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::nss;

/// Default location of the shadow password database.
pub const SHADOW_PATH: &str = "/etc/shadow";

/// Outcome of the self-test. Advisory only; the check itself never fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub ok: bool,
    pub message: String,
}

impl DiagnosticResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Run the self-test against the default shadow path.
///
/// `admin` is the embedding application's privilege decision. Unprivileged
/// callers always get a plain ok without any filesystem access, so the
/// check cannot be used to probe file metadata.
pub fn diagnose(admin: bool) -> DiagnosticResult {
    diagnose_path(admin, Path::new(SHADOW_PATH))
}

/// Run the self-test against an explicit path.
pub fn diagnose_path(admin: bool, shadow: &Path) -> DiagnosticResult {
    if !admin {
        return DiagnosticResult::ok("");
    }

    if !shadow.exists() {
        // No shadow database in use; nothing to check.
        return DiagnosticResult::ok("Success");
    }

    match fs::File::open(shadow) {
        Ok(_) => DiagnosticResult::ok("Success"),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            debug!("{} exists but is not readable", shadow.display());
            match shadow_attributes(shadow) {
                Ok(attrs) => permission_advice(&attrs),
                Err(err) => DiagnosticResult::error(err.to_string()),
            }
        }
        Err(e) => DiagnosticResult::error(format!("cannot open {}: {e}", shadow.display())),
    }
}

/// Ownership and permission bits of the shadow file.
struct ShadowAttributes {
    owner: String,
    group: String,
    group_readable: bool,
}

fn shadow_attributes(shadow: &Path) -> Result<ShadowAttributes, AuthError> {
    use std::os::unix::fs::MetadataExt;

    // Do not follow symlinks: the advice must describe the file that is
    // actually in the way.
    let meta = fs::symlink_metadata(shadow).map_err(|e| {
        AuthError::DiagnosticUnavailable(format!(
            "cannot read ownership of {}: {e}",
            shadow.display()
        ))
    })?;

    Ok(ShadowAttributes {
        owner: nss::user_name_or_uid(meta.uid()),
        group: nss::group_name_or_gid(meta.gid()),
        group_readable: meta.mode() & 0o040 != 0,
    })
}

fn permission_advice(attrs: &ShadowAttributes) -> DiagnosticResult {
    let account = nss::current_username();
    if attrs.group_readable {
        // The file is already group-readable; joining the group suffices.
        DiagnosticResult::error(format!(
            "Add {account} to the group {} so that the password database can be read",
            attrs.group
        ))
    } else {
        DiagnosticResult::error(format!(
            "Run the service as {}, or add {account} to the group {} and make the password \
             database readable by that group",
            attrs.owner, attrs.group
        ))
    }
}
