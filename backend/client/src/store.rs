//! Cookie jar kept in a file so the session survives between CLI runs.
use std::{fs, io, path::Path};

use tracing::debug;

use crate::api::ApiClient;

/// Restores the saved cookies, returns whether there were any.
pub fn load(path: &Path, api: &ApiClient) -> io::Result<bool> {
    let cookies = match fs::read_to_string(path) {
        Ok(cookies) => cookies,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let cookies = cookies.trim();
    if cookies.is_empty() {
        return Ok(false);
    }

    debug!("Restoring cookies from {}", path.display());
    api.restore_cookies(cookies);

    Ok(true)
}

/// Writes the current cookies, the file holds the session token.
pub fn save(path: &Path, api: &ApiClient) -> io::Result<()> {
    let Some(cookies) = api.cookies() else {
        return clear(path);
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, cookies)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

pub fn clear(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
