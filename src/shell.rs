use std::process::Command;

/// Opens a folder or URL with the desktop's default handler, off the UI thread.
pub fn open_externally(target: String) {
    std::thread::spawn(move || {
        #[cfg(target_os = "windows")]
        let result = Command::new("explorer").arg(&target).spawn();
        #[cfg(target_os = "macos")]
        let result = Command::new("open").arg(&target).spawn();
        #[cfg(all(unix, not(target_os = "macos")))]
        let result = Command::new("xdg-open").arg(&target).spawn();

        if let Err(e) = result {
            tracing::warn!("could not open {target}: {e}");
        }
    });
}
