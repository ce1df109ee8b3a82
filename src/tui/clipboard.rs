use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Clipboard contents on X11/Wayland vanish with the owning `Clipboard`, so a
/// background thread keeps each one alive long enough for managers to read it.
fn init_clipboard_manager() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            for text in rx {
                match arboard::Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(&text) {
                            tracing::warn!(error = %e, "clipboard write failed");
                            continue;
                        }
                        std::thread::sleep(Duration::from_secs(2));
                    }
                    Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
                }
            }
        });
        tx
    })
}

/// Queue `text` for the clipboard; returns without waiting for the write.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    init_clipboard_manager()
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("clipboard manager channel closed"))
}
