use anyhow::{anyhow, Context, Result};
use std::process::{Command, Stdio};
use tracing::debug;

/// Something that can show a story URL to the user
pub trait UrlOpener {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands URLs to the platform's default browser
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(anyhow!("Story has no URL to open"));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(anyhow!("Refusing to open '{}': not a web URL", url));
        }

        let (program, args) = opener_command(std::env::consts::OS, url);
        debug!("Opening {} with {}", url, program);

        let status = Command::new(program)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run '{}'. Is a browser available?", program))?;

        if !status.success() {
            return Err(anyhow!("'{}' could not open {}", program, url));
        }

        Ok(())
    }
}

/// The launcher for `os`. Windows goes through `rundll32` rather than
/// `cmd /C start` so `&` and `^` in a URL reach the browser untouched.
fn opener_command(os: &str, url: &str) -> (&'static str, Vec<String>) {
    match os {
        "macos" => ("open", vec![url.to_string()]),
        "windows" => (
            "rundll32",
            vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
        ),
        _ => ("xdg-open", vec![url.to_string()]),
    }
}

/// Records URLs instead of launching anything
#[cfg(test)]
#[derive(Default)]
pub struct RecordingOpener {
    pub opened: std::cell::RefCell<Vec<String>>,
    pub fail: bool,
}

#[cfg(test)]
impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<()> {
        self.opened.borrow_mut().push(url.to_string());
        if self.fail {
            return Err(anyhow!("no browser"));
        }
        Ok(())
    }
}
