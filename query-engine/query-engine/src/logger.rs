use crate::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_DIRECTIVES: &str = "query_core=info,request_handlers=info";

/// An installer for a global logger.
#[derive(Debug, Clone)]
pub struct Logger {
    service_name: &'static str,
    log_format: LogFormat,
}

impl Logger {
    /// Initialize a new global logger installer.
    pub fn new(service_name: &'static str) -> Self {
        Self {
            service_name,
            log_format: LogFormat::Text,
        }
    }

    /// Sets the output format. Default: Text.
    pub fn log_format(&mut self, log_format: LogFormat) {
        self.log_format = log_format;
    }

    /// Installs the logger as the global default. Logs go to stderr so stdout only carries
    /// responses. `RUST_LOG` overrides the default directives.
    pub fn install(&self) -> Result<(), tracing_subscriber::util::TryInitError> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        let fmt_layer = match self.log_format {
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
        };

        tracing_subscriber::registry().with(fmt_layer).try_init()?;
        tracing::debug!(service = self.service_name, "Logger installed.");

        Ok(())
    }
}

/// Reports panics in the configured log format and exits with status 255. With JSON output the
/// report is a single user facing error line on stderr.
pub fn set_panic_hook(log_format: LogFormat) {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| match log_format {
        LogFormat::Json => {
            let error = user_facing_errors::Error::new_in_panic_hook(info);

            match panic_line(&error) {
                Ok(line) => eprintln!("{line}"),
                Err(err) => {
                    tracing::error!(%err, "Could not render the panic as JSON.");
                    original_hook(info);
                }
            }

            std::process::exit(255);
        }
        LogFormat::Text => {
            let location = info.location().map(|location| location.to_string());
            let reason = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_default();

            tracing::error!(reason = reason.as_str(), location = location.as_deref(), "PANIC");
            std::process::exit(255);
        }
    }));
}

fn panic_line(error: &user_facing_errors::Error) -> serde_json::Result<String> {
    serde_json::to_string(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn panics_render_as_one_json_line() {
        let error = user_facing_errors::Error::from_panic_payload(Box::new("store poisoned"));
        let line = panic_line(&error).unwrap();

        assert!(!line.contains('\n'), "{line}");

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["is_panic"], serde_json::json!(true));
        assert!(parsed["message"].as_str().unwrap().contains("store poisoned"), "{line}");
    }
}
