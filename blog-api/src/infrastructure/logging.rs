use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// `error`, `warn`, `info`, `debug` or `trace`; anything else means `info`.
    pub level: String,
    /// Human-readable text instead of JSON lines.
    pub text: bool,
}

impl LogSettings {
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim() {
            "" => LevelFilter::INFO,
            level => level.parse().unwrap_or(LevelFilter::INFO),
        }
    }
}

pub fn build_dispatch(settings: &LogSettings) -> Dispatch {
    build_dispatch_with_writer(settings, std::io::stdout)
}

/// Same as [`build_dispatch`] but writes records to `writer` instead of stdout.
pub fn build_dispatch_with_writer<W>(settings: &LogSettings, writer: W) -> Dispatch
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::builder()
        .with_default_directive(settings.level_filter().into())
        .parse_lossy("");

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(writer)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    if settings.text {
        Dispatch::new(builder.finish())
    } else {
        Dispatch::new(builder.json().finish())
    }
}

pub fn init_logging(settings: &LogSettings) {
    let _ = tracing::dispatcher::set_global_default(build_dispatch(settings));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: &str) -> LogSettings {
        LogSettings {
            level: level.into(),
            text: true,
        }
    }

    #[test]
    fn parses_known_levels() {
        assert_eq!(settings("debug").level_filter(), LevelFilter::DEBUG);
        assert_eq!(settings("WARN").level_filter(), LevelFilter::WARN);
        assert_eq!(settings(" error ").level_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(settings("verbose").level_filter(), LevelFilter::INFO);
        assert_eq!(settings("").level_filter(), LevelFilter::INFO);
    }

    #[test]
    fn dispatch_honours_level() {
        let dispatch = build_dispatch(&settings("warn"));
        tracing::dispatcher::with_default(&dispatch, || {
            assert!(!tracing::enabled!(tracing::Level::INFO));
            assert!(tracing::enabled!(tracing::Level::WARN));
        });
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::Value;
    use tracing::Dispatch;
    use tracing_subscriber::fmt::MakeWriter;

    use super::{LogSettings, build_dispatch_with_writer};

    /// JSON log output kept in memory so tests can inspect records.
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn dispatch(&self) -> Dispatch {
            let settings = LogSettings {
                level: "info".into(),
                text: false,
            };
            build_dispatch_with_writer(&settings, self.clone())
        }

        pub fn records(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect()
        }

        pub fn find(&self, message: &str) -> Value {
            self.records()
                .into_iter()
                .find(|record| record["fields"]["message"] == message)
                .unwrap_or_else(|| panic!("no {message:?} record in {:?}", self.records()))
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}
