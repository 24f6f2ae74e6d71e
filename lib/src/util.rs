use log::Level;
use std::fmt;
use std::sync::Arc;

/// Callback receiving every log record a connection emits.
pub type LogSink = Arc<dyn Fn(Level, &fmt::Arguments<'_>) + Send + Sync>;

/// Severity-filtered logging side channel owned by a connection.
///
/// Records go to the installed sink, or to the `log` facade under the
/// `sparqlclient` target when no sink is installed. Debug and trace records
/// are dropped unless the logger is verbose.
#[derive(Clone, Default)]
pub struct Logger {
    verbose: bool,
    sink: Option<LogSink>,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            sink: None,
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_sink(&mut self, sink: Option<LogSink>) {
        self.sink = sink;
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if level >= Level::Debug && !self.verbose {
            return;
        }
        match &self.sink {
            Some(sink) => sink(level, &args),
            None => log::log!(target: "sparqlclient", level, "{}", args),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("verbose", &self.verbose)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Logs through a [`Logger`]: `sparql_log!(logger, Level::Warn, "...", args)`.
#[macro_export]
macro_rules! sparql_log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format_args!($($arg)+))
    };
}
