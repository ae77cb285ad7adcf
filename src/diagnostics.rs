use std::cell::RefCell;

use crate::collaborators::DiagnosticsSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Something an author should hear about, optionally tied to one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub field: Option<String>,
    pub index: Option<usize>,
}

pub const UNKNOWN_TYPE_CODE: &str = "unknown-embed-type";
pub const EMBED_ERROR_CODE: &str = "embed-error";

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            field: None,
            index: None,
        }
    }

    pub fn for_field_value(mut self, field: impl Into<String>, index: usize) -> Self {
        self.field = Some(field.into());
        self.index = Some(index);
        self
    }
}

/// Routes diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report_unknown_type(&self, name: &str) {
        log::warn!("Reference to unknown embed type: {name}");
    }

    fn log_error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// Keeps every diagnostic it receives, and logs it as well.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn with_code(&self, code: &str) -> Vec<Diagnostic> {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.code == code)
            .cloned()
            .collect()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report_unknown_type(&self, name: &str) {
        LogSink.report_unknown_type(name);
        self.push(Diagnostic::warning(
            UNKNOWN_TYPE_CODE,
            format!("Reference to unknown embed type: {name}"),
        ));
    }

    fn log_error(&self, message: &str) {
        LogSink.log_error(message);
        self.push(Diagnostic::error(EMBED_ERROR_CODE, message));
    }
}
