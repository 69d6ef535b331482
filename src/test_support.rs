use std::{
    convert::Infallible,
    io,
    sync::{Arc, Mutex},
};

use crate::{
    SuiteHarness,
    context::SuiteEnv,
    filter::NoFilter,
    formatter::{
        common::{AssertionExpr, ScopeLabel, color::SupportsColor},
        no::NoFormatter,
        *,
    },
    panic::DefaultPanicHandler,
    runner::SimpleRunner,
    suite::SuiteRegistry,
};

/// Shared in-memory sink, clones write into the same bytes.
#[derive(Debug, Clone, Default)]
pub struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SupportsColor for Buffer {
    fn supports_color(&self) -> bool {
        false
    }
}

/// Records every formatter event as a short line.
#[derive(Debug, Default)]
pub struct RecordingFormatter {
    pub events: Vec<String>,
}

impl SuiteFormatter for RecordingFormatter {
    type Error = Infallible;

    fn fmt_begin(&mut self, data: FmtBegin) -> Result<(), Self::Error> {
        self.events
            .push(format!("begin {} of {}", data.suites, data.registered()));
        Ok(())
    }

    fn fmt_suite_begin(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        match data.panic {
            Some(message) => self
                .events
                .push(format!("suite_begin {} panicked: {message}", data.meta.name)),
            None => self.events.push(format!("suite_begin {}", data.meta.name)),
        }
        Ok(())
    }

    fn fmt_suite_templates(&mut self, data: FmtTemplates<'_>) -> Result<(), Self::Error> {
        self.events.push(format!("templates {}", data.type_names.join(", ")));
        Ok(())
    }

    fn fmt_suite_parameters(&mut self, data: FmtParameters<'_>) -> Result<(), Self::Error> {
        self.events.push(format!("parameters {}", data.params.join(", ")));
        Ok(())
    }

    fn fmt_scope_begin(&mut self, data: FmtScope<'_>) -> Result<(), Self::Error> {
        self.events.push(format!("scope_begin {}", ScopeLabel(data.scope)));
        Ok(())
    }

    fn fmt_expect(&mut self, data: FmtExpect<'_>) -> Result<(), Self::Error> {
        self.events.push(format!(
            "expect {} {}",
            data.scope.name,
            AssertionExpr(data.assertion)
        ));
        Ok(())
    }

    fn fmt_scope_end(&mut self, data: FmtScope<'_>) -> Result<(), Self::Error> {
        self.events.push(format!("scope_end {}", data.scope.name));
        Ok(())
    }

    fn fmt_suite_end(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        self.events.push(format!("suite_end {}", data.meta.name));
        Ok(())
    }

    fn fmt_totals(&mut self, data: FmtTotals) -> Result<(), Self::Error> {
        let tally = data.totals.tally;
        self.events
            .push(format!("totals {}/{}/{}", tally.pass, tally.fail, tally.fatal));
        Ok(())
    }

    fn fmt_end(&mut self) -> Result<(), Self::Error> {
        self.events.push("end".to_string());
        Ok(())
    }
}

/// A quiet, single threaded harness.
pub fn harness(
    registry: &SuiteRegistry,
) -> SuiteHarness<'_, NoFilter, DefaultPanicHandler, SimpleRunner, NoFormatter> {
    SuiteHarness {
        registry,
        filter: NoFilter,
        panic_handler: DefaultPanicHandler,
        runner: SimpleRunner,
        formatter: NoFormatter,
        env: SuiteEnv::default(),
    }
}
