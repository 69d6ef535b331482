use std::io;

use crate::{
    formatter::{
        common::{
            AssertionExpr, ScopeLabel, Seconds,
            color::{ColorSetting, SupportsColor, colors::*, paint},
            plural, shows_values,
        },
        *,
    },
    result::Outcome,
};

/// Compact output: one character per suite, details only for failures.
#[derive(Debug)]
pub struct TerseFormatter<W: io::Write> {
    target: W,
    color_setting: ColorSetting,
    suites: usize,
    progress: usize,
    last_ok: bool,
    suite: String,
    scopes: Vec<String>,
    failures: Vec<TerseFailure>,
}

#[derive(Debug)]
struct TerseFailure {
    suite: String,
    scopes: Vec<String>,
    kind: TerseFailureKind,
}

#[derive(Debug)]
enum TerseFailureKind {
    Assertion {
        outcome: Outcome,
        expr: String,
        values: Option<(String, String)>,
        annotation: Option<String>,
        location: String,
    },
    Panicked(String),
}

impl Default for TerseFormatter<io::Stdout> {
    fn default() -> Self {
        Self {
            target: io::stdout(),
            color_setting: Default::default(),
            suites: 0,
            progress: 0,
            last_ok: false,
            suite: String::new(),
            scopes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<W: io::Write> TerseFormatter<W> {
    pub fn with_target<WithTarget: io::Write>(
        self,
        with_target: WithTarget,
    ) -> TerseFormatter<WithTarget> {
        TerseFormatter {
            target: with_target,
            color_setting: self.color_setting,
            suites: self.suites,
            progress: self.progress,
            last_ok: self.last_ok,
            suite: self.suite,
            scopes: self.scopes,
            failures: self.failures,
        }
    }

    pub fn with_color_setting(self, color_setting: impl Into<ColorSetting>) -> Self {
        TerseFormatter {
            color_setting: color_setting.into(),
            ..self
        }
    }
}

impl<W: io::Write + SupportsColor> TerseFormatter<W> {
    /// Return whether this formatter will currently emit colored output.
    pub fn use_color(&self) -> bool {
        self.color_setting.use_color(&self.target)
    }

    fn write_failures(&mut self) -> io::Result<()> {
        let color = self.use_color();
        writeln!(self.target)?;
        writeln!(self.target, "failures:")?;
        writeln!(self.target)?;
        for failure in self.failures.iter() {
            write!(self.target, "---- {}", failure.suite)?;
            for scope in failure.scopes.iter() {
                write!(self.target, " > {scope}")?;
            }
            writeln!(self.target, " ----")?;

            match &failure.kind {
                TerseFailureKind::Panicked(message) => {
                    writeln!(self.target, "panicked: {message}")?;
                }
                TerseFailureKind::Assertion {
                    outcome,
                    expr,
                    values,
                    annotation,
                    location,
                } => {
                    let label = match outcome {
                        Outcome::Fatal => "required",
                        _ => "expected",
                    };
                    writeln!(self.target, "{} {expr}", paint(label, YELLOW, color))?;
                    if let Some((lhs, rhs)) = values {
                        writeln!(self.target, "  left:  {lhs}")?;
                        writeln!(self.target, "  right: {rhs}")?;
                    }
                    if let Some(annotation) = annotation {
                        writeln!(self.target, "note: {annotation}")?;
                    }
                    writeln!(self.target, "  at {location}")?;
                }
            }
            writeln!(self.target)?;
        }

        writeln!(self.target, "failures:")?;
        let mut last = None;
        for failure in self.failures.iter() {
            if last != Some(failure.suite.as_str()) {
                writeln!(self.target, "    {}", failure.suite)?;
                last = Some(failure.suite.as_str());
            }
        }
        Ok(())
    }
}

impl<W: io::Write + SupportsColor> SuiteFormatter for TerseFormatter<W> {
    type Error = io::Error;

    fn fmt_begin(&mut self, data: FmtBegin) -> Result<(), Self::Error> {
        self.suites = data.suites;
        writeln!(self.target, "\nrunning {}", plural(data.suites, "suite"))
    }

    fn fmt_suite_begin(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        self.suite = data.meta.name.to_string();
        self.scopes.clear();
        self.progress += 1;

        if data.tally.is_ok() && data.panic.is_none() {
            self.last_ok = true;
            return write!(self.target, ".");
        }

        if self.last_ok {
            writeln!(self.target, " {}/{}", self.progress - 1, self.suites)?;
        }
        self.last_ok = false;

        let status = match data.panic {
            Some(message) => {
                self.failures.push(TerseFailure {
                    suite: self.suite.clone(),
                    scopes: Vec::new(),
                    kind: TerseFailureKind::Panicked(message.to_string()),
                });
                "PANICKED"
            }
            None => "FAILED",
        };
        writeln!(self.target, "{} --- {status}", data.meta.name)
    }

    fn fmt_scope_begin(&mut self, data: FmtScope<'_>) -> Result<(), Self::Error> {
        self.scopes.truncate(data.scope.depth().saturating_sub(1));
        self.scopes.push(ScopeLabel(data.scope).to_string());
        Ok(())
    }

    fn fmt_expect(&mut self, data: FmtExpect<'_>) -> Result<(), Self::Error> {
        self.scopes.truncate(data.scope.depth());
        let assertion = data.assertion;
        if assertion.outcome == Outcome::Pass {
            return Ok(());
        }

        let mut scopes = Vec::with_capacity(self.scopes.len() + 1);
        if !data.params.is_empty() {
            scopes.push(format!("({})", data.params.join(", ")));
        }
        scopes.extend(self.scopes.iter().cloned());

        self.failures.push(TerseFailure {
            suite: self.suite.clone(),
            scopes,
            kind: TerseFailureKind::Assertion {
                outcome: assertion.outcome,
                expr: AssertionExpr(assertion).to_string(),
                values: shows_values(assertion)
                    .then(|| (assertion.lhs.clone(), assertion.rhs.clone())),
                annotation: assertion.annotation.clone(),
                location: assertion.location.to_string(),
            },
        });
        Ok(())
    }

    fn fmt_totals(&mut self, data: FmtTotals) -> Result<(), Self::Error> {
        if self.last_ok {
            writeln!(self.target, " {}/{}", self.progress, self.suites)?;
        }
        if !self.failures.is_empty() {
            self.write_failures()?;
        }

        let color = self.use_color();
        let FmtTotals {
            totals,
            wall_duration,
            filtered_out,
            ..
        } = data;
        writeln!(self.target)?;
        write!(self.target, "test result: ")?;
        match totals.success() {
            true => write!(self.target, "{}. ", paint("ok", GREEN, color))?,
            false => write!(self.target, "{}. ", paint("FAILED", RED, color))?,
        }
        writeln!(
            self.target,
            "{} passed; {} failed; {} fatal; {filtered_out} filtered out; finished in {}",
            totals.tally.pass,
            totals.tally.fail,
            totals.tally.fatal,
            Seconds(wall_duration)
        )?;
        writeln!(self.target)
    }
}
