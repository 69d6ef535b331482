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

/// Detailed output: every suite, scope and assertion.
#[derive(Debug)]
pub struct PrettyFormatter<W: io::Write> {
    target: W,
    color_setting: ColorSetting,
}

impl Default for PrettyFormatter<io::Stdout> {
    fn default() -> Self {
        Self {
            target: io::stdout(),
            color_setting: Default::default(),
        }
    }
}

impl<W: io::Write> PrettyFormatter<W> {
    pub fn with_target<WithTarget: io::Write>(
        self,
        target: WithTarget,
    ) -> PrettyFormatter<WithTarget> {
        PrettyFormatter {
            target,
            color_setting: self.color_setting,
        }
    }

    pub fn with_color_setting(self, color_setting: impl Into<ColorSetting>) -> Self {
        Self {
            color_setting: color_setting.into(),
            ..self
        }
    }

    pub fn into_target(self) -> W {
        self.target
    }
}

impl<W: io::Write + SupportsColor> PrettyFormatter<W> {
    /// Return whether this formatter will currently emit colored output.
    pub fn use_color(&self) -> bool {
        self.color_setting.use_color(&self.target)
    }
}

fn indent(depth: usize) -> usize {
    2 * (depth + 1)
}

impl<W: io::Write + SupportsColor> SuiteFormatter for PrettyFormatter<W> {
    type Error = io::Error;

    fn fmt_begin(&mut self, data: FmtBegin) -> Result<(), Self::Error> {
        writeln!(self.target)?;
        writeln!(self.target, "running {}", plural(data.suites, "suite"))?;
        writeln!(self.target)
    }

    fn fmt_suite_begin(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        let color = self.use_color();
        write!(self.target, "suite {} ... ", paint(&data.meta.name, BOLD, color))?;
        if let Some(message) = data.panic {
            writeln!(self.target, "{}", paint("PANICKED", RED, color))?;
            return writeln!(self.target, "  panicked: {message}");
        }

        let status = match data.tally.is_ok() {
            true => paint("ok", GREEN, color),
            false => paint("FAILED", RED, color),
        };
        writeln!(
            self.target,
            "{status} ({} passed; {} failed; {} fatal) {}",
            data.tally.pass,
            data.tally.fail,
            data.tally.fatal,
            Seconds(data.duration)
        )
    }

    fn fmt_suite_templates(&mut self, data: FmtTemplates<'_>) -> Result<(), Self::Error> {
        let color = self.use_color();
        let names = format!("<{}>", data.type_names.join(", "));
        writeln!(self.target, "  {}", paint(names, CYAN, color))
    }

    fn fmt_suite_parameters(&mut self, data: FmtParameters<'_>) -> Result<(), Self::Error> {
        let color = self.use_color();
        let params = format!("with ({})", data.params.join(", "));
        writeln!(self.target, "  {}", paint(params, CYAN, color))
    }

    fn fmt_scope_begin(&mut self, data: FmtScope<'_>) -> Result<(), Self::Error> {
        let width = indent(data.scope.depth()) - 2;
        writeln!(self.target, "{:width$}- {}", "", ScopeLabel(data.scope))
    }

    fn fmt_expect(&mut self, data: FmtExpect<'_>) -> Result<(), Self::Error> {
        let color = self.use_color();
        let width = indent(data.scope.depth());
        let assertion = data.assertion;
        let mark = match assertion.outcome {
            Outcome::Pass => paint("ok   ", GREEN, color),
            Outcome::Fail => paint("FAIL ", RED, color),
            Outcome::Fatal => paint("FATAL", RED, color),
        };
        writeln!(self.target, "{:width$}{mark} {}", "", AssertionExpr(assertion))?;
        if assertion.outcome == Outcome::Pass {
            return Ok(());
        }

        let width = width + 6;
        if shows_values(assertion) {
            writeln!(self.target, "{:width$}left:  {}", "", assertion.lhs)?;
            writeln!(self.target, "{:width$}right: {}", "", assertion.rhs)?;
        }
        if let Some(annotation) = &assertion.annotation {
            writeln!(self.target, "{:width$}note: {annotation}", "")?;
        }
        writeln!(
            self.target,
            "{:width$}{}",
            "",
            paint(format!("at {}", assertion.location), DIM, color)
        )
    }

    fn fmt_suite_end(&mut self, _: FmtSuite<'_>) -> Result<(), Self::Error> {
        writeln!(self.target)
    }

    fn fmt_totals(&mut self, data: FmtTotals) -> Result<(), Self::Error> {
        let color = self.use_color();
        let FmtTotals {
            totals,
            wall_duration,
            cpu_duration,
            filtered_out,
        } = data;

        write!(self.target, "test result: ")?;
        match totals.success() {
            true => write!(self.target, "{}. ", paint("ok", GREEN, color))?,
            false => write!(self.target, "{}. ", paint("FAILED", RED, color))?,
        }
        writeln!(
            self.target,
            "{} passed; {} failed; {} fatal; {} ({} failed); {filtered_out} filtered out; finished in {} (suites took {})",
            totals.tally.pass,
            totals.tally.fail,
            totals.tally.fatal,
            plural(totals.suites, "suite"),
            totals.failed_suites,
            Seconds(wall_duration),
            Seconds(cpu_duration),
        )?;
        writeln!(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{suite::SuiteRegistry, test_support::*};

    fn render(registry: &SuiteRegistry) -> String {
        let buffer = Buffer::default();
        harness(registry)
            .with_formatter(
                PrettyFormatter::default()
                    .with_target(buffer.clone())
                    .with_color_setting(ColorSetting::Never),
            )
            .run();
        buffer.contents()
    }

    #[test]
    fn renders_scopes_and_failures() {
        let mut registry = SuiteRegistry::new();
        registry.suite("stack").run(|ctx| {
            let mut stack = vec![1];
            ctx.section("push", |ctx| {
                stack.push(2);
                ctx.expect(stack.len()).is_eq(2);
            });
            ctx.section("pop", |ctx| {
                ctx.info("popping the only element");
                ctx.expect(stack.pop()).is_eq(Some(2));
            });
        });

        let output = render(&registry);
        assert!(output.contains("running 1 suite\n"));
        assert!(output.contains("suite stack ... FAILED (1 passed; 1 failed; 0 fatal)"));
        assert!(output.contains("\n  - push\n    ok    2 == 2\n"));
        assert!(output.contains("\n  - pop\n    FAIL  Some(1) == Some(2)\n"));
        assert!(output.contains("note: popping the only element"));
        assert!(output.contains("test result: FAILED. 1 passed; 1 failed; 0 fatal; 1 suite (1 failed)"));
    }

    #[test]
    fn renders_instantiations_and_parameters() {
        let mut registry = SuiteRegistry::new();
        registry
            .suite("typed")
            .typed::<u8>(["u8"])
            .params([3])
            .run(|ctx| {
                ctx.expect(1).is_le(3);
            });

        let output = render(&registry);
        assert!(output.contains("  <u8>\n  with (3)\n  ok    1 <= 3\n"));
        assert!(output.contains("test result: ok."));
    }
}
