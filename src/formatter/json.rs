use std::io;

use serde::Serialize;

use crate::{
    formatter::*,
    outcome::Totals,
    result::{Comparison, Outcome, Tally},
};

/// Collects the whole run and writes it as one JSON document at the end.
#[derive(Debug)]
pub struct JsonFormatter<W: io::Write> {
    target: W,
    pretty: bool,
    report: JsonReport,
    open: Vec<JsonScope>,
}

#[derive(Debug, Default, Serialize)]
struct JsonReport {
    suites: Vec<JsonSuite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    totals: Option<Totals>,
    wall_duration: f64,
    cpu_duration: f64,
    filtered_out: usize,
}

#[derive(Debug, Serialize)]
struct JsonSuite {
    name: String,
    categories: Vec<String>,
    location: String,
    tally: Tally,
    duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    panic: Option<String>,
    nodes: Vec<JsonNode>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonNode {
    Templates { type_names: Vec<String> },
    Parameters { params: Vec<String> },
    Scope(JsonScope),
    Assertion(JsonAssertion),
}

#[derive(Debug, Serialize)]
struct JsonScope {
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<String>,
    path: String,
    location: String,
    tally: Tally,
    duration: f64,
    children: Vec<JsonNode>,
}

#[derive(Debug, Serialize)]
struct JsonAssertion {
    outcome: Outcome,
    comparison: Comparison,
    lhs: String,
    rhs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lhs_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rhs_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotation: Option<String>,
    location: String,
}

impl Default for JsonFormatter<io::Stdout> {
    fn default() -> Self {
        Self {
            target: io::stdout(),
            pretty: true,
            report: JsonReport::default(),
            open: Vec::new(),
        }
    }
}

impl<W: io::Write> JsonFormatter<W> {
    pub fn with_target<WithTarget: io::Write>(self, target: WithTarget) -> JsonFormatter<WithTarget> {
        JsonFormatter {
            target,
            pretty: self.pretty,
            report: self.report,
            open: self.open,
        }
    }

    /// Write a single line instead of an indented document.
    pub fn with_compact(self, compact: bool) -> Self {
        Self {
            pretty: !compact,
            ..self
        }
    }

    fn push_node(&mut self, node: JsonNode) {
        match self.open.last_mut() {
            Some(scope) => scope.children.push(node),
            None => {
                if let Some(suite) = self.report.suites.last_mut() {
                    suite.nodes.push(node);
                }
            }
        }
    }
}

impl<W: io::Write> SuiteFormatter for JsonFormatter<W> {
    type Error = io::Error;

    fn fmt_suite_begin(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        self.open.clear();
        self.report.suites.push(JsonSuite {
            name: data.meta.name.to_string(),
            categories: data.meta.categories.iter().map(|c| c.to_string()).collect(),
            location: data.meta.location.to_string(),
            tally: data.tally,
            duration: data.duration.as_secs_f64(),
            panic: data.panic.map(str::to_string),
            nodes: Vec::new(),
        });
        Ok(())
    }

    fn fmt_suite_templates(&mut self, data: FmtTemplates<'_>) -> Result<(), Self::Error> {
        self.push_node(JsonNode::Templates {
            type_names: data.type_names.to_vec(),
        });
        Ok(())
    }

    fn fmt_suite_parameters(&mut self, data: FmtParameters<'_>) -> Result<(), Self::Error> {
        self.push_node(JsonNode::Parameters {
            params: data.params.to_vec(),
        });
        Ok(())
    }

    fn fmt_scope_begin(&mut self, data: FmtScope<'_>) -> Result<(), Self::Error> {
        let scope = data.scope;
        self.open.push(JsonScope {
            name: scope.name.clone(),
            params: scope.params.clone(),
            path: scope.path.to_string(),
            location: scope.location.to_string(),
            tally: scope.tally,
            duration: scope.duration().as_secs_f64(),
            children: Vec::new(),
        });
        Ok(())
    }

    fn fmt_expect(&mut self, data: FmtExpect<'_>) -> Result<(), Self::Error> {
        let assertion = data.assertion;
        self.push_node(JsonNode::Assertion(JsonAssertion {
            outcome: assertion.outcome,
            comparison: assertion.comparison,
            lhs: assertion.lhs.clone(),
            rhs: assertion.rhs.clone(),
            lhs_source: assertion.lhs_source.clone(),
            rhs_source: assertion.rhs_source.clone(),
            annotation: assertion.annotation.clone(),
            location: assertion.location.to_string(),
        }));
        Ok(())
    }

    fn fmt_scope_end(&mut self, _: FmtScope<'_>) -> Result<(), Self::Error> {
        if let Some(scope) = self.open.pop() {
            self.push_node(JsonNode::Scope(scope));
        }
        Ok(())
    }

    fn fmt_totals(&mut self, data: FmtTotals) -> Result<(), Self::Error> {
        self.report.totals = Some(data.totals);
        self.report.wall_duration = data.wall_duration.as_secs_f64();
        self.report.cpu_duration = data.cpu_duration.as_secs_f64();
        self.report.filtered_out = data.filtered_out;
        Ok(())
    }

    fn fmt_end(&mut self) -> Result<(), Self::Error> {
        let written = match self.pretty {
            true => serde_json::to_writer_pretty(&mut self.target, &self.report),
            false => serde_json::to_writer(&mut self.target, &self.report),
        };
        written.map_err(io::Error::from)?;
        writeln!(self.target)?;
        self.target.flush()
    }
}
