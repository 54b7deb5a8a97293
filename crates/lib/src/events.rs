//! C++ code generation for structured metrics event classes.
//!
//! The build consumes a JSON description of metrics projects and their
//! events, and emits one C++ header per project with a fluent builder
//! class per event. Generation is deterministic: declaration order in
//! the input is preserved in the output.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use camino::Utf8Path;
use fn_error_context::context;
use serde::Deserialize;

/// The full structured-metrics description: a set of projects.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventsDescription {
    /// All metrics projects.
    pub projects: Vec<Project>,
}

/// A metrics project: a named group of events owned by one team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Project {
    /// Project name, used as the C++ namespace (snake-cased).
    pub name: String,
    /// The events recorded under this project.
    pub events: Vec<Event>,
}

/// One recordable event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Event {
    /// Event name, used as the C++ class name (camel-cased).
    pub name: String,
    /// The metrics carried by the event.
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

/// One typed metric of an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Metric {
    /// Metric name, used for the setter (camel-cased).
    pub name: String,
    /// Value type.
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

/// The value type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    /// A string recorded as a keyed hash.
    HashedString,
    /// A string recorded verbatim.
    RawString,
    /// A 64-bit integer.
    Int,
}

impl MetricKind {
    fn cpp_param(self) -> &'static str {
        match self {
            Self::HashedString | Self::RawString => "const std::string&",
            Self::Int => "int64_t",
        }
    }

    fn setter(self) -> &'static str {
        match self {
            Self::HashedString => "AddHashedStringMetric",
            Self::RawString => "AddStringMetric",
            Self::Int => "AddIntMetric",
        }
    }
}

/// Convert a kebab-or-snake name into a C++ CamelCase identifier.
fn camel_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert a kebab-case name into a snake_case identifier.
fn snake_case(name: &str) -> String {
    name.replace(['-', ' '], "_").to_lowercase()
}

/// Render the header for one project.
///
/// Errors only on a name that cannot become a C++ identifier.
pub fn generate_project_header(project: &Project) -> Result<String> {
    let namespace = snake_case(&project.name);
    anyhow::ensure!(
        !namespace.is_empty() && !namespace.starts_with(|c: char| c.is_ascii_digit()),
        "Project name {:?} is not usable as a C++ namespace",
        project.name
    );

    let mut out = String::new();
    let guard = format!("METRICS_STRUCTURED_EVENTS_{}_H_", namespace.to_uppercase());
    writeln!(out, "// Generated by unibuild gen-events. Do not edit.")?;
    writeln!(out)?;
    writeln!(out, "#ifndef {guard}")?;
    writeln!(out, "#define {guard}")?;
    writeln!(out)?;
    writeln!(out, "#include <cstdint>")?;
    writeln!(out, "#include <string>")?;
    writeln!(out)?;
    writeln!(out, "#include \"metrics/structured/event_base.h\"")?;
    writeln!(out)?;
    writeln!(out, "namespace metrics {{")?;
    writeln!(out, "namespace structured {{")?;
    writeln!(out, "namespace events {{")?;
    writeln!(out, "namespace {namespace} {{")?;

    for event in &project.events {
        let class_name = camel_case(&event.name);
        anyhow::ensure!(
            !class_name.is_empty(),
            "Event name {:?} is not usable as a C++ class name",
            event.name
        );
        writeln!(out)?;
        writeln!(out, "class {class_name} final : public EventBase {{")?;
        writeln!(out, " public:")?;
        writeln!(out, "  {class_name}();")?;
        writeln!(out, "  ~{class_name}() override;")?;
        for metric in &event.metrics {
            let setter = camel_case(&metric.name);
            writeln!(out)?;
            writeln!(
                out,
                "  {class_name}& Set{setter}({} value);",
                metric.kind.cpp_param()
            )?;
        }
        writeln!(out, "}};")?;
    }

    writeln!(out)?;
    writeln!(out, "}}  // namespace {namespace}")?;
    writeln!(out, "}}  // namespace events")?;
    writeln!(out, "}}  // namespace structured")?;
    writeln!(out, "}}  // namespace metrics")?;
    writeln!(out)?;
    writeln!(out, "#endif  // {guard}")?;
    Ok(out)
}

/// Render the implementation file for one project.
pub fn generate_project_impl(project: &Project) -> Result<String> {
    let namespace = snake_case(&project.name);
    let mut out = String::new();
    writeln!(out, "// Generated by unibuild gen-events. Do not edit.")?;
    writeln!(out)?;
    writeln!(
        out,
        "#include \"metrics/structured/structured_events/{namespace}.h\""
    )?;
    writeln!(out)?;
    writeln!(out, "namespace metrics {{")?;
    writeln!(out, "namespace structured {{")?;
    writeln!(out, "namespace events {{")?;
    writeln!(out, "namespace {namespace} {{")?;

    for event in &project.events {
        let class_name = camel_case(&event.name);
        writeln!(out)?;
        writeln!(
            out,
            "{class_name}::{class_name}() : EventBase(\"{}\", \"{}\") {{}}",
            project.name, event.name
        )?;
        writeln!(out, "{class_name}::~{class_name}() = default;")?;
        for metric in &event.metrics {
            let setter = camel_case(&metric.name);
            writeln!(out)?;
            writeln!(
                out,
                "{class_name}& {class_name}::Set{setter}({} value) {{",
                metric.kind.cpp_param()
            )?;
            writeln!(out, "  {}(\"{}\", value);", metric.kind.setter(), metric.name)?;
            writeln!(out, "  return *this;")?;
            writeln!(out, "}}")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "}}  // namespace {namespace}")?;
    writeln!(out, "}}  // namespace events")?;
    writeln!(out, "}}  // namespace structured")?;
    writeln!(out, "}}  // namespace metrics")?;
    Ok(out)
}

/// Load an events description from a JSON file.
#[context("Loading events description {path}")]
pub fn load_description(path: &Utf8Path) -> Result<EventsDescription> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).context("Parsing events description")
}

/// Generate the header and implementation files for every project into
/// `output_dir`, named `<project>.h` / `<project>.cc`.
#[context("Generating event classes in {output_dir}")]
pub fn generate_all(description: &EventsDescription, output_dir: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    for project in &description.projects {
        let base = snake_case(&project.name);
        std::fs::write(
            output_dir.join(format!("{base}.h")),
            generate_project_header(project)?,
        )?;
        std::fs::write(
            output_dir.join(format!("{base}.cc")),
            generate_project_impl(project)?,
        )?;
        tracing::debug!("generated event classes for project {}", project.name);
    }
    Ok(())
}
