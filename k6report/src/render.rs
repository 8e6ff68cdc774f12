//! HTML rendering of a [`Report`]
//!
//! Rendering reads the report and nothing else. Every source is rendered,
//! passing or not; within a source only hierarchical groups get a row.

use std::{
    fmt::{self, Write as _},
    fs, io,
    path::{Path, PathBuf},
};

use k6report_results::{
    aggregate::SourceSummary,
    reduce::Report,
    threshold::Verdict,
};

/// Errors produced while rendering or persisting a report
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The report could not be written to disk.
    #[error("Failed to write report to {path:?}: {source}")]
    Write {
        /// Output path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// The document could not be formatted.
    #[error("Failed to format report: {0}")]
    Format(#[from] fmt::Error),
}

const PASSED_CLASS: &str = "bg-green-100 text-green-800";
const FAILED_CLASS: &str = "bg-red-100 text-red-800";

/// Escape text for inclusion in HTML element content or attribute values.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

fn status_class(passed: bool) -> &'static str {
    if passed { PASSED_CLASS } else { FAILED_CLASS }
}

fn status_text(passed: bool) -> &'static str {
    if passed { "Passed" } else { "Failed" }
}

/// Render `report` as a complete HTML document headed by `title`.
///
/// # Errors
///
/// Returns [`Error::Format`] if a value's `Display` implementation fails.
pub fn render(report: &Report, title: &str) -> Result<String, Error> {
    let mut html = String::with_capacity(8 * 1024);
    write_document(&mut html, report, title)?;
    Ok(html)
}

fn write_document(out: &mut String, report: &Report, title: &str) -> fmt::Result {
    let title = Escaped(title);
    write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        body {{ font-family: 'Inter', sans-serif; background-color: #f3f4f6; }}
    </style>
</head>
<body class="p-4 sm:p-8">
    <div class="max-w-4xl mx-auto bg-white rounded-xl shadow-lg p-6 sm:p-10">
        <h1 class="text-3xl sm:text-4xl font-extrabold text-center text-gray-800 mb-6">{title}</h1>
"#
    )?;
    write_summary(out, report)?;
    write_thresholds(out, report)?;
    for (name, summary) in report.sources.iter() {
        write_source(out, name, summary)?;
    }
    out.write_str("    </div>\n</body>\n</html>\n")
}

fn write_card(out: &mut String, class: &str, label: &str, value: &str) -> fmt::Result {
    write!(
        out,
        r#"            <div class="{class} p-4 rounded-lg shadow-md">
                <p class="text-sm font-semibold">{label}</p>
                <p class="text-2xl font-bold">{value}</p>
            </div>
"#
    )
}

fn write_summary(out: &mut String, report: &Report) -> fmt::Result {
    let global = &report.global;
    out.write_str(
        r#"        <h2 class="text-2xl font-bold text-gray-700 mb-4">Overall Test Summary</h2>
        <div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4 mb-8 text-center">
"#,
    )?;
    write_card(
        out,
        "bg-blue-100 text-blue-800",
        "Total Requests",
        &global.requests.to_string(),
    )?;
    write_card(
        out,
        "bg-green-100 text-green-800",
        "Requests Passed",
        &global.passed_requests().to_string(),
    )?;
    write_card(
        out,
        "bg-red-100 text-red-800",
        "Requests Failed",
        &global.failures.to_string(),
    )?;
    write_card(
        out,
        "bg-gray-100 text-gray-800",
        "Avg. Response Time",
        &format!("{:.2} ms", global.average_duration),
    )?;
    write_card(
        out,
        "bg-yellow-100 text-yellow-800",
        "Max Virtual Users",
        &global.peak_vus.to_string(),
    )?;
    write_card(
        out,
        "bg-purple-100 text-purple-800",
        "Data Sent",
        &format!("{:.2} MB", global.data_sent_mib()),
    )?;
    write_card(
        out,
        "bg-indigo-100 text-indigo-800",
        "Data Received",
        &format!("{:.2} MB", global.data_received_mib()),
    )?;
    out.write_str("        </div>\n")
}

fn write_verdict(out: &mut String, verdict: &Verdict) -> fmt::Result {
    write!(
        out,
        r#"            <div class="p-4 rounded-lg shadow-md {class}">
                <p class="font-semibold text-gray-900">{label}</p>
                <p class="text-lg font-bold">{status}</p>
            </div>
"#,
        class = status_class(verdict.passed),
        label = Escaped(&verdict.label),
        status = verdict.status(),
    )
}

fn write_thresholds(out: &mut String, report: &Report) -> fmt::Result {
    out.write_str(
        r#"        <h2 class="text-2xl font-bold text-gray-700 mb-4">Thresholds Summary</h2>
        <div class="grid grid-cols-1 sm:grid-cols-2 gap-4 mb-8">
"#,
    )?;
    write_verdict(out, &report.thresholds.failure_rate)?;
    write_verdict(out, &report.thresholds.duration)?;
    out.write_str("        </div>\n")
}

fn write_source(out: &mut String, name: &str, summary: &SourceSummary) -> fmt::Result {
    write!(
        out,
        r#"        <h2 class="text-2xl font-bold text-gray-700 mb-4 mt-8">{name} Performance</h2>
        <div class="overflow-x-auto">
            <table class="min-w-full bg-white rounded-lg shadow-md overflow-hidden">
                <thead class="bg-gray-200">
                    <tr>
                        <th class="px-6 py-3 text-left text-xs font-semibold text-gray-600 uppercase tracking-wider">Endpoint Group</th>
                        <th class="px-6 py-3 text-left text-xs font-semibold text-gray-600 uppercase tracking-wider">Status</th>
                        <th class="px-6 py-3 text-left text-xs font-semibold text-gray-600 uppercase tracking-wider">Avg. Time Taken</th>
                    </tr>
                </thead>
                <tbody class="divide-y divide-gray-200">
"#,
        name = Escaped(name),
    )?;
    for row in summary.endpoint_rows() {
        let passed = row.passed();
        write!(
            out,
            r#"                    <tr class="hover:{hover}">
                        <td class="px-6 py-4 whitespace-nowrap text-sm text-gray-900">{endpoint}</td>
                        <td class="px-6 py-4 whitespace-nowrap text-sm font-medium">
                            <span class="px-2 inline-flex text-xs leading-5 font-semibold rounded-full {class}">{status}</span>
                        </td>
                        <td class="px-6 py-4 whitespace-nowrap text-sm text-gray-500">{average:.2} ms</td>
                    </tr>
"#,
            hover = if passed { "bg-green-50" } else { "bg-red-50" },
            endpoint = Escaped(row.endpoint),
            class = status_class(passed),
            status = status_text(passed),
            average = row.average,
        )?;
    }
    out.write_str(
        r"                </tbody>
            </table>
        </div>
",
    )
}

/// Write a rendered document to `path`.
///
/// # Errors
///
/// Returns [`Error::Write`] if the file cannot be created or written.
pub fn write_report(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}
