use std::io::{self, Write};

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::CorrelatedResult;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub searched_at: String,
    pub count: usize,
    pub results: Vec<CorrelatedResult>,
}

impl SearchReport {
    pub fn new(query: &str, results: Vec<CorrelatedResult>) -> Self {
        Self {
            query: query.to_string(),
            searched_at: chrono::Utc::now().to_rfc3339(),
            count: results.len(),
            results,
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &SearchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_config(config: &ResolvedConfig) -> io::Result<()> {
        Self::print_json(config)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &SearchReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_report(&mut stdout, report)
    }

    pub fn write_report(out: &mut dyn Write, report: &SearchReport) -> io::Result<()> {
        if report.results.is_empty() {
            writeln!(out, "no entries match {:?}", report.query)?;
            return Ok(());
        }
        let width = column_width(report.results.iter().map(|r| r.identifier.as_str()));
        let accession_width =
            column_width(report.results.iter().map(|r| r.accession.as_deref().unwrap_or("-")));
        for result in &report.results {
            let accession = result.accession.as_deref().unwrap_or("-");
            let title = if result.has_title() {
                result.title.as_str()
            } else {
                "-"
            };
            writeln!(
                out,
                "{:<width$}  {accession:<accession_width$}  {title}",
                result.identifier
            )?;
        }
        Ok(())
    }
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).max().unwrap_or(0)
}
