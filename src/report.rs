use std::io::Write;

use anyhow::{Context, Result};
use console::style;

use crate::cli::OutputFormat;
use crate::lookup::ReportEntry;

/// Fixed strings of the text report.
#[derive(Debug, Clone)]
pub struct Templates {
    pub section_open: &'static str,
    pub section_close: &'static str,
    pub path_separator: &'static str,
    pub detail_indent: &'static str,
    pub signature_separator: &'static str,
    pub not_found: &'static str,
    pub found: &'static str,
    pub detected: &'static str,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            section_open: "[*] (",
            section_close: "):",
            path_separator: "\n     ",
            detail_indent: "\t   ",
            signature_separator: "\n\t\t",
            not_found: "NOT FOUND",
            found: "FOUND",
            detected: "DETECTED",
        }
    }
}

pub struct Renderer {
    format: OutputFormat,
    templates: Templates,
    colors: bool,
}

impl Renderer {
    pub fn new(format: OutputFormat, colors: bool) -> Self {
        Self {
            format,
            templates: Templates::default(),
            colors,
        }
    }

    pub fn render<W: Write>(&self, out: &mut W, entries: &[ReportEntry]) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                for entry in entries {
                    self.render_entry(out, entry)
                        .context("failed to write report")?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, entries)
                    .context("failed to serialize report to JSON")?;
                writeln!(out).context("failed to write report")?;
            }
            OutputFormat::Yaml => {
                serde_yaml::to_writer(&mut *out, entries)
                    .context("failed to serialize report to YAML")?;
            }
        }
        Ok(())
    }

    fn render_entry<W: Write>(&self, out: &mut W, entry: &ReportEntry) -> std::io::Result<()> {
        let t = &self.templates;
        let paths: Vec<String> = entry
            .paths
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        writeln!(
            out,
            "{}{}{}",
            t.section_open,
            paths.join(t.path_separator),
            t.section_close
        )?;

        let result = &entry.result;
        if !result.found {
            return writeln!(out, "{}", t.not_found);
        }
        writeln!(out, "{}", style(t.found).yellow().force_styling(self.colors))?;
        if !result.is_detected() {
            return Ok(());
        }
        writeln!(
            out,
            "\t_ Results: {}/{} {}",
            result.positives,
            result.total,
            style(t.detected).red().force_styling(self.colors)
        )?;
        writeln!(out, "{}SHA256: {}", t.detail_indent, result.digest)?;
        writeln!(
            out,
            "{}Scan Date: {}",
            t.detail_indent,
            result.scan_date.as_deref().unwrap_or("unknown")
        )?;
        writeln!(
            out,
            "{}Signatures:{}{}",
            t.detail_indent,
            t.signature_separator,
            result.signatures.join(t.signature_separator)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupResult;
    use std::path::PathBuf;

    fn render(format: OutputFormat, entries: &[ReportEntry]) -> String {
        let mut out = Vec::new();
        Renderer::new(format, false)
            .render(&mut out, entries)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn detected() -> ReportEntry {
        ReportEntry {
            paths: vec![PathBuf::from("eicar.com")],
            result: LookupResult {
                digest: "275a02".into(),
                found: true,
                positives: 3,
                total: 60,
                scan_date: Some("2010-05-15 03:38:44".into()),
                signatures: vec!["EICAR-Test-File".into(), "Eicar-Test-Signature".into()],
                permalink: None,
                message: None,
            },
        }
    }

    #[test]
    fn not_found_omits_details() {
        let entry = ReportEntry {
            paths: vec![PathBuf::from("a"), PathBuf::from("b")],
            result: LookupResult::not_found("ff"),
        };
        assert_eq!(
            render(OutputFormat::Text, &[entry]),
            "[*] (a\n     b):\nNOT FOUND\n"
        );
    }

    #[test]
    fn clean_file_prints_found_only() {
        let mut entry = detected();
        entry.result.positives = 0;
        entry.result.signatures.clear();
        assert_eq!(
            render(OutputFormat::Text, &[entry]),
            "[*] (eicar.com):\nFOUND\n"
        );
    }

    #[test]
    fn detection_prints_counts_and_signatures() {
        let text = render(OutputFormat::Text, &[detected()]);
        assert_eq!(
            text,
            "[*] (eicar.com):\nFOUND\n\
             \t_ Results: 3/60 DETECTED\n\
             \t   SHA256: 275a02\n\
             \t   Scan Date: 2010-05-15 03:38:44\n\
             \t   Signatures:\n\t\tEICAR-Test-File\n\t\tEicar-Test-Signature\n"
        );
    }

    #[test]
    fn colors_only_when_enabled() {
        let mut out = Vec::new();
        Renderer::new(OutputFormat::Text, true)
            .render(&mut out, &[detected()])
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\u{1b}[33mFOUND\u{1b}[0m"));
        assert!(text.contains("\u{1b}[31mDETECTED\u{1b}[0m"));
        assert!(!render(OutputFormat::Text, &[detected()]).contains('\u{1b}'));
    }

    #[test]
    fn json_output_flattens_result() {
        let text = render(OutputFormat::Json, &[detected()]);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["paths"][0], "eicar.com");
        assert_eq!(value[0]["positives"], 3);
        assert_eq!(value[0]["signatures"].as_array().unwrap().len(), 2);
        assert!(value[0].get("permalink").is_none());
    }

    #[test]
    fn yaml_output_lists_entries() {
        let text = render(OutputFormat::Yaml, &[detected()]);
        assert!(text.contains("digest: 275a02"));
        assert!(text.contains("- eicar.com"));
    }
}
