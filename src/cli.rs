//! CLI: check documents against a shape descriptor, or sample instances of one.
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use shape_codec::{ArbitraryConfig, DecodeErrors, Descriptor, Shape};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode, guard and generate JSON against runtime shape descriptors
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every input document and report failures as error trees
    Check(CheckOut),
    /// print random instances of the shape as NDJSON
    Sample(SampleOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    /// shape descriptor (.json)
    #[arg(long)]
    shape: PathBuf,

    #[command(flatten)]
    input_settings: InputSettings,

    /// only run the guard; failures carry no error tree
    #[arg(long)]
    guard_only: bool,

    /// write a JSON report of every document to this file
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct SampleOut {
    /// shape descriptor (.json)
    #[arg(long)]
    shape: PathBuf,

    /// number of instances
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// RNG seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// depth after which collections come out empty
    #[arg(long, default_value_t = ArbitraryConfig::default().max_depth)]
    max_depth: usize,

    /// upper bound for collection lengths
    #[arg(long, default_value_t = ArbitraryConfig::default().max_len)]
    max_len: usize,

    /// output .ndjson file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document, labeled by where it came from.
#[derive(Debug)]
struct Document {
    source: String,
    value: Value,
}

#[derive(Debug, Serialize)]
struct Outcome {
    source: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<DecodeErrors>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = read_source(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (ix, line) in source.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse JSON at {source_path_str}:{}", ix + 1))?;
                    self.select(format!("{source_path_str}:{}", ix + 1), value, &mut out)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                self.select(source_path_str, value, &mut out)?;
            }
        }
        debug!("loaded {} document(s)", out.len());
        Ok(out)
    }

    fn select(&self, source: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .with_context(|| format!("JSON pointer {pointer} selects nothing in {source}"))?,
        };
        match self.jq_expr.as_deref() {
            None => out.push(Document { source, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {source}"))?;
                let many = results.len() > 1;
                for (ix, value) in results.into_iter().enumerate() {
                    let source = if many { format!("{source}#{ix}") } else { source.clone() };
                    out.push(Document { source, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when some checked document failed.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Sample(target) => target.run().map(|()| true),
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<bool> {
        let shape = load_shape(&self.shape)?;
        let documents = self.input_settings.load_documents()?;
        let outcomes: Vec<Outcome> = documents
            .into_par_iter()
            .map(|doc| {
                if self.guard_only {
                    let ok = shape.is(&doc.value);
                    Outcome { source: doc.source, ok, errors: None }
                } else {
                    match shape.decode(&doc.value) {
                        Ok(_) => Outcome { source: doc.source, ok: true, errors: None },
                        Err(errors) => Outcome { source: doc.source, ok: false, errors: Some(errors) },
                    }
                }
            })
            .collect();

        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();
        for outcome in &outcomes {
            print_outcome(&mut stdout, outcome)?;
        }
        let failed = outcomes.iter().filter(|o| !o.ok).count();
        writeln!(
            stdout,
            "{} passed, {} failed",
            (outcomes.len() - failed).to_string().green(),
            failed.to_string().red()
        )?;

        if let Some(out) = self.out.as_ref() {
            let report = serde_json::to_string_pretty(&outcomes)?;
            write_output(out, &report)?;
        }
        Ok(failed == 0)
    }
}

impl SampleOut {
    fn run(&self) -> Result<()> {
        let shape = load_shape(&self.shape)?;
        let config = ArbitraryConfig { max_depth: self.max_depth, max_len: self.max_len, ..ArbitraryConfig::default() };
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut lines = String::new();
        for ix in 0..self.count {
            let value = shape
                .generate_with(&mut rng, config)
                .with_context(|| format!("failed to generate instance {ix}"))?;
            lines.push_str(&serde_json::to_string(&value)?);
            lines.push('\n');
        }
        match self.out.as_ref() {
            Some(out) => write_output(out, &lines),
            None => {
                std::io::stdout().write_all(lines.as_bytes())?;
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_shape(path: &Path) -> Result<Shape> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shape descriptor {}", path.display()))?;
    let shape = Descriptor::parse(&source)
        .and_then(Descriptor::compile)
        .with_context(|| format!("invalid shape descriptor {}", path.display()))?;
    debug!("loaded shape `{}`", shape.expected());
    Ok(shape)
}

fn print_outcome(w: &mut impl Write, outcome: &Outcome) -> Result<()> {
    if outcome.ok {
        writeln!(w, "{} {}", "✓".green(), outcome.source)?;
        return Ok(());
    }
    writeln!(w, "{} {}", "✗".red(), outcome.source.bold())?;
    if let Some(errors) = outcome.errors.as_ref() {
        for leaf in errors.leaves() {
            let actual = leaf.actual.map_or_else(|| "undefined".to_string(), Value::to_string);
            let path = leaf.path.to_string();
            let at = if path.is_empty() { "<root>".to_string() } else { path };
            writeln!(w, "    {}: expected {}, got {}", at.yellow(), leaf.expected, actual.dimmed())?;
        }
        writeln!(w, "{}", serde_json::to_string_pretty(errors)?)?;
    }
    Ok(())
}

fn write_output(out: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn read_source(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        Ok(s)
    } else {
        std::fs::read_to_string(path)
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(json_pointer: Option<&str>, jq_expr: Option<&str>) -> InputSettings {
        InputSettings {
            ndjson: false,
            json_pointer: json_pointer.map(str::to_string),
            jq_expr: jq_expr.map(str::to_string),
            input: vec![],
        }
    }

    #[test]
    fn json_pointer_selects_a_subnode() {
        let mut out = Vec::new();
        settings(Some("/data/0"), None).select("a.json".into(), json!({"data": [{"x": 1}]}), &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, json!({"x": 1}));
    }

    #[test]
    fn missing_pointer_target_is_an_error() {
        let mut out = Vec::new();
        assert!(settings(Some("/nope"), None).select("a.json".into(), json!({}), &mut out).is_err());
    }

    #[test]
    fn jq_outputs_become_separate_documents() {
        let mut out = Vec::new();
        settings(None, Some(".[]")).select("a.json".into(), json!([1, 2]), &mut out).unwrap();
        let sources: Vec<&str> = out.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, ["a.json#0", "a.json#1"]);
    }

    #[test]
    fn literal_paths_pass_through_unresolved() {
        let paths = resolve_file_path_patterns(["a.json", "-"]).unwrap();
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("-")]);
    }

    #[test]
    fn outcomes_serialize_without_empty_errors() {
        let o = Outcome { source: "a".into(), ok: true, errors: None };
        assert_eq!(serde_json::to_value(&o).unwrap(), json!({"source": "a", "ok": true}));
    }
}
