use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use futures::executor::block_on;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fieldkit::form::FormHandle;
use fieldkit::io::{parse_document_any, parse_form_definition};
use fieldkit::{
    DocumentFormat, FormOptions, FormPanel, FormRequest, OutputDestination, OutputOptions,
    StaticTransport, build_form, emit,
};

const DATA_URL: &str = "fieldkit://data";
const SUBMIT_URL: &str = "fieldkit://submit";

#[derive(Debug, Parser)]
#[command(
    name = "fieldkit",
    version,
    about = "Validate data against a form definition and emit the submitted payload"
)]
struct Cli {
    /// Form definition source: file path, inline payload, or "-" for stdin
    #[arg(short = 'F', long = "form", value_name = "SOURCE")]
    form: String,

    /// Data source loaded into the form: file path, inline payload, or "-" for stdin
    #[arg(short = 'd', long = "data", value_name = "SOURCE")]
    data: Option<String>,

    /// Output destinations ("-" writes to stdout). Accepts multiple values per flag use.
    #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<String>,

    /// Emit compact JSON/TOML rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,

    /// Overwrite output files even if they already exist
    #[arg(short = 'f', long = "force", short_alias = 'y', alias = "yes")]
    force: bool,

    /// Log form activity to stderr (repeat for more detail)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut diagnostics = DiagnosticCollector::default();
    if cli.form == "-" && cli.data.as_deref() == Some("-") {
        diagnostics.push_input(
            "form/data",
            "cannot read form and data from stdin simultaneously; provide inline content or files",
        );
    }
    let form_value = load_source(&cli.form, "form", &mut diagnostics);
    let data_value = cli
        .data
        .as_deref()
        .and_then(|source| load_source(source, "data", &mut diagnostics));
    let output = build_output_options(&cli, &mut diagnostics);
    diagnostics.into_result()?;

    let Some(form_value) = form_value else {
        return Err(eyre!("no form definition loaded"));
    };
    let definition = parse_form_definition(form_value).map_err(|err| eyre!("{err:#}"))?;
    let form = build_form(&definition, FormOptions::default())
        .wrap_err("failed to build form from definition")?;
    if let Some(title) = &definition.title {
        debug!(%title, "form built");
    }

    let mut transport = StaticTransport::new();
    if let Some(data) = data_value.clone() {
        transport = transport.with_document(DATA_URL, data);
    }
    let transport = Rc::new(transport);
    let panel = FormPanel::new(form, transport.clone());

    block_on(async {
        if data_value.is_some() {
            panel
                .load(&FormRequest::new(DATA_URL))
                .await
                .map_err(|err| eyre!("{err:#}"))?;
        }
        let response = panel
            .submit(&FormRequest::new(SUBMIT_URL))
            .await
            .map_err(|err| eyre!("{err:#}"))?;
        if response.success {
            Ok(())
        } else {
            Err(report_invalid(panel.form()))
        }
    })?;

    let payload = transport
        .posted()
        .pop()
        .map(|request| request.data)
        .unwrap_or(Value::Null);
    emit(&payload, &output).map_err(|err| eyre!("{err:#}"))?;
    Ok(())
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "fieldkit=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Lists every field with a cached error and turns them into one report.
fn report_invalid(form: &FormHandle) -> Report {
    let failures = form.read(|tree| {
        tree.get_fields()
            .into_iter()
            .filter_map(|id| {
                let field = tree.field(id)?;
                if !field.has_error() {
                    return None;
                }
                let message = field
                    .validation_result()
                    .message()
                    .unwrap_or("invalid value")
                    .to_string();
                Some((field.name().to_string(), message))
            })
            .collect::<Vec<_>>()
    });
    let mut body = format!("form is invalid ({} field(s)):\n", failures.len());
    for (name, message) in &failures {
        let _ = writeln!(body, "  {name}: {message}");
    }
    eyre!(body)
}

fn load_source(
    source: &str,
    label: &str,
    diagnostics: &mut DiagnosticCollector,
) -> Option<Value> {
    match load_value(source, label) {
        Ok(value) => Some(value),
        Err(err) => {
            diagnostics.push_input(label, format!("{err:#}"));
            None
        }
    }
}

fn load_value(source: &str, label: &str) -> Result<Value> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .wrap_err("failed to read from stdin")?;
        return parse_contents(&buffer, DocumentFormat::default(), label);
    }
    let path = Path::new(source);
    if !path.is_file() {
        return parse_contents(source, DocumentFormat::default(), &format!("inline {label}"));
    }
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to load {label} from {}", path.display()))?;
    let format = DocumentFormat::from_path(path).unwrap_or_default();
    parse_contents(&contents, format, label)
}

fn parse_contents(contents: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    parse_document_any(contents, format).map_err(|err| eyre!("failed to parse {label}: {err:#}"))
}

#[derive(Default)]
struct DiagnosticCollector {
    messages: Vec<String>,
}

impl DiagnosticCollector {
    fn push_input(&mut self, label: &str, message: impl Into<String>) {
        self.messages
            .push(format!("input ({label}): {}", message.into()));
    }

    fn push_output(&mut self, message: impl Into<String>) {
        self.messages.push(format!("output: {}", message.into()));
    }

    fn into_result(self) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        let mut body = String::from("encountered input/output issues:\n");
        for (idx, msg) in self.messages.iter().enumerate() {
            let _ = writeln!(body, "  {}. {}", idx + 1, msg);
        }
        Err(eyre!(body))
    }
}

fn build_output_options(cli: &Cli, diagnostics: &mut DiagnosticCollector) -> OutputOptions {
    let mut destinations = Vec::new();
    for raw in &cli.outputs {
        if raw.trim().is_empty() {
            diagnostics.push_output("output destination cannot be empty");
            continue;
        }
        destinations.push(OutputDestination::parse(raw));
    }
    if destinations.is_empty() {
        destinations.push(OutputDestination::Stdout);
    }

    let files = destinations
        .iter()
        .filter_map(|dest| match dest {
            OutputDestination::File(path) => Some(path.clone()),
            OutputDestination::Stdout => None,
        })
        .collect::<Vec<_>>();
    let format = infer_format_from_files(&files, diagnostics).unwrap_or_default();
    if !cli.force {
        for path in files.iter().filter(|path| path.exists()) {
            diagnostics.push_output(format!(
                "file {} already exists (pass --force to overwrite)",
                path.display()
            ));
        }
    }

    OutputOptions::new(format)
        .with_pretty(!cli.no_pretty)
        .with_destinations(destinations)
}

fn infer_format_from_files(
    files: &[PathBuf],
    diagnostics: &mut DiagnosticCollector,
) -> Option<DocumentFormat> {
    let mut detected: Option<DocumentFormat> = None;
    for path in files {
        let Some(format) = DocumentFormat::from_path(path) else {
            diagnostics.push_output(format!(
                "cannot infer format from output file {}; use .json/.yaml/.toml with a matching feature",
                path.display()
            ));
            continue;
        };
        match detected {
            Some(existing) if existing != format => diagnostics.push_output(format!(
                "output file {} uses {format} but other destinations use {existing}; align extensions",
                path.display()
            )),
            Some(_) => {}
            None => detected = Some(format),
        }
    }
    detected
}
