//! CLI command implementations
//!
//! Download and upload walk their units of work strictly one at a time.
//! A failing document or file becomes a failed [`Outcome`] and the run
//! moves on; only problems that make the whole run impossible (config,
//! unreachable drive listing or capability catalog) are returned as
//! [`CliError`].

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::time::sleep;

use crate::archive::{list_entries, CompressionMethod, EntryInfo};
use crate::container::{
    export_document, import_container, open_container, read_container, ContainerError,
    ContainerResult, ExportOptions, ImportOptions, ImportReport,
};
use crate::document::Scope;
use crate::drive::{sanitize_name, DriveNode, PathResolver, PATH_SEPARATOR};
use crate::observability::Logger;
use crate::remote::{CreateCommandCatalog, HttpStore, RemoteStore};

use super::args::{Cli, Command};
use super::config::{parse_severity, Config};
use super::errors::{CliError, CliResult};
use super::summary::{Outcome, RunSummary};

/// Where and how downloaded containers are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub root: PathBuf,
    pub extension: String,
    pub skip_existing: bool,
    pub export: ExportOptions,
    /// Pause between consecutive documents
    pub request_delay: Duration,
}

/// Run the CLI with process arguments
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args()).inspect_err(|e| {
        Logger::fatal(
            "RUN_FAILED",
            &[("code", e.code_str()), ("message", e.message())],
        )
    })
}

/// Run a parsed command
pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let severity = match cli.log_level.as_deref() {
        Some(name) => parse_severity(name)?,
        None => config.log_severity()?,
    };
    Logger::set_min_severity(severity);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Download {
            endpoint,
            drive_id,
            skip_existing,
            output,
        } => {
            let store = HttpStore::new(&endpoint, config.request_timeout())?;
            let settings = DownloadSettings {
                root: output.unwrap_or_else(|| config.downloads_dir.clone()),
                extension: config.extension.clone(),
                skip_existing,
                export: config.export_options()?,
                request_delay: config.request_delay(),
            };
            runtime()?.block_on(download_drives(
                &store,
                drive_id.as_deref(),
                &settings,
                &mut out,
            ))?;
            Ok(())
        }
        Command::Upload {
            endpoint,
            drive_id,
            files,
        } => {
            let store = HttpStore::new(&endpoint, config.request_timeout())?;
            let summary = runtime()?.block_on(upload_files(
                &store,
                &drive_id,
                &files,
                &config.import_options(),
                &mut out,
            ))?;
            if summary.failed() > 0 {
                return Err(CliError::upload_failed(summary.failed(), files.len()));
            }
            Ok(())
        }
        Command::Inspect { files } => {
            let failed = inspect_files(&files, &mut out)?;
            if failed > 0 {
                return Err(CliError::inspect_failed(failed, files.len()));
            }
            Ok(())
        }
    }
}

fn runtime() -> CliResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime_error(format!("Failed to start runtime: {}", e)))
}

// ---------------------------------------------------------------------
// download
// ---------------------------------------------------------------------

/// Export every document of `drive_id`, or of every listed drive
pub async fn download_drives<S: RemoteStore, W: Write>(
    store: &S,
    drive_id: Option<&str>,
    settings: &DownloadSettings,
    out: &mut W,
) -> CliResult<RunSummary> {
    let drive_ids = match drive_id {
        Some(id) => vec![id.to_string()],
        None => store.list_drives().await?,
    };

    let mut total = RunSummary::default();
    for (position, id) in drive_ids.iter().enumerate() {
        if position > 0 {
            sleep(settings.request_delay).await;
        }
        let summary = download_drive(store, id, settings).await;
        writeln!(out, "drive {}: {}", id, summary.download_line())?;
        total = total.merge(summary);
    }

    writeln!(out, "total: {}", total.download_line())?;
    write!(out, "{}", total.details())?;
    out.flush()?;
    Ok(total)
}

async fn download_drive<S: RemoteStore>(
    store: &S,
    drive_id: &str,
    settings: &DownloadSettings,
) -> RunSummary {
    let drive = match store.drive(drive_id).await {
        Ok(drive) => drive,
        Err(e) => {
            let error = ContainerError::from(e);
            Logger::error(
                "DRIVE_FAILED",
                &[("drive_id", drive_id), ("reason", error.to_string().as_str())],
            );
            return RunSummary::default().absorb(Outcome::failed(drive_id, &error));
        }
    };

    let root = settings.root.join(sanitize_name(&drive.name));
    let mut resolver = PathResolver::new(&drive.nodes);
    let mut taken = HashSet::new();
    let mut exported = 0usize;
    let mut summary = RunSummary::default();

    for node in drive.files() {
        let outcome = match node.document_type.as_deref() {
            None | Some("") => skipped(node, "no document type"),
            Some(_) => {
                let folder = resolver.parent_path(node);
                let path = target_path(&root, &folder, node, &settings.extension, &mut taken);
                if settings.skip_existing && path.exists() {
                    skipped(node, "already on disk")
                } else {
                    if exported > 0 {
                        sleep(settings.request_delay).await;
                    }
                    exported += 1;
                    export_node(store, drive_id, node, &path, &settings.export).await
                }
            }
        };
        summary = summary.absorb(outcome);
    }

    summary
}

fn skipped(node: &DriveNode, reason: &str) -> Outcome {
    Logger::info(
        "DOCUMENT_SKIPPED",
        &[("document_id", node.id.as_str()), ("reason", reason)],
    );
    Outcome::Skipped {
        subject: node.id.clone(),
        reason: reason.to_string(),
    }
}

async fn export_node<S: RemoteStore>(
    store: &S,
    drive_id: &str,
    node: &DriveNode,
    path: &Path,
    options: &ExportOptions,
) -> Outcome {
    match export_document(store, drive_id, &node.id, path, options).await {
        Ok(report) => {
            let path_text = report.path.display().to_string();
            if report.round_trip.is_match() {
                Logger::info(
                    "DOCUMENT_SAVED",
                    &[("document_id", node.id.as_str()), ("path", path_text.as_str())],
                );
            } else {
                Logger::warn(
                    "ROUND_TRIP_MISMATCH",
                    &[
                        ("document_id", node.id.as_str()),
                        ("path", path_text.as_str()),
                        ("keys", report.round_trip.to_string().as_str()),
                    ],
                );
            }
            Outcome::Saved {
                document_id: report.document_id,
                path: report.path,
                round_trip: report.round_trip,
            }
        }
        Err(e) => {
            Logger::error(
                "DOCUMENT_FAILED",
                &[
                    ("document_id", node.id.as_str()),
                    ("kind", e.kind().as_str()),
                    ("reason", e.to_string().as_str()),
                ],
            );
            Outcome::failed(node.id.clone(), &e)
        }
    }
}

/// `<root>/<folder path>/<name>.<ext>`, suffixed with the document id
/// when an earlier document of the same run already took the path
fn target_path(
    root: &Path,
    folder_path: &str,
    node: &DriveNode,
    extension: &str,
    taken: &mut HashSet<PathBuf>,
) -> PathBuf {
    let dir = folder_path
        .split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |dir, segment| dir.join(segment));
    let stem = sanitize_name(&node.name);

    let path = dir.join(format!("{}.{}", stem, extension));
    if taken.insert(path.clone()) {
        return path;
    }
    let path = dir.join(format!("{}-{}.{}", stem, sanitize_name(&node.id), extension));
    taken.insert(path.clone());
    path
}

// ---------------------------------------------------------------------
// upload
// ---------------------------------------------------------------------

/// Recreate every container in `files` inside `drive_id`
pub async fn upload_files<S: RemoteStore, W: Write>(
    store: &S,
    drive_id: &str,
    files: &[PathBuf],
    options: &ImportOptions,
    out: &mut W,
) -> CliResult<RunSummary> {
    let catalog = CreateCommandCatalog::from_commands(store.create_commands().await?);
    let command_count = catalog.len().to_string();
    Logger::info("CATALOG_LOADED", &[("commands", command_count.as_str())]);

    let mut summary = RunSummary::default();
    for (position, file) in files.iter().enumerate() {
        if position > 0 {
            sleep(options.replay.batch_delay).await;
        }
        let outcome = match upload_file(store, &catalog, drive_id, file, options).await {
            Ok(report) => {
                writeln!(out, "{}: {}", file.display(), describe_upload(&report))?;
                Outcome::Uploaded {
                    source: file.clone(),
                    report,
                }
            }
            Err(e) => {
                let source = file.display().to_string();
                Logger::error(
                    "UPLOAD_FAILED",
                    &[
                        ("file", source.as_str()),
                        ("kind", e.kind().as_str()),
                        ("reason", e.to_string().as_str()),
                    ],
                );
                writeln!(out, "{}: FAILED {}", source, e)?;
                Outcome::failed(source, &e)
            }
        };
        summary = summary.absorb(outcome);
    }

    writeln!(out, "total: {}", summary.upload_line())?;
    write!(out, "{}", summary.details())?;
    out.flush()?;
    Ok(summary)
}

async fn upload_file<S: RemoteStore>(
    store: &S,
    catalog: &CreateCommandCatalog,
    drive_id: &str,
    file: &Path,
    options: &ImportOptions,
) -> ContainerResult<ImportReport> {
    let container = open_container(file)?;
    import_container(store, catalog, drive_id, &container, options).await
}

fn describe_upload(report: &ImportReport) -> String {
    let state_match = match report.state_match() {
        Some(matched) => matched.to_string(),
        None => "n/a".to_string(),
    };
    format!(
        "created {} ({}), pushed {}, stateMatch {}",
        report.document_id, report.name, report.pushed, state_match
    )
}

// ---------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------

/// Print entries and header of each file; returns how many failed
pub fn inspect_files<W: Write>(files: &[PathBuf], out: &mut W) -> CliResult<usize> {
    let mut failed = 0;
    for file in files {
        writeln!(out, "{}", file.display())?;
        match fs::read(file) {
            Ok(bytes) => {
                if !describe_container(&bytes, out)? {
                    failed += 1;
                }
            }
            Err(e) => {
                writeln!(out, "  unreadable: {}", e)?;
                failed += 1;
            }
        }
    }
    out.flush()?;
    Ok(failed)
}

fn method_name(method: u16) -> String {
    match CompressionMethod::from_u16(method) {
        Some(CompressionMethod::Stored) => "stored".to_string(),
        Some(CompressionMethod::Deflate) => "deflate".to_string(),
        None => format!("method {}", method),
    }
}

fn describe_entry(entry: &EntryInfo) -> String {
    format!(
        "    {:<14} {:<8} crc {:08x}  {} -> {} bytes  @{}",
        entry.name,
        method_name(entry.method),
        entry.crc32,
        entry.compressed_size,
        entry.uncompressed_size,
        entry.local_offset
    )
}

fn describe_container<W: Write>(bytes: &[u8], out: &mut W) -> CliResult<bool> {
    match list_entries(bytes) {
        Ok(entries) => {
            writeln!(out, "  entries:")?;
            for entry in &entries {
                writeln!(out, "{}", describe_entry(entry))?;
            }
        }
        Err(e) => writeln!(out, "  directory unreadable: {}", e)?,
    }

    let container = match read_container(bytes) {
        Ok(container) => container,
        Err(e) => {
            writeln!(out, "  invalid container: {}", e)?;
            return Ok(false);
        }
    };

    let header = &container.header;
    writeln!(
        out,
        "  document: {} ({}) \"{}\"",
        header.id, header.document_type, header.name
    )?;
    let revisions: Vec<String> = Scope::ALL
        .iter()
        .map(|scope| format!("{} {}", scope, header.revision_of(*scope)))
        .collect();
    writeln!(out, "  revisions: {}", revisions.join(", "))?;
    let operations: Vec<String> = Scope::ALL
        .iter()
        .map(|scope| format!("{} {}", scope, container.operations.for_scope(*scope).len()))
        .collect();
    writeln!(out, "  operations: {}", operations.join(", "))?;
    Ok(true)
}
