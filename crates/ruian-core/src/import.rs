//! Registry import from RUIAN "address places" CSV exports.
//!
//! The export is a set of semicolon separated files, one per municipality,
//! encoded in windows-1250. Each row is one address place with its town part
//! and (optionally) street. CUZK publishes it monthly as one zip archive; the
//! importer reads either that archive or the extracted files.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use encoding_rs::Encoding;
use rusqlite::Connection;
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use crate::config::ImportConfig;
use crate::error::{Result, RuianError};
use crate::models::{AddressNumber, ImportLog, ImportState, Street, Town};
use crate::storage::database::Database;
use crate::storage::repositories::{
    Repository, SqliteNumberRepository, SqliteStreetRepository, SqliteTownRepository,
    StreetRepository,
};

const COL_NUMBER_CODE: &str = "Kód ADM";
const COL_TOWN_CODE: &str = "Kód části obce";
const COL_TOWN: &str = "Název obce";
const COL_TOWN_PART: &str = "Název části obce";
const COL_ZIP: &str = "PSČ";
const COL_STREET: &str = "Název ulice";
const COL_HOUSE_NUMBER: &str = "Číslo domovní";
const COL_ORIENT_NUMBER: &str = "Číslo orientační";
const COL_ORIENT_LETTER: &str = "Číslo orientační písmeno";
const COL_X: &str = "Souřadnice X";
const COL_Y: &str = "Souřadnice Y";

/// Date tag of the newest monthly export: the last day of the month before `today`.
pub fn archive_tag(today: NaiveDate) -> String {
    let first = today.with_day(1).unwrap_or(today);
    (first - Duration::days(1)).format("%Y%m%d").to_string()
}

/// URL of the monthly CUZK export for the last day of the month before `today`.
pub fn archive_url(today: NaiveDate) -> String {
    format!(
        "https://vdp.cuzk.gov.cz/vymenny_format/csv/{}_OB_ADR_csv.zip",
        archive_tag(today)
    )
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Clear existing registry data before importing.
    pub replace: bool,
    /// Tag recorded in the import log; defaults to today's date.
    pub name: Option<String>,
    pub progress_step: usize,
    pub delimiter: char,
    /// Fallback when a file is not valid UTF-8.
    pub encoding: &'static Encoding,
}

impl ImportOptions {
    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        let encoding = Encoding::for_label(config.encoding.as_bytes()).ok_or_else(|| {
            RuianError::ConfigError(format!("unknown import encoding: {}", config.encoding))
        })?;
        Ok(Self {
            replace: false,
            name: None,
            progress_step: config.progress_step.max(1),
            delimiter: config.delimiter,
            encoding,
        })
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            replace: false,
            name: None,
            progress_step: 1000,
            delimiter: ';',
            encoding: encoding_rs::WINDOWS_1250,
        }
    }
}

/// Per-file counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub rows: u64,
    pub towns: u64,
    pub streets: u64,
    pub numbers: u64,
    pub warnings: u64,
}

impl ImportStats {
    fn add(&mut self, other: &ImportStats) {
        self.rows += other.rows;
        self.towns += other.towns;
        self.streets += other.streets;
        self.numbers += other.numbers;
        self.warnings += other.warnings;
    }
}

/// Ids already written during this run, so that each town, street and
/// number is stored once however many files mention it.
#[derive(Debug, Clone, Default)]
struct SeenIds {
    towns: HashMap<i64, i64>,
    streets: HashMap<String, i64>,
    numbers: HashMap<i64, i64>,
    street_towns: HashSet<(i64, i64)>,
    street_numbers: HashSet<(i64, i64)>,
}

pub struct RuianImporter<'a> {
    db: &'a Database,
    options: ImportOptions,
    seen: SeenIds,
}

impl<'a> RuianImporter<'a> {
    pub fn new(db: &'a Database, options: ImportOptions) -> Self {
        Self {
            db,
            options,
            seen: SeenIds::default(),
        }
    }

    /// Import a single CSV file or every `.csv` file in a directory.
    pub fn run(&mut self, path: &Path) -> Result<ImportLog> {
        info!("=== Starting RUIAN import from {} ===", path.display());
        self.run_logged(|importer, log| importer.import_dir(path, log))
    }

    /// Import every `.csv` entry of a zip archive, such as the monthly export.
    pub fn run_archive<R: Read + Seek>(&mut self, reader: R, label: &str) -> Result<ImportLog> {
        info!("=== Starting RUIAN import from archive {label} ===");
        self.run_logged(|importer, log| importer.import_archive(reader, label, log))
    }

    /// Wrap an import in its log record: running, then done or failed.
    fn run_logged<F>(&mut self, import: F) -> Result<ImportLog>
    where
        F: FnOnce(&mut Self, &mut ImportLog) -> Result<()>,
    {
        let started = Instant::now();

        let name = self
            .options
            .name
            .clone()
            .unwrap_or_else(|| Utc::now().format("%Y%m%d").to_string());
        let mut log = ImportLog::start(name);
        log.id = self.db.save_import_log(&log)?;

        match import(self, &mut log) {
            Ok(()) => {
                log.state = ImportState::Done;
                log.end_date = Some(Utc::now());
                self.db.save_import_log(&log)?;
                info!(
                    "Import completed in {:.2}s: towns {}, streets {}, numbers {}, warnings {}",
                    started.elapsed().as_secs_f64(),
                    log.towns,
                    log.streets,
                    log.numbers,
                    log.warnings
                );
                Ok(log)
            }
            Err(e) => {
                error!("Critical import failure: {e}");
                log.state = ImportState::Failed;
                log.end_date = Some(Utc::now());
                log.error_message = Some(e.to_string());
                self.db.save_import_log(&log)?;
                Err(e)
            }
        }
    }

    fn import_dir(&mut self, path: &Path, log: &mut ImportLog) -> Result<()> {
        let files = collect_csv_files(path)?;
        let names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        self.import_each(&path.display().to_string(), &names, log, |index| {
            Ok(std::fs::read(&files[index])?)
        })
    }

    fn import_archive<R: Read + Seek>(
        &mut self,
        reader: R,
        label: &str,
        log: &mut ImportLog,
    ) -> Result<()> {
        let mut archive = ZipArchive::new(reader)?;
        info!("Archive {label} holds {} entries", archive.len());

        let mut entries = Vec::new();
        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            if entry.is_file() && is_csv(entry.name()) {
                entries.push((entry.name().to_string(), index));
            }
        }
        entries.sort();

        let names: Vec<String> = entries.iter().map(|(name, _)| name.clone()).collect();
        self.import_each(label, &names, log, |index| {
            let mut entry = archive.by_index(entries[index].1)?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
    }

    /// Import `names` in order. `load` fetches the bytes of the n-th file.
    /// A file that fails to load or import is rolled back and counted as a
    /// warning.
    fn import_each<F>(
        &mut self,
        source: &str,
        names: &[String],
        log: &mut ImportLog,
        mut load: F,
    ) -> Result<()>
    where
        F: FnMut(usize) -> Result<Vec<u8>>,
    {
        if names.is_empty() {
            return Err(RuianError::Import {
                file: source.to_string(),
                message: "no CSV files found".to_string(),
            });
        }
        log.file_count = names.len() as u32;
        info!("Found {} CSV files", names.len());

        if self.options.replace {
            self.db.clear_registry()?;
        }

        let mut totals = ImportStats::default();
        for (index, name) in names.iter().enumerate() {
            info!("Processing file {}/{}: {name}", index + 1, names.len());
            let file_started = Instant::now();
            let snapshot = self.seen.clone();

            match load(index).and_then(|bytes| self.import_bytes(name, &bytes)) {
                Ok(stats) => {
                    info!(
                        "Processed {} rows in {:.2}s (T+:{} S+:{} N+:{} W:{})",
                        stats.rows,
                        file_started.elapsed().as_secs_f64(),
                        stats.towns,
                        stats.streets,
                        stats.numbers,
                        stats.warnings
                    );
                    totals.add(&stats);
                }
                Err(e) => {
                    warn!("Rolling back {name}: {e}");
                    self.seen = snapshot;
                    totals.warnings += 1;
                }
            }

            log.files = index as u32 + 1;
            log.rows = totals.rows;
            log.towns = totals.towns;
            log.streets = totals.streets;
            log.numbers = totals.numbers;
            log.warnings = totals.warnings;
            self.db.save_import_log(log)?;
        }
        Ok(())
    }

    /// One file, one transaction.
    pub fn import_file(&mut self, path: &Path) -> Result<ImportStats> {
        let bytes = std::fs::read(path)?;
        self.import_bytes(&path.display().to_string(), &bytes)
    }

    /// Import the raw contents of one CSV file in its own transaction.
    pub fn import_bytes(&mut self, file_name: &str, bytes: &[u8]) -> Result<ImportStats> {
        let text = decode(bytes, self.options.encoding);

        let options = &self.options;
        let seen = &mut self.seen;
        self.db.transaction(|conn| {
            let mut lines = text.lines();
            let header_line = lines.next().ok_or_else(|| RuianError::Import {
                file: file_name.to_string(),
                message: "empty file".to_string(),
            })?;
            let header = Header::parse(header_line, options.delimiter);
            if header.index(COL_NUMBER_CODE).is_none() {
                return Err(RuianError::Import {
                    file: file_name.to_string(),
                    message: format!("missing column '{COL_NUMBER_CODE}'"),
                });
            }

            let mut writer = RowWriter {
                conn,
                seen,
                stats: ImportStats::default(),
            };
            for line in lines.filter(|l| !l.trim().is_empty()) {
                writer.stats.rows += 1;
                if writer.stats.rows % options.progress_step as u64 == 0 {
                    debug!("Processed {} rows...", writer.stats.rows);
                }

                let values = split_record(line, options.delimiter);
                let record = Record {
                    header: &header,
                    values: &values,
                };
                if let Err(e) = writer.process(&record) {
                    warn!("Row {} error: {e}", writer.stats.rows);
                    writer.stats.warnings += 1;
                }
            }
            Ok(writer.stats)
        })
    }
}

fn collect_csv_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let path = entry?.path();
        if path.is_file() && is_csv(&path.to_string_lossy()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_csv(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn decode(bytes: &[u8], fallback: &'static Encoding) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            let (text, _, had_errors) = fallback.decode(bytes);
            if had_errors {
                warn!("{} decoding replaced invalid bytes", fallback.name());
            }
            text.into_owned()
        }
    }
}

/// Split one line, honouring double-quoted fields with `""` escapes.
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

struct Header {
    columns: HashMap<String, usize>,
}

impl Header {
    fn parse(line: &str, delimiter: char) -> Self {
        let columns = split_record(line, delimiter)
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self { columns }
    }

    fn index(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }
}

struct Record<'r> {
    header: &'r Header,
    values: &'r [String],
}

impl Record<'_> {
    fn get(&self, column: &str) -> &str {
        self.header
            .index(column)
            .and_then(|i| self.values.get(i))
            .map(|v| v.trim())
            .unwrap_or_default()
    }

    fn get_code(&self, column: &str) -> Result<Option<i64>> {
        let raw = self.get(column);
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<i64>().map(Some).map_err(|_| {
            RuianError::ValidationError(format!("invalid {column} '{raw}'"))
        })
    }

    fn get_coord(&self, column: &str) -> f64 {
        self.get(column).replace(',', ".").parse().unwrap_or(0.0)
    }

    /// `"<obec> - <část>"` when the town part differs from the municipality.
    fn town_name(&self) -> String {
        let town = self.get(COL_TOWN);
        let part = self.get(COL_TOWN_PART);
        if !part.is_empty() && part != town {
            format!("{town} - {part}")
        } else {
            town.to_string()
        }
    }

    /// Orientation number (with its letter) if any, else the house number.
    fn number_name(&self) -> String {
        let parts: Vec<&str> = [self.get(COL_ORIENT_NUMBER), self.get(COL_ORIENT_LETTER)]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() {
            return parts.join(" ");
        }
        match self.get(COL_HOUSE_NUMBER) {
            "" => "Unknown".to_string(),
            house => house.to_string(),
        }
    }
}

struct RowWriter<'c, 's> {
    conn: &'c Connection,
    seen: &'s mut SeenIds,
    stats: ImportStats,
}

impl RowWriter<'_, '_> {
    fn process(&mut self, record: &Record<'_>) -> Result<()> {
        let town = self.town(record);
        let street = self.street(record, town)?;
        self.number(record, town, street)
    }

    /// Town problems only drop the town link; the row still imports.
    fn town(&mut self, record: &Record<'_>) -> Option<i64> {
        let code = match record.get_code(COL_TOWN_CODE) {
            Ok(Some(code)) => code,
            Ok(None) => return None,
            Err(e) => {
                warn!("Town error in row {}: {e}", self.stats.rows);
                self.stats.warnings += 1;
                return None;
            }
        };
        if let Some(id) = self.seen.towns.get(&code) {
            return Some(*id);
        }

        let town = Town::new(code, record.town_name(), record.get(COL_ZIP));
        if town.name.is_empty() || town.postal_code.is_empty() {
            warn!("Town error in row {}: missing name or postal code", self.stats.rows);
            self.stats.warnings += 1;
            return None;
        }

        match SqliteTownRepository::new(self.conn).save(&town) {
            Ok(id) => {
                self.seen.towns.insert(code, id);
                self.stats.towns += 1;
                debug!("Created town: {} ({code})", town.name);
                Some(id)
            }
            Err(e) => {
                warn!("Town error in row {}: {e}", self.stats.rows);
                self.stats.warnings += 1;
                None
            }
        }
    }

    fn street(&mut self, record: &Record<'_>, town: Option<i64>) -> Result<Option<i64>> {
        let name = record.get(COL_STREET);
        if name.is_empty() {
            return Ok(None);
        }

        let repo = SqliteStreetRepository::new(self.conn);
        let id = match self.seen.streets.get(name) {
            Some(id) => *id,
            None => {
                let id = repo.save(&Street::new(name))?;
                self.seen.streets.insert(name.to_string(), id);
                self.stats.streets += 1;
                debug!("Created street: {name}");
                id
            }
        };

        if let Some(town) = town
            && self.seen.street_towns.insert((id, town))
        {
            repo.link_town(id, town)?;
        }
        Ok(Some(id))
    }

    fn number(
        &mut self,
        record: &Record<'_>,
        town: Option<i64>,
        street: Option<i64>,
    ) -> Result<()> {
        let Some(code) = record.get_code(COL_NUMBER_CODE)? else {
            return Ok(());
        };

        let id = match self.seen.numbers.get(&code) {
            Some(id) => *id,
            None => {
                let mut number = AddressNumber::new(code, record.number_name());
                number.coord_x = record.get_coord(COL_X);
                number.coord_y = record.get_coord(COL_Y);
                number.town_id = town;

                let id = SqliteNumberRepository::new(self.conn).save(&number)?;
                self.seen.numbers.insert(code, id);
                self.stats.numbers += 1;
                debug!("Created number: {} ({code})", number.name);
                id
            }
        };

        if let Some(street) = street
            && self.seen.street_numbers.insert((street, id))
        {
            SqliteStreetRepository::new(self.conn).link_number(street, id)?;
        }
        Ok(())
    }
}
