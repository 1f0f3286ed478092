/*!
 * Delimited-text ingestion into the embedded database.
 *
 * Each CSV or TSV file becomes one table named after the file. Loading a
 * file replaces any table of the same name; every column is stored as TEXT
 * and empty fields become NULL. Rows are inserted in a single transaction.
 */

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::backend::{quote_identifier, SqliteBackend};

// @struct: Summary of one loaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTable {
    pub source: PathBuf,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

// @returns: Table name derived from the file's base name
pub fn sanitize_table_name<P: AsRef<Path>>(path: P) -> String {
    let stem = path
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut name: String = stem
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() {
        name.push_str("table");
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "t_");
    }
    name
}

// @returns: Field delimiter for a supported file extension
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> Option<char> {
    let ext = path.as_ref().extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "csv" => Some(','),
        "tsv" | "tab" => Some('\t'),
        _ => None,
    }
}

/// Split delimited text into records
///
/// Follows RFC 4180: fields may be wrapped in double quotes, a doubled quote
/// inside a quoted field is a literal quote, and quoted fields may span
/// lines. Both `\n` and `\r\n` end a record. Blank lines are skipped.
pub fn parse_delimited(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        bail!("Unterminated quoted field near line {}", line);
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

// @returns: Header names made unique and non-empty
fn column_names(header: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (index, raw) in header.iter().enumerate() {
        let base = match raw.trim() {
            "" => format!("column_{}", index + 1),
            trimmed => trimmed.to_string(),
        };
        let mut name = base.clone();
        let mut suffix = 2;
        while names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn create_table_sql(table: &str, columns: &[String]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_identifier(c, '"')))
        .collect();
    format!("CREATE TABLE {} ({})", quote_identifier(table, '"'), definitions.join(", "))
}

fn insert_sql(table: &str, width: usize) -> String {
    let placeholders: Vec<String> = (1..=width).map(|i| format!("?{}", i)).collect();
    format!("INSERT INTO {} VALUES ({})", quote_identifier(table, '"'), placeholders.join(", "))
}

/// Load one CSV/TSV file, replacing the table named after it
pub async fn load_file<P: AsRef<Path>>(db: &SqliteBackend, path: P) -> Result<LoadedTable> {
    let path = path.as_ref();
    let delimiter = delimiter_for(path)
        .ok_or_else(|| anyhow!("Unsupported file type (expected .csv or .tsv): {}", path.display()))?;
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let mut records = parse_delimited(text.trim_start_matches('\u{feff}'), delimiter)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if records.is_empty() {
        bail!("File has no header row: {}", path.display());
    }

    let header = records.remove(0);
    let columns = column_names(&header);
    let width = columns.len();
    for (index, record) in records.iter_mut().enumerate() {
        if record.len() > width {
            bail!(
                "Row {} of {} has {} fields, header has {}",
                index + 2,
                path.display(),
                record.len(),
                width
            );
        }
        record.resize(width, String::new());
    }

    let table = sanitize_table_name(path);
    let row_count = records.len();
    debug!("Loading {} row(s) into '{}'", row_count, table);

    let drop_sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(&table, '"'));
    let create_sql = create_table_sql(&table, &columns);
    let insert_sql = insert_sql(&table, width);

    db.run_blocking(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(&drop_sql, [])?;
        tx.execute(&create_sql, [])?;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for record in &records {
                let values = record.iter().map(|v| if v.is_empty() { None } else { Some(v.as_str()) });
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()
    })
    .await?
    .with_context(|| format!("Failed to load {} into table '{}'", path.display(), table))?;

    info!("Loaded {} row(s) from {} into '{}'", row_count, path.display(), table);
    Ok(LoadedTable {
        source: path.to_path_buf(),
        table,
        columns,
        rows: row_count,
    })
}

/// Load a file, or every CSV/TSV file under a directory
pub async fn load_path<P: AsRef<Path>>(db: &SqliteBackend, path: P) -> Result<Vec<LoadedTable>> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(vec![load_file(db, path).await?]);
    }
    if !path.is_dir() {
        bail!("Path does not exist: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry.context("Failed to read directory entry")?;
        if entry.file_type().is_file() && delimiter_for(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        warn!("No .csv or .tsv files found under {}", path.display());
    }

    let mut loaded = Vec::with_capacity(files.len());
    for file in files {
        loaded.push(load_file(db, &file).await?);
    }
    Ok(loaded)
}
