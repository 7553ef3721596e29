use std::collections::HashSet;
use std::fs::File;
use std::io::Read;

use stat_arb_core::series::parse_date;
use stat_arb_core::PricePoint;

use super::file::resolve_path;

/// Observations read from one price file.
#[derive(Debug, Clone, Default)]
pub struct LoadedPrices {
    pub points: Vec<PricePoint>,
    /// Rows with an empty or `null` value
    pub skipped: usize,
    /// Rows whose date was already seen (the first row wins)
    pub duplicates: usize,
}

impl LoadedPrices {
    pub fn warnings(&self, source: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.duplicates > 0 {
            warnings.push(format!(
                "{source}: {} duplicate date row(s) ignored, first occurrence kept",
                self.duplicates
            ));
        }
        warnings
    }
}

/// Which header names hold the date and the value. `None` selects the
/// first and second column respectively.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceColumns<'a> {
    pub date: Option<&'a str>,
    pub value: Option<&'a str>,
}

pub fn read_prices(
    path: &str,
    columns: PriceColumns<'_>,
) -> Result<LoadedPrices, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let loaded = parse_prices(file, path, columns)?;
    tracing::debug!(
        source = path,
        points = loaded.points.len(),
        skipped = loaded.skipped,
        duplicates = loaded.duplicates,
        "loaded prices"
    );
    Ok(loaded)
}

/// Parse `date,value` rows. The date is the first ten characters of its
/// cell, so timestamps such as `2014-10-31 00:00:00` are accepted.
pub fn parse_prices<R: Read>(
    reader: R,
    source: &str,
    columns: PriceColumns<'_>,
) -> Result<LoadedPrices, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let date_idx = column_index(&headers, columns.date, 0, source)?;
    let value_idx = column_index(&headers, columns.value, 1, source)?;

    let mut loaded = LoadedPrices::default();
    let mut seen = HashSet::new();

    for (i, record) in rdr.records().enumerate() {
        // 1-based, counting the header line
        let line = i + 2;
        let record = record.map_err(|e| format!("{source} line {line}: {e}"))?;

        let date_cell = record
            .get(date_idx)
            .ok_or_else(|| format!("{source} line {line}: missing date column"))?;
        let date = date_cell.get(..10).unwrap_or(date_cell);

        let value_cell = record.get(value_idx).unwrap_or("");
        if value_cell.is_empty() || value_cell.eq_ignore_ascii_case("null") {
            tracing::debug!(source, line, date, "skipping row without a value");
            loaded.skipped += 1;
            continue;
        }
        let value: f64 = value_cell
            .parse()
            .map_err(|_| format!("{source} line {line}: invalid value '{value_cell}'"))?;

        let (_, ts) = parse_date(date).map_err(|e| format!("{source} line {line}: {e}"))?;
        if !seen.insert(ts) {
            loaded.duplicates += 1;
            continue;
        }
        loaded.points.push(PricePoint::new(date, value));
    }

    if loaded.duplicates > 0 {
        tracing::warn!(source, duplicates = loaded.duplicates, "duplicate dates ignored");
    }
    Ok(loaded)
}

fn column_index(
    headers: &csv::StringRecord,
    name: Option<&str>,
    fallback: usize,
    source: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    match name {
        Some(name) => headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("{source}: no column named '{name}'").into()),
        None if fallback < headers.len() => Ok(fallback),
        None => Err(format!("{source}: expected at least {} columns", fallback + 1).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<LoadedPrices, Box<dyn std::error::Error>> {
        parse_prices(text.as_bytes(), "test.csv", PriceColumns::default())
    }

    #[test]
    fn test_basic_rows() {
        let loaded = parse("Date,Close\n2014-01-02,10.5\n2014-01-03, 10.75 \n").unwrap();
        assert_eq!(
            loaded.points,
            vec![
                PricePoint::new("2014-01-02", 10.5),
                PricePoint::new("2014-01-03", 10.75)
            ]
        );
    }

    #[test]
    fn test_time_suffix_is_truncated() {
        let loaded = parse("date,value\n2014-10-31 00:00:00,1.0\n").unwrap();
        assert_eq!(loaded.points[0].date, "2014-10-31");
    }

    #[test]
    fn test_null_and_empty_values_skipped() {
        let loaded = parse("date,value\n2014-01-02,null\n2014-01-03,\n2014-01-06,3.0\n").unwrap();
        assert_eq!(loaded.points.len(), 1);
        assert_eq!(loaded.skipped, 2);
    }

    #[test]
    fn test_bad_value_names_the_line() {
        let err = parse("date,value\n2014-01-02,1.0\n2014-01-03,abc\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_duplicates_keep_first() {
        let loaded = parse("date,value\n2014-01-02,1.0\n2014-01-02,2.0\n").unwrap();
        assert_eq!(loaded.points, vec![PricePoint::new("2014-01-02", 1.0)]);
        assert_eq!(loaded.duplicates, 1);
        assert_eq!(loaded.warnings("test.csv").len(), 1);
    }

    #[test]
    fn test_named_columns() {
        let text = "Open,Adj Close,Date\n1.0,2.0,2014-01-02\n";
        let cols = PriceColumns {
            date: Some("date"),
            value: Some("adj close"),
        };
        let loaded = parse_prices(text.as_bytes(), "t.csv", cols).unwrap();
        assert_eq!(loaded.points, vec![PricePoint::new("2014-01-02", 2.0)]);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let cols = PriceColumns {
            date: None,
            value: Some("volume"),
        };
        assert!(parse_prices("date,value\n".as_bytes(), "t.csv", cols).is_err());
    }
}
