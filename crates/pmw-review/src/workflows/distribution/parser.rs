use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One raw line of a distribution export, with its line number in the file.
#[derive(Debug)]
pub(crate) struct DistributionRecord {
    pub(crate) line: usize,
    pub(crate) row: DistributionRow,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistributionRow {
    pub(crate) id_distribusi: String,
    pub(crate) id_proposal: String,
    #[serde(default)]
    pub(crate) judul: String,
    pub(crate) id_penilai: String,
    pub(crate) role: String,
    pub(crate) tahap: String,
    pub(crate) tanggal_penugasan: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) periode_mulai: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) periode_selesai: Option<String>,
}

/// Rows come back in file order; the header is line 1.
pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<DistributionRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<DistributionRow>().enumerate() {
        records.push(DistributionRecord {
            line: index + 2,
            row: row?,
        });
    }

    Ok(records)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// RFC 3339 timestamps, or bare dates read as midnight UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_with(value, |date| date.and_hms_opt(0, 0, 0))
}

/// Like [`parse_timestamp`], but a bare date closes at the last instant of
/// that day, so `periode_selesai` includes the whole final day.
pub(crate) fn parse_window_end(value: &str) -> Option<DateTime<Utc>> {
    parse_with(value, |date| date.and_hms_nano_opt(23, 59, 59, 999_999_999))
}

fn parse_with(
    value: &str,
    time_of_day: impl FnOnce(NaiveDate) -> Option<NaiveDateTime>,
) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(time_of_day)
        .map(|naive| Utc.from_utc_datetime(&naive))
}
