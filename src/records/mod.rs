mod xlsx;

pub use xlsx::read_xlsx;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::Error;

pub const SAMPLE_NUM_FIELD: &str = "sample num";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{n}"),
        }
    }
}

/// One data row, keyed by lowercased header name.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// 1-based spreadsheet row (the header is row 1).
    pub row: usize,
    pub sample: usize,
    fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new(row: usize, sample: usize, fields: HashMap<String, FieldValue>) -> Self {
        let mut fields = fields;
        fields.insert(SAMPLE_NUM_FIELD.to_string(), FieldValue::Integer(sample as i64));
        Self { row, sample, fields }
    }

    /// Lookup is case-insensitive on the field name.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .get(field)
            .or_else(|| self.fields.get(&field.trim().to_lowercase()))
    }

    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }
}

/// A data row that could not be assigned to any sample.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    pub header: Vec<String>,
    pub records: Vec<Record>,
    pub rejected: Vec<RejectedRow>,
}

impl RecordSet {
    /// Build records from a header row and data rows of cell strings.
    ///
    /// Missing cells become empty strings. `sample num` is injected as 0 when the
    /// column is absent or the cell is blank; a value that is not a non-negative
    /// integer after trimming rejects the row.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<RecordSet, Error> {
        if rows.is_empty() {
            return Err(Error::Data(
                "only a header row was found; no data rows to generate from".into(),
            ));
        }
        let header: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let sample_col = header.iter().position(|h| h == SAMPLE_NUM_FIELD);

        let mut records = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            let row_number = i + 2;
            let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

            let sample = match sample_col.map(cell) {
                None => 0,
                Some(raw) if raw.trim().is_empty() => 0,
                Some(raw) => match raw.trim().parse::<usize>() {
                    Ok(n) => n,
                    Err(_) => {
                        rejected.push(RejectedRow {
                            row: row_number,
                            reason: format!(
                                "sample number '{raw}' in row {row_number} is not a non-negative integer"
                            ),
                        });
                        continue;
                    }
                },
            };

            let fields = header
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(col, name)| (name.clone(), FieldValue::Text(cell(col).to_string())))
                .collect();
            records.push(Record::new(row_number, sample, fields));
        }

        let mut header = header;
        if sample_col.is_none() {
            header.push(SAMPLE_NUM_FIELD.to_string());
        }
        Ok(RecordSet {
            header,
            records,
            rejected,
        })
    }

    /// Records per sample number, ascending, each group in source order.
    pub fn group_by_sample(&self) -> BTreeMap<usize, Vec<Record>> {
        let mut groups: BTreeMap<usize, Vec<Record>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.sample).or_default().push(record.clone());
        }
        groups
    }
}
