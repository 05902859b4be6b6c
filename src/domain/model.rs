use crate::utils::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;

/// Field values read as [`Cell::Missing`], the usual null spellings of
/// spreadsheet and database exports.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One value of a [`Table`]. CSV input only ever produces `Missing` or `Text`;
/// `Int` and `Float` appear once a column has been coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Int(i64),
    Float(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion: surrounding whitespace is ignored, anything that is
    /// not a finite number gives `None`.
    pub fn coerce_float(&self) -> Option<f64> {
        match self {
            Cell::Missing => None,
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => v.is_finite().then_some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Like [`Cell::coerce_float`] but truncates towards zero.
    pub fn coerce_int(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Text(s) => match s.trim().parse::<i64>() {
                Ok(v) => Some(v),
                Err(_) => self.coerce_float().map(|v| v.trunc() as i64),
            },
            _ => self.coerce_float().map(|v| v.trunc() as i64),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A small column-ordered table: just enough dataframe for the merge steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let columns = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut table = Table::new(columns);

        for record in csv_reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|field| {
                    if NA_TOKENS.contains(&field) {
                        Cell::Missing
                    } else {
                        Cell::text(field)
                    }
                })
                .collect();
            table.push_row(row);
        }

        Ok(table)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_csv_reader(bytes)
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| crate::utils::error::EtlError::IoError(e.into_error()))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Short rows are padded with `Missing`, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Renames columns that exist; unknown source names are ignored.
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) {
        for column in self.columns.iter_mut() {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
    }

    /// Applies `f` to every cell of `name`. Returns false when the column does not exist.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(&Cell) -> Cell,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in self.rows.iter_mut() {
            row[idx] = f(&row[idx]);
        }
        true
    }

    pub fn insert_column(&mut self, index: usize, name: &str, values: Vec<Cell>) {
        let index = index.min(self.columns.len());
        self.columns.insert(index, name.to_string());
        let mut values = values.into_iter();
        for row in self.rows.iter_mut() {
            row.insert(index, values.next().unwrap_or(Cell::Missing));
        }
    }

    pub fn add_column_filled(&mut self, name: &str, fill: Cell) {
        self.columns.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(fill.clone());
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Projects onto `names`; names the table lacks become all-`Missing` columns.
    pub fn select(&self, names: &[&str]) -> Table {
        let indices: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let mut out = Table::new(names.iter().map(|n| n.to_string()).collect());
        for row in &self.rows {
            let projected = indices
                .iter()
                .map(|idx| idx.map(|i| row[i].clone()).unwrap_or(Cell::Missing))
                .collect();
            out.rows.push(projected);
        }
        out
    }

    /// Projects onto the subset of `names` that exist, in that order.
    pub fn project(&self, names: &[&str]) -> Table {
        let present: Vec<&str> = names.iter().copied().filter(|n| self.has_column(n)).collect();
        self.select(&present)
    }

    /// Keeps the first row for every distinct value of `key`.
    pub fn dedup_by(&mut self, key: &str) {
        let Some(idx) = self.column_index(key) else {
            return;
        };
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| seen.insert(row[idx].to_string()));
    }

    /// Left join on integer keys. Rows of `self` are kept in order and never
    /// multiplied: only the first right row per key is considered. The right key
    /// column is dropped and right columns whose name already exists on the left
    /// get `suffix` appended.
    pub fn left_join(&self, left_key: &str, right: &Table, right_key: &str, suffix: &str) -> Table {
        let left_idx = self.column_index(left_key);
        let right_idx = right.column_index(right_key);

        let mut index: HashMap<i64, usize> = HashMap::new();
        if let Some(r_idx) = right_idx {
            for (pos, row) in right.rows.iter().enumerate() {
                if let Some(key) = row[r_idx].coerce_int() {
                    index.entry(key).or_insert(pos);
                }
            }
        }

        let carried: Vec<usize> = (0..right.columns.len())
            .filter(|&i| Some(i) != right_idx)
            .collect();

        let mut columns = self.columns.clone();
        for &i in &carried {
            let name = &right.columns[i];
            if columns.contains(name) {
                columns.push(format!("{}{}", name, suffix));
            } else {
                columns.push(name.clone());
            }
        }

        let mut out = Table::new(columns);
        for row in &self.rows {
            let matched = left_idx
                .and_then(|l| row[l].coerce_int())
                .and_then(|key| index.get(&key))
                .map(|&pos| &right.rows[pos]);

            let mut joined = row.clone();
            for &i in &carried {
                joined.push(matched.map(|r| r[i].clone()).unwrap_or(Cell::Missing));
            }
            out.rows.push(joined);
        }
        out
    }
}
