use std::{collections::HashMap, fmt, ops::Deref};

/// A column identifier derived from a spreadsheet header cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName(String);

impl ColumnName {
    /// Derive the name of the column at `index` from its header text.
    ///
    /// Missing or blank headers become `col_<index>`. Anything else is
    /// trimmed, and spaces and hyphens turn into underscores.
    pub fn from_header(index: usize, header: Option<&str>) -> Self {
        match header.map(str::trim) {
            None | Some("") => ColumnName(format!("col_{}", index)),
            Some(text) => ColumnName(normalize(text)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ColumnName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(header: &str) -> String {
    header
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c,
        })
        .collect()
}

/// Two header cells that normalize to the same column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub name: ColumnName,
    pub first: usize,
    pub second: usize,
}

/// Name every column of a header row, preserving order.
pub fn column_names<'a, I>(headers: I) -> Vec<ColumnName>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    headers
        .into_iter()
        .enumerate()
        .map(|(i, header)| ColumnName::from_header(i, header))
        .collect()
}

/// Find the first pair of positions sharing a column name.
pub fn find_collision(names: &[ColumnName]) -> Option<Collision> {
    let mut seen: HashMap<&ColumnName, usize> = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if let Some(&first) = seen.get(name) {
            return Some(Collision {
                name: name.clone(),
                first,
                second: i,
            });
        }
        seen.insert(name, i);
    }
    None
}
