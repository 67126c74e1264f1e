use crate::naming::ColumnName;

/// Quote an identifier with `quote`, doubling any embedded quote character.
pub fn quote_ident(ident: &str, quote: char) -> String {
    let mut quoted = String::with_capacity(ident.len() + 2);
    quoted.push(quote);
    for c in ident.chars() {
        if c == quote {
            quoted.push(quote);
        }
        quoted.push(c);
    }
    quoted.push(quote);
    quoted
}

pub fn create_table_sql(table: &str, columns: &[ColumnName], quote: char) -> String {
    let columns = columns
        .iter()
        .map(|column| format!("{} TEXT", quote_ident(column, quote)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table, quote),
        columns
    )
}

pub fn insert_sql(table: &str, column_count: usize, quote: char) -> String {
    let placeholders = vec!["?"; column_count].join(", ");
    format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(table, quote),
        placeholders
    )
}

pub fn check_arity(row: usize, expected: usize, values: &[String]) -> Result<(), crate::DbError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(crate::DbError::Arity {
            row,
            expected,
            actual: values.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("Duty_Type", '`'), "`Duty_Type`");
        assert_eq!(quote_ident("we`ird", '`'), "`we``ird`");
        assert_eq!(quote_ident("say \"hi\"", '"'), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn builds_statements() {
        let columns = vec![
            ColumnName::from_header(0, Some("Duty Type")),
            ColumnName::from_header(1, None),
        ];
        assert_eq!(
            create_table_sql("duty_type_table", &columns, '`'),
            "CREATE TABLE IF NOT EXISTS `duty_type_table` (`Duty_Type` TEXT, `col_1` TEXT)"
        );
        assert_eq!(
            insert_sql("duty_type_table", 2, '"'),
            "INSERT INTO \"duty_type_table\" VALUES (?, ?)"
        );
    }
}
