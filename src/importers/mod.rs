use std::path::Path;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::amount::{parse_amount, DecimalConvention};
use crate::error::{ImportError, Result};
use crate::ledger::Transaction;
use crate::resolver::{DraftRow, TransactionResolver};
use crate::source::semicolon_reader;

/// beancount importer for Sparkasse checking account CSV exports
#[cfg(feature = "sparkasse")]
pub mod sparkasse_giro;

/// beancount importer for Sparkasse MasterCard CSV exports
#[cfg(feature = "sparkasse")]
pub mod sparkasse_mastercard;

/// beancount importer for BBVA checking account Excel exports
#[cfg(feature = "bbva")]
pub mod bbva;

/// beancount importer for Edenred meal card CSV exports
#[cfg(feature = "edenred")]
pub mod edenred;

/// beancount importer for MyInvestor CSV exports
#[cfg(feature = "myinvestor")]
pub mod myinvestor;

/// Deserializes all records of a semicolon separated export with header line.
/// The position in the returned vector is the 0-based row index.
pub(crate) fn deserialize_rows<T: DeserializeOwned>(input_file: &Path, text: &str) -> Result<Vec<T>> {
    let mut reader = semicolon_reader(text, true);
    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(row, record)| record.map_err(|e| ImportError::malformed_row(input_file, row, e)))
        .collect()
}

pub(crate) fn parse_date(input_file: &Path, row: usize, text: &str, format: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), format).map_err(|e| {
        ImportError::malformed_row(input_file, row, format!("invalid date \"{}\": {}", text, e))
    })
}

pub(crate) fn parse_row_amount(
    input_file: &Path,
    row: usize,
    text: &str,
    convention: DecimalConvention,
) -> Result<BigDecimal> {
    parse_amount(text, convention).map_err(|e| ImportError::malformed_row(input_file, row, e))
}

pub(crate) fn resolve_all(
    name: &str,
    resolver: &TransactionResolver,
    input_file: &Path,
    drafts: Vec<DraftRow>,
) -> Vec<Transaction> {
    let transactions: Vec<Transaction> = drafts
        .into_iter()
        .map(|draft| resolver.resolve(draft, input_file))
        .collect();
    log::info!(
        "{}: extracted {} transactions from {}",
        name,
        transactions.len(),
        input_file.display()
    );
    transactions
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(rename = "A")]
        pub a: String,
        #[serde(rename = "Betrag")]
        pub amount: String,
    }

    #[test]
    fn delimited_amount_with_comma_decimal() {
        let text = "\"A\";\"B\";\"Betrag\"\n\"x\";\"y\";\"1.234,56\"\n";
        let rows: Vec<Row> = deserialize_rows(Path::new("t.csv"), text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].a, "x");

        let amount = parse_row_amount(
            Path::new("t.csv"),
            0,
            &rows[0].amount,
            DecimalConvention::DecimalComma,
        )
        .unwrap();
        assert_eq!(amount, "1234.56".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn malformed_rows_name_file_and_index() {
        let result = parse_date(Path::new("t.csv"), 3, "31.02.24", "%d.%m.%y");
        match result {
            Err(ImportError::MalformedRow { file, row, .. }) => {
                assert_eq!(file, Path::new("t.csv"));
                assert_eq!(row, 3);
            }
            other => panic!("unexpected result {:?}", other),
        }

        let result = parse_row_amount(Path::new("t.csv"), 1, "abc", DecimalConvention::DecimalComma);
        assert!(matches!(result, Err(ImportError::MalformedRow { row: 1, .. })));
    }

    #[test]
    fn missing_column_is_malformed_row() {
        let text = "\"A\";\"B\"\n\"x\";\"y\"\n";
        let result: Result<Vec<Row>> = deserialize_rows(Path::new("t.csv"), text);
        assert!(matches!(result, Err(ImportError::MalformedRow { row: 0, .. })));
    }
}
