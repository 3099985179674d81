use std::path::Path;

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::amount::DecimalConvention;
use crate::config::AccountOptions;
use crate::error::Result;
use crate::importers::{deserialize_rows, parse_date, parse_row_amount, resolve_all};
use crate::ledger::Transaction;
use crate::resolver::{DraftRow, TransactionResolver};
use crate::source::{encoding_for_label, has_extension, read_text};
use crate::Importer;

const HEADER_PREFIX: &str = "Fecha de operación;Fecha de valor;Concepto;Importe;Divisa";
const DATE_FORMAT: &str = "%d/%m/%Y";
const FILE_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MyInvestorConfig {
    #[serde(flatten)]
    pub options: AccountOptions,
}

pub struct MyInvestorImporter {
    encoding: &'static Encoding,
    currency: String,
    resolver: TransactionResolver,
}

impl MyInvestorImporter {
    pub fn new(config: MyInvestorConfig, base_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            encoding: encoding_for_label(FILE_ENCODING)?,
            resolver: config.options.resolver(base_dir)?,
            currency: config.options.currency,
        })
    }
}

impl Importer for MyInvestorImporter {
    fn name(&self) -> &'static str {
        "MyInvestor"
    }

    fn account(&self) -> &str {
        self.resolver.account()
    }

    fn probe(&self, input_file: &Path) -> Result<bool> {
        if !has_extension(input_file, "csv") {
            return Ok(false);
        }
        let text = read_text(input_file, self.encoding)?;
        let header = text.lines().next().unwrap_or("").trim();
        Ok(header.starts_with(HEADER_PREFIX))
    }

    fn extract(&self, input_file: &Path) -> Result<Vec<Transaction>> {
        let text = read_text(input_file, self.encoding)?;
        let drafts = deserialize_rows::<MyInvestorRow>(input_file, &text)?
            .into_iter()
            .enumerate()
            .map(|(row, record)| -> Result<DraftRow> {
                let currency = match record.currency.trim() {
                    "" => self.currency.clone(),
                    currency => currency.to_owned(),
                };
                Ok(DraftRow {
                    row,
                    date: parse_date(input_file, row, &record.value_date, DATE_FORMAT)?,
                    amount: parse_row_amount(
                        input_file,
                        row,
                        &record.amount,
                        DecimalConvention::DecimalComma,
                    )?,
                    payee: String::new(),
                    narration: Some(record.concept.trim().to_owned()),
                    currency,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(resolve_all(self.name(), &self.resolver, input_file, drafts))
    }

    fn filename(&self, input_file: &Path) -> Result<String> {
        let basename = input_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("myinvestor.{}", basename))
    }
}

#[derive(Debug, Deserialize)]
struct MyInvestorRow {
    #[serde(rename = "Fecha de valor")]
    pub value_date: String,
    #[serde(rename = "Concepto")]
    pub concept: String,
    #[serde(rename = "Importe")]
    pub amount: String,
    #[serde(rename = "Divisa")]
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn sample(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("export_cuenta.csv");
        std::fs::write(
            &path,
            "\u{feff}Fecha de operación;Fecha de valor;Concepto;Importe;Divisa;Saldo
02/03/2024;04/03/2024;TRANSFERENCIA NOMINA;2.100,00;EUR;5.100,00
05/03/2024;05/03/2024;COMPRA FONDO INDEXADO;-500,00;;4.600,00
06/03/2024;07/03/2024;DIVIDENDO;12,34;USD;4.612,34
",
        )
        .unwrap();
        path
    }

    fn importer() -> MyInvestorImporter {
        MyInvestorImporter::new(
            MyInvestorConfig {
                options: AccountOptions::new("Assets:ES:MyInvestor"),
            },
            None,
        )
        .expect("creating importer failed")
    }

    #[test]
    fn recognizes_header() {
        let dir = tempfile::tempdir().unwrap();
        let file = sample(&dir);
        assert!(importer().recognize(&file));

        let other = dir.path().join("other.csv");
        std::fs::write(&other, "Fecha;Concepto;Importe\n").unwrap();
        assert!(!importer().recognize(&other));
    }

    #[test]
    fn extracts_with_row_currency() {
        let dir = tempfile::tempdir().unwrap();
        let file = sample(&dir);
        let transactions = importer().extract(&file).expect("extraction failed");

        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(transactions[0].narration, "TRANSFERENCIA NOMINA");
        assert_eq!(transactions[0].payee, None);
        assert_eq!(
            transactions[0].postings[0].units.number,
            BigDecimal::from_str("2100").unwrap()
        );
        assert_eq!(transactions[1].postings[0].units.currency, "EUR");
        assert_eq!(transactions[2].postings[0].units.currency, "USD");
    }

    #[test]
    fn filename_keeps_original_name() {
        assert_eq!(
            importer()
                .filename(Path::new("/downloads/export_cuenta.csv"))
                .unwrap(),
            "myinvestor.export_cuenta.csv"
        );
    }
}
