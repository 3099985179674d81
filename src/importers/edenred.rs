use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use regex::Regex;
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::amount::DecimalConvention;
use crate::config::AccountOptions;
use crate::error::{ImportError, Result};
use crate::importers::{deserialize_rows, parse_date, parse_row_amount, resolve_all};
use crate::ledger::Transaction;
use crate::resolver::{DraftRow, TransactionResolver};
use crate::source::{encoding_for_label, first_field, has_extension, read_text};
use crate::Importer;

/// Lines in front of the column header (card holder, product, card number, ...)
const PREAMBLE_LINES: usize = 10;
const PRODUCT_LINE: usize = 3;
const CARD_NUMBER_LINE: usize = 4;
const PRODUCT_PREFIX: &str = "Tipo de producto: ";

const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const FILE_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EdenredConfig {
    pub card_number: String,
    /// where the temporary copy without preamble is written, defaults to the system temp dir
    pub scratch_dir: Option<PathBuf>,
    #[serde(flatten)]
    pub options: AccountOptions,
}

pub struct EdenredImporter {
    card_number: String,
    scratch_dir: PathBuf,
    encoding: &'static Encoding,
    digits: Regex,
    currency: String,
    resolver: TransactionResolver,
}

impl EdenredImporter {
    pub fn new(config: EdenredConfig, base_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            encoding: encoding_for_label(FILE_ENCODING)?,
            digits: Regex::new(r"\d+").map_err(|e| ImportError::Regex(e.to_string()))?,
            resolver: config.options.resolver(base_dir)?,
            scratch_dir: config.scratch_dir.unwrap_or_else(std::env::temp_dir),
            card_number: config.card_number,
            currency: config.options.currency,
        })
    }

    /// Copies everything after the preamble into a temporary file. The file is
    /// removed when the returned handle is dropped.
    fn scratch_copy(&self, text: &str) -> Result<NamedTempFile> {
        let mut scratch = tempfile::Builder::new()
            .prefix("edenred")
            .suffix(".csv.tmp")
            .tempfile_in(&self.scratch_dir)?;
        for line in text.lines().skip(PREAMBLE_LINES) {
            writeln!(scratch, "{}", line)?;
        }
        scratch.flush()?;
        Ok(scratch)
    }

    fn preamble_line(&self, input_file: &Path, index: usize) -> Result<String> {
        let text = read_text(input_file, self.encoding)?;
        text.lines()
            .nth(index)
            .map(first_field)
            .ok_or_else(|| {
                ImportError::InputParse(format!(
                    "{} has no line {}",
                    input_file.display(),
                    index + 1
                ))
            })
    }
}

impl Importer for EdenredImporter {
    fn name(&self) -> &'static str {
        "Edenred"
    }

    fn account(&self) -> &str {
        self.resolver.account()
    }

    fn probe(&self, input_file: &Path) -> Result<bool> {
        if !has_extension(input_file, "csv") {
            return Ok(false);
        }
        // the card number is only part of a free text line
        let line = self.preamble_line(input_file, CARD_NUMBER_LINE)?;
        let card_number = self.digits.find(&line).map(|m| m.as_str());
        Ok(card_number == Some(self.card_number.as_str()))
    }

    fn extract(&self, input_file: &Path) -> Result<Vec<Transaction>> {
        let text = read_text(input_file, self.encoding)?;
        let scratch = self.scratch_copy(&text)?;
        let data = std::fs::read_to_string(scratch.path())?;

        let drafts = deserialize_rows::<EdenredRow>(input_file, &data)?
            .into_iter()
            .enumerate()
            .map(|(row, record)| -> Result<DraftRow> {
                Ok(DraftRow {
                    row,
                    date: parse_date(input_file, row, &record.date, DATE_FORMAT)?,
                    amount: parse_row_amount(
                        input_file,
                        row,
                        &record.amount,
                        DecimalConvention::DecimalComma,
                    )?,
                    payee: record.detail.trim().to_owned(),
                    narration: None,
                    currency: self.currency.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(resolve_all(self.name(), &self.resolver, input_file, drafts))
    }

    /// Named after the card product, e.g. `TicketRestaurant_1234567890.csv`.
    fn filename(&self, input_file: &Path) -> Result<String> {
        let product = self
            .preamble_line(input_file, PRODUCT_LINE)?
            .replace(PRODUCT_PREFIX, "")
            .replace(' ', "");
        Ok(format!("{}_{}.csv", product, self.card_number))
    }
}

#[derive(Debug, Deserialize)]
struct EdenredRow {
    #[serde(rename = "Fecha")]
    pub date: String,
    #[serde(rename = "Detalle transacción")]
    pub detail: String,
    #[serde(rename = "Importe")]
    pub amount: String,
}
