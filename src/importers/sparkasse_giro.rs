use std::path::Path;

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::amount::DecimalConvention;
use crate::config::AccountOptions;
use crate::error::Result;
use crate::importers::{deserialize_rows, parse_date, parse_row_amount, resolve_all};
use crate::ledger::Transaction;
use crate::resolver::{DraftRow, TransactionResolver};
use crate::source::{encoding_for_label, first_field, has_extension, quoted_header, read_text};
use crate::Importer;

/// Columns of the Sparkasse CSV-CAMT export, in file order.
pub const GIRO_FIELDS: [&str; 17] = [
    "Auftragskonto",
    "Buchungstag",
    "Valutadatum",
    "Buchungstext",
    "Verwendungszweck",
    "Glaeubiger ID",
    "Mandatsreferenz",
    "Kundenreferenz (End-to-End)",
    "Sammlerreferenz",
    "Lastschrift Ursprungsbetrag",
    "Auslagenersatz Ruecklastschrift",
    "Beguenstigter/Zahlungspflichtiger",
    "Kontonummer/IBAN",
    "BIC (SWIFT-Code)",
    "Betrag",
    "Waehrung",
    "Info",
];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SparkasseGiroConfig {
    pub iban: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(flatten)]
    pub options: AccountOptions,
}

fn default_date_format() -> String {
    "%d.%m.%y".to_owned()
}

fn default_encoding() -> String {
    "ISO-8859-1".to_owned()
}

impl SparkasseGiroConfig {
    pub fn new(iban: &str, account: &str) -> Self {
        Self {
            iban: iban.to_owned(),
            date_format: default_date_format(),
            encoding: default_encoding(),
            options: AccountOptions::new(account),
        }
    }
}

pub struct SparkasseGiroImporter {
    iban: String,
    date_format: String,
    encoding: &'static Encoding,
    currency: String,
    resolver: TransactionResolver,
}

impl SparkasseGiroImporter {
    pub fn new(config: SparkasseGiroConfig, base_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            encoding: encoding_for_label(&config.encoding)?,
            resolver: config.options.resolver(base_dir)?,
            iban: config.iban,
            date_format: config.date_format,
            currency: config.options.currency,
        })
    }
}

impl Importer for SparkasseGiroImporter {
    fn name(&self) -> &'static str {
        "Sparkasse Giro"
    }

    fn account(&self) -> &str {
        self.resolver.account()
    }

    fn probe(&self, input_file: &Path) -> Result<bool> {
        if !has_extension(input_file, "csv") {
            return Ok(false);
        }
        let text = read_text(input_file, self.encoding)?;
        let mut lines = text.lines();
        let header = lines.next().unwrap_or("").trim();
        let first_row = lines.next().unwrap_or("").trim();

        // several accounts share the layout, so the IBAN has to match as well
        let header_match = header == quoted_header(&GIRO_FIELDS);
        let iban_match = first_field(first_row) == self.iban;
        Ok(header_match && iban_match)
    }

    fn extract(&self, input_file: &Path) -> Result<Vec<Transaction>> {
        let text = read_text(input_file, self.encoding)?;
        let drafts = deserialize_rows::<GiroRow>(input_file, &text)?
            .into_iter()
            .enumerate()
            .map(|(row, record)| record.into_draft(input_file, row, &self.date_format, &self.currency))
            .collect::<Result<Vec<_>>>()?;
        Ok(resolve_all(self.name(), &self.resolver, input_file, drafts))
    }

    fn filename(&self, _input_file: &Path) -> Result<String> {
        Ok(format!("{}.csv", self.iban))
    }
}

#[derive(Debug, Deserialize)]
struct GiroRow {
    #[serde(rename = "Buchungstag")]
    pub posting_date: String,
    #[serde(rename = "Verwendungszweck")]
    pub purpose: String,
    #[serde(rename = "Beguenstigter/Zahlungspflichtiger")]
    pub counterparty: String,
    #[serde(rename = "Betrag")]
    pub amount: String,
}

impl GiroRow {
    fn into_draft(self, input_file: &Path, row: usize, date_format: &str, currency: &str) -> Result<DraftRow> {
        Ok(DraftRow {
            row,
            date: parse_date(input_file, row, &self.posting_date, date_format)?,
            amount: parse_row_amount(input_file, row, &self.amount, DecimalConvention::DecimalComma)?,
            payee: self.counterparty.trim().to_owned(),
            narration: Some(self.purpose.trim().to_owned()),
            currency: currency.to_owned(),
        })
    }
}
