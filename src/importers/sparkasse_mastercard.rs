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

pub const MASTERCARD_FIELDS: [&str; 16] = [
    "Umsatz getätigt von",
    "Belegdatum",
    "Buchungsdatum",
    "Originalbetrag",
    "Originalwährung",
    "Umrechnungskurs",
    "Buchungsbetrag",
    "Buchungswährung",
    "Transaktionsbeschreibung",
    "Transaktionsbeschreibung Zusatz",
    "Buchungsreferenz",
    "Gebührenschlüssel",
    "Länderkennzeichen",
    "BAR-Entgelt+Buchungsreferenz",
    "AEE+Buchungsreferenz",
    "Abrechnungskennzeichen",
];

const DATE_FORMAT: &str = "%d.%m.%y";
const FILE_ENCODING: &str = "ISO-8859-1";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SparkasseMasterCardConfig {
    pub last_four_digits: String,
    #[serde(flatten)]
    pub options: AccountOptions,
}

pub struct SparkasseMasterCardImporter {
    last_four_digits: String,
    encoding: &'static Encoding,
    currency: String,
    resolver: TransactionResolver,
}

impl SparkasseMasterCardImporter {
    pub fn new(config: SparkasseMasterCardConfig, base_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            encoding: encoding_for_label(FILE_ENCODING)?,
            resolver: config.options.resolver(base_dir)?,
            last_four_digits: config.last_four_digits,
            currency: config.options.currency,
        })
    }
}

fn last_four(card_number: &str) -> String {
    let chars: Vec<char> = card_number.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

impl Importer for SparkasseMasterCardImporter {
    fn name(&self) -> &'static str {
        "Sparkasse MasterCard"
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

        let header_match = header == quoted_header(&MASTERCARD_FIELDS);
        let card_match = last_four(&first_field(first_row)) == self.last_four_digits;
        Ok(header_match && card_match)
    }

    fn extract(&self, input_file: &Path) -> Result<Vec<Transaction>> {
        let text = read_text(input_file, self.encoding)?;
        let drafts = deserialize_rows::<MasterCardRow>(input_file, &text)?
            .into_iter()
            .enumerate()
            .map(|(row, record)| -> Result<DraftRow> {
                Ok(DraftRow {
                    row,
                    date: parse_date(input_file, row, &record.posting_date, DATE_FORMAT)?,
                    amount: parse_row_amount(
                        input_file,
                        row,
                        &record.amount,
                        DecimalConvention::DecimalComma,
                    )?,
                    // the export has no counterparty, the description is the lookup key
                    payee: String::new(),
                    narration: Some(record.description.trim().to_owned()),
                    currency: self.currency.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(resolve_all(self.name(), &self.resolver, input_file, drafts))
    }

    fn filename(&self, _input_file: &Path) -> Result<String> {
        Ok(format!("MasterCard_{}.csv", self.last_four_digits))
    }
}

#[derive(Debug, Deserialize)]
struct MasterCardRow {
    #[serde(rename = "Buchungsdatum")]
    pub posting_date: String,
    #[serde(rename = "Buchungsbetrag")]
    pub amount: String,
    #[serde(rename = "Transaktionsbeschreibung")]
    pub description: String,
}
