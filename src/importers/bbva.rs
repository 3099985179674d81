use std::path::Path;

use bigdecimal::BigDecimal;
use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::amount::{parse_amount, DecimalConvention};
use crate::config::AccountOptions;
use crate::error::{ImportError, Result};
use crate::importers::{parse_date, resolve_all};
use crate::ledger::Transaction;
use crate::resolver::{without_placeholder, DraftRow, TransactionResolver};
use crate::source::has_extension;
use crate::Importer;

/// Sheet row of the column header, the rows above only hold account information.
const HEADER_ROW: u32 = 4;

const HEADER: [&str; 9] = [
    "Fecha",
    "F.Valor",
    "Concepto",
    "Movimiento",
    "Importe",
    "Divisa",
    "Disponible",
    "Divisa",
    "Observaciones",
];

/// Newer exports swap the two date columns.
const NEW_HEADER: [&str; 9] = [
    "F.Valor",
    "Fecha",
    "Concepto",
    "Movimiento",
    "Importe",
    "Divisa",
    "Disponible",
    "Divisa",
    "Observaciones",
];

/// Generic descriptions BBVA uses instead of a real text.
const PLACEHOLDER_NARRATIONS: [&str; 2] = ["Pago con tarjeta", "Otros"];

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BbvaConfig {
    pub account_number: String,
    #[serde(flatten)]
    pub options: AccountOptions,
}

pub struct BbvaImporter {
    account_number: String,
    currency: String,
    resolver: TransactionResolver,
}

impl BbvaImporter {
    pub fn new(config: BbvaConfig, base_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            resolver: config.options.resolver(base_dir)?,
            account_number: config.account_number,
            currency: config.options.currency,
        })
    }

    fn extract_range(&self, input_file: &Path, range: &Range<Data>) -> Result<Vec<DraftRow>> {
        let (header, rows) = split_header(range).ok_or_else(|| {
            ImportError::InputParse(format!("{} has no header row", input_file.display()))
        })?;
        let column = |name: &str| {
            header
                .iter()
                .position(|cell| cell_text(cell) == name)
                .ok_or_else(|| ImportError::InputParse(format!("column \"{}\" is missing", name)))
        };
        let date_column = column("Fecha")?;
        let payee_column = column("Concepto")?;
        let narration_column = column("Movimiento")?;
        let amount_column = column("Importe")?;

        let mut drafts = Vec::new();
        for (row, cells) in rows.enumerate() {
            if cells.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            let cell = |index: usize| cells.get(index).unwrap_or(&Data::Empty);

            drafts.push(DraftRow {
                row,
                date: cell_date(input_file, row, cell(date_column))?,
                amount: cell_amount(input_file, row, cell(amount_column))?,
                payee: cell_text(cell(payee_column)),
                narration: without_placeholder(
                    cell_text(cell(narration_column)),
                    &PLACEHOLDER_NARRATIONS,
                ),
                currency: self.currency.clone(),
            });
        }
        Ok(drafts)
    }
}

fn first_sheet(input_file: &Path) -> Result<Range<Data>> {
    let mut workbook: Xlsx<_> =
        open_workbook(input_file).map_err(|e: calamine::XlsxError| ImportError::Spreadsheet(e.to_string()))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Spreadsheet("workbook has no worksheet".to_owned()))?
        .map_err(|e| ImportError::Spreadsheet(e.to_string()))
}

/// Header row and the data rows below it. Row positions are absolute sheet
/// positions, the range itself starts at the first used cell.
fn split_header(range: &Range<Data>) -> Option<(&[Data], impl Iterator<Item = &[Data]>)> {
    let (start_row, _) = range.start()?;
    let skip = HEADER_ROW.checked_sub(start_row)? as usize;
    let mut rows = range.rows().skip(skip);
    let header = rows.next()?;
    Some((header, rows))
}

fn header_matches(range: &Range<Data>) -> bool {
    let Some((header, _)) = split_header(range) else {
        return false;
    };
    let names: Vec<String> = header.iter().map(cell_text).collect();
    let first = names.iter().position(|name| !name.is_empty());
    let last = names.iter().rposition(|name| !name.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => {
            let names = &names[first..=last];
            names == HEADER || names == NEW_HEADER
        }
        _ => false,
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    }
}

/// Date cells are taken as they are, text cells are parsed.
fn cell_date(input_file: &Path, row: usize, cell: &Data) -> Result<NaiveDate> {
    match cell {
        Data::String(s) => parse_date(input_file, row, s, DATE_FORMAT),
        Data::DateTimeIso(s) => parse_date(input_file, row, s.get(..10).unwrap_or(s), "%Y-%m-%d"),
        other => other
            .as_date()
            .ok_or_else(|| ImportError::malformed_row(input_file, row, format!("invalid date {:?}", other))),
    }
}

/// Numeric cells are rounded to cents, text cells use the Spanish number format.
fn cell_amount(input_file: &Path, row: usize, cell: &Data) -> Result<BigDecimal> {
    let amount = match cell {
        Data::Float(f) => parse_amount(&format!("{:.2}", f), DecimalConvention::DecimalDot),
        Data::Int(i) => Ok(BigDecimal::from(*i)),
        Data::String(s) => parse_amount(s, DecimalConvention::DecimalComma),
        other => Err(ImportError::MalformedAmount(format!("{:?}", other))),
    };
    amount.map_err(|e| ImportError::malformed_row(input_file, row, e))
}

impl Importer for BbvaImporter {
    fn name(&self) -> &'static str {
        "BBVA"
    }

    fn account(&self) -> &str {
        self.resolver.account()
    }

    fn probe(&self, input_file: &Path) -> Result<bool> {
        if !has_extension(input_file, "xlsx") {
            return Ok(false);
        }
        let range = first_sheet(input_file)?;
        Ok(header_matches(&range))
    }

    fn extract(&self, input_file: &Path) -> Result<Vec<Transaction>> {
        let range = first_sheet(input_file)?;
        let drafts = self.extract_range(input_file, &range)?;
        Ok(resolve_all(self.name(), &self.resolver, input_file, drafts))
    }

    fn filename(&self, _input_file: &Path) -> Result<String> {
        Ok(format!("BBVA_{}.xlsx", self.account_number))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    fn text(value: &str) -> Data {
        Data::String(value.to_owned())
    }

    /// Sheet as exported by BBVA: title rows, header in row 4 starting in column B.
    fn sheet(header: &[&str; 9], rows: Vec<[Data; 9]>) -> Range<Data> {
        let mut range = Range::new((0, 0), (HEADER_ROW + rows.len() as u32, 9));
        range.set_value((0, 1), text("Últimos movimientos"));
        range.set_value((2, 1), text("ES12 3456 7890 1234 5678 90"));
        for (col, name) in header.iter().enumerate() {
            range.set_value((HEADER_ROW, col as u32 + 1), text(name));
        }
        for (index, row) in rows.into_iter().enumerate() {
            for (col, value) in row.into_iter().enumerate() {
                range.set_value((HEADER_ROW + 1 + index as u32, col as u32 + 1), value);
            }
        }
        range
    }

    fn row(date: Data, payee: &str, narration: &str, amount: Data) -> [Data; 9] {
        [
            date.clone(),
            date,
            text(payee),
            text(narration),
            amount,
            text("EUR"),
            Data::Float(1500.0),
            text("EUR"),
            Data::Empty,
        ]
    }

    fn importer() -> BbvaImporter {
        let mut options = AccountOptions::new("Assets:ES:BBVA:Checking");
        options.tags = BTreeSet::from(["share-Example".to_owned()]);
        BbvaImporter::new(
            BbvaConfig {
                account_number: "ES12345678901234567890".to_owned(),
                options,
            },
            None,
        )
        .expect("creating importer failed")
    }

    #[test]
    fn accepts_both_header_orders() {
        assert!(header_matches(&sheet(&HEADER, vec![])));
        assert!(header_matches(&sheet(&NEW_HEADER, vec![])));

        let mut wrong = HEADER;
        wrong[4] = "Cantidad";
        assert!(!header_matches(&sheet(&wrong, vec![])));

        assert!(!header_matches(&Range::new((0, 0), (2, 2))));
        assert!(!header_matches(&Range::empty()));
    }

    #[test]
    fn extracts_rows() {
        let range = sheet(
            &NEW_HEADER,
            vec![
                row(
                    text("15/01/2024"),
                    "MERCADONA",
                    "Pago con tarjeta",
                    Data::Float(-23.456),
                ),
                row(
                    Data::DateTimeIso("2024-01-20T00:00:00".to_owned()),
                    "Nómina",
                    "Transferencia recibida",
                    text("1.250,00"),
                ),
            ],
        );

        let drafts = importer()
            .extract_range(Path::new("bbva.xlsx"), &range)
            .expect("extraction failed");
        assert_eq!(drafts.len(), 2);

        assert_eq!(drafts[0].row, 0);
        assert_eq!(drafts[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(drafts[0].payee, "MERCADONA");
        assert_eq!(drafts[0].narration, None);
        assert_eq!(drafts[0].amount, BigDecimal::from_str("-23.46").unwrap());

        assert_eq!(drafts[1].date, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(drafts[1].narration, Some("Transferencia recibida".to_owned()));
        assert_eq!(drafts[1].amount, BigDecimal::from_str("1250").unwrap());

        let importer = importer();
        let t = importer
            .resolver
            .resolve(drafts[0].clone(), Path::new("bbva.xlsx"));
        assert_eq!(t.payee, None);
        assert_eq!(t.narration, "MERCADONA");
        assert!(t.tags.contains("share-Example"));
    }

    #[test]
    fn empty_rows_are_skipped() {
        let empty: [Data; 9] = Default::default();
        let range = sheet(
            &HEADER,
            vec![
                empty,
                row(text("01/02/2024"), "Bizum", "Otros", Data::Int(5)),
            ],
        );
        let drafts = importer()
            .extract_range(Path::new("bbva.xlsx"), &range)
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].row, 1);
        assert_eq!(drafts[0].amount, BigDecimal::from(5));
    }

    #[test]
    fn invalid_date_is_malformed_row() {
        let range = sheet(
            &HEADER,
            vec![row(text("yesterday"), "Bizum", "Otros", Data::Int(5))],
        );
        let result = importer().extract_range(Path::new("bbva.xlsx"), &range);
        assert!(matches!(result, Err(ImportError::MalformedRow { row: 0, .. })));
    }

    #[test]
    fn recognize_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer();

        let fake = dir.path().join("movimientos.xlsx");
        std::fs::write(&fake, b"this is not a zip archive").unwrap();
        assert!(!importer.recognize(&fake));

        let empty = dir.path().join("empty.xlsx");
        std::fs::write(&empty, b"").unwrap();
        assert!(!importer.recognize(&empty));

        let csv = dir.path().join("movimientos.csv");
        std::fs::write(&csv, b"Fecha;Concepto\n").unwrap();
        assert!(!importer.recognize(&csv));

        assert!(!importer.recognize(&dir.path().join("missing.xlsx")));
        assert!(importer.extract(&fake).is_err());
    }

    #[test]
    fn filename_from_account_number() {
        assert_eq!(
            importer().filename(Path::new("x.xlsx")).unwrap(),
            "BBVA_ES12345678901234567890.xlsx"
        );
    }
}
