use std::path::Path;

use chrono::NaiveDate;

pub mod amount;
pub mod config;
pub mod error;
pub mod importers;
pub mod ledger;
pub mod mapping;
pub mod resolver;
pub mod source;

use error::Result;
use ledger::Transaction;

/// A bank export format together with the account it is booked on.
///
/// The ledger tool offers every candidate file to every configured importer, so
/// [`Importer::recognize`] is total: whatever goes wrong while looking at a file
/// that is not ours means "no match". The conditions reported by
/// [`Importer::probe`] and swallowed there are
/// - the file cannot be read (missing, permissions, directory),
/// - the bytes are not valid in the configured text encoding,
/// - the content is not a readable CSV file or workbook,
/// - the file has fewer lines, rows or fields than the signature needs.
///
/// All other operations return their errors to the caller.
pub trait Importer {
    /// Human readable name of the export format.
    fn name(&self) -> &'static str;

    /// The ledger account that owns the imported transactions.
    fn account(&self) -> &str;

    /// Compares the structural signature of the file with this importer.
    fn probe(&self, input_file: &Path) -> Result<bool>;

    fn recognize(&self, input_file: &Path) -> bool {
        match self.probe(input_file) {
            Ok(matches) => matches,
            Err(e) => {
                log::debug!(
                    "{}: {} is not recognized: {}",
                    self.name(),
                    input_file.display(),
                    e
                );
                false
            }
        }
    }

    /// All transactions of the file, in the order of the source rows.
    fn extract(&self, input_file: &Path) -> Result<Vec<Transaction>>;

    /// Name under which the ledger tool files the source document.
    fn filename(&self, input_file: &Path) -> Result<String>;

    /// The latest transaction date of the file, from a fresh extraction.
    fn date(&self, input_file: &Path) -> Result<Option<NaiveDate>> {
        let transactions = self.extract(input_file)?;
        Ok(transactions.iter().map(|t| t.date).max())
    }
}
