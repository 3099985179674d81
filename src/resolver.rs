use std::collections::BTreeSet;
use std::path::Path;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::ledger::{Amount, Flag, Metadata, Posting, Transaction};
use crate::mapping::AccountMapper;

/// One data row of a bank export, before account mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRow {
    /// 0-based index of the data row in the source file
    pub row: usize,
    pub date: NaiveDate,
    /// counterparty as written in the export, may be empty
    pub payee: String,
    /// description as written in the export, `None` for missing or placeholder texts
    pub narration: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
}

impl DraftRow {
    /// The text used to look up overrides: the payee, or the narration if the
    /// export has no payee for this row.
    pub fn lookup_key(&self) -> &str {
        if !self.payee.is_empty() {
            &self.payee
        } else {
            self.narration.as_deref().unwrap_or("")
        }
    }
}

/// Returns `None` for texts that only carry a generic placeholder of the card network
/// or bank (e.g. "Otros"), so that the payee is used as description instead.
pub fn without_placeholder(text: String, placeholders: &[&str]) -> Option<String> {
    if text.is_empty() || placeholders.contains(&text.as_str()) {
        None
    } else {
        Some(text)
    }
}

/// Turns draft rows into balanced transactions on the account of one importer.
#[derive(Debug, Clone)]
pub struct TransactionResolver {
    account: String,
    tags: BTreeSet<String>,
    flag: Flag,
    mapper: AccountMapper,
}

impl TransactionResolver {
    pub fn new(account: String, mapper: AccountMapper) -> Self {
        Self {
            account,
            tags: BTreeSet::new(),
            flag: Flag::default(),
            mapper,
        }
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flag = flag;
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn mapper(&self) -> &AccountMapper {
        &self.mapper
    }

    pub fn resolve(&self, draft: DraftRow, file: &Path) -> Transaction {
        let key = draft.lookup_key().to_owned();
        let units = Amount::new(draft.amount, draft.currency);

        let mut postings = vec![Posting::new(self.account.clone(), units.clone())];
        if let Some(account) = self.mapper.account(&key) {
            postings.push(Posting::new(account.to_owned(), -&units));
        }

        let mut payee = Some(draft.payee).filter(|p| !p.is_empty());
        if let Some(mapped) = self.mapper.payee(&key) {
            payee = Some(mapped.to_owned());
        }

        let mut narration = draft.narration.filter(|n| !n.is_empty());
        if let Some(mapped) = self.mapper.narration(&key) {
            narration = Some(mapped.to_owned());
        }

        // a transaction always needs a description, the payee is optional
        let narration = match narration {
            Some(narration) => narration,
            None => payee.take().unwrap_or_default(),
        };

        Transaction {
            date: draft.date,
            flag: self.flag,
            payee,
            narration,
            tags: self.tags.clone(),
            postings,
            meta: Metadata {
                filename: file.to_path_buf(),
                lineno: draft.row,
            },
        }
    }
}
