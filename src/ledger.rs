use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::PathBuf;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Deserialize;

/// helper structure that binds the currency to a given amount (e.g. 25.39 EUR)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub number: BigDecimal,
    pub currency: String,
}

impl Amount {
    pub fn new(number: BigDecimal, currency: String) -> Self {
        Self { number, currency }
    }

    /// Renders the number with grouped thousands and at least two decimal places,
    /// e.g. `-1,799,361.99`.
    pub fn formatted_number(&self) -> String {
        let mut result = String::new();
        let mut amount_str = self.number.to_string();

        if amount_str.starts_with('-') {
            result.push('-');
            amount_str.remove(0);
        }

        if !amount_str.contains('.') {
            amount_str.push_str(".00");
        }

        let mut parts = amount_str.split('.');

        // the part before the decimal point
        if let Some(before_decimal) = parts.next() {
            match before_decimal.parse::<u128>() {
                Ok(integer) => {
                    let mut buffer = num_format::Buffer::new();
                    buffer.write_formatted(&integer, &num_format::Locale::en);
                    result.push_str(buffer.as_str());
                }
                Err(_) => result.push_str(before_decimal),
            }
        }

        // the part after the decimal point
        if let Some(after_decimal) = parts.next() {
            result.push('.');
            result.push_str(after_decimal);
            if after_decimal.len() < 2 {
                result.push('0');
            }
        }

        result
    }
}

impl std::ops::Neg for &Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount {
            number: -self.number.clone(),
            currency: self.currency.clone(),
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.formatted_number(), &self.currency)
    }
}

/// The flag indicates how the transaction is to be interpreted.
/// `*` marks transactions that are known to be correct, `!` marks transactions
/// that need further checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    #[default]
    Okay,
    Warning,
}

impl Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match &self {
            Flag::Okay => "*",
            Flag::Warning => "!",
        };
        write!(f, "{}", c)
    }
}

/// Origin of a transaction: the imported file and the 0-based data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub filename: PathBuf,
    pub lineno: usize,
}

/// A transaction is an accounting document that consists of a date and a set of
/// postings on accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub flag: Flag,
    pub payee: Option<String>,
    pub narration: String,
    pub tags: BTreeSet<String>,
    pub postings: Vec<Posting>,
    pub meta: Metadata,
}

impl Transaction {
    /// Sum of the posting units per currency. A balanced transaction only has
    /// zero entries.
    pub fn balance(&self) -> BTreeMap<String, BigDecimal> {
        let mut sums: BTreeMap<String, BigDecimal> = BTreeMap::new();
        for posting in &self.postings {
            let sum = sums.entry(posting.units.currency.clone()).or_default();
            *sum += &posting.units.number;
        }
        sums
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let date = self.date.format("%Y-%m-%d").to_string();
        let mut result = format!("{} {}", &date, &self.flag);
        if let Some(payee) = &self.payee {
            result = format!("{} {}", &result, quoted(payee));
        }
        result = format!("{} {}", &result, quoted(&self.narration));
        self.tags.iter().for_each(|tag| {
            result = format!("{} #{}", &result, tag);
        });
        self.postings.iter().for_each(|p| {
            result = format!("{}\n{}", &result, p);
        });
        write!(f, "{}", &result)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub account: String,
    pub units: Amount,
}

impl Posting {
    pub fn new(account: String, units: Amount) -> Self {
        Self { account, units }
    }
}

impl Display for Posting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let amount = self.units.to_string();
        // 80 is the default line length - the amount should be aligned to the right (at position 80)
        let length_filler = 80_usize.saturating_sub(2 + amount.len() + 1);
        write!(f, "  {:<w$} {}", &self.account, &amount, w = length_filler)
    }
}

#[derive(Debug)]
pub struct HeaderComment<'a> {
    pub title: &'a str,
}

impl<'a> HeaderComment<'a> {
    pub fn new(title: &'a str) -> Self {
        Self { title }
    }
}

impl Display for HeaderComment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let asterisk_line: String = "*".repeat(78);
        let date_time = chrono::Local::now().to_rfc2822();
        let gap: String = " ".repeat(80_usize.saturating_sub(self.title.len() + date_time.len() + 2));
        write!(
            f,
            "; {}\n; {}{}{}\n; {}",
            asterisk_line, self.title, gap, date_time, asterisk_line
        )
    }
}
