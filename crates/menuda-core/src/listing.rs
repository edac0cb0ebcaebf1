//! Transaction list view model: rows grouped by calendar month

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use menuda_config::CurrencyConfig;
use menuda_utils::{format_money, NumberFormat};

use crate::models::Transaction;

/// Label of the group holding rows without a readable date
pub const UNDATED_LABEL: &str = "Undated";

/// Money formatting from the currency config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyFormat {
    pub symbol: String,
    pub decimal_places: u32,
    pub thousands_separator: String,
    pub decimal_separator: String,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self::from_config(&CurrencyConfig::default())
    }
}

impl MoneyFormat {
    pub fn from_config(config: &CurrencyConfig) -> Self {
        Self {
            symbol: config.symbol.clone(),
            decimal_places: config.decimal_places,
            thousands_separator: config.thousands_separator.clone(),
            decimal_separator: config.decimal_separator.clone(),
        }
    }

    /// Round to the display precision; a value that rounds to zero loses its sign
    pub fn round(&self, amount: Decimal) -> Decimal {
        let mut rounded = amount.round_dp(self.decimal_places);
        rounded.rescale(self.decimal_places);
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        rounded
    }

    /// `-1234.5` → `-$1,234.50`
    pub fn format(&self, amount: Decimal) -> String {
        let rounded = self.round(amount);
        let format = NumberFormat {
            symbol: &self.symbol,
            thousands_separator: &self.thousands_separator,
            decimal_separator: &self.decimal_separator,
        };
        format_money(&rounded.to_string(), &format)
    }

    /// CSS class for the amount as displayed
    pub fn class(&self, amount: Decimal) -> &'static str {
        amount_class(self.round(amount))
    }
}

/// CSS class for a signed amount
pub fn amount_class(amount: Decimal) -> &'static str {
    if amount.is_sign_negative() && !amount.is_zero() {
        "negative"
    } else {
        "positive"
    }
}

/// One rendered list row
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub transaction_id: String,
    pub title: String,
    pub category_name: String,
    pub vendor_name: String,
    pub date: Option<NaiveDate>,
    /// e.g. `Oct 19, 2026`
    pub display_date: String,
    pub amount: Decimal,
    pub display_amount: String,
    pub amount_class: &'static str,
    pub has_attachment: bool,
}

impl TransactionRow {
    pub fn from_transaction(transaction: &Transaction, money: &MoneyFormat) -> Self {
        let date = transaction.date();
        Self {
            transaction_id: transaction.transaction_id.clone(),
            title: transaction.title.clone(),
            category_name: transaction.category_name.clone(),
            vendor_name: transaction.vendor_name.clone(),
            date,
            display_date: date
                .map(|d| d.format("%b %-d, %Y").to_string())
                .unwrap_or_default(),
            amount: transaction.amount,
            display_amount: money.format(transaction.amount),
            amount_class: money.class(transaction.amount),
            has_attachment: transaction.attachment().is_some(),
        }
    }
}

/// Rows of one calendar month
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionGroup {
    /// e.g. `October 2026`, or [`UNDATED_LABEL`]
    pub label: String,
    pub rows: Vec<TransactionRow>,
    pub total: Decimal,
    pub display_total: String,
    pub total_class: &'static str,
}

impl TransactionGroup {
    fn new(label: String, rows: Vec<TransactionRow>, money: &MoneyFormat) -> Self {
        let total: Decimal = rows.iter().map(|r| r.amount).sum();
        Self {
            label,
            rows,
            total,
            display_total: money.format(total),
            total_class: money.class(total),
        }
    }
}

/// Newest month first, newest row first inside a month; undated rows last
pub fn group_transactions(transactions: &[Transaction], money: &MoneyFormat) -> Vec<TransactionGroup> {
    let mut months: BTreeMap<(i32, u32), Vec<TransactionRow>> = BTreeMap::new();
    let mut undated = Vec::new();

    for transaction in transactions {
        let row = TransactionRow::from_transaction(transaction, money);
        match row.date {
            Some(date) => months.entry((date.year(), date.month())).or_default().push(row),
            None => undated.push(row),
        }
    }

    let mut groups: Vec<TransactionGroup> = months
        .into_iter()
        .rev()
        .map(|(_, mut rows)| {
            // Stable: same-day rows keep backend order
            rows.sort_by(|a, b| b.date.cmp(&a.date));
            let label = rows[0]
                .date
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_default();
            TransactionGroup::new(label, rows, money)
        })
        .collect();

    if !undated.is_empty() {
        groups.push(TransactionGroup::new(UNDATED_LABEL.to_string(), undated, money));
    }
    groups
}
