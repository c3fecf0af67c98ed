use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const IBC_PREFIX: &str = "ibc/";

/// A single coin amount. Its value is `numeric * 10^exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub text: String,
    pub currency: String,
    #[serde(with = "display_string")]
    pub numeric: BigUint,
    pub exp: i32,
}

impl Amount {
    pub fn new(currency: impl Into<String>, numeric: BigUint, exp: i32) -> Self {
        let currency = currency.into();
        let text = format!(
            "{}{}",
            format_decimal(&BigInt::from_biguint(Sign::Plus, numeric.clone()), exp),
            currency
        );

        Amount {
            text,
            currency,
            numeric,
            exp,
        }
    }

    /// Parses a single `<number><denom>` term. A bare number gets the
    /// default currency appended before parsing.
    pub fn parse(default_currency: &str, term: &str) -> Result<Amount, Error> {
        let term = term.trim();
        let term = if !term.is_empty() && term.bytes().all(|b| b.is_ascii_digit()) {
            format!("{}{}", term, default_currency)
        } else {
            term.to_owned()
        };

        let (number, currency) = split_denom(&term)?;
        let (numeric, exp) = parse_number(number)
            .ok_or_else(|| Error::MalformedAmount(term.to_owned()))?;

        Ok(Amount {
            text: term.to_owned(),
            currency,
            numeric,
            exp,
        })
    }

    pub fn to_decimal(&self) -> BigDecimal {
        BigDecimal::new(
            BigInt::from_biguint(Sign::Plus, self.numeric.clone()),
            -i64::from(self.exp),
        )
    }

    /// Magnitude expressed at a finer (or equal) exponent.
    fn rescaled(&self, exp: i32) -> BigUint {
        match self.exp.cmp(&exp) {
            Ordering::Greater => {
                let shift = (self.exp - exp).unsigned_abs();
                &self.numeric * BigUint::from(10u32).pow(shift)
            },
            _ => self.numeric.clone(),
        }
    }

    pub(crate) fn merged(&self, other: &Amount) -> Amount {
        let exp = self.exp.min(other.exp);
        let numeric = self.rescaled(exp) + other.rescaled(exp);
        Amount::new(self.currency.to_owned(), numeric, exp)
    }
}

/// Parses `<number><denom>[,<number><denom>...]`. Empty terms are skipped.
pub fn parse_amounts(default_currency: &str, raw: &str) -> Result<Vec<Amount>, Error> {
    let mut amounts = vec![];

    for term in raw.split(',') {
        if term.trim().is_empty() {
            continue;
        }
        amounts.push(Amount::parse(default_currency, term)?);
    }

    Ok(amounts)
}

/// Denom as stored in amounts: `ibc/HASH` becomes `HASH`.
pub fn normalize_currency(denom: &str) -> String {
    denom.strip_prefix(IBC_PREFIX).unwrap_or(denom).to_owned()
}

fn split_denom(term: &str) -> Result<(&str, String), Error> {
    let index = term
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| Error::MalformedAmount(term.to_owned()))?;

    let (number, denom) = term.split_at(index);

    if number.is_empty() {
        return Err(Error::MalformedAmount(term.to_owned()));
    }

    Ok((number, normalize_currency(denom)))
}

fn parse_number(number: &str) -> Option<(BigUint, i32)> {
    let (int, frac) = match number.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (number, ""),
    };

    if frac.contains('.') || (int.is_empty() && frac.is_empty()) {
        return None;
    }

    let digits = format!("{}{}", int, frac);
    let numeric = digits.parse::<BigUint>().ok()?;
    let exp = -i32::try_from(frac.len()).ok()?;

    Some((numeric, exp))
}

/// Renders `value * 10^exp` in plain decimal notation without trailing
/// fractional zeros.
pub fn format_decimal(value: &BigInt, exp: i32) -> String {
    let sign = if value.sign() == Sign::Minus { "-" } else { "" };
    let mut digits = value.magnitude().to_string();

    if exp >= 0 {
        if digits != "0" {
            digits.push_str(&"0".repeat(exp.unsigned_abs() as usize));
        }
        return format!("{}{}", sign, digits);
    }

    let scale = exp.unsigned_abs() as usize;
    if digits.len() <= scale {
        digits = format!("{}{}", "0".repeat(scale - digits.len() + 1), digits);
    }

    let (int, frac) = digits.split_at(digits.len() - scale);
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        if int == "0" {
            return String::from("0");
        }
        return format!("{}{}", sign, int);
    }

    format!("{}{}.{}", sign, int, frac)
}

/// Accumulates amounts keyed by currency, keeping first-seen order.
/// Amounts with differing exponents are merged at the finer exponent.
#[derive(Debug, Default, Clone)]
pub struct AmountsBuilder {
    amounts: Vec<Amount>,
}

impl AmountsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, amount: Amount) -> &mut Self {
        match self
            .amounts
            .iter_mut()
            .find(|item| item.currency == amount.currency)
        {
            Some(item) => *item = item.merged(&amount),
            None => self.amounts.push(amount),
        }

        self
    }

    pub fn extend<I: IntoIterator<Item = Amount>>(&mut self, amounts: I) -> &mut Self {
        for amount in amounts {
            self.add(amount);
        }

        self
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    pub fn build(self) -> Vec<Amount> {
        self.amounts
    }
}

pub(crate) mod display_string {
    use std::{fmt::Display, str::FromStr};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parses_single_term() {
        let amounts = parse_amounts("uatom", "140000uatom").unwrap();

        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].text, "140000uatom");
        assert_eq!(amounts[0].currency, "uatom");
        assert_eq!(amounts[0].numeric, BigUint::from(140000u32));
        assert_eq!(amounts[0].exp, 0);
    }

    #[test]
    fn parses_multiple_terms_and_strips_ibc_prefix() {
        let raw = "25uatom,7ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2";
        let amounts = parse_amounts("uatom", raw).unwrap();

        assert_eq!(amounts.len(), 2);
        assert_eq!(amounts[0].text, "25uatom");
        assert_eq!(
            amounts[1].currency,
            "27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2"
        );
        assert_eq!(
            amounts[1].text,
            "7ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2"
        );
    }

    #[test]
    fn bare_number_takes_default_currency() {
        let amounts = parse_amounts("uosmo", "500000000").unwrap();

        assert_eq!(amounts[0].text, "500000000uosmo");
        assert_eq!(amounts[0].currency, "uosmo");
        assert_eq!(amounts[0].numeric, BigUint::from(500000000u32));
    }

    #[test]
    fn decimal_term_sets_exponent() {
        let amount = Amount::parse("uatom", "12.5uatom").unwrap();

        assert_eq!(amount.numeric, BigUint::from(125u32));
        assert_eq!(amount.exp, -1);
        assert_eq!(amount.to_decimal(), BigDecimal::from_str("12.5").unwrap());
        assert_eq!(amount.text, "12.5uatom");
    }

    #[test]
    fn rejects_malformed_terms() {
        assert!(matches!(
            Amount::parse("uatom", "uatom"),
            Err(Error::MalformedAmount(_))
        ));
        assert!(matches!(
            Amount::parse("uatom", "1.2.3uatom"),
            Err(Error::MalformedAmount(_))
        ));
        assert!(matches!(
            Amount::parse("uatom", "140000"),
            Ok(Amount { exp: 0, .. })
        ));
        assert!(parse_amounts("uatom", "5uatom,.uatom").is_err());
    }

    #[test]
    fn empty_terms_are_skipped() {
        assert!(parse_amounts("uatom", "").unwrap().is_empty());
        assert_eq!(parse_amounts("uatom", "1uatom,,2uatom").unwrap().len(), 2);
    }

    #[test]
    fn builder_merges_by_currency() {
        let mut builder = AmountsBuilder::new();
        builder
            .add(Amount::parse("uatom", "10uatom").unwrap())
            .add(Amount::parse("uatom", "5uosmo").unwrap())
            .add(Amount::parse("uatom", "15uatom").unwrap());

        let amounts = builder.build();

        assert_eq!(amounts.len(), 2);
        assert_eq!(amounts[0].currency, "uatom");
        assert_eq!(amounts[0].numeric, BigUint::from(25u32));
        assert_eq!(amounts[0].text, "25uatom");
        assert_eq!(amounts[1].currency, "uosmo");
    }

    #[test]
    fn builder_merges_mixed_exponents_exactly() {
        let mut builder = AmountsBuilder::new();
        builder
            .add(Amount::parse("uatom", "10uatom").unwrap())
            .add(Amount::parse("uatom", "0.25uatom").unwrap());

        let amounts = builder.build();

        assert_eq!(amounts[0].numeric, BigUint::from(1025u32));
        assert_eq!(amounts[0].exp, -2);
        assert_eq!(amounts[0].text, "10.25uatom");
    }

    #[test]
    fn formats_decimals() {
        assert_eq!(format_decimal(&BigInt::from(51334), -4), "5.1334");
        assert_eq!(format_decimal(&BigInt::from(-5), -18), "-0.000000000000000005");
        assert_eq!(format_decimal(&BigInt::from(2_000_000), -6), "2");
        assert_eq!(format_decimal(&BigInt::from(0), -18), "0");
        assert_eq!(format_decimal(&BigInt::from(12), 2), "1200");
    }
}
