//! Local grammar for natural-language trade commands:
//! `swap 0.1 ETH to USDC`, `buy 100 USDC with ETH`, `sell 0.5 eth for usdc`.

use serde::{Deserialize, Serialize};

use crate::error::SynthxError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTrade {
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
    /// `buy` names the amount received rather than the amount spent
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exact_output: bool,
}

const USAGE: &str = "Could not parse trade command. Try: \"swap 0.1 ETH to USDC\", \
                     \"buy 100 USDC with ETH\" or \"sell 0.5 ETH for USDC\"";

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace("->", " to ")
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

fn symbol(word: &str) -> Option<String> {
    let word = word.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    match word {
        "" => None,
        "ether" | "ethereum" => Some("ETH".to_string()),
        w if w.chars().all(|c| c.is_ascii_alphanumeric()) && w.chars().any(|c| c.is_ascii_alphabetic()) => {
            Some(w.to_ascii_uppercase())
        }
        _ => None,
    }
}

fn amount(word: &str) -> Option<String> {
    let value: f64 = word.parse().ok()?;
    (value.is_finite() && value > 0.0).then(|| word.to_string())
}

pub fn parse_trade_command(command: &str) -> Result<ParsedTrade, SynthxError> {
    let normalized = normalize(command);
    let words = tokenize(&normalized);

    let parsed = match words.as_slice() {
        [verb, qty, from, link, to]
            if matches!(*verb, "swap" | "exchange" | "trade" | "convert")
                && matches!(*link, "to" | "for" | "into") =>
        {
            Some((symbol(from), symbol(to), amount(qty), false))
        }
        [verb, qty, from, link, to]
            if *verb == "sell" && matches!(*link, "for" | "to" | "into") =>
        {
            Some((symbol(from), symbol(to), amount(qty), false))
        }
        [verb, qty, to, link, from]
            if *verb == "buy" && matches!(*link, "with" | "using") =>
        {
            Some((symbol(from), symbol(to), amount(qty), true))
        }
        _ => None,
    };

    let Some((Some(from_token), Some(to_token), Some(amount), exact_output)) = parsed else {
        return Err(SynthxError::validation(USAGE));
    };

    if from_token == to_token {
        return Err(SynthxError::validation("Cannot trade a token for itself"));
    }

    Ok(ParsedTrade { from_token, to_token, amount, exact_output })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn supported_forms() {
        assert_eq!(
            parse_trade_command("swap 0.1 ETH to USDC").unwrap(),
            ParsedTrade {
                from_token: "ETH".into(),
                to_token: "USDC".into(),
                amount: "0.1".into(),
                exact_output: false
            }
        );

        let buy = parse_trade_command("Buy 100 usdc with eth").unwrap();
        assert_eq!((buy.from_token.as_str(), buy.to_token.as_str()), ("ETH", "USDC"));
        assert!(buy.exact_output);

        let sell = parse_trade_command("sell 0.5 eth for usdc").unwrap();
        assert_eq!((sell.from_token.as_str(), sell.amount.as_str()), ("ETH", "0.5"));

        let arrow = parse_trade_command("swap 2 weth -> usdc").unwrap();
        assert_eq!(arrow.from_token, "WETH");
    }

    #[test]
    fn rejects_malformed_commands() {
        for bad in ["", "swap ETH to USDC", "swap -1 ETH to USDC", "swap 1 ETH to ETH", "hello there"] {
            assert_eq!(parse_trade_command(bad).unwrap_err().kind(), "validation", "{bad:?}");
        }
    }
}
