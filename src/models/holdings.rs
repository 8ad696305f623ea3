//! Portfolio holdings and coin catalogue types.

use serde::{Deserialize, Serialize};

/// A position in the user's portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: i64,
    pub coin_name: String,
    pub average_price: f64,
    pub buying_price: f64,
}

/// Fields accepted when creating or updating a holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingDraft {
    pub coin_name: String,
    pub average_price: f64,
    pub buying_price: f64,
}

/// `GET /Coins` returns either a list or a single entry when filtered.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    Many(Vec<String>),
    One(String),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_wire_format() {
        let holding: Holding = serde_json::from_str(
            r#"{"id":7,"coinName":"BTC","averagePrice":41000.5,"buyingPrice":39000}"#,
        )
        .unwrap();
        assert_eq!(holding.coin_name, "BTC");
        assert_eq!(holding.buying_price, 39000.0);
    }

    #[test]
    fn test_coins_single_value_normalised() {
        let one: OneOrMany = serde_json::from_str(r#""ETH""#).unwrap();
        assert_eq!(Vec::<String>::from(one), vec!["ETH"]);

        let many: OneOrMany = serde_json::from_str(r#"["BTC","ETH"]"#).unwrap();
        assert_eq!(Vec::<String>::from(many).len(), 2);
    }
}
