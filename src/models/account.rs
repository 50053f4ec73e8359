//! The two exchange sub-accounts the bot trades on.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Side;

/// One of the two trading accounts. Each has its own credentials and equity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Account {
    Main,
    Sub,
}

impl Account {
    /// Buys trade on the sub account, sells on the main account.
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Buy => Account::Sub,
            Side::Sell => Account::Main,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Account::Main => "Main",
            Account::Sub => "Sub",
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_policy() {
        assert_eq!(Account::for_side(Side::Buy), Account::Sub);
        assert_eq!(Account::for_side(Side::Sell), Account::Main);
        assert_eq!(Account::Main.to_string(), "Main");
    }
}
