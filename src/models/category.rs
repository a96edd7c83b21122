//! Blog category model
//!
//! Categories are a closed set: posts always belong to exactly one of the
//! five values below. The wire form is the kebab-case value; `label()` gives
//! the human-readable name used in listings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of blog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    RealEstate,
    Finance,
    Healthcare,
    SupplyChain,
    Cybersecurity,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::RealEstate,
        Category::Finance,
        Category::Healthcare,
        Category::SupplyChain,
        Category::Cybersecurity,
    ];

    /// Canonical string value (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::RealEstate => "real-estate",
            Category::Finance => "finance",
            Category::Healthcare => "healthcare",
            Category::SupplyChain => "supply-chain",
            Category::Cybersecurity => "cybersecurity",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Category::RealEstate => "Real Estate",
            Category::Finance => "Finance",
            Category::Healthcare => "Healthcare",
            Category::SupplyChain => "Supply Chain",
            Category::Cybersecurity => "Cybersecurity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "real-estate" => Ok(Category::RealEstate),
            "finance" => Ok(Category::Finance),
            "healthcare" => Ok(Category::Healthcare),
            "supply-chain" => Ok(Category::SupplyChain),
            "cybersecurity" => Ok(Category::Cybersecurity),
            _ => Err(anyhow::anyhow!("Invalid category: {}", s)),
        }
    }
}

/// Category value + label pair for the public categories listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub value: Category,
    pub label: String,
}

impl From<Category> for CategoryInfo {
    fn from(category: Category) -> Self {
        Self {
            value: category,
            label: category.label().to_string(),
        }
    }
}
