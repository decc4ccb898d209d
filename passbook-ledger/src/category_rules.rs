//! Deterministic category rules for posted transactions.
//!
//! Inflows are income. Outflows are matched by keyword over the description and, for UPI
//! rows, the receiver name and note. No model needed: merchant keywords plus the
//! person-to-person rule cover the bulk of a savings account.

use passbook_core::Transaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Income,
    #[serde(rename = "Starting Balances")]
    StartingBalances,
    Food,
    Transportation,
    Shopping,
    Bills,
    Transfer,
    Entertainment,
    Health,
    Investment,
    General,
}

impl Category {
    /// Name as it appears in the destination budget.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Income => "Income",
            Category::StartingBalances => "Starting Balances",
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Transfer => "Transfer",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Investment => "Investment",
            Category::General => "General",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Description of the synthetic opening-balance record.
pub const OPENING_BALANCE: &str = "Opening Balance";

/// `UPI/<receiver>/<vpa>/<note>/<bank>` particulars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpiParticulars {
    pub receiver: String,
    pub vpa: String,
    pub note: String,
    pub bank: String,
}

impl UpiParticulars {
    pub fn parse(description: &str) -> Option<Self> {
        let parts: Vec<&str> = description.split('/').map(str::trim).collect();
        if parts.len() < 5 || !parts[0].eq_ignore_ascii_case("UPI") {
            return None;
        }
        Some(Self {
            receiver: parts[1].to_string(),
            vpa: parts[2].to_string(),
            note: parts[3].to_string(),
            bank: parts[4].to_string(),
        })
    }

    /// QR and gateway handles belong to merchants, not people.
    fn is_merchant_handle(&self) -> bool {
        let vpa = self.vpa.to_lowercase();
        MERCHANT_HANDLES.iter().any(|h| vpa.contains(h))
    }
}

/// Lowercase VPA fragments of QR codes and payment gateways.
const MERCHANT_HANDLES: &[&str] = &[
    "paytmqr", "bharatpe", "razorpay", "pinelabs", "merchant", "q@", ".rzp", "gpay-",
];

const RULES: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &[
            "SWIGGY", "ZOMATO", "CAFE", "CAF ", "RESTAURANT", "HOTEL", "BAKERY", "TEA", "COFFEE",
            "BREAKFAST", "LUNCH", "DINNER", "SNACK", "CHAPATI", "MEAL", "FOOD", "GROCER", "BIGBASKET",
            "BLINKIT", "ZEPTO", "DMART", "MILK",
        ],
    ),
    (
        Category::Transportation,
        &[
            "UBER", "OLA", "RAPIDO", "PETROL", "FUEL", "IRCTC", "METRO", "BUS", "TRAIN", "PARKING",
            "TOLL", "FASTAG", "REDBUS",
        ],
    ),
    (
        Category::Shopping,
        &["AMAZON", "FLIPKART", "MYNTRA", "AJIO", "MEESHO", "NYKAA", "CROMA", "RELIANCE DIGITAL"],
    ),
    (
        Category::Bills,
        &[
            "ELECTRICITY", "BESCOM", "WATER", "GAS", "RECHARGE", "AIRTEL", "JIO", "VODAFONE", "BSNL",
            "BROADBAND", "INTERNET", "DTH", "BILL",
        ],
    ),
    (
        Category::Entertainment,
        &["NETFLIX", "SPOTIFY", "HOTSTAR", "PRIME VIDEO", "BOOKMYSHOW", "PVR", "INOX", "STEAM", "YOUTUBE"],
    ),
    (
        Category::Health,
        &["PHARMA", "MEDICAL", "HOSPITAL", "CLINIC", "APOLLO", "NETMEDS", "1MG", "DOCTOR", "GYM", "FITNESS"],
    ),
    (
        Category::Investment,
        &["MUTUAL FUND", "ZERODHA", "GROWW", "SIP", "INSURANCE", "LIC", "NPS", "PPF", "UPSTOX"],
    ),
];

/// Category for one posted transaction.
/// Priority: opening balance > inflow > keywords > person-to-person UPI > General.
pub fn categorize(txn: &Transaction) -> Category {
    if txn.description() == OPENING_BALANCE {
        return Category::StartingBalances;
    }
    if txn.is_inflow() {
        return Category::Income;
    }

    let upi = UpiParticulars::parse(txn.description());
    let haystack = match &upi {
        Some(p) => format!("{} {} {}", p.receiver, p.note, txn.description()).to_uppercase(),
        None => txn.description().to_uppercase(),
    };

    if let Some(category) = match_keywords(&haystack) {
        return category;
    }

    match upi {
        Some(p) if !p.is_merchant_handle() => Category::Transfer,
        _ => Category::General,
    }
}

fn match_keywords(haystack: &str) -> Option<Category> {
    let words: Vec<&str> = haystack
        .split(|c: char| !c.is_ascii_alphanumeric() && c != ' ')
        .collect();
    let padded = format!(" {} ", words.join(" "));
    RULES.iter().find_map(|(category, keywords)| {
        keywords
            .iter()
            .any(|k| contains_word(&padded, k))
            .then_some(*category)
    })
}

/// Short keywords (OLA, GAS, SIP) must match whole words; longer ones may match inside words.
fn contains_word(padded: &str, keyword: &str) -> bool {
    if keyword.len() <= 4 {
        padded.contains(&format!(" {} ", keyword.trim()))
    } else {
        padded.contains(keyword)
    }
}
