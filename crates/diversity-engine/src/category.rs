//! Keyword categorisation of report bullets.

/// Category assigned to templated bullets. Exempt from category cooldown.
pub const TEMPLATED: &str = "templated";
pub const GENERIC: &str = "generic";

/// Checked in order; the first table with a matching keyword wins.
const KEYWORDS: &[(&str, &[&str])] = &[
    (
        "allergen",
        &["allergen", "allergy", "allergic", "peanut", "tree nut", "shellfish", "sesame", "soy"],
    ),
    (
        "diet",
        &[
            "vegan", "vegetarian", "gluten", "halal", "kosher", "dairy", "diet", "plant-based",
            "keto", "pescatarian",
        ],
    ),
    (
        "accessibility",
        &[
            "contrast", "screen reader", "aria", "alt text", "tap target", "font size",
            "accessib", "focus order", "voiceover", "zoom",
        ],
    ),
    (
        "fees",
        &["fee", "surcharge", "tax", "tip", "service charge", "hidden cost", "total"],
    ),
    (
        "budget",
        &["budget", "price", "cheap", "afford", "deal", "promo", "discount", "coupon", "$"],
    ),
    ("upsell", &["upsell", "add-on", "combo", "upgrade", "pop-up", "popup", "modal"]),
    (
        "performance",
        &["slow", "load", "spinner", "lag", "delay", "timeout", "timed out", "wait"],
    ),
    (
        "checkout",
        &["cart", "checkout", "order review", "review order", "pickup time", "delivery time"],
    ),
    (
        "navigation",
        &[
            "menu", "search", "filter", "navigation", "categor", "scroll", "tab", "find",
            "button", "label", "layout",
        ],
    ),
];

/// Coarse topic of a bullet, used for category cooldown.
pub fn categorize(text: &str) -> &'static str {
    let lower = text.to_ascii_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(GENERIC)
}
